//! Sequential batch loop: submit each example, attribute, aggregate.

use std::collections::{BTreeMap, HashSet};

use tracing::{info, warn};

use super::attribution::{AttributionSettings, Attributor, GroupCheck, PredictionIndex};
use super::report::format_ratio;
use super::stats::{Aggregator, FoldSummary};
use super::thresholds::ThresholdAnalyzer;
use crate::config::EvaluationSettings;
use crate::dataset::{PartitionError, stratify};
use crate::recognition::{RecognitionOutcome, Recognizer, invoke};
use crate::sketch::{Example, FamilyCatalog, LabelCheck, Stroke};

/// Note attached to groups of an example whose recognition ran over time.
pub const OVER_TIME_NOTE: &str = "Over Time";

/// What happened to one example.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExampleStatus {
    Tested,
    /// Scored with every group missing.
    TimedOut,
    /// Recognition failed; the example was skipped.
    Failed,
}

/// Mutable state threaded through a batch.
#[derive(Debug, Default)]
pub struct EvalState {
    pub aggregator: Aggregator,
    pub thresholds: ThresholdAnalyzer,
}

impl EvalState {
    /// State whose report lists every family of `catalog`, including untested ones.
    pub fn new(catalog: &FamilyCatalog) -> Self {
        Self {
            aggregator: Aggregator::with_families(catalog.names()),
            thresholds: ThresholdAnalyzer::default(),
        }
    }
}

pub struct BatchRunner<'a> {
    attributor: Attributor<'a>,
    submit_unknown_strokes: bool,
}

impl<'a> BatchRunner<'a> {
    pub fn new(catalog: &'a FamilyCatalog, settings: &EvaluationSettings) -> Self {
        Self {
            attributor: Attributor::new(catalog, AttributionSettings::from(settings)),
            submit_unknown_strokes: settings.submit_unknown_strokes,
        }
    }

    /// Strokes handed to the recognizer for `example`.
    ///
    /// Ungrouped strokes whose label names no recognized family are held back unless
    /// `submit_unknown_strokes` is set; their labels are still reported.
    pub fn submission(&self, example: &Example) -> Vec<Stroke> {
        if self.submit_unknown_strokes {
            return example.strokes().to_vec();
        }
        let held_back: HashSet<_> = example
            .groups()
            .iter()
            .filter(|group| group.implicit)
            .filter(|group| {
                matches!(
                    self.attributor.catalog().check(group.trimmed_label()),
                    LabelCheck::Unknown(_)
                )
            })
            .flat_map(|group| group.members.iter().copied())
            .collect();
        example
            .strokes()
            .iter()
            .filter(|stroke| !held_back.contains(&stroke.id))
            .cloned()
            .collect()
    }

    /// Recognize, attribute, and record one example.
    pub fn evaluate_example(
        &self,
        recognizer: &mut dyn Recognizer,
        example: &Example,
        state: &mut EvalState,
    ) -> ExampleStatus {
        let strokes = self.submission(example);
        let outcome = invoke(recognizer, &strokes);
        state.aggregator.record_recognition_time(outcome.elapsed());

        let (results, incomplete, status) = match outcome {
            RecognitionOutcome::Completed { results, .. } => (results, None, ExampleStatus::Tested),
            RecognitionOutcome::TimedOut { .. } => {
                warn!("{}: recognition ran over time", example.path().display());
                state.aggregator.record_timed_out(example.name());
                (Vec::new(), Some(OVER_TIME_NOTE), ExampleStatus::TimedOut)
            }
            RecognitionOutcome::Failed { reason, .. } => {
                warn!("{}: {}", example.path().display(), reason);
                state.aggregator.record_failed(example.name(), &reason);
                return ExampleStatus::Failed;
            }
        };

        let index = PredictionIndex::new(&results);
        let checks = self
            .attributor
            .attribute_example(example, &index, incomplete);
        let mut observed = HashSet::new();
        for check in &checks {
            state.aggregator.record(example.name(), check);
            let GroupCheck::Evaluated(attribution) = check else {
                continue;
            };
            let Some(position) = attribution.result else {
                continue;
            };
            if observed.insert(position) {
                for reading in &results[position].thresholds {
                    state
                        .thresholds
                        .observe(&reading.name, &attribution.family, reading.value);
                }
            }
        }
        state.aggregator.record_file_tested();

        let file_name = example
            .path()
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| example.name().to_string());
        let accuracy = state.aggregator.totals().accuracy().unwrap_or(0.0);
        info!("{file_name}\tCurrent Accuracy = {accuracy}");
        status
    }

    /// Evaluate `examples` in order.
    pub fn run<'e>(
        &self,
        recognizer: &mut dyn Recognizer,
        examples: impl IntoIterator<Item = &'e Example>,
        state: &mut EvalState,
    ) {
        for example in examples {
            self.evaluate_example(recognizer, example, state);
        }
    }

    /// Train on each fold's training split and evaluate its test split.
    ///
    /// Every fold contributes to the global statistics and records its own summary.
    pub fn run_cross_validation(
        &self,
        recognizer: &mut dyn Recognizer,
        classes: &BTreeMap<String, Vec<Example>>,
        fold_count: usize,
        seed: Option<&str>,
        state: &mut EvalState,
    ) -> Result<(), PartitionError> {
        let folds = stratify(classes, fold_count, seed, |example| {
            example.name().to_string()
        })?;
        for index in 0..fold_count {
            let mut training: Vec<&Example> = Vec::new();
            let mut test: Vec<&Example> = Vec::new();
            for (class_id, examples) in classes {
                let Some(fold) = folds.get(class_id).and_then(|folds| folds.get(index)) else {
                    continue;
                };
                test.extend(fold.test.iter().map(|&position| &examples[position]));
                training.extend(
                    fold.training(examples.len())
                        .into_iter()
                        .map(|position| &examples[position]),
                );
            }
            info!(
                "Fold {index}: training on {} examples, testing {}",
                training.len(),
                test.len()
            );

            let before = *state.aggregator.totals();
            if let Err(err) = recognizer.train(&training) {
                warn!("Fold {index}: training failed: {err}");
                let reason = err.to_string();
                for example in &test {
                    state.aggregator.record_failed(example.name(), &reason);
                }
            } else {
                self.run(recognizer, test.iter().copied(), state);
            }
            let after = *state.aggregator.totals();
            let summary = FoldSummary {
                index,
                files: after.files_tested - before.files_tested,
                tested: after.groups.tested - before.groups.tested,
                correct: after.groups.correct - before.groups.correct,
            };
            info!(
                "Fold {index}: accuracy {} ({} of {})",
                format_ratio(summary.accuracy()),
                summary.correct,
                summary.tested
            );
            state.aggregator.record_fold(summary);
        }
        Ok(())
    }
}
