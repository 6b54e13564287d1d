//! Running statistics across examples and folds.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use super::attribution::{CombineSign, ConfusionEntry, GroupAttribution, GroupCheck, Verdict};

/// `numerator / denominator`, undefined when nothing was tested.
pub fn ratio(numerator: usize, denominator: usize) -> Option<f64> {
    (denominator > 0).then(|| numerator as f64 / denominator as f64)
}

/// Per-family counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClassStats {
    pub tested: usize,
    pub correct: usize,
    /// Correct within the searched N-best prefix (includes top-1 hits).
    pub precision_hits: usize,
    pub multi_tested: usize,
    pub multi_correct: usize,
    pub single_tested: usize,
    pub single_correct: usize,
    pub combination_errors: usize,
}

impl ClassStats {
    pub fn accuracy(&self) -> Option<f64> {
        ratio(self.correct, self.tested)
    }

    pub fn precision(&self) -> Option<f64> {
        ratio(self.precision_hits, self.tested)
    }

    pub fn multi_accuracy(&self) -> Option<f64> {
        ratio(self.multi_correct, self.multi_tested)
    }

    pub fn single_accuracy(&self) -> Option<f64> {
        ratio(self.single_correct, self.single_tested)
    }

    fn add(&mut self, attribution: &GroupAttribution) {
        let correct = usize::from(attribution.is_correct());
        self.tested += 1;
        self.correct += correct;
        self.precision_hits += usize::from(attribution.is_precision_hit());
        if attribution.single_stroke {
            self.single_tested += 1;
            self.single_correct += correct;
        } else {
            self.multi_tested += 1;
            self.multi_correct += correct;
        }
        if matches!(attribution.verdict, Verdict::BadCombine { .. }) {
            self.combination_errors += 1;
        }
    }
}

/// Totals over every class.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Totals {
    pub files_tested: usize,
    pub groups: ClassStats,
    /// Multi-stroke groups that passed the combination gate.
    pub combined_correct: usize,
    pub combine_false_positives: usize,
    pub combine_false_negatives: usize,
}

impl Totals {
    pub fn accuracy(&self) -> Option<f64> {
        self.groups.accuracy()
    }

    pub fn precision(&self) -> Option<f64> {
        self.groups.precision()
    }
}

/// Results of one cross-validation fold.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FoldSummary {
    pub index: usize,
    pub files: usize,
    pub tested: usize,
    pub correct: usize,
}

impl FoldSummary {
    pub fn accuracy(&self) -> Option<f64> {
        ratio(self.correct, self.tested)
    }
}

/// Accumulates attribution outcomes for the final report.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Aggregator {
    classes: BTreeMap<String, ClassStats>,
    totals: Totals,
    false_positive_examples: BTreeSet<String>,
    false_negative_examples: BTreeSet<String>,
    confusion: Vec<ConfusionEntry>,
    unlabeled: BTreeSet<String>,
    unknown: BTreeMap<String, Vec<String>>,
    recognition_time: Duration,
    timed_out: Vec<String>,
    failed: Vec<(String, String)>,
    folds: Vec<FoldSummary>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// An aggregator that reports every named family, tested or not.
    pub fn with_families<'n>(names: impl IntoIterator<Item = &'n str>) -> Self {
        let classes = names
            .into_iter()
            .map(|name| (name.to_string(), ClassStats::default()))
            .collect();
        Self {
            classes,
            ..Self::default()
        }
    }

    /// Record the outcome of one group of `example`.
    pub fn record(&mut self, example: &str, check: &GroupCheck) {
        match check {
            GroupCheck::Unlabeled { .. } => {
                self.unlabeled.insert(example.to_string());
            }
            GroupCheck::UnknownLabel { label, .. } => self.record_unknown(label, example),
            GroupCheck::Evaluated(attribution) => self.record_attribution(example, attribution),
        }
    }

    /// Note a label that names no recognized family.
    pub fn record_unknown(&mut self, label: &str, example: &str) {
        let examples = self.unknown.entry(label.to_string()).or_default();
        if !examples.iter().any(|name| name == example) {
            examples.push(example.to_string());
        }
    }

    fn record_attribution(&mut self, example: &str, attribution: &GroupAttribution) {
        self.classes
            .entry(attribution.family.clone())
            .or_default()
            .add(attribution);
        self.totals.groups.add(attribution);
        if !attribution.single_stroke && attribution.combined_correctly() {
            self.totals.combined_correct += 1;
        }
        if let Verdict::BadCombine { sign, charged, .. } = &attribution.verdict {
            match sign {
                CombineSign::FalsePositive => {
                    if *charged > 0 {
                        self.totals.combine_false_positives += charged;
                        self.false_positive_examples.insert(example.to_string());
                    }
                }
                CombineSign::FalseNegative => {
                    self.totals.combine_false_negatives += charged;
                    self.false_negative_examples.insert(example.to_string());
                }
            }
        }
        if let Some(entry) = attribution.confusion_entry(example) {
            self.confusion.push(entry);
        }
    }

    pub fn record_recognition_time(&mut self, elapsed: Duration) {
        self.recognition_time += elapsed;
    }

    pub fn record_file_tested(&mut self) {
        self.totals.files_tested += 1;
    }

    pub fn record_timed_out(&mut self, example: &str) {
        self.timed_out.push(example.to_string());
    }

    pub fn record_failed(&mut self, example: &str, reason: &str) {
        self.failed.push((example.to_string(), reason.to_string()));
    }

    pub fn record_fold(&mut self, summary: FoldSummary) {
        self.folds.push(summary);
    }

    pub fn classes(&self) -> &BTreeMap<String, ClassStats> {
        &self.classes
    }

    pub fn class(&self, family: &str) -> Option<&ClassStats> {
        self.classes.get(family)
    }

    pub fn totals(&self) -> &Totals {
        &self.totals
    }

    /// Confusion entries in processing order.
    pub fn confusion(&self) -> &[ConfusionEntry] {
        &self.confusion
    }

    /// Examples with at least one confusion entry, in processing order, each with its
    /// entries.
    pub fn missed_examples(&self) -> Vec<(&str, Vec<&ConfusionEntry>)> {
        let mut missed: Vec<(&str, Vec<&ConfusionEntry>)> = Vec::new();
        for entry in &self.confusion {
            match missed.iter_mut().find(|(name, _)| *name == entry.example) {
                Some((_, entries)) => entries.push(entry),
                None => missed.push((entry.example.as_str(), vec![entry])),
            }
        }
        missed
    }

    pub fn false_positive_examples(&self) -> &BTreeSet<String> {
        &self.false_positive_examples
    }

    pub fn false_negative_examples(&self) -> &BTreeSet<String> {
        &self.false_negative_examples
    }

    pub fn unlabeled(&self) -> &BTreeSet<String> {
        &self.unlabeled
    }

    pub fn unknown(&self) -> &BTreeMap<String, Vec<String>> {
        &self.unknown
    }

    pub fn recognition_time(&self) -> Duration {
        self.recognition_time
    }

    /// Mean recognition time per tested group, in milliseconds.
    pub fn ms_per_primitive(&self) -> Option<f64> {
        let tested = self.totals.groups.tested;
        (tested > 0).then(|| self.recognition_time.as_secs_f64() * 1000.0 / tested as f64)
    }

    pub fn timed_out(&self) -> &[String] {
        &self.timed_out
    }

    pub fn failed(&self) -> &[(String, String)] {
        &self.failed
    }

    pub fn folds(&self) -> &[FoldSummary] {
        &self.folds
    }
}
