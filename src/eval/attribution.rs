//! Attribution of recognition output to ground-truth groups.
//!
//! For every group the combination gate runs first: the predicted group covering the
//! group's strokes must cover exactly as many strokes as the group has members. Only
//! then is the predicted label compared with the ground-truth label.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::config::EvaluationSettings;
use crate::recognition::{PredictedGroup, RecognitionResult};
use crate::sketch::{Example, FamilyCatalog, GroundTruthGroup, LabelCheck, PrimitiveLabel, StrokeId};

/// Predicted label recorded for a group nothing was attributed to.
pub const NOT_FOUND_LABEL: &str = "Not Found";
/// Label of the synthetic prediction used for single-point strokes.
pub const DOT_LABEL: &str = "Dot";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttributionSettings {
    /// N-best positions searched for a precision hit.
    pub precision_rank: usize,
    pub dot_fallback: bool,
}

impl Default for AttributionSettings {
    fn default() -> Self {
        Self::from(&EvaluationSettings::default())
    }
}

impl From<&EvaluationSettings> for AttributionSettings {
    fn from(settings: &EvaluationSettings) -> Self {
        Self {
            precision_rank: settings.precision_rank.max(1),
            dot_fallback: settings.dot_fallback,
        }
    }
}

/// Lookup from stroke to the result whose best interpretation covers it.
///
/// When two results claim the same stroke the earlier one wins.
#[derive(Debug)]
pub struct PredictionIndex<'r> {
    results: &'r [RecognitionResult],
    by_stroke: HashMap<StrokeId, usize>,
}

impl<'r> PredictionIndex<'r> {
    pub fn new(results: &'r [RecognitionResult]) -> Self {
        let mut by_stroke = HashMap::new();
        for (position, result) in results.iter().enumerate() {
            let Some(best) = result.best() else {
                continue;
            };
            for stroke in best.flatten() {
                by_stroke.entry(stroke).or_insert(position);
            }
        }
        Self { results, by_stroke }
    }

    pub fn empty() -> PredictionIndex<'static> {
        PredictionIndex {
            results: &[],
            by_stroke: HashMap::new(),
        }
    }

    /// Position and result attributed to `stroke`.
    pub fn result_for(&self, stroke: StrokeId) -> Option<(usize, &'r RecognitionResult)> {
        let position = *self.by_stroke.get(&stroke)?;
        Some((position, &self.results[position]))
    }

    /// First member of `group` with an attributed result.
    fn result_for_group(&self, group: &GroundTruthGroup) -> Option<(usize, &'r RecognitionResult)> {
        group
            .members
            .iter()
            .find_map(|stroke| self.result_for(*stroke))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CombineSign {
    /// Extra strokes were folded into the prediction.
    FalsePositive,
    /// The prediction is missing strokes of the group.
    FalseNegative,
}

impl fmt::Display for CombineSign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CombineSign::FalsePositive => f.write_str("(+)"),
            CombineSign::FalseNegative => f.write_str("(-)"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Verdict {
    /// Top-1 label matches.
    Correct,
    Mislabeled {
        predicted: String,
        confidence: f64,
        /// The true label appears within the first `precision_rank` interpretations.
        within_rank: bool,
    },
    BadCombine {
        sign: CombineSign,
        /// Combination errors charged by this group; zero when every extra stroke was
        /// already charged through another group of the same example.
        charged: usize,
        note: String,
    },
    NotFound {
        note: String,
    },
}

/// Outcome for one ground-truth group with a recognized label.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupAttribution {
    pub group_index: usize,
    /// Ground-truth label as written.
    pub actual: String,
    /// Canonical family name of the ground-truth label.
    pub family: String,
    pub single_stroke: bool,
    /// Position of the attributed result in the recognizer output.
    pub result: Option<usize>,
    pub verdict: Verdict,
}

impl GroupAttribution {
    pub fn is_correct(&self) -> bool {
        matches!(self.verdict, Verdict::Correct)
    }

    /// Top-1 correct, or the true label within the searched N-best prefix.
    pub fn is_precision_hit(&self) -> bool {
        matches!(
            self.verdict,
            Verdict::Correct
                | Verdict::Mislabeled {
                    within_rank: true,
                    ..
                }
        )
    }

    /// Passed the combination gate.
    pub fn combined_correctly(&self) -> bool {
        matches!(self.verdict, Verdict::Correct | Verdict::Mislabeled { .. })
    }

    pub fn confusion_entry(&self, example: &str) -> Option<ConfusionEntry> {
        let (predicted, confidence, note) = match &self.verdict {
            Verdict::Correct => return None,
            Verdict::Mislabeled {
                predicted,
                confidence,
                within_rank,
            } => {
                let note = if *within_rank { "in n-best" } else { "" };
                (predicted.clone(), *confidence, note.to_string())
            }
            Verdict::BadCombine { sign, note, .. } => {
                (format!("Bad Combine {sign}"), 0.0, note.clone())
            }
            Verdict::NotFound { note } => (NOT_FOUND_LABEL.to_string(), 0.0, note.clone()),
        };
        Some(ConfusionEntry {
            example: example.to_string(),
            group_index: self.group_index,
            actual: self.actual.clone(),
            predicted,
            confidence,
            note,
        })
    }
}

/// Diagnostic or scored result for one group of an example.
#[derive(Clone, Debug, PartialEq)]
pub enum GroupCheck {
    Unlabeled { group_index: usize },
    UnknownLabel { group_index: usize, label: String },
    Evaluated(GroupAttribution),
}

/// A recorded mismatch between expected and predicted outcome.
#[derive(Clone, Debug, PartialEq)]
pub struct ConfusionEntry {
    pub example: String,
    pub group_index: usize,
    pub actual: String,
    /// Predicted top-1 label, `Bad Combine (+)`/`Bad Combine (-)`, or `Not Found`.
    pub predicted: String,
    pub confidence: f64,
    pub note: String,
}

pub struct Attributor<'a> {
    catalog: &'a FamilyCatalog,
    settings: AttributionSettings,
}

impl<'a> Attributor<'a> {
    pub fn new(catalog: &'a FamilyCatalog, settings: AttributionSettings) -> Self {
        Self { catalog, settings }
    }

    pub fn catalog(&self) -> &FamilyCatalog {
        self.catalog
    }

    /// Attribute every group of `example` in group order.
    ///
    /// `incomplete` carries the note for a recognition that did not finish (for example
    /// `Over Time`). Every valid group is then scored as not found with that note, and
    /// no fallback prediction is synthesized.
    pub fn attribute_example(
        &self,
        example: &Example,
        index: &PredictionIndex<'_>,
        incomplete: Option<&str>,
    ) -> Vec<GroupCheck> {
        let mut charged: HashSet<StrokeId> = HashSet::new();
        example
            .groups()
            .iter()
            .enumerate()
            .map(|(group_index, group)| {
                match self.catalog.check(group.trimmed_label()) {
                    LabelCheck::Unlabeled => GroupCheck::Unlabeled { group_index },
                    LabelCheck::Unknown(label) => GroupCheck::UnknownLabel { group_index, label },
                    LabelCheck::Valid(label) => GroupCheck::Evaluated(self.attribute_group(
                        example,
                        group_index,
                        &label,
                        index,
                        incomplete,
                        &mut charged,
                    )),
                }
            })
            .collect()
    }

    fn attribute_group(
        &self,
        example: &Example,
        group_index: usize,
        label: &PrimitiveLabel,
        index: &PredictionIndex<'_>,
        incomplete: Option<&str>,
        charged: &mut HashSet<StrokeId>,
    ) -> GroupAttribution {
        let group = &example.groups()[group_index];
        let mut attribution = GroupAttribution {
            group_index,
            actual: label.raw.clone(),
            family: self.catalog.family_name(label.family).to_string(),
            single_stroke: group.is_single_stroke(),
            result: None,
            verdict: Verdict::NotFound {
                note: incomplete.unwrap_or_default().to_string(),
            },
        };
        if incomplete.is_some() {
            return attribution;
        }
        let fallback;
        let result = match index.result_for_group(group) {
            Some((position, result)) => {
                attribution.result = Some(position);
                result
            }
            None => match self.dot_fallback(example, group) {
                Some(dot) => {
                    fallback = dot;
                    &fallback
                }
                None => return attribution,
            },
        };
        let Some(best) = result.best() else {
            return attribution;
        };
        attribution.verdict = self.judge(group, label, result, best, charged);
        attribution
    }

    fn dot_fallback(&self, example: &Example, group: &GroundTruthGroup) -> Option<RecognitionResult> {
        if !self.settings.dot_fallback || !group.is_single_stroke() {
            return None;
        }
        let stroke = example.stroke(group.members[0])?;
        (stroke.points.len() <= 1).then(|| {
            RecognitionResult::single(PredictedGroup::leaf(DOT_LABEL, 1.0, vec![stroke.id]))
        })
    }

    fn judge(
        &self,
        group: &GroundTruthGroup,
        label: &PrimitiveLabel,
        result: &RecognitionResult,
        best: &PredictedGroup,
        charged: &mut HashSet<StrokeId>,
    ) -> Verdict {
        let expected = group.members.len();
        let predicted_strokes = best.flatten();
        let predicted = predicted_strokes.len();

        if predicted > expected {
            let already_charged = group.members.iter().all(|stroke| charged.contains(stroke));
            let charged_now = if already_charged {
                0
            } else {
                charged.extend(predicted_strokes.iter().copied());
                predicted - expected
            };
            let note = if group.is_single_stroke() {
                best.leaf_containing(group.members[0])
                    .map(|leaf| format!("as part of {} ({:.3})", leaf.label, leaf.confidence))
                    .unwrap_or_default()
            } else {
                String::new()
            };
            return Verdict::BadCombine {
                sign: CombineSign::FalsePositive,
                charged: charged_now,
                note,
            };
        }
        if predicted < expected {
            return Verdict::BadCombine {
                sign: CombineSign::FalseNegative,
                charged: 1,
                note: format!("{predicted} of {expected} strokes"),
            };
        }

        if self.catalog.matches(&best.label, label) {
            return Verdict::Correct;
        }
        let within_rank = result
            .n_best()
            .iter()
            .take(self.settings.precision_rank)
            .any(|candidate| self.catalog.matches(&candidate.label, label));
        Verdict::Mislabeled {
            predicted: best.label.clone(),
            confidence: best.confidence,
            within_rank,
        }
    }
}

#[cfg(test)]
mod tests;
