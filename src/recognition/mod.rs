//! Recognition invocation: the recognizer seam and the shape of its output.

pub mod replay;

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::debug;

use crate::sketch::{Example, Stroke, StrokeId};

pub use replay::{DEFAULT_PREDICTIONS_FILE, ReplayLoadError, ReplayRecognizer};

/// Attribute key marking a composite interpretation.
pub const COMBINED_ATTRIBUTE: &str = "combined";

/// Members of a predicted group.
#[derive(Clone, Debug, PartialEq)]
pub enum GroupBody {
    Leaf(Vec<StrokeId>),
    /// Combined interpretation built from sub-interpretations.
    Composite(Vec<PredictedGroup>),
}

/// One labeled interpretation of a set of strokes.
#[derive(Clone, Debug, PartialEq)]
pub struct PredictedGroup {
    pub label: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    pub attributes: BTreeMap<String, String>,
    pub body: GroupBody,
}

impl PredictedGroup {
    pub fn leaf(label: impl Into<String>, confidence: f64, strokes: Vec<StrokeId>) -> Self {
        Self {
            label: label.into(),
            confidence,
            attributes: BTreeMap::new(),
            body: GroupBody::Leaf(strokes),
        }
    }

    pub fn composite(
        label: impl Into<String>,
        confidence: f64,
        children: Vec<PredictedGroup>,
    ) -> Self {
        let mut attributes = BTreeMap::new();
        attributes.insert(COMBINED_ATTRIBUTE.to_string(), "true".to_string());
        Self {
            label: label.into(),
            confidence,
            attributes,
            body: GroupBody::Composite(children),
        }
    }

    /// Composite bodies and groups flagged with [`COMBINED_ATTRIBUTE`] both count.
    pub fn is_combined(&self) -> bool {
        matches!(self.body, GroupBody::Composite(_))
            || self
                .attributes
                .get(COMBINED_ATTRIBUTE)
                .is_some_and(|value| value == "true")
    }

    /// Every stroke covered by this interpretation.
    ///
    /// A leaf contributes its own strokes; a composite contributes the union of its
    /// children's flattened strokes, first occurrence order.
    pub fn flatten(&self) -> Vec<StrokeId> {
        let mut out = Vec::new();
        self.collect_strokes(&mut out);
        out
    }

    fn collect_strokes(&self, out: &mut Vec<StrokeId>) {
        match &self.body {
            GroupBody::Leaf(strokes) => {
                for stroke in strokes {
                    if !out.contains(stroke) {
                        out.push(*stroke);
                    }
                }
            }
            GroupBody::Composite(children) => {
                for child in children {
                    child.collect_strokes(out);
                }
            }
        }
    }

    pub fn stroke_count(&self) -> usize {
        self.flatten().len()
    }

    pub fn contains(&self, stroke: StrokeId) -> bool {
        match &self.body {
            GroupBody::Leaf(strokes) => strokes.contains(&stroke),
            GroupBody::Composite(children) => children.iter().any(|child| child.contains(stroke)),
        }
    }

    /// The innermost leaf interpretation covering `stroke`.
    pub fn leaf_containing(&self, stroke: StrokeId) -> Option<&PredictedGroup> {
        match &self.body {
            GroupBody::Leaf(strokes) => strokes.contains(&stroke).then_some(self),
            GroupBody::Composite(children) => children
                .iter()
                .find_map(|child| child.leaf_containing(stroke)),
        }
    }
}

/// A decision-threshold value the engine exposed while recognizing a group.
#[derive(Clone, Debug, PartialEq)]
pub struct ThresholdReading {
    pub name: String,
    pub value: f64,
}

/// N-best interpretations for one emitted group.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct RecognitionResult {
    n_best: Vec<PredictedGroup>,
    pub thresholds: Vec<ThresholdReading>,
}

impl RecognitionResult {
    /// Build a result; interpretations are ordered by descending confidence.
    pub fn new(mut n_best: Vec<PredictedGroup>, thresholds: Vec<ThresholdReading>) -> Self {
        n_best.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        Self { n_best, thresholds }
    }

    pub fn single(best: PredictedGroup) -> Self {
        Self::new(vec![best], Vec::new())
    }

    pub fn best(&self) -> Option<&PredictedGroup> {
        self.n_best.first()
    }

    pub fn n_best(&self) -> &[PredictedGroup] {
        &self.n_best
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecognitionError {
    #[error("recognition exceeded its time budget")]
    OverTime,
    #[error("recognition failed: {0}")]
    Failed(String),
}

/// A classifier that groups and labels strokes.
pub trait Recognizer {
    fn name(&self) -> &str;

    /// Prepare for a cross-validation fold. Recognizers without a training step
    /// ignore this.
    fn train(&mut self, _training: &[&Example]) -> Result<(), RecognitionError> {
        Ok(())
    }

    /// Drop any strokes submitted so far.
    fn clear(&mut self);

    fn submit(&mut self, strokes: &[Stroke]);

    fn recognize(&mut self) -> Result<Vec<RecognitionResult>, RecognitionError>;
}

/// What one recognition call produced, with its wall-clock duration.
#[derive(Clone, Debug, PartialEq)]
pub enum RecognitionOutcome {
    Completed {
        results: Vec<RecognitionResult>,
        elapsed: Duration,
    },
    TimedOut {
        elapsed: Duration,
    },
    Failed {
        reason: String,
        elapsed: Duration,
    },
}

impl RecognitionOutcome {
    pub fn elapsed(&self) -> Duration {
        match self {
            RecognitionOutcome::Completed { elapsed, .. }
            | RecognitionOutcome::TimedOut { elapsed }
            | RecognitionOutcome::Failed { elapsed, .. } => *elapsed,
        }
    }
}

/// Clear, submit `strokes`, and recognize, timing the whole call.
pub fn invoke(recognizer: &mut dyn Recognizer, strokes: &[Stroke]) -> RecognitionOutcome {
    let started = Instant::now();
    recognizer.clear();
    recognizer.submit(strokes);
    let result = recognizer.recognize();
    let elapsed = started.elapsed();
    debug!(
        "{} recognized {} strokes in {:?}",
        recognizer.name(),
        strokes.len(),
        elapsed
    );
    match result {
        Ok(results) => RecognitionOutcome::Completed { results, elapsed },
        Err(RecognitionError::OverTime) => RecognitionOutcome::TimedOut { elapsed },
        Err(RecognitionError::Failed(reason)) => RecognitionOutcome::Failed { reason, elapsed },
    }
}
