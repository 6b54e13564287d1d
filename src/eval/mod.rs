//! Evaluation: attribute predictions to ground truth, aggregate, and report.

pub mod attribution;
pub mod batch;
pub mod report;
pub mod stats;
pub mod thresholds;

pub use attribution::{
    AttributionSettings, Attributor, CombineSign, ConfusionEntry, DOT_LABEL, GroupAttribution,
    GroupCheck, NOT_FOUND_LABEL, PredictionIndex, Verdict,
};
pub use batch::{BatchRunner, EvalState, ExampleStatus, OVER_TIME_NOTE};
pub use report::{ReportError, SPACER, format_ratio, render, write_report};
pub use stats::{Aggregator, ClassStats, FoldSummary, Totals, ratio};
pub use thresholds::{ThresholdAnalyzer, ThresholdStats, ThresholdSummary};
