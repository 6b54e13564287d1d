//! Plain-text evaluation report.
//!
//! Sections always appear in the same order, each separated by a spacer line, and an
//! empty section still prints its header so tools can parse the layout.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::stats::{Aggregator, ClassStats};
use super::thresholds::ThresholdAnalyzer;

pub const SPACER: &str = "**************************************";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Format a derived ratio; undefined ratios print as `undefined`.
pub fn format_ratio(value: Option<f64>) -> String {
    match value {
        Some(value) => format!("{value:.4}"),
        None => "undefined".to_string(),
    }
}

/// Render the full report.
pub fn render(aggregator: &Aggregator, thresholds: &ThresholdAnalyzer) -> String {
    let sections = [
        missed_examples(aggregator),
        unknown_labels(aggregator),
        unlabeled_files(aggregator),
        combination_summary(aggregator),
        accuracy_summary(aggregator),
        timing_summary(aggregator),
        threshold_summary(thresholds),
    ];
    let spacer = format!("\n{SPACER}\n\n");
    sections.join(spacer.as_str())
}

pub fn write_report(
    path: &Path,
    aggregator: &Aggregator,
    thresholds: &ThresholdAnalyzer,
) -> Result<(), ReportError> {
    write_text(path, &render(aggregator, thresholds))
}

pub(crate) fn write_text(path: &Path, text: &str) -> Result<(), ReportError> {
    let write_err = |source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    fs::write(path, text).map_err(write_err)
}

fn missed_examples(aggregator: &Aggregator) -> String {
    let mut out = String::from("Missed Examples (File (Group), Actual, Recognized As, Confidence, Notes):\n\n");
    let missed = aggregator.missed_examples();
    for (_, entries) in &missed {
        for entry in entries {
            out.push_str(&format!(
                "{} ({})\t{}\t{}\t{}",
                entry.example, entry.group_index, entry.actual, entry.predicted, entry.confidence
            ));
            if !entry.note.is_empty() {
                out.push('\t');
                out.push_str(&entry.note);
            }
            out.push('\n');
        }
    }
    out.push_str("\n\n");
    for (_, entries) in &missed {
        for entry in entries {
            out.push_str(&format!("{} ({})\n", entry.example, entry.group_index));
        }
    }
    out
}

fn unknown_labels(aggregator: &Aggregator) -> String {
    let mut out = String::from("Unknown Primitive References:\n\n");
    for (label, examples) in aggregator.unknown() {
        out.push_str(&format!("{label}\n"));
        for example in examples {
            out.push_str(&format!("\t{example}\n"));
        }
    }
    out
}

fn unlabeled_files(aggregator: &Aggregator) -> String {
    let mut out = String::from("Files Containing Unlabeled Shapes:\n\n");
    for example in aggregator.unlabeled() {
        out.push_str(&format!("{example}\n"));
    }
    out
}

fn combination_summary(aggregator: &Aggregator) -> String {
    let totals = aggregator.totals();
    let mut out = [
        format!("Number of multi-stroke primitives: {}", totals.groups.multi_tested),
        format!("Number of multi-stroke combine correct: {}", totals.combined_correct),
        format!(
            "Number of multi-stroke false negatives: {}",
            totals.combine_false_negatives
        ),
        format!(
            "Number of multi-stroke false positives: {}",
            totals.combine_false_positives
        ),
        String::new(),
    ]
    .join("\n");
    out.push_str("\nFiles containing false negatives:\n\n");
    for example in aggregator.false_negative_examples() {
        out.push_str(&format!("{example}\n"));
    }
    out.push_str("\nFiles containing false positives:\n\n");
    for example in aggregator.false_positive_examples() {
        out.push_str(&format!("{example}\n"));
    }
    out
}

fn count_line(out: &mut String, name: &str, correct: usize, tested: usize, value: Option<f64>) {
    out.push_str(&format!(
        "\t{name}:\t({correct}\\{tested}) = {}\n",
        format_ratio(value)
    ));
}

fn class_block(out: &mut String, family: &str, stats: &ClassStats) {
    out.push_str(&format!("{family}:\n"));
    if stats.tested == 0 {
        out.push_str("\tno examples tested\n\n");
        return;
    }
    count_line(out, "Accuracy", stats.correct, stats.tested, stats.accuracy());
    count_line(
        out,
        "Precision",
        stats.precision_hits,
        stats.tested,
        stats.precision(),
    );
    if stats.multi_tested > 0 {
        count_line(
            out,
            "MS Accuracy",
            stats.multi_correct,
            stats.multi_tested,
            stats.multi_accuracy(),
        );
    }
    if stats.single_tested > 0 {
        count_line(
            out,
            "SS Accuracy",
            stats.single_correct,
            stats.single_tested,
            stats.single_accuracy(),
        );
    }
    out.push_str(&format!("\tCombination Errors:\t{}\n\n", stats.combination_errors));
}

fn accuracy_summary(aggregator: &Aggregator) -> String {
    let mut out = String::from("Individual Primitive Accuracies:\n\n");
    for (family, stats) in aggregator.classes() {
        class_block(&mut out, family, stats);
    }

    let totals = aggregator.totals();
    let groups = &totals.groups;
    let lines = [
        String::new(),
        format!("Number of files tested: {}", totals.files_tested),
        format!("Number of primitives correct: {}", groups.correct),
        format!("Number of primitives tested: {}", groups.tested),
        format!("Final Accuracy = {}", format_ratio(totals.accuracy())),
        format!("Final Precision = {}", format_ratio(totals.precision())),
        String::new(),
        format!("Number of multi-stroke primitives correct: {}", groups.multi_correct),
        format!("Number of multi-stroke primitives: {}", groups.multi_tested),
        format!(
            "Accuracy Multi-Stroke = {}",
            format_ratio(groups.multi_accuracy())
        ),
        String::new(),
        format!("Number of single-stroke primitives correct: {}", groups.single_correct),
        format!("Number of single-stroke primitives: {}", groups.single_tested),
        format!(
            "Accuracy Single-Stroke = {}",
            format_ratio(groups.single_accuracy())
        ),
    ];
    out.push_str(&lines.join("\n"));
    out.push('\n');

    out.push_str("\nCross-Validation Folds:\n\n");
    for fold in aggregator.folds() {
        out.push_str(&format!(
            "Fold {}: files={} tested={} correct={} accuracy={}\n",
            fold.index,
            fold.files,
            fold.tested,
            fold.correct,
            format_ratio(fold.accuracy())
        ));
    }

    out.push_str(&format!("\nTimed Out Examples ({}):\n\n", aggregator.timed_out().len()));
    for example in aggregator.timed_out() {
        out.push_str(&format!("{example}\n"));
    }
    out.push_str(&format!("\nFailed Examples ({}):\n\n", aggregator.failed().len()));
    for (example, reason) in aggregator.failed() {
        out.push_str(&format!("{example}\t{reason}\n"));
    }
    out
}

fn timing_summary(aggregator: &Aggregator) -> String {
    let mut out = format!(
        "Total Recognition Time = {} seconds. ",
        aggregator.recognition_time().as_secs_f64()
    );
    if let Some(ms) = aggregator.ms_per_primitive() {
        out.push_str(&format!("{ms:.3} ms per primitive."));
    }
    out.push('\n');
    out
}

fn threshold_summary(thresholds: &ThresholdAnalyzer) -> String {
    let mut out = String::from("Threshold Summary (Threshold, Class, Samples, Min, Max, Avg, StdDev):\n\n");
    for summary in thresholds.summarize() {
        let stats = summary.stats;
        out.push_str(&format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\n",
            summary.threshold,
            summary.class_name,
            stats.count,
            stats.min,
            stats.max,
            stats.mean,
            stats.std_dev
        ));
    }
    out
}
