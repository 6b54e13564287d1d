//! Per-class distributions of recognizer decision thresholds.

use std::collections::BTreeMap;
use std::path::Path;

use super::report::ReportError;

#[derive(Clone, Debug, PartialEq)]
struct Series {
    min: f64,
    max: f64,
    sum: f64,
    values: Vec<f64>,
}

impl Series {
    fn new() -> Self {
        Self {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            sum: 0.0,
            values: Vec::new(),
        }
    }

    fn push(&mut self, value: f64) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.sum += value;
        self.values.push(value);
    }

    fn stats(&self) -> ThresholdStats {
        let count = self.values.len();
        let mean = self.sum / count as f64;
        let variance = self
            .values
            .iter()
            .map(|value| (value - mean) * (value - mean))
            .sum::<f64>()
            / count as f64;
        ThresholdStats {
            count,
            min: self.min,
            max: self.max,
            mean,
            std_dev: variance.sqrt(),
        }
    }
}

/// Summary of one (threshold, class) series; `std_dev` is the population deviation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThresholdStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ThresholdSummary {
    pub threshold: String,
    pub class_name: String,
    pub stats: ThresholdStats,
}

/// Collects threshold values keyed by threshold name, then class.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ThresholdAnalyzer {
    series: BTreeMap<String, BTreeMap<String, Series>>,
}

impl ThresholdAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, threshold: &str, class_name: &str, value: f64) {
        self.series
            .entry(threshold.to_string())
            .or_default()
            .entry(class_name.to_string())
            .or_insert_with(Series::new)
            .push(value);
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Every observed series, ordered by threshold name then class name.
    pub fn summarize(&self) -> Vec<ThresholdSummary> {
        self.series
            .iter()
            .flat_map(|(threshold, classes)| {
                classes.iter().map(move |(class_name, series)| ThresholdSummary {
                    threshold: threshold.clone(),
                    class_name: class_name.clone(),
                    stats: series.stats(),
                })
            })
            .collect()
    }

    /// Raw values in observation order.
    pub fn history(&self, threshold: &str, class_name: &str) -> Option<&[f64]> {
        self.series
            .get(threshold)?
            .get(class_name)
            .map(|series| series.values.as_slice())
    }

    /// Standalone listing: one block per threshold with min/max/avg/stddev per class.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let mut current: Option<&str> = None;
        let summaries = self.summarize();
        for summary in &summaries {
            if current != Some(summary.threshold.as_str()) {
                out.push_str(&format!("Thresholds for {}:\n\n", summary.threshold));
                current = Some(summary.threshold.as_str());
            }
            let stats = &summary.stats;
            out.push_str(&format!("Class {}:\n", summary.class_name));
            out.push_str(&format!("Samples: {}\n", stats.count));
            out.push_str(&format!("Min: {}\n", stats.min));
            out.push_str(&format!("Max: {}\n", stats.max));
            out.push_str(&format!("Avg: {}\n", stats.mean));
            out.push_str(&format!("StdDev: {}\n", stats.std_dev));
            out.push('\n');
        }
        out
    }

    pub fn write_to(&self, path: &Path) -> Result<(), ReportError> {
        super::report::write_text(path, &self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn summarizes_min_max_mean_and_population_std_dev() {
        let mut analyzer = ThresholdAnalyzer::new();
        for value in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            analyzer.observe("line_fit", "Line", value);
        }
        analyzer.observe("line_fit", "Arc", -1.5);
        let summaries = analyzer.summarize();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].class_name, "Arc");
        let arc = summaries[0].stats;
        assert_eq!((arc.min, arc.max, arc.count), (-1.5, -1.5, 1));
        assert!(close(arc.std_dev, 0.0));

        let line = summaries[1].stats;
        assert_eq!(line.min, 2.0);
        assert_eq!(line.max, 9.0);
        assert!(close(line.mean, 5.0));
        assert!(close(line.std_dev, 2.0));
        assert_eq!(analyzer.history("line_fit", "Line").unwrap().len(), 8);
        assert!(analyzer.history("line_fit", "Circle").is_none());
    }

    #[test]
    fn negative_values_set_max_correctly() {
        let mut analyzer = ThresholdAnalyzer::new();
        analyzer.observe("t", "c", -3.0);
        analyzer.observe("t", "c", -1.0);
        let stats = analyzer.summarize()[0].stats;
        assert_eq!(stats.max, -1.0);
        assert_eq!(stats.min, -3.0);
    }

    #[test]
    fn render_groups_classes_under_threshold_headers() {
        let mut analyzer = ThresholdAnalyzer::new();
        analyzer.observe("b", "Line", 1.0);
        analyzer.observe("a", "Arc", 2.0);
        analyzer.observe("a", "Line", 3.0);
        let text = analyzer.render();
        assert_eq!(text.matches("Thresholds for ").count(), 2);
        let a = text.find("Thresholds for a:").unwrap();
        let b = text.find("Thresholds for b:").unwrap();
        assert!(a < b);
        assert!(text.contains("Class Arc:\nSamples: 1\nMin: 2\nMax: 2\nAvg: 2\nStdDev: 0\n"));
    }
}
