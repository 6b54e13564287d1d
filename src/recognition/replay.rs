//! Recognizer that replays recognition output recorded by an external engine.
//!
//! Input is JSON lines, one recognition result per line:
//!
//! ```text
//! {"n_best": [{"label": "Line", "confidence": 0.9, "strokes": ["<uuid>"]}],
//!  "thresholds": {"line_fit_error": 0.02}, "status": "ok"}
//! ```
//!
//! Composite interpretations set `"combined": true` and carry `"children"`. A record
//! with `"status": "over_time"` or `"failed"` makes recognition of any submission that
//! touches it fail the same way; such records name their strokes with a top-level
//! `"strokes"` list.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use super::{
    COMBINED_ATTRIBUTE, GroupBody, PredictedGroup, RecognitionError, RecognitionResult,
    Recognizer, ThresholdReading,
};
use crate::sketch::{Stroke, StrokeId};

/// Default predictions file name inside the test data directory.
pub const DEFAULT_PREDICTIONS_FILE: &str = "predictions.jsonl";

#[derive(Debug, Error)]
pub enum ReplayLoadError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid prediction record at {path}:{line}: {source}")]
    Json {
        path: PathBuf,
        line: usize,
        source: serde_json::Error,
    },
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ReplayStatus {
    #[default]
    Ok,
    OverTime,
    Failed,
}

#[derive(Debug, Deserialize)]
struct ReplayRecord {
    #[serde(default)]
    n_best: Vec<ReplayGroup>,
    #[serde(default)]
    thresholds: BTreeMap<String, f64>,
    #[serde(default)]
    status: ReplayStatus,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    strokes: Vec<StrokeId>,
}

#[derive(Debug, Deserialize)]
struct ReplayGroup {
    label: String,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    strokes: Vec<StrokeId>,
    #[serde(default)]
    combined: bool,
    #[serde(default)]
    children: Vec<ReplayGroup>,
    #[serde(default)]
    attributes: BTreeMap<String, serde_json::Value>,
}

impl ReplayGroup {
    fn into_predicted(self) -> PredictedGroup {
        let mut attributes: BTreeMap<String, String> = self
            .attributes
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    serde_json::Value::String(text) => text,
                    other => other.to_string(),
                };
                (key, value)
            })
            .collect();
        if self.combined || !self.children.is_empty() {
            attributes.insert(COMBINED_ATTRIBUTE.to_string(), "true".to_string());
        }
        // A combined record without children keeps its own stroke list.
        let body = if self.children.is_empty() {
            GroupBody::Leaf(self.strokes)
        } else {
            GroupBody::Composite(
                self.children
                    .into_iter()
                    .map(ReplayGroup::into_predicted)
                    .collect(),
            )
        };
        PredictedGroup {
            label: self.label,
            confidence: self.confidence,
            attributes,
            body,
        }
    }
}

#[derive(Debug, Clone)]
struct StoredRecord {
    result: RecognitionResult,
    status: ReplayStatus,
    message: Option<String>,
}

/// Serves recorded results for whichever strokes are submitted.
#[derive(Debug, Default)]
pub struct ReplayRecognizer {
    records: Vec<StoredRecord>,
    by_stroke: HashMap<StrokeId, Vec<usize>>,
    submitted: Vec<StrokeId>,
}

impl ReplayRecognizer {
    /// Load a `.jsonl` file, or every `.jsonl` file of a directory in name order.
    pub fn from_path(path: &Path) -> Result<Self, ReplayLoadError> {
        let mut recognizer = Self::default();
        if path.is_dir() {
            let entries = fs::read_dir(path).map_err(|source| ReplayLoadError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            let mut files = Vec::new();
            for entry in entries {
                let entry = entry.map_err(|source| ReplayLoadError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                let file = entry.path();
                if file.is_file() && file.extension().is_some_and(|ext| ext == "jsonl") {
                    files.push(file);
                }
            }
            files.sort();
            for file in files {
                recognizer.load_file(&file)?;
            }
        } else {
            recognizer.load_file(path)?;
        }
        info!(
            "Loaded {} recorded recognition results from {}",
            recognizer.records.len(),
            path.display()
        );
        Ok(recognizer)
    }

    /// Parse JSON lines from memory; `origin` only labels errors.
    pub fn parse_str(text: &str, origin: &Path) -> Result<Self, ReplayLoadError> {
        let mut recognizer = Self::default();
        recognizer.load_text(text, origin)?;
        Ok(recognizer)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn load_file(&mut self, path: &Path) -> Result<(), ReplayLoadError> {
        let text = fs::read_to_string(path).map_err(|source| ReplayLoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_text(&text, path)
    }

    fn load_text(&mut self, text: &str, origin: &Path) -> Result<(), ReplayLoadError> {
        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let record: ReplayRecord =
                serde_json::from_str(line).map_err(|source| ReplayLoadError::Json {
                    path: origin.to_path_buf(),
                    line: idx + 1,
                    source,
                })?;
            self.push(record);
        }
        Ok(())
    }

    fn push(&mut self, record: ReplayRecord) {
        let position = self.records.len();
        let thresholds = record
            .thresholds
            .into_iter()
            .map(|(name, value)| ThresholdReading { name, value })
            .collect();
        let n_best = record
            .n_best
            .into_iter()
            .map(ReplayGroup::into_predicted)
            .collect();
        let result = RecognitionResult::new(n_best, thresholds);

        let mut touched: BTreeSet<StrokeId> = record.strokes.into_iter().collect();
        if let Some(best) = result.best() {
            touched.extend(best.flatten());
        }
        for stroke in touched {
            self.by_stroke.entry(stroke).or_default().push(position);
        }
        self.records.push(StoredRecord {
            result,
            status: record.status,
            message: record.message,
        });
    }
}

impl Recognizer for ReplayRecognizer {
    fn name(&self) -> &str {
        "replay"
    }

    fn clear(&mut self) {
        self.submitted.clear();
    }

    fn submit(&mut self, strokes: &[Stroke]) {
        self.submitted.extend(strokes.iter().map(|stroke| stroke.id));
    }

    fn recognize(&mut self) -> Result<Vec<RecognitionResult>, RecognitionError> {
        let touched: BTreeSet<usize> = self
            .submitted
            .iter()
            .filter_map(|stroke| self.by_stroke.get(stroke))
            .flatten()
            .copied()
            .collect();
        let mut results = Vec::with_capacity(touched.len());
        for position in touched {
            let record = &self.records[position];
            match record.status {
                ReplayStatus::Ok => results.push(record.result.clone()),
                ReplayStatus::OverTime => return Err(RecognitionError::OverTime),
                ReplayStatus::Failed => {
                    let reason = record
                        .message
                        .clone()
                        .unwrap_or_else(|| "recorded failure".to_string());
                    return Err(RecognitionError::Failed(reason));
                }
            }
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sketch::Point;
    use tempfile::tempdir;

    const A: &str = "0b7d5b0e-0000-4000-8000-00000000000a";
    const B: &str = "0b7d5b0e-0000-4000-8000-00000000000b";
    const C: &str = "0b7d5b0e-0000-4000-8000-00000000000c";

    fn stroke(id: &str) -> Stroke {
        Stroke {
            id: StrokeId(id.parse().unwrap()),
            label: None,
            points: vec![Point { x: 0.0, y: 0.0, time: 0 }],
        }
    }

    fn lines() -> String {
        [
            format!(
                r#"{{"n_best":[{{"label":"Arc","confidence":0.3,"strokes":["{A}"]}},{{"label":"Arrow","confidence":0.92,"combined":true,"children":[{{"label":"Line","confidence":0.9,"strokes":["{A}"]}},{{"label":"Line","confidence":0.8,"strokes":["{B}"]}}]}}],"thresholds":{{"head_angle":0.4}}}}"#
            ),
            String::new(),
            format!(r#"{{"status":"over_time","strokes":["{C}"]}}"#),
        ]
        .join("\n")
    }

    #[test]
    fn replays_records_touching_submitted_strokes() {
        let mut recognizer = ReplayRecognizer::parse_str(&lines(), Path::new("mem")).unwrap();
        assert_eq!(recognizer.len(), 2);
        recognizer.submit(&[stroke(B)]);
        let results = recognizer.recognize().unwrap();
        assert_eq!(results.len(), 1);
        let best = results[0].best().unwrap();
        assert_eq!(best.label, "Arrow");
        assert!(best.is_combined());
        assert_eq!(best.stroke_count(), 2);
        assert_eq!(results[0].thresholds[0].name, "head_angle");
    }

    #[test]
    fn combined_record_without_children_keeps_its_strokes() {
        let text = format!(
            r#"{{"n_best":[{{"label":"Arrow","confidence":0.8,"combined":true,"strokes":["{A}","{B}"]}}]}}"#
        );
        let mut recognizer = ReplayRecognizer::parse_str(&text, Path::new("mem")).unwrap();
        recognizer.submit(&[stroke(A), stroke(B)]);
        let results = recognizer.recognize().unwrap();
        assert_eq!(results.len(), 1);
        let best = results[0].best().unwrap();
        assert!(best.is_combined());
        assert_eq!(best.stroke_count(), 2);
        assert_eq!(best.flatten(), vec![stroke(A).id, stroke(B).id]);
    }

    #[test]
    fn status_records_raise_errors() {
        let mut recognizer = ReplayRecognizer::parse_str(&lines(), Path::new("mem")).unwrap();
        recognizer.submit(&[stroke(A), stroke(C)]);
        assert_eq!(recognizer.recognize(), Err(RecognitionError::OverTime));
        recognizer.clear();
        recognizer.submit(&[stroke(A)]);
        assert!(recognizer.recognize().is_ok());
    }

    #[test]
    fn untouched_submission_yields_nothing() {
        let mut recognizer = ReplayRecognizer::parse_str(&lines(), Path::new("mem")).unwrap();
        recognizer.submit(&[stroke("0b7d5b0e-0000-4000-8000-0000000000ff")]);
        assert!(recognizer.recognize().unwrap().is_empty());
    }

    #[test]
    fn loads_directory_and_reports_bad_lines() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.jsonl"), lines()).unwrap();
        fs::write(dir.path().join("skip.txt"), "not json").unwrap();
        let recognizer = ReplayRecognizer::from_path(dir.path()).unwrap();
        assert_eq!(recognizer.len(), 2);

        let bad = dir.path().join("b.jsonl");
        fs::write(&bad, "{\"n_best\": [}\n").unwrap();
        let err = ReplayRecognizer::from_path(dir.path()).unwrap_err();
        assert!(matches!(err, ReplayLoadError::Json { line: 1, .. }));
    }
}
