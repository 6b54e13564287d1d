use std::{fs, path::Path};

use serde_json::{Value, json};
use uuid::Uuid;

/// In-memory sketch document written as the JSON example format.
#[derive(Default)]
pub struct SketchFixture {
    strokes: Vec<Value>,
    shapes: Vec<Value>,
}

impl SketchFixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a stroke with `points` samples and return its id.
    pub fn stroke(&mut self, label: Option<&str>, points: usize) -> Uuid {
        let id = Uuid::new_v4();
        let points: Vec<Value> = (0..points)
            .map(|i| json!({ "x": i as f64, "y": (i * 2) as f64, "time": i as u64 * 10 }))
            .collect();
        self.strokes
            .push(json!({ "id": id, "label": label, "points": points }));
        id
    }

    pub fn shape(&mut self, label: Option<&str>, strokes: &[Uuid]) -> &mut Self {
        self.shapes.push(json!({ "label": label, "strokes": strokes }));
        self
    }

    pub fn write(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let document = json!({ "strokes": self.strokes, "shapes": self.shapes });
        fs::write(path, serde_json::to_string_pretty(&document).unwrap()).unwrap();
    }
}

/// One recorded interpretation for a predictions file.
pub fn leaf(label: &str, confidence: f64, strokes: &[Uuid]) -> Value {
    json!({ "label": label, "confidence": confidence, "strokes": strokes })
}

pub fn composite(label: &str, confidence: f64, children: Vec<Value>) -> Value {
    json!({ "label": label, "confidence": confidence, "combined": true, "children": children })
}

/// A recorded result with its N-best list and threshold readings.
pub fn result(n_best: Vec<Value>, thresholds: &[(&str, f64)]) -> Value {
    let thresholds: serde_json::Map<String, Value> = thresholds
        .iter()
        .map(|(name, value)| (name.to_string(), json!(value)))
        .collect();
    json!({ "n_best": n_best, "thresholds": thresholds })
}

pub fn over_time(strokes: &[Uuid]) -> Value {
    json!({ "status": "over_time", "strokes": strokes })
}

pub fn write_predictions(path: &Path, records: &[Value]) {
    let lines: Vec<String> = records.iter().map(Value::to_string).collect();
    fs::write(path, lines.join("\n")).unwrap();
}
