//! Labeled sketch examples: strokes, ground-truth groupings, and their labels.

pub mod document;
pub mod label;

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use document::{JsonSketchParser, ParsedShape, ParsedSketch, SketchParseError, SketchParser};
pub use label::{CatalogError, Family, FamilyCatalog, FamilyId, LabelCheck, PrimitiveLabel};

/// Stable identity of a stroke within a sketch document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StrokeId(pub Uuid);

impl StrokeId {
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for StrokeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Timestamped 2D sample of a stroke.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    /// Capture time in milliseconds.
    #[serde(default)]
    pub time: u64,
}

/// Ordered pen trace. Only identity, label and point count matter to evaluation.
#[derive(Clone, Debug, PartialEq)]
pub struct Stroke {
    pub id: StrokeId,
    /// Label used when the stroke is not a member of any explicit shape.
    pub label: Option<String>,
    pub points: Vec<Point>,
}

/// A labeled set of strokes that truly belong together.
#[derive(Clone, Debug, PartialEq)]
pub struct GroundTruthGroup {
    pub label: Option<String>,
    pub members: Vec<StrokeId>,
    /// `true` for the single-member group of a stroke that no shape covers.
    pub implicit: bool,
}

impl GroundTruthGroup {
    pub fn is_single_stroke(&self) -> bool {
        self.members.len() == 1
    }

    /// Label with surrounding whitespace removed; `None` when missing or blank.
    pub fn trimmed_label(&self) -> Option<&str> {
        self.label
            .as_deref()
            .map(str::trim)
            .filter(|label| !label.is_empty())
    }
}

/// Invariant violations found while assembling an example from a parsed document.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExampleError {
    #[error("stroke {0} appears more than once")]
    DuplicateStroke(StrokeId),
    #[error("shape {shape} references unknown stroke {stroke}")]
    UnknownStroke { shape: usize, stroke: StrokeId },
    #[error("stroke {stroke} belongs to shapes {first} and {second}")]
    SharedStroke {
        stroke: StrokeId,
        first: usize,
        second: usize,
    },
    #[error("shape {0} has no member strokes")]
    EmptyShape(usize),
}

/// One labeled example file, immutable after loading.
#[derive(Clone, Debug, PartialEq)]
pub struct Example {
    name: String,
    path: PathBuf,
    class_id: String,
    strokes: Vec<Stroke>,
    groups: Vec<GroundTruthGroup>,
}

impl Example {
    /// Assemble an example, appending one implicit group per stroke no shape covers.
    ///
    /// Explicit shapes keep document order and come first; implicit groups follow in
    /// stroke order. A group's index in [`Example::groups`] is the index used in reports.
    pub fn new(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        class_id: impl Into<String>,
        sketch: ParsedSketch,
    ) -> Result<Self, ExampleError> {
        let ParsedSketch { strokes, shapes } = sketch;
        let mut positions: HashMap<StrokeId, usize> = HashMap::with_capacity(strokes.len());
        for (idx, stroke) in strokes.iter().enumerate() {
            if positions.insert(stroke.id, idx).is_some() {
                return Err(ExampleError::DuplicateStroke(stroke.id));
            }
        }

        let mut owner: HashMap<StrokeId, usize> = HashMap::new();
        let mut groups = Vec::with_capacity(shapes.len() + strokes.len());
        for (shape_idx, shape) in shapes.into_iter().enumerate() {
            if shape.strokes.is_empty() {
                return Err(ExampleError::EmptyShape(shape_idx));
            }
            for stroke in &shape.strokes {
                if !positions.contains_key(stroke) {
                    return Err(ExampleError::UnknownStroke {
                        shape: shape_idx,
                        stroke: *stroke,
                    });
                }
                if let Some(first) = owner.insert(*stroke, shape_idx) {
                    return Err(ExampleError::SharedStroke {
                        stroke: *stroke,
                        first,
                        second: shape_idx,
                    });
                }
            }
            groups.push(GroundTruthGroup {
                label: shape.label,
                members: shape.strokes,
                implicit: false,
            });
        }
        for stroke in &strokes {
            if owner.contains_key(&stroke.id) {
                continue;
            }
            groups.push(GroundTruthGroup {
                label: stroke.label.clone(),
                members: vec![stroke.id],
                implicit: true,
            });
        }

        Ok(Self {
            name: name.into(),
            path: path.into(),
            class_id: class_id.into(),
            strokes,
            groups,
        })
    }

    /// Display name used in reports (`<class dir>/<relative file>`).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Class label derived from the containing directory.
    pub fn class_id(&self) -> &str {
        &self.class_id
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn groups(&self) -> &[GroundTruthGroup] {
        &self.groups
    }

    pub fn stroke(&self, id: StrokeId) -> Option<&Stroke> {
        self.strokes.iter().find(|stroke| stroke.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }
}
