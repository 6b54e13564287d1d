//! Persisted sketch documents and the parser seam used by the dataset loader.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use super::{Point, Stroke, StrokeId};

/// Errors raised while reading a single sketch file.
#[derive(Debug, Error)]
pub enum SketchParseError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid sketch document {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Shape record as stored in the document, before invariants are checked.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedShape {
    pub label: Option<String>,
    pub strokes: Vec<StrokeId>,
}

/// Raw strokes and shapes of one document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParsedSketch {
    pub strokes: Vec<Stroke>,
    pub shapes: Vec<ParsedShape>,
}

/// Turns a persisted sketch file into strokes and ground-truth shapes.
pub trait SketchParser {
    fn parse_file(&self, path: &Path) -> Result<ParsedSketch, SketchParseError>;
}

/// Parser for the JSON sketch layout (`strokes` + `shapes`).
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonSketchParser;

#[derive(Debug, Deserialize)]
struct SketchDocument {
    #[serde(default)]
    strokes: Vec<StrokeRecord>,
    #[serde(default)]
    shapes: Vec<ShapeRecord>,
}

#[derive(Debug, Deserialize)]
struct StrokeRecord {
    id: StrokeId,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    points: Vec<Point>,
}

#[derive(Debug, Deserialize)]
struct ShapeRecord {
    #[serde(default)]
    label: Option<String>,
    strokes: Vec<StrokeId>,
}

impl JsonSketchParser {
    pub fn parse_str(&self, text: &str) -> Result<ParsedSketch, serde_json::Error> {
        let document: SketchDocument = serde_json::from_str(text)?;
        Ok(document.into_parsed())
    }
}

impl SketchParser for JsonSketchParser {
    fn parse_file(&self, path: &Path) -> Result<ParsedSketch, SketchParseError> {
        let text = std::fs::read_to_string(path).map_err(|source| SketchParseError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        self.parse_str(&text).map_err(|source| SketchParseError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl SketchDocument {
    fn into_parsed(self) -> ParsedSketch {
        ParsedSketch {
            strokes: self
                .strokes
                .into_iter()
                .map(|record| Stroke {
                    id: record.id,
                    label: record.label,
                    points: record.points,
                })
                .collect(),
            shapes: self
                .shapes
                .into_iter()
                .map(|record| ParsedShape {
                    label: record.label,
                    strokes: record.strokes,
                })
                .collect(),
        }
    }
}
