//! Library exports for the evaluation binaries, benchmarks, and tests.
/// Application directory helpers.
pub mod app_dirs;
/// TOML settings and the primitive family list.
pub mod config;
/// Class-directory loading and stratified fold partitioning.
pub mod dataset;
/// Attribution, statistics, thresholds, and the text report.
pub mod eval;
/// Tracing subscriber setup.
pub mod logging;
/// Recognizer seam and predicted-group model.
pub mod recognition;
/// Strokes, examples, and primitive labels.
pub mod sketch;
