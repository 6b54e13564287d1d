//! Evaluation settings persisted as TOML.
//!
//! Settings live in `sketcheval.toml` inside the application directory unless a
//! path is given explicitly. A missing file yields the defaults; every section
//! and key is optional.

mod errors;
mod families;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::app_dirs;
use crate::sketch::FamilyCatalog;

pub use errors::ConfigError;

/// File name for the TOML settings file.
pub const CONFIG_FILE_NAME: &str = "sketcheval.toml";

/// Full evaluation configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    pub dataset: DatasetSettings,
    pub evaluation: EvaluationSettings,
    pub report: ReportSettings,
    /// Recognized primitive families; replaces the built-in list when present.
    pub families: Vec<FamilySpec>,
}

/// Where labeled examples are read from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetSettings {
    /// Root with one subdirectory per class.
    pub test_data_dir: PathBuf,
    /// Extension of example files (without the dot); empty accepts every file.
    pub file_extension: String,
    /// Class directories whose name ends with this suffix are skipped; empty disables.
    pub exclude_dir_suffix: String,
}

/// Knobs for partitioning and attribution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationSettings {
    pub fold_count: usize,
    /// Number of N-best entries searched for a precision hit.
    pub precision_rank: usize,
    /// Seed for a deterministic shuffle before partitioning; `None` keeps name order.
    pub shuffle_seed: Option<String>,
    /// Score unattributed single-point strokes as a `Dot` prediction.
    pub dot_fallback: bool,
    /// Submit ungrouped strokes with unknown labels to the recognizer anyway.
    pub submit_unknown_strokes: bool,
}

/// Output locations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    pub output_path: PathBuf,
    /// Fold assignment listing written when folds are materialized.
    pub division_output_path: PathBuf,
}

/// One recognizable primitive family.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilySpec {
    pub name: String,
    /// Labels may extend the name with a suffix, e.g. `Polygon (5)`.
    #[serde(default)]
    pub parametrized: bool,
    /// Families whose predictions of equal arity also count as correct.
    #[serde(default)]
    pub accepts: Vec<String>,
}

impl FamilySpec {
    pub fn plain(name: &str) -> Self {
        Self {
            name: name.to_string(),
            parametrized: false,
            accepts: Vec::new(),
        }
    }
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            dataset: DatasetSettings::default(),
            evaluation: EvaluationSettings::default(),
            report: ReportSettings::default(),
            families: families::default_families(),
        }
    }
}

impl Default for DatasetSettings {
    fn default() -> Self {
        Self {
            test_data_dir: PathBuf::from("testData"),
            file_extension: "json".to_string(),
            exclude_dir_suffix: "2".to_string(),
        }
    }
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self {
            fold_count: 10,
            precision_rank: 5,
            shuffle_seed: None,
            dot_fallback: true,
            submit_unknown_strokes: false,
        }
    }
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("sketcheval_report.txt"),
            division_output_path: PathBuf::from("data_division.txt"),
        }
    }
}

impl EvalConfig {
    /// Check numeric settings and build the family catalog.
    pub fn validate(&self) -> Result<FamilyCatalog, ConfigError> {
        if self.evaluation.fold_count == 0 {
            return Err(ConfigError::InvalidFoldCount);
        }
        if self.evaluation.precision_rank == 0 {
            return Err(ConfigError::InvalidPrecisionRank);
        }
        Ok(FamilyCatalog::from_specs(&self.families)?)
    }
}

/// Resolve the default configuration file path inside the app directory.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    Ok(app_dirs::app_root_dir()?.join(CONFIG_FILE_NAME))
}

/// Load from the app directory, returning defaults if the file is missing.
pub fn load_or_default() -> Result<EvalConfig, ConfigError> {
    load_from(&config_path()?)
}

/// Load from an explicit path, returning defaults if the file is missing.
pub fn load_from(path: &Path) -> Result<EvalConfig, ConfigError> {
    if !path.exists() {
        return Ok(EvalConfig::default());
    }
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })
}
