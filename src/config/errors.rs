use std::path::PathBuf;

use thiserror::Error;

use crate::sketch::CatalogError;

/// Errors that may occur while loading evaluation configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a config file.
    #[error("Failed to read {path}: {source}")]
    Read {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// Failed to parse TOML config.
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        /// TOML file path.
        path: PathBuf,
        /// TOML parse error.
        source: toml::de::Error,
    },
    /// No usable config directory found.
    #[error("No suitable config directory found: {0}")]
    NoConfigDir(#[from] crate::app_dirs::AppDirError),
    #[error("fold_count must be at least 1")]
    InvalidFoldCount,
    #[error("precision_rank must be at least 1")]
    InvalidPrecisionRank,
    /// The `[[families]]` table does not describe a usable catalog.
    #[error("Invalid primitive families: {0}")]
    Families(#[from] CatalogError),
}
