//! Materialize cross-validation folds as directory trees.
//!
//! For a dataset at `<parent>/<root>` the output lives in `<parent>/<root>_CV` with one
//! `<root>_train_<i>/<class>` and one `<root>_test_<i>/<class>` tree per fold. Files
//! are copied byte for byte, keeping their path relative to the class directory.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use super::partition::{PartitionError, stratify};

#[derive(Debug, Clone)]
pub struct FoldExportSummary {
    /// The `<root>_CV` directory.
    pub out_dir: PathBuf,
    pub fold_count: usize,
    pub classes: usize,
    /// Source files distributed (each lands in one test tree and N-1 train trees).
    pub files: usize,
}

#[derive(Debug, Error)]
pub enum FoldExportError {
    #[error("Dataset root {0} has no directory name")]
    RootName(PathBuf),
    #[error("partition error: {0}")]
    Partition(#[from] PartitionError),
    #[error("Create dir {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
    #[error("Write division log {path}: {source}")]
    WriteLog {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// `<parent>/<root>_CV` for a dataset root.
pub fn cv_root(root: &Path) -> Result<PathBuf, FoldExportError> {
    let name = root_name(root)?;
    let parent = root.parent().unwrap_or_else(|| Path::new(""));
    Ok(parent.join(format!("{name}_CV")))
}

fn root_name(root: &Path) -> Result<String, FoldExportError> {
    root.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| FoldExportError::RootName(root.to_path_buf()))
}

/// Partition `files` per class and copy them into train/test fold trees.
///
/// The division log lists `Directory: <class>` followed by one `<file> <fold>` line per
/// file, in the class's file order.
pub fn export_folds(
    root: &Path,
    files: &BTreeMap<String, Vec<PathBuf>>,
    fold_count: usize,
    seed: Option<&str>,
    division_log: &Path,
) -> Result<FoldExportSummary, FoldExportError> {
    let folds = stratify(files, fold_count, seed, |path| path.display().to_string())?;
    let name = root_name(root)?;
    let out_dir = cv_root(root)?;
    let fold_dir = |kind: &str, index: usize| out_dir.join(format!("{name}_{kind}_{index}"));

    create_dir(&out_dir)?;
    for index in 0..fold_count {
        for class_id in files.keys() {
            create_dir(&fold_dir("train", index).join(class_id))?;
            create_dir(&fold_dir("test", index).join(class_id))?;
        }
    }

    let log_err = |source| FoldExportError::WriteLog {
        path: division_log.to_path_buf(),
        source,
    };
    if let Some(parent) = division_log.parent().filter(|p| !p.as_os_str().is_empty()) {
        create_dir(parent)?;
    }
    let mut log = BufWriter::new(File::create(division_log).map_err(log_err)?);

    let mut copied = 0usize;
    for (class_id, class_files) in files {
        info!("Directory: {class_id}");
        writeln!(log, "Directory: {class_id}").map_err(log_err)?;
        let class_dir = root.join(class_id);
        let mut assigned = vec![0usize; class_files.len()];
        for fold in folds.get(class_id).into_iter().flatten() {
            for &position in &fold.test {
                assigned[position] = fold.index;
            }
        }
        for (source, &test_fold) in class_files.iter().zip(&assigned) {
            let relative = source.strip_prefix(&class_dir).unwrap_or(source);
            writeln!(log, "{} {test_fold}", display_relative(relative)).map_err(log_err)?;
            for index in 0..fold_count {
                let kind = if index == test_fold { "test" } else { "train" };
                let target = fold_dir(kind, index).join(class_id).join(relative);
                copy_file(source, &target)?;
            }
            copied += 1;
        }
    }
    log.flush().map_err(log_err)?;

    Ok(FoldExportSummary {
        out_dir,
        fold_count,
        classes: files.len(),
        files: copied,
    })
}

fn display_relative(relative: &Path) -> String {
    relative
        .components()
        .map(|part| part.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn create_dir(path: &Path) -> Result<(), FoldExportError> {
    fs::create_dir_all(path).map_err(|source| FoldExportError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

fn copy_file(from: &Path, to: &Path) -> Result<(), FoldExportError> {
    if let Some(parent) = to.parent() {
        create_dir(parent)?;
    }
    fs::copy(from, to).map_err(|source| FoldExportError::Copy {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })?;
    Ok(())
}
