//! Loader for per-class example directories.
//!
//! Layout: `<root>/<class>/**/<file>.<ext>`. Class directories are enumerated in name
//! order and files inside a class are sorted by path, so fold assignment does not
//! depend on the order the filesystem happens to list entries in.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::config::DatasetSettings;
use crate::sketch::{Example, ExampleError, SketchParser};

#[derive(Debug, Error)]
pub enum DatasetLoadError {
    #[error("Dataset root {0} is not a directory")]
    NotADirectory(PathBuf),
    #[error("Read dir {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// File selection rules for a dataset walk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoaderOptions {
    /// Extension without the dot, compared case-insensitively; empty accepts all files.
    pub file_extension: String,
    /// Class directories ending with this suffix are skipped; empty disables.
    pub exclude_dir_suffix: String,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self::from_settings(&DatasetSettings::default())
    }
}

impl LoaderOptions {
    pub fn from_settings(settings: &DatasetSettings) -> Self {
        Self {
            file_extension: settings.file_extension.trim_start_matches('.').to_string(),
            exclude_dir_suffix: settings.exclude_dir_suffix.clone(),
        }
    }

    fn accepts_file(&self, path: &Path) -> bool {
        if self.file_extension.is_empty() {
            return true;
        }
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(&self.file_extension))
    }

    fn excludes_class(&self, name: &str) -> bool {
        !self.exclude_dir_suffix.is_empty() && name.ends_with(&self.exclude_dir_suffix)
    }
}

/// Why a file under the dataset root did not become an [`Example`].
#[derive(Debug)]
pub enum SkipReason {
    Parse(String),
    Invalid(ExampleError),
    NoStrokes,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Parse(message) => f.write_str(message),
            SkipReason::Invalid(err) => write!(f, "{err}"),
            SkipReason::NoStrokes => f.write_str("contains no strokes"),
        }
    }
}

#[derive(Debug)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: SkipReason,
}

/// Parsed examples grouped by class directory name.
#[derive(Debug, Default)]
pub struct LoadedCorpus {
    pub classes: BTreeMap<String, Vec<Example>>,
    pub skipped: Vec<SkippedFile>,
}

impl LoadedCorpus {
    pub fn example_count(&self) -> usize {
        self.classes.values().map(Vec::len).sum()
    }

    /// All examples, class by class in name order.
    pub fn examples(&self) -> impl Iterator<Item = &Example> {
        self.classes.values().flatten()
    }
}

/// List example files per class without parsing them.
///
/// Every non-excluded class directory gets an entry, even when it holds no files.
pub fn collect_class_files(
    root: &Path,
    options: &LoaderOptions,
) -> Result<BTreeMap<String, Vec<PathBuf>>, DatasetLoadError> {
    if !root.is_dir() {
        return Err(DatasetLoadError::NotADirectory(root.to_path_buf()));
    }
    let mut classes = BTreeMap::new();
    for entry in read_dir_sorted(root)? {
        if !entry.is_dir() {
            continue;
        }
        let Some(class_id) = dir_name(&entry) else {
            continue;
        };
        if is_metadata_dir(&class_id) {
            continue;
        }
        if options.excludes_class(&class_id) {
            debug!("Skipping excluded class directory {}", entry.display());
            continue;
        }
        let mut files = Vec::new();
        collect_files_recursive(&entry, options, &mut files)?;
        files.sort();
        classes.insert(class_id, files);
    }
    Ok(classes)
}

/// Load and parse every example under `root`.
///
/// Unreadable or malformed files and files without strokes are skipped with a
/// warning and listed in [`LoadedCorpus::skipped`].
pub fn load_corpus(
    root: &Path,
    options: &LoaderOptions,
    parser: &dyn SketchParser,
) -> Result<LoadedCorpus, DatasetLoadError> {
    let mut corpus = LoadedCorpus::default();
    for (class_id, files) in collect_class_files(root, options)? {
        let class_dir = root.join(&class_id);
        let mut examples = Vec::with_capacity(files.len());
        for path in files {
            match load_example(&class_dir, &class_id, &path, parser) {
                Ok(example) => examples.push(example),
                Err(reason) => {
                    warn!("{}: {}", path.display(), reason);
                    corpus.skipped.push(SkippedFile { path, reason });
                }
            }
        }
        corpus.classes.insert(class_id, examples);
    }
    Ok(corpus)
}

fn load_example(
    class_dir: &Path,
    class_id: &str,
    path: &Path,
    parser: &dyn SketchParser,
) -> Result<Example, SkipReason> {
    let sketch = parser
        .parse_file(path)
        .map_err(|err| SkipReason::Parse(err.to_string()))?;
    let name = example_name(class_dir, class_id, path);
    let example = Example::new(name, path, class_id, sketch).map_err(SkipReason::Invalid)?;
    if example.is_empty() {
        return Err(SkipReason::NoStrokes);
    }
    Ok(example)
}

/// `<class>/<path relative to the class dir>` with forward slashes.
fn example_name(class_dir: &Path, class_id: &str, path: &Path) -> String {
    let relative = path.strip_prefix(class_dir).unwrap_or(path);
    let mut name = class_id.to_string();
    for part in relative.components() {
        name.push('/');
        name.push_str(&part.as_os_str().to_string_lossy());
    }
    name
}

fn collect_files_recursive(
    dir: &Path,
    options: &LoaderOptions,
    out: &mut Vec<PathBuf>,
) -> Result<(), DatasetLoadError> {
    for path in read_dir_sorted(dir)? {
        let hidden = dir_name(&path).is_some_and(|name| is_metadata_dir(&name));
        if path.is_dir() {
            if !hidden {
                collect_files_recursive(&path, options, out)?;
            }
        } else if path.is_file() && !hidden && options.accepts_file(&path) {
            out.push(path);
        }
    }
    Ok(())
}

fn read_dir_sorted(dir: &Path) -> Result<Vec<PathBuf>, DatasetLoadError> {
    let read_err = |source| DatasetLoadError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_err)? {
        paths.push(entry.map_err(read_err)?.path());
    }
    paths.sort();
    Ok(paths)
}

fn dir_name(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_string_lossy().trim().to_string();
    (!name.is_empty()).then_some(name)
}

/// Version-control and editor metadata (`.svn`, `.git`, `.DS_Store`, `CVS`, ...).
fn is_metadata_dir(name: &str) -> bool {
    name.starts_with('.') || name == "CVS"
}
