//! Labeled example corpus: loading per-class directories, stratified folds, and
//! materializing folds on disk.

pub mod export;
pub mod loader;
pub mod partition;

pub use export::{FoldExportError, FoldExportSummary, cv_root, export_folds};
pub use loader::{
    DatasetLoadError, LoadedCorpus, LoaderOptions, SkipReason, SkippedFile, collect_class_files,
    load_corpus,
};
pub use partition::{Fold, PartitionError, partition, shuffled_order, stratify};
