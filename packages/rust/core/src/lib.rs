//! Corpus walking and batch orchestration for dbgsplit.
//!
//! This crate ties together transcript reading, segmentation, and artifact
//! writing into the end-to-end batch run ([`pipeline::split_corpus`]).

pub mod pipeline;
pub mod report;
pub mod transcript;
pub mod walker;

pub use pipeline::{
    FailureKind, FolderFailure, ProgressReporter, RunSummary, SilentProgress, split_corpus,
};
pub use report::{RunReport, write_report};
pub use walker::{FolderOutcome, FolderReport, ProcessFolder, discover_folders, process_folder};
