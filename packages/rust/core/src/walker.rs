//! Corpus walking: discover process folders and process one folder at a time.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use dbgsplit_artifacts::{ArtifactMeta, write_artifacts};
use dbgsplit_segmenter::{Catalog, segment};
use dbgsplit_shared::{Result, SplitConfig, SplitError};

use crate::transcript::read_transcript;

/// One per-process capture folder under the capture root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessFolder {
    /// Directory name; also the name of the output subdirectory.
    pub name: String,
    pub path: PathBuf,
}

/// Result of processing one folder that did not fail.
#[derive(Debug, Clone)]
pub enum FolderOutcome {
    /// The folder has no capture file.
    Skipped,
    /// Artifacts were written.
    Written(FolderReport),
}

/// Artifacts written for one process folder.
#[derive(Debug, Clone, Serialize)]
pub struct FolderReport {
    pub folder: String,
    /// Number of section types found.
    pub section_types: usize,
    pub artifacts: Vec<ArtifactMeta>,
}

/// List the immediate subdirectories of `capture_root`, sorted by name.
///
/// Fails with [`SplitError::RootNotFound`] if `capture_root` is not a directory.
/// Plain files and entries with non-UTF-8 names are ignored.
pub fn discover_folders(capture_root: &Path) -> Result<Vec<ProcessFolder>> {
    if !capture_root.is_dir() {
        return Err(SplitError::RootNotFound {
            path: capture_root.to_path_buf(),
        });
    }

    let entries =
        std::fs::read_dir(capture_root).map_err(|e| SplitError::io(capture_root, e))?;

    let mut folders = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(root = %capture_root.display(), error = %e, "unreadable directory entry, skipping");
                continue;
            }
        };

        let path = entry.path();
        if !path.is_dir() {
            continue;
        }

        match entry.file_name().into_string() {
            Ok(name) => folders.push(ProcessFolder { name, path }),
            Err(raw) => warn!(name = ?raw, "non-UTF-8 folder name, skipping"),
        }
    }

    folders.sort_by(|a, b| a.name.cmp(&b.name));
    info!(root = %capture_root.display(), count = folders.len(), "discovered process folders");
    Ok(folders)
}

/// Segment one folder's capture and write its artifacts.
///
/// A folder without the capture file is [`FolderOutcome::Skipped`] and gets no
/// output directory. Read, decode and write failures are returned as errors.
pub fn process_folder(
    folder: &ProcessFolder,
    config: &SplitConfig,
    catalog: &Catalog,
) -> Result<FolderOutcome> {
    let capture = folder.path.join(&config.capture_file);
    if !capture.is_file() {
        debug!(folder = %folder.name, "no capture file, skipping");
        return Ok(FolderOutcome::Skipped);
    }

    let text = read_transcript(&capture, config.decoding)?;
    let segmentation = segment(&text, catalog);

    let output_dir = config.output_root.join(&folder.name);
    let artifacts = write_artifacts(&output_dir, &segmentation, &config.extension)?;

    info!(
        folder = %folder.name,
        section_types = segmentation.type_count(),
        artifacts = artifacts.len(),
        "folder processed"
    );

    Ok(FolderOutcome::Written(FolderReport {
        folder: folder.name.clone(),
        section_types: segmentation.type_count(),
        artifacts,
    }))
}
