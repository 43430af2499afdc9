//! Artifact writer: persists a [`Segmentation`] as one file per section instance.
//!
//! File names are `<section-id>_<index>.<ext>`. Planning the files is pure
//! ([`plan_artifacts`]); [`write_artifacts`] is the thin filesystem adapter.

use std::path::Path;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use dbgsplit_segmenter::Segmentation;
use dbgsplit_shared::{Result, SectionId, SplitError};

/// Default artifact extension.
pub const DEFAULT_EXTENSION: &str = "txt";

/// A file to be written: name plus verbatim content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedArtifact<'a> {
    pub file_name: String,
    pub section: SectionId,
    pub index: usize,
    pub content: &'a str,
}

/// Metadata for a single written artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactMeta {
    pub file_name: String,
    pub section: SectionId,
    pub index: usize,
    pub sha256: String,
    pub size_bytes: usize,
}

/// `<section-id>_<index>.<extension>`
pub fn artifact_name(section: &SectionId, index: usize, extension: &str) -> String {
    format!("{section}_{index}.{extension}")
}

/// Name and content of every artifact for `segmentation`, without touching disk.
pub fn plan_artifacts<'a>(
    segmentation: &Segmentation<'a>,
    extension: &str,
) -> Vec<PlannedArtifact<'a>> {
    segmentation
        .sections()
        .map(|section| PlannedArtifact {
            file_name: artifact_name(section.id, section.index, extension),
            section: section.id.clone(),
            index: section.index,
            content: section.text,
        })
        .collect()
}

/// Write every artifact of `segmentation` into `dir`.
///
/// Creates `dir` (and missing ancestors) first. Existing files with the same
/// name are replaced; files from earlier runs that are not part of this
/// segmentation are left untouched. Each artifact is written to a hidden temp
/// file and renamed into place, so a failure never leaves a partial artifact
/// behind. The first failure stops the pass.
#[instrument(skip_all, fields(dir = %dir.display(), instances = segmentation.instance_count()))]
pub fn write_artifacts(
    dir: &Path,
    segmentation: &Segmentation<'_>,
    extension: &str,
) -> Result<Vec<ArtifactMeta>> {
    std::fs::create_dir_all(dir)
        .map_err(|e| SplitError::write(dir.display().to_string(), dir, e))?;

    let planned = plan_artifacts(segmentation, extension);
    let mut metas = Vec::with_capacity(planned.len());

    for artifact in planned {
        metas.push(write_one(dir, &artifact)?);
    }

    debug!(count = metas.len(), "artifacts written");
    Ok(metas)
}

fn write_one(dir: &Path, artifact: &PlannedArtifact<'_>) -> Result<ArtifactMeta> {
    let target = dir.join(&artifact.file_name);
    let temp = dir.join(format!(".{}.tmp", artifact.file_name));

    replace_file(&artifact.file_name, &temp, &target, |path| {
        std::fs::write(path, artifact.content)
    })?;

    debug!(file = %artifact.file_name, size = artifact.content.len(), "wrote artifact");

    Ok(ArtifactMeta {
        file_name: artifact.file_name.clone(),
        section: artifact.section.clone(),
        index: artifact.index,
        sha256: sha256_hex(artifact.content.as_bytes()),
        size_bytes: artifact.content.len(),
    })
}

/// Fill `temp` with `write`, then rename it over `target`.
///
/// `temp` is removed on any failure, including a write that fails partway.
fn replace_file(
    artifact: &str,
    temp: &Path,
    target: &Path,
    write: impl FnOnce(&Path) -> std::io::Result<()>,
) -> Result<()> {
    if let Err(e) = write(temp) {
        let _ = std::fs::remove_file(temp);
        return Err(SplitError::write(artifact, temp, e));
    }

    if let Err(e) = std::fs::rename(temp, target) {
        let _ = std::fs::remove_file(temp);
        return Err(SplitError::write(artifact, target, e));
    }

    Ok(())
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
