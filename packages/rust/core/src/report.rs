//! JSON run report written on request after a batch run.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use dbgsplit_segmenter::Catalog;
use dbgsplit_shared::{Result, SplitConfig, SplitError, Termination};

use crate::pipeline::RunSummary;

/// Everything known about one run, as written to `--report`.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport<'a> {
    pub tool_version: &'a str,
    pub root: PathBuf,
    pub output_root: PathBuf,
    pub catalog_size: usize,
    pub termination: Termination,
    pub elapsed_ms: u128,
    pub artifact_count: usize,
    #[serde(flatten)]
    pub summary: &'a RunSummary,
}

impl<'a> RunReport<'a> {
    pub fn new(
        summary: &'a RunSummary,
        config: &SplitConfig,
        catalog: &Catalog,
        tool_version: &'a str,
    ) -> Self {
        Self {
            tool_version,
            root: config.root.clone(),
            output_root: config.output_root.clone(),
            catalog_size: catalog.len(),
            termination: catalog.termination(),
            elapsed_ms: summary.elapsed.as_millis(),
            artifact_count: summary.artifact_count(),
            summary,
        }
    }
}

/// Write `report` as pretty-printed JSON, creating parent directories.
pub fn write_report(path: &Path, report: &RunReport<'_>) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| SplitError::io(parent, e))?;
    }

    let json = serde_json::to_string_pretty(report)
        .map_err(|e| SplitError::io(path, std::io::Error::other(e)))?;
    std::fs::write(path, json).map_err(|e| SplitError::io(path, e))?;

    info!(path = %path.display(), "wrote run report");
    Ok(())
}
