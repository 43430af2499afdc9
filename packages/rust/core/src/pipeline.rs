//! End-to-end batch run: capture root → process folders → artifact tree.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, instrument, warn};

use dbgsplit_segmenter::Catalog;
use dbgsplit_shared::{Result, RunId, SplitConfig, SplitError};

use crate::walker::{FolderOutcome, FolderReport, ProcessFolder, discover_folders, process_folder};

/// Why a folder failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Read,
    Decode,
    Write,
    /// The worker processing the folder panicked.
    Panic,
    /// Any other error returned for the folder.
    Other,
}

impl FailureKind {
    pub fn of(err: &SplitError) -> Self {
        match err {
            SplitError::Read { .. } => FailureKind::Read,
            SplitError::Decode { .. } => FailureKind::Decode,
            SplitError::Write { .. } => FailureKind::Write,
            _ => FailureKind::Other,
        }
    }
}

/// A folder whose processing failed; siblings are unaffected.
#[derive(Debug, Clone, Serialize)]
pub struct FolderFailure {
    pub folder: String,
    pub kind: FailureKind,
    pub message: String,
}

impl FolderFailure {
    fn from_error(folder: String, err: &SplitError) -> Self {
        Self {
            folder,
            kind: FailureKind::of(err),
            message: err.to_string(),
        }
    }
}

/// Result of a whole batch run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(skip)]
    pub elapsed: Duration,
    /// Folders with artifacts written, sorted by name.
    pub processed: Vec<FolderReport>,
    /// Folders without a capture file, sorted by name.
    pub skipped: Vec<String>,
    /// Folders that failed, sorted by name.
    pub failed: Vec<FolderFailure>,
}

impl RunSummary {
    pub fn artifact_count(&self) -> usize {
        self.processed.iter().map(|f| f.artifacts.len()).sum()
    }

    pub fn folder_count(&self) -> usize {
        self.processed.len() + self.skipped.len() + self.failed.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Progress callback for reporting run status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called once the process folders have been enumerated.
    fn folders_found(&self, total: usize);
    /// Called whenever a folder finishes, whatever its outcome.
    fn folder_done(&self, folder: &str, current: usize, total: usize);
    /// Called when the run completes.
    fn done(&self, summary: &RunSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn folders_found(&self, _total: usize) {}
    fn folder_done(&self, _folder: &str, _current: usize, _total: usize) {}
    fn done(&self, _summary: &RunSummary) {}
}

/// Run the batch over every process folder of the corpus.
///
/// 1. Enumerate `<root>/<capture_dir>/*/` (missing capture root is fatal)
/// 2. Process folders on a pool of `config.concurrency` blocking workers
/// 3. Collect per-folder outcomes; one folder's failure never stops the others
#[instrument(skip_all, fields(root = %config.root.display(), concurrency = config.concurrency))]
pub async fn split_corpus(
    config: &SplitConfig,
    catalog: Arc<Catalog>,
    progress: &dyn ProgressReporter,
) -> Result<RunSummary> {
    config.validate()?;

    let start = Instant::now();
    let started_at = Utc::now();
    let run_id = RunId::new();

    info!(%run_id, output = %config.output_root.display(), rules = catalog.len(), "starting run");

    progress.phase("Discovering process folders");
    let folders = discover_folders(&config.capture_root())?;
    let total = folders.len();
    progress.folders_found(total);

    progress.phase("Splitting transcripts");
    let shared_config = Arc::new(config.clone());
    let results = run_folders(folders, config.concurrency, progress, move |folder| {
        process_folder(folder, &shared_config, &catalog)
    })
    .await;

    let summary = RunSummary {
        run_id,
        started_at,
        finished_at: Utc::now(),
        elapsed: start.elapsed(),
        processed: results.processed,
        skipped: results.skipped,
        failed: results.failed,
    };

    info!(
        processed = summary.processed.len(),
        skipped = summary.skipped.len(),
        failed = summary.failed.len(),
        artifacts = summary.artifact_count(),
        duration_ms = summary.elapsed.as_millis(),
        "run completed"
    );

    progress.done(&summary);
    Ok(summary)
}

/// Per-folder results of a pool run, each list sorted by folder name.
#[derive(Debug, Default)]
struct FolderResults {
    processed: Vec<FolderReport>,
    skipped: Vec<String>,
    failed: Vec<FolderFailure>,
}

/// Run `work` for every folder on at most `concurrency` blocking workers.
///
/// Errors and panics are recorded against the folder they came from.
async fn run_folders<F>(
    folders: Vec<ProcessFolder>,
    concurrency: usize,
    progress: &dyn ProgressReporter,
    work: F,
) -> FolderResults
where
    F: Fn(&ProcessFolder) -> Result<FolderOutcome> + Send + Sync + 'static,
{
    let total = folders.len();
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let work = Arc::new(work);
    let mut names = HashMap::with_capacity(total);
    let mut tasks = JoinSet::new();

    for folder in folders {
        let sem = Arc::clone(&semaphore);
        let work = Arc::clone(&work);
        let name = folder.name.clone();

        let handle = tasks.spawn(async move {
            let _permit = sem.acquire().await.expect("semaphore closed");
            tokio::task::spawn_blocking(move || (*work)(&folder)).await
        });
        names.insert(handle.id(), name);
    }

    let mut results = FolderResults::default();
    let mut completed = 0;

    while let Some(joined) = tasks.join_next_with_id().await {
        completed += 1;

        let (id, outcome) = match joined {
            Ok((id, outcome)) => (id, outcome),
            Err(join_err) => (join_err.id(), Err(join_err)),
        };
        let folder = names.remove(&id).unwrap_or_default();

        match outcome {
            Ok(Ok(FolderOutcome::Written(report))) => results.processed.push(report),
            Ok(Ok(FolderOutcome::Skipped)) => results.skipped.push(folder.clone()),
            Ok(Err(e)) => {
                warn!(folder = %folder, error = %e, "folder failed, continuing");
                results.failed.push(FolderFailure::from_error(folder.clone(), &e));
            }
            Err(join_err) => {
                warn!(folder = %folder, error = %join_err, "folder worker panicked, continuing");
                results.failed.push(FolderFailure {
                    folder: folder.clone(),
                    kind: FailureKind::Panic,
                    message: join_err.to_string(),
                });
            }
        }

        progress.folder_done(&folder, completed, total);
    }

    results.processed.sort_by(|a, b| a.folder.cmp(&b.folder));
    results.skipped.sort();
    results.failed.sort_by(|a, b| a.folder.cmp(&b.folder));
    results
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    use dbgsplit_shared::CorpusConfig;

    use super::*;

    const CAPTURE: &str = "\
ModLoad: 00007ff6`1a2b0000 00007ff6`1a2f3000   C:\\Windows\\System32\\notepad.exe
=== System Information ===
CPU: x86
Cores: 4
=== Memory Information ===
--- Usage Summary ---------------- RgnCount ----------- Total Size
Free                                     54     7df9`2b6a1000
ModLoad: 00007ffa`6c8d0000 00007ffa`6cae7000   C:\\Windows\\SYSTEM32\\ntdll.dll
";

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("dbgsplit-pipeline-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn add_folder(root: &Path, name: &str, capture: Option<&[u8]>) {
        let dir = root.join("windbg_outputs").join(name);
        std::fs::create_dir_all(&dir).unwrap();
        if let Some(bytes) = capture {
            std::fs::write(dir.join("windbg_output_clipboard.txt"), bytes).unwrap();
        }
    }

    fn config_for(root: &Path, concurrency: usize) -> SplitConfig {
        let corpus = CorpusConfig {
            concurrency,
            ..CorpusConfig::default()
        };
        SplitConfig::resolve(&corpus, root.to_path_buf())
    }

    fn read_tree(dir: &Path) -> Vec<(String, String)> {
        let mut files = Vec::new();
        for folder in std::fs::read_dir(dir).unwrap() {
            let folder = folder.unwrap().path();
            for file in std::fs::read_dir(&folder).unwrap() {
                let file = file.unwrap().path();
                let rel = file.strip_prefix(dir).unwrap().to_string_lossy().to_string();
                files.push((rel, std::fs::read_to_string(&file).unwrap()));
            }
        }
        files.sort();
        files
    }

    #[derive(Default)]
    struct RecordingProgress {
        done: Mutex<Vec<String>>,
    }

    impl ProgressReporter for RecordingProgress {
        fn phase(&self, _name: &str) {}
        fn folders_found(&self, _total: usize) {}
        fn folder_done(&self, folder: &str, _current: usize, _total: usize) {
            self.done.lock().unwrap().push(folder.to_string());
        }
        fn done(&self, _summary: &RunSummary) {}
    }

    #[tokio::test]
    async fn missing_capture_root_aborts_run() {
        let tmp = temp_dir();
        let config = config_for(&tmp, 2);

        let err = split_corpus(&config, Arc::new(Catalog::builtin().clone()), &SilentProgress)
            .await
            .unwrap_err();

        assert!(matches!(err, SplitError::RootNotFound { .. }));
        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn run_writes_skips_and_isolates_failures() {
        let tmp = temp_dir();
        add_folder(&tmp, "notepad.exe_1a2c", Some(CAPTURE.as_bytes()));
        add_folder(&tmp, "idle_0", None);
        add_folder(&tmp, "corrupt.exe_77", Some(b"=== Stack Traces ===\n\xff\xfe\xfd\n"));
        add_folder(&tmp, "svchost.exe_880", Some(b"=== Heap Summary ===\nheap 1\n"));

        let config = config_for(&tmp, 2);
        let progress = RecordingProgress::default();
        let summary = split_corpus(&config, Arc::new(Catalog::builtin().clone()), &progress)
            .await
            .unwrap();

        let processed: Vec<_> = summary.processed.iter().map(|f| f.folder.as_str()).collect();
        assert_eq!(processed, vec!["notepad.exe_1a2c", "svchost.exe_880"]);
        assert_eq!(summary.skipped, vec!["idle_0".to_string()]);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].folder, "corrupt.exe_77");
        assert_eq!(summary.failed[0].kind, FailureKind::Decode);
        assert!(!summary.is_success());
        assert_eq!(summary.folder_count(), 4);
        assert_eq!(progress.done.lock().unwrap().len(), 4);

        let out = &config.output_root;
        assert!(!out.join("idle_0").exists());
        let notepad = out.join("notepad.exe_1a2c");
        assert_eq!(
            std::fs::read_to_string(notepad.join("system_info_1.txt")).unwrap(),
            "CPU: x86\nCores: 4"
        );
        assert!(
            std::fs::read_to_string(notepad.join("modload_2.txt"))
                .unwrap()
                .ends_with("ntdll.dll")
        );
        assert!(notepad.join("usage_summary_1.txt").exists());
        assert_eq!(
            std::fs::read_to_string(out.join("svchost.exe_880").join("heap_summary_1.txt")).unwrap(),
            "heap 1"
        );

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn sequential_and_parallel_runs_match() {
        let tmp = temp_dir();
        for i in 0..6 {
            let capture = format!("=== Stack Traces ===\nframe {i}\nModLoad: m{i}.dll\n");
            add_folder(&tmp, &format!("proc_{i}"), Some(capture.as_bytes()));
        }

        let catalog = Arc::new(Catalog::builtin().clone());

        let sequential = config_for(&tmp, 1);
        split_corpus(&sequential, Arc::clone(&catalog), &SilentProgress).await.unwrap();
        let first = read_tree(&sequential.output_root);

        std::fs::remove_dir_all(&sequential.output_root).unwrap();

        let parallel = config_for(&tmp, 4);
        let summary = split_corpus(&parallel, catalog, &SilentProgress).await.unwrap();
        let second = read_tree(&parallel.output_root);

        assert_eq!(first, second);
        assert_eq!(summary.artifact_count(), 12);
        assert!(summary.is_success());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn rerun_is_idempotent() {
        let tmp = temp_dir();
        add_folder(&tmp, "notepad.exe_1a2c", Some(CAPTURE.as_bytes()));
        let config = config_for(&tmp, 1);
        let catalog = Arc::new(Catalog::builtin().clone());

        split_corpus(&config, Arc::clone(&catalog), &SilentProgress).await.unwrap();
        let first = read_tree(&config.output_root);
        split_corpus(&config, catalog, &SilentProgress).await.unwrap();
        let second = read_tree(&config.output_root);

        assert_eq!(first, second);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn panicking_worker_is_reported_against_its_folder() {
        let folders: Vec<_> = ["crashy.exe_13", "calm.exe_12", "idle_0"]
            .iter()
            .map(|name| ProcessFolder {
                name: name.to_string(),
                path: PathBuf::from(name),
            })
            .collect();
        let progress = RecordingProgress::default();

        let results = run_folders(folders, 2, &progress, |folder| match folder.name.as_str() {
            "crashy.exe_13" => panic!("worker blew up"),
            "idle_0" => Ok(FolderOutcome::Skipped),
            _ => Ok(FolderOutcome::Written(FolderReport {
                folder: folder.name.clone(),
                section_types: 0,
                artifacts: Vec::new(),
            })),
        })
        .await;

        assert_eq!(results.failed.len(), 1);
        assert_eq!(results.failed[0].folder, "crashy.exe_13");
        assert_eq!(results.failed[0].kind, FailureKind::Panic);
        assert_eq!(results.skipped, vec!["idle_0".to_string()]);
        assert_eq!(results.processed.len(), 1);
        assert_eq!(results.processed[0].folder, "calm.exe_12");

        let mut done = progress.done.lock().unwrap().clone();
        done.sort();
        assert_eq!(done, vec!["calm.exe_12", "crashy.exe_13", "idle_0"]);
    }

    #[test]
    fn failure_kind_mapping() {
        let io = || std::io::Error::other("boom");
        assert_eq!(FailureKind::of(&SplitError::read("a", io())), FailureKind::Read);
        assert_eq!(FailureKind::of(&SplitError::write("x_1.txt", "a", io())), FailureKind::Write);
        assert_eq!(FailureKind::of(&SplitError::config("bad")), FailureKind::Other);
    }
}
