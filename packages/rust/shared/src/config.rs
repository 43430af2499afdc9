//! Application configuration for dbgsplit.
//!
//! User config lives at `~/.dbgsplit/dbgsplit.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SplitError};
use crate::types::{Decoding, SectionRule, Termination};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "dbgsplit.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".dbgsplit";

/// Subdirectory of the root holding one folder per captured process.
pub const DEFAULT_CAPTURE_DIR: &str = "windbg_outputs";

/// Raw transcript file expected inside each process folder.
pub const DEFAULT_CAPTURE_FILE: &str = "windbg_output_clipboard.txt";

/// Output directory created under the root when none is configured.
pub const DEFAULT_OUTPUT_DIR_NAME: &str = "classifier";

// ---------------------------------------------------------------------------
// Config structs (matching dbgsplit.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Corpus layout and run settings.
    #[serde(default)]
    pub corpus: CorpusConfig,

    /// Extra section rules appended to the built-in catalog.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<SectionRule>,
}

/// `[corpus]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// Corpus root. Defaults to the directory containing the executable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,

    /// Name of the capture subdirectory under the root.
    #[serde(default = "default_capture_dir")]
    pub capture_dir: String,

    /// Name of the transcript file inside each process folder.
    #[serde(default = "default_capture_file")]
    pub capture_file: String,

    /// Output root. Defaults to `<root>/classifier`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,

    /// Artifact file extension (without the dot).
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Folders processed in parallel; 0 means available parallelism.
    #[serde(default)]
    pub concurrency: usize,

    /// Transcript decoding mode.
    #[serde(default)]
    pub decoding: Decoding,

    /// Banner termination policy.
    #[serde(default)]
    pub termination: Termination,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            root: None,
            capture_dir: default_capture_dir(),
            capture_file: default_capture_file(),
            output_dir: None,
            extension: default_extension(),
            concurrency: 0,
            decoding: Decoding::default(),
            termination: Termination::default(),
        }
    }
}

fn default_capture_dir() -> String {
    DEFAULT_CAPTURE_DIR.into()
}
fn default_capture_file() -> String {
    DEFAULT_CAPTURE_FILE.into()
}
fn default_extension() -> String {
    "txt".into()
}

// ---------------------------------------------------------------------------
// Split config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime corpus configuration, merged from config file and CLI flags.
#[derive(Debug, Clone)]
pub struct SplitConfig {
    /// Corpus root containing the capture subdirectory.
    pub root: PathBuf,
    /// Capture subdirectory name.
    pub capture_dir: String,
    /// Transcript file name inside each process folder.
    pub capture_file: String,
    /// Output root; one subdirectory per process folder.
    pub output_root: PathBuf,
    /// Artifact file extension.
    pub extension: String,
    /// Maximum folders processed at once (always >= 1).
    pub concurrency: usize,
    /// Transcript decoding mode.
    pub decoding: Decoding,
}

impl SplitConfig {
    /// Resolve the runtime config for `root`, filling unset values from `config`.
    pub fn resolve(config: &CorpusConfig, root: PathBuf) -> Self {
        let output_root = config
            .output_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| root.join(DEFAULT_OUTPUT_DIR_NAME));

        Self {
            root,
            capture_dir: config.capture_dir.clone(),
            capture_file: config.capture_file.clone(),
            output_root,
            extension: config.extension.clone(),
            concurrency: effective_concurrency(config.concurrency),
            decoding: config.decoding,
        }
    }

    /// `<root>/<capture_dir>`.
    pub fn capture_root(&self) -> PathBuf {
        self.root.join(&self.capture_dir)
    }

    /// Check values that would otherwise produce surprising file names.
    pub fn validate(&self) -> Result<()> {
        if self.capture_dir.is_empty() || self.capture_file.is_empty() {
            return Err(SplitError::config(
                "capture_dir and capture_file must not be empty",
            ));
        }
        validate_extension(&self.extension)
    }
}

/// Artifact extensions are non-empty ASCII letters and digits.
pub fn validate_extension(extension: &str) -> Result<()> {
    if extension.is_empty() || !extension.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(SplitError::config(format!(
            "invalid artifact extension '{extension}': expected ASCII letters and digits"
        )));
    }
    Ok(())
}

/// Map a configured concurrency (0 = auto) to a usable worker count.
pub fn effective_concurrency(requested: usize) -> usize {
    if requested > 0 {
        return requested;
    }
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.dbgsplit/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| SplitError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.dbgsplit/dbgsplit.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| SplitError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| SplitError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| SplitError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| SplitError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| SplitError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
