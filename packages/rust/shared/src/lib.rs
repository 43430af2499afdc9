//! Shared types, error model, and configuration for dbgsplit.
//!
//! This crate is the foundation depended on by all other dbgsplit crates.
//! It provides:
//! - [`SplitError`]: the unified error type
//! - Domain types ([`SectionId`], [`Delimiter`], [`SectionRule`], [`RunId`])
//! - Configuration ([`AppConfig`], [`SplitConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CorpusConfig, DEFAULT_CAPTURE_DIR, DEFAULT_CAPTURE_FILE, DEFAULT_OUTPUT_DIR_NAME,
    SplitConfig, config_dir, config_file_path, effective_concurrency, init_config, load_config,
    load_config_from, validate_extension,
};
pub use error::{Result, SplitError};
pub use types::{Decoding, Delimiter, Family, RunId, SectionId, SectionRule, Termination};
