//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use dbgsplit_core::{ProgressReporter, RunReport, RunSummary, split_corpus, write_report};
use dbgsplit_segmenter::{Catalog, segment};
use dbgsplit_shared::{
    AppConfig, Decoding, SplitConfig, Termination, init_config, load_config, load_config_from,
    validate_extension,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// dbgsplit: split debugger transcripts into labeled section artifacts.
#[derive(Parser)]
#[command(
    name = "dbgsplit",
    version,
    about = "Split debugger-session transcripts into typed, ordered section artifacts.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.dbgsplit/dbgsplit.toml).
    #[arg(long, env = "DBGSPLIT_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Defaults to `run` with no flags.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Banner termination policy as a CLI value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum TerminationArg {
    /// Only a banner of the section's own family ends its body.
    FamilyScoped,
    /// Any banner line ends the body.
    AnyBanner,
}

impl From<TerminationArg> for Termination {
    fn from(arg: TerminationArg) -> Self {
        match arg {
            TerminationArg::FamilyScoped => Termination::FamilyScoped,
            TerminationArg::AnyBanner => Termination::AnyBanner,
        }
    }
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Split every process folder of the corpus (the default).
    Run(RunArgs),

    /// Segment a single transcript and print what was found.
    Segment {
        /// Transcript file to segment.
        file: PathBuf,

        /// Also write the artifacts into this directory.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Banner termination policy.
        #[arg(long, value_enum)]
        termination: Option<TerminationArg>,

        /// Replace invalid UTF-8 instead of failing.
        #[arg(long)]
        lossy: bool,
    },

    /// List the section catalog.
    Sections,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Flags of the batch run; unset flags fall back to the config file.
#[derive(Args, Debug, Default)]
pub(crate) struct RunArgs {
    /// Corpus root (defaults to the directory containing this executable).
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Output root (defaults to <root>/classifier).
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Capture subdirectory name under the root.
    #[arg(long)]
    pub capture_dir: Option<String>,

    /// Transcript file name inside each process folder.
    #[arg(long)]
    pub capture_file: Option<String>,

    /// Artifact file extension.
    #[arg(long)]
    pub ext: Option<String>,

    /// Folders processed in parallel (0 = available parallelism).
    #[arg(short = 'j', long)]
    pub concurrency: Option<usize>,

    /// Banner termination policy.
    #[arg(long, value_enum)]
    pub termination: Option<TerminationArg>,

    /// Replace invalid UTF-8 instead of failing the folder.
    #[arg(long)]
    pub lossy: bool,

    /// Write a JSON run report to this path.
    #[arg(long)]
    pub report: Option<PathBuf>,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = [
        "dbgsplit",
        "dbgsplit_core",
        "dbgsplit_segmenter",
        "dbgsplit_artifacts",
        "dbgsplit_shared",
    ]
    .iter()
    .map(|target| format!("{target}={level}"))
    .collect::<Vec<_>>()
    .join(",");

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    match cli.command.unwrap_or(Command::Run(RunArgs::default())) {
        Command::Run(args) => cmd_run(&config, args).await,
        Command::Segment {
            file,
            out,
            termination,
            lossy,
        } => cmd_segment(&config, &file, out.as_deref(), termination, lossy),
        Command::Sections => cmd_sections(&config),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(&config),
        },
    }
}

/// Merge the config file with run flags (flags win).
fn resolve_run(config: &AppConfig, args: &RunArgs) -> Result<(SplitConfig, Catalog)> {
    let mut corpus = config.corpus.clone();

    if let Some(dir) = &args.capture_dir {
        corpus.capture_dir = dir.clone();
    }
    if let Some(file) = &args.capture_file {
        corpus.capture_file = file.clone();
    }
    if let Some(ext) = &args.ext {
        corpus.extension = ext.clone();
    }
    if let Some(n) = args.concurrency {
        corpus.concurrency = n;
    }
    if let Some(t) = args.termination {
        corpus.termination = t.into();
    }
    if args.lossy {
        corpus.decoding = Decoding::Lossy;
    }
    if let Some(out) = &args.out {
        corpus.output_dir = Some(out.to_string_lossy().to_string());
    }

    let root = match args.root.clone().or_else(|| corpus.root.as_ref().map(PathBuf::from)) {
        Some(root) => root,
        None => executable_dir()?,
    };

    let split = SplitConfig::resolve(&corpus, root);
    split.validate()?;
    let catalog = Catalog::with_extra(&config.sections, corpus.termination)?;

    Ok((split, catalog))
}

/// Directory containing the running executable.
fn executable_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe().map_err(|e| eyre!("cannot locate executable: {e}"))?;
    exe.parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| eyre!("executable path '{}' has no parent", exe.display()))
}

async fn cmd_run(config: &AppConfig, args: RunArgs) -> Result<()> {
    let (split, catalog) = resolve_run(config, &args)?;
    let catalog = Arc::new(catalog);

    info!(
        root = %split.root.display(),
        output = %split.output_root.display(),
        concurrency = split.concurrency,
        termination = %catalog.termination(),
        "splitting corpus"
    );

    let reporter = CliProgress::new();
    let summary = split_corpus(&split, Arc::clone(&catalog), &reporter).await?;

    if let Some(path) = &args.report {
        let report = RunReport::new(&summary, &split, &catalog, env!("CARGO_PKG_VERSION"));
        write_report(path, &report)?;
    }

    print_summary(&summary, &split);

    if !summary.is_success() {
        return Err(eyre!(
            "{} of {} process folders failed",
            summary.failed.len(),
            summary.folder_count()
        ));
    }

    Ok(())
}

fn print_summary(summary: &RunSummary, split: &SplitConfig) {
    println!();
    println!("  Run {} finished", summary.run_id);
    println!("  Processed: {}", summary.processed.len());
    println!("  Skipped:   {}", summary.skipped.len());
    println!("  Failed:    {}", summary.failed.len());
    println!("  Artifacts: {}", summary.artifact_count());
    println!("  Output:    {}", split.output_root.display());
    println!("  Time:      {:.1}s", summary.elapsed.as_secs_f64());

    if !summary.failed.is_empty() {
        println!();
        println!("  Failed folders:");
        for failure in &summary.failed {
            println!("    {} ({:?}): {}", failure.folder, failure.kind, failure.message);
        }
    }
    println!();
}

fn cmd_segment(
    config: &AppConfig,
    file: &Path,
    out: Option<&Path>,
    termination: Option<TerminationArg>,
    lossy: bool,
) -> Result<()> {
    if out.is_some() {
        validate_extension(&config.corpus.extension)?;
    }

    let termination = termination.map_or(config.corpus.termination, Termination::from);
    let decoding = if lossy {
        Decoding::Lossy
    } else {
        config.corpus.decoding
    };

    let catalog = Catalog::with_extra(&config.sections, termination)?;
    let text = dbgsplit_core::transcript::read_transcript(file, decoding)?;
    let segmentation = segment(&text, &catalog);

    for rule in catalog.rules() {
        if let Some(bodies) = segmentation.get(rule.id.as_str()) {
            println!("  {:<28} {:>5}", rule.id, bodies.len());
        }
    }
    println!(
        "  {} section types, {} instances",
        segmentation.type_count(),
        segmentation.instance_count()
    );

    if let Some(dir) = out {
        let metas =
            dbgsplit_artifacts::write_artifacts(dir, &segmentation, &config.corpus.extension)?;
        println!("  Wrote {} artifacts to {}", metas.len(), dir.display());
    }

    Ok(())
}

fn cmd_sections(config: &AppConfig) -> Result<()> {
    let catalog = Catalog::with_extra(&config.sections, config.corpus.termination)?;
    for rule in catalog.rules() {
        println!(
            "  {:<28} {:<9} {}",
            rule.id,
            rule.delimiter.family(),
            rule.delimiter.literal()
        );
    }
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner that turns into a bar.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            bar.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
        }
        bar.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { bar }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.bar.set_message(name.to_string());
    }

    fn folders_found(&self, total: usize) {
        self.bar.set_length(total as u64);
        if let Ok(style) = ProgressStyle::with_template("{bar:30.cyan/blue} {pos}/{len} {msg}") {
            self.bar.set_style(style);
        }
    }

    fn folder_done(&self, folder: &str, current: usize, _total: usize) {
        self.bar.set_position(current as u64);
        self.bar.set_message(folder.to_string());
    }

    fn done(&self, _summary: &RunSummary) {
        self.bar.finish_and_clear();
    }
}
