//! dbgsplit CLI: split debugger-session transcripts into labeled sections.
//!
//! With no arguments it runs the batch over `<root>/windbg_outputs/` and
//! writes one artifact per section instance under `<root>/classifier/`.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
