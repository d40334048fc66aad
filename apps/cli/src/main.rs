//! LLMO CLI: keyword-to-article blog writing with Gemini.
//!
//! Each generation step is a subcommand; `llmo run` chains them.

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
