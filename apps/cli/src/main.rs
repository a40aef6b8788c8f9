//! Sunbird CLI: resolve content identifiers into downloadable artifacts,
//! search the catalogue, and serve both as MCP tools.

mod commands;
mod mcp;

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
