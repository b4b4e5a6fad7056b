mod commands;
mod workspace;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{clippy, fmt, size};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Format all code
    Fmt,
    /// Run clippy with warnings denied
    Clippy,
    /// Compare local crate sizes against their published crates.io sizes
    Size,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Fmt => fmt::run_fmt().await?,
        Commands::Clippy => clippy::run_clippy().await?,
        Commands::Size => size::show_size_comparison().await?,
    }
    Ok(())
}
