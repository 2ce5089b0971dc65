//! grantline - NIH grant impact data pipeline
//!
//! Fetches grant, publication, citation, and code-repository metadata for a
//! collection of NIH-funded projects, materializes the results into DuckDB,
//! and serves them through a restricted read-only query API.

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "grantline")]
#[command(about = "NIH grant impact data pipeline")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./grantline.toml or ~/.config/grantline/config.toml)
    #[arg(long, global = true)]
    config: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the fetch pipeline and write JSONL stage outputs
    Fetch(cmd::fetch::FetchArgs),
    /// Materialize JSONL outputs into a DuckDB database
    Materialize(cmd::materialize::MaterializeArgs),
    /// Serve the materialized database over HTTP (read-only)
    Serve(cmd::serve::ServeArgs),
    /// Show current configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Progress context (TTY auto-detect)
    let progress = Arc::new(grantline_core::ProgressContext::new());

    // Logging:
    //   TTY:     quiet (warn) unless --debug  — status lines show activity
    //   non-TTY: info unless --debug          — logs are the only progress indicator
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let quiet = if is_tty { !cli.debug } else { false };
    grantline_core::init_logging(quiet, cli.debug, multi);

    let config = if let Some(path) = cli.config {
        Config::from_file(&path)?
    } else {
        Config::load()?
    };

    match cli.command {
        Command::Fetch(args) => cmd::fetch::run(args, &config, &progress),
        Command::Materialize(args) => cmd::materialize::run(args, &config),
        Command::Serve(args) => cmd::serve::run(args, &config),
        Command::Config => {
            use comfy_table::{
                modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table,
            };

            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .apply_modifier(UTF8_ROUND_CORNERS)
                .set_header(vec![
                    Cell::new("Setting").fg(Color::Cyan),
                    Cell::new("Value").fg(Color::Cyan),
                ]);

            table.add_row(vec![
                "Output directory",
                &config.output.default_dir.display().to_string(),
            ]);
            table.add_row(vec![
                "OpenAlex API key",
                if config.openalex.api_key.is_some() {
                    "configured"
                } else {
                    "not set"
                },
            ]);
            table.add_row(vec![
                "Europe PMC concurrency",
                &config.europepmc.concurrency.to_string(),
            ]);
            table.add_row(vec![
                "GitHub token",
                if std::env::var("GITHUB_TOKEN").is_ok() {
                    "configured"
                } else {
                    "not set"
                },
            ]);

            eprintln!("\n{table}");
            Ok(())
        }
    }
}
