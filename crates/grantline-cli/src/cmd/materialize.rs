//! `grantline materialize` - build the DuckDB file from JSONL outputs

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::config::Config;

#[derive(Args, Debug)]
pub struct MaterializeArgs {
    /// Directory holding the JSONL stage outputs (default from config)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Output database path (default: <data-dir>/grantline.duckdb)
    #[arg(long)]
    pub db: Option<PathBuf>,
}

pub fn run(args: MaterializeArgs, config: &Config) -> Result<()> {
    let data_dir = args
        .data_dir
        .unwrap_or_else(|| config.output.default_dir.clone());
    let db_path = args
        .db
        .unwrap_or_else(|| data_dir.join("grantline.duckdb"));

    let counts = grantline_db::materialize(&data_dir, &db_path)?;

    let total: u64 = counts.iter().map(|(_, n)| n).sum();
    log::info!("{} rows across {} tables", total, counts.len());
    Ok(())
}
