//! `grantline serve` - read-only HTTP query server

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use grantline_db::ReadOnlyDatabase;

use crate::config::Config;

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Path to the materialized DuckDB file (default: <output-dir>/grantline.duckdb)
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, default_value_t = 8000)]
    pub port: u16,
}

pub fn run(args: ServeArgs, config: &Config) -> Result<()> {
    let db_path = args
        .db
        .unwrap_or_else(|| config.output.default_dir.join("grantline.duckdb"));

    let db = ReadOnlyDatabase::open(&db_path)?;
    log::info!("loaded database: {}", db_path.display());
    log::info!("tables: {:?}", db.table_names().map_err(anyhow::Error::new)?);

    let host: IpAddr = args
        .host
        .parse()
        .with_context(|| format!("invalid host: {}", args.host))?;
    let addr = SocketAddr::new(host, args.port);

    grantline_core::SHARED_RUNTIME
        .handle()
        .block_on(grantline_server::serve(addr, db))
}
