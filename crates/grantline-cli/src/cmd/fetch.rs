//! `grantline fetch` - run the collection pipeline

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use grantline_clients::{
    EuropePmcClient, GitHubClient, IciteClient, NihReporterClient, OpenAlexClient,
};
use grantline_core::ProgressContext;
use grantline_pipeline::{CollectionConfig, Pipeline};

use crate::config::Config;

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Path to the collection TOML (list of core project numbers)
    #[arg(short, long, default_value = "collection.toml")]
    pub collection: PathBuf,

    /// Output directory for JSONL files (default from config)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
}

pub fn run(args: FetchArgs, config: &Config, progress: &Arc<ProgressContext>) -> Result<()> {
    let collection = CollectionConfig::from_file(&args.collection)
        .with_context(|| format!("failed to load {}", args.collection.display()))?;
    let output_dir = args
        .output_dir
        .unwrap_or_else(|| config.output.default_dir.clone());

    let pipeline = Pipeline::with_clients(
        NihReporterClient::new(),
        EuropePmcClient::with_concurrency(config.europepmc.concurrency),
        IciteClient::new(),
        OpenAlexClient::with_api_key(config.openalex.api_key.clone()),
        GitHubClient::new(),
    );

    pipeline.run(&collection, &output_dir, progress)?;
    Ok(())
}
