//! grantline-pipeline: fetch orchestration for the grant-impact ETL
//!
//! Sequences the five provider clients into a fixed multi-stage flow:
//! grants → publication links → publication metadata and citation metrics →
//! citation-graph expansion → citing-publication fetches → repository search,
//! writing each stage's records to line-delimited JSON.

pub mod collection;
pub mod expand;
pub mod runner;

pub use collection::CollectionConfig;
pub use expand::{expand_citations, Expansion};
pub use runner::{Pipeline, RunSummary};
