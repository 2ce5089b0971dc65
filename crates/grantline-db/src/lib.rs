//! grantline-db: analytical table store over the JSONL stage outputs
//!
//! Materializes the pipeline's line-delimited JSON files into a DuckDB
//! database of nine fixed tables, and exposes that database through a
//! restricted, read-only query layer.

pub mod materialize;
pub mod query;
pub mod views;

pub use materialize::materialize;
pub use query::{DbError, ReadOnlyDatabase, Row, MAX_ROWS};
pub use views::TABLE_NAMES;
