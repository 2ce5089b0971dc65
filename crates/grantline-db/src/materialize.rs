//! Materialize JSONL stage outputs into a DuckDB database file
//!
//! Creates views over the JSONL files, then turns each view into a permanent
//! table (create-as-select, drop view, rename), replacing any existing
//! database file so the result is always a whole, fresh snapshot.

use std::path::Path;

use anyhow::{Context, Result};
use duckdb::Connection;

use crate::views::{self, TABLE_NAMES};

/// Build `output_path` from the JSONL files in `data_dir`.
///
/// Returns per-table row counts in creation order.
pub fn materialize(data_dir: &Path, output_path: &Path) -> Result<Vec<(&'static str, u64)>> {
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    if output_path.exists() {
        std::fs::remove_file(output_path)
            .with_context(|| format!("failed to replace {}", output_path.display()))?;
    }

    let conn = Connection::open(output_path)
        .with_context(|| format!("failed to open database {}", output_path.display()))?;

    log::info!("creating views over {}", data_dir.display());
    for stmt in views::create_views(data_dir) {
        conn.execute_batch(&stmt)
            .with_context(|| format!("failed to create view: {stmt}"))?;
    }

    let mut counts = Vec::with_capacity(TABLE_NAMES.len());
    for table in TABLE_NAMES {
        log::info!("materializing {table}...");
        conn.execute_batch(&format!(
            "CREATE TABLE {table}_tbl AS SELECT * FROM {table}"
        ))
        .with_context(|| format!("failed to materialize {table}"))?;

        let count: i64 = conn
            .query_row(&format!("SELECT count(*) FROM {table}_tbl"), [], |row| {
                row.get(0)
            })
            .with_context(|| format!("failed to count {table}"))?;
        log::info!("  {table}: {count} rows");

        conn.execute_batch(&format!(
            "DROP VIEW {table}; ALTER TABLE {table}_tbl RENAME TO {table};"
        ))
        .with_context(|| format!("failed to finalize {table}"))?;

        counts.push((table, count as u64));
    }

    log::info!(
        "materialized {} tables into {}",
        TABLE_NAMES.len(),
        output_path.display()
    );
    Ok(counts)
}
