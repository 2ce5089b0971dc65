//! Restricted read-only query execution
//!
//! The connection is opened read-only with external access disabled, and
//! every statement must lead with an allow-listed keyword. Results come
//! back as JSON objects so the caller never touches engine value types.

use std::path::Path;

use anyhow::{Context, Result};
use duckdb::{AccessMode, Config, Connection};

/// Statement types a caller may execute.
const ALLOWED_KEYWORDS: [&str; 7] = [
    "SELECT",
    "WITH",
    "SHOW",
    "DESCRIBE",
    "PRAGMA",
    "EXPLAIN",
    "SUMMARIZE",
];

/// Hard ceiling on returned rows, whatever the caller asks for.
pub const MAX_ROWS: usize = 10_000;

/// One result row: column name → JSON value.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Error from the query layer.
///
/// `Rejected` is a client-visible validation error (disallowed statement,
/// unknown table); `Query` is an engine-level failure.
#[derive(Debug)]
pub enum DbError {
    Rejected(String),
    Query(duckdb::Error),
}

impl std::fmt::Display for DbError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected(message) => write!(f, "{message}"),
            Self::Query(e) => write!(f, "query failed: {e}"),
        }
    }
}

impl std::error::Error for DbError {}

impl From<duckdb::Error> for DbError {
    fn from(e: duckdb::Error) -> Self {
        Self::Query(e)
    }
}

impl DbError {
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

/// Leading keyword must be in the allow-list; anything else is rejected.
fn is_read_only_statement(sql: &str) -> bool {
    let keyword: String = sql
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_ascii_uppercase();
    ALLOWED_KEYWORDS.contains(&keyword.as_str())
}

/// Read-only DuckDB connection with query validation.
pub struct ReadOnlyDatabase {
    conn: Connection,
}

impl ReadOnlyDatabase {
    /// Open an existing materialized database.
    pub fn open(db_path: &Path) -> Result<Self> {
        anyhow::ensure!(
            db_path.exists(),
            "database not found: {} (run materialize first)",
            db_path.display()
        );
        let config = Config::default()
            .access_mode(AccessMode::ReadOnly)
            .context("failed to build database config")?;
        let conn = Connection::open_with_flags(db_path, config)
            .with_context(|| format!("failed to open database {}", db_path.display()))?;
        // The query engine must not reach files or the network on its own.
        conn.execute_batch("SET enable_external_access = false")
            .context("failed to disable external access")?;
        Ok(Self { conn })
    }

    /// Execute an allow-listed statement, returning at most `limit` rows
    /// (clamped to `1..=MAX_ROWS`).
    pub fn execute_query(&self, sql: &str, limit: usize) -> Result<Vec<Row>, DbError> {
        if !is_read_only_statement(sql) {
            return Err(DbError::Rejected(format!(
                "only read-only queries are allowed ({})",
                ALLOWED_KEYWORDS.join(", ")
            )));
        }

        let limit = limit.clamp(1, MAX_ROWS);
        let wrapped = format!("SELECT * FROM ({sql}) AS _q LIMIT {limit}");
        log::debug!("executing query (limit={limit}): {sql}");

        let mut stmt = self.conn.prepare(&wrapped)?;
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();

        while let Some(row) = rows.next()? {
            let stmt = row.as_ref();
            let mut object = Row::new();
            for idx in 0..stmt.column_count() {
                let name = stmt.column_name(idx)?.to_string();
                let value: duckdb::types::Value = row.get(idx)?;
                object.insert(name, value_to_json(value));
            }
            out.push(object);
        }

        Ok(out)
    }

    /// Names of every table in the database.
    pub fn table_names(&self) -> Result<Vec<String>, DbError> {
        let mut stmt = self.conn.prepare("SHOW TABLES")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// Column names, types, and nullability of one table.
    pub fn describe(&self, table: &str) -> Result<Vec<Row>, DbError> {
        let known = self.table_names()?;
        if !known.iter().any(|name| name == table) {
            return Err(DbError::Rejected(format!(
                "unknown table: {table} (available: {})",
                known.join(", ")
            )));
        }
        self.execute_query(&format!("DESCRIBE {table}"), 1000)
    }
}

/// Engine value → JSON, recursing through lists and structs.
fn value_to_json(value: duckdb::types::Value) -> serde_json::Value {
    use duckdb::types::Value as Db;
    use serde_json::Value as Json;

    match value {
        Db::Null => Json::Null,
        Db::Boolean(b) => Json::Bool(b),
        Db::TinyInt(i) => Json::from(i64::from(i)),
        Db::SmallInt(i) => Json::from(i64::from(i)),
        Db::Int(i) => Json::from(i64::from(i)),
        Db::BigInt(i) => Json::from(i),
        Db::HugeInt(i) => match i64::try_from(i) {
            Ok(v) => Json::from(v),
            Err(_) => Json::String(i.to_string()),
        },
        Db::UTinyInt(u) => Json::from(u64::from(u)),
        Db::USmallInt(u) => Json::from(u64::from(u)),
        Db::UInt(u) => Json::from(u64::from(u)),
        Db::UBigInt(u) => Json::from(u),
        Db::Float(f) => serde_json::Number::from_f64(f64::from(f))
            .map(Json::Number)
            .unwrap_or(Json::Null),
        Db::Double(f) => serde_json::Number::from_f64(f)
            .map(Json::Number)
            .unwrap_or(Json::Null),
        Db::Decimal(d) => d
            .to_string()
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Json::Number)
            .unwrap_or_else(|| Json::String(d.to_string())),
        Db::Text(s) => Json::String(s),
        Db::Enum(s) => Json::String(s),
        Db::List(values) | Db::Array(values) => {
            Json::Array(values.into_iter().map(value_to_json).collect())
        }
        Db::Struct(map) => {
            let mut object = serde_json::Map::new();
            for pair in map.iter() {
                object.insert(pair.0.clone(), value_to_json(pair.1.clone()));
            }
            Json::Object(object)
        }
        other => Json::String(format!("{other:?}")),
    }
}
