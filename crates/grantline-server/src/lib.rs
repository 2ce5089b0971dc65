//! grantline-server: HTTP access to the materialized analytical store
//!
//! Three read operations over one shared [`ReadOnlyDatabase`]: execute an
//! allow-listed SQL statement, list tables, describe one table. A statement
//! the query layer refuses comes back as a `{"error": ...}` payload with
//! status 400 — a validation result, never a transport failure.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use grantline_db::{DbError, ReadOnlyDatabase};

/// Shared state: the read-only database behind a mutex (one connection,
/// queries serialize).
#[derive(Clone)]
pub struct AppState {
    db: Arc<Mutex<ReadOnlyDatabase>>,
}

impl AppState {
    pub fn new(db: ReadOnlyDatabase) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/query", post(query))
        .route("/tables", get(tables))
        .route("/tables/{name}", get(describe_table))
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(addr: std::net::SocketAddr, db: ReadOnlyDatabase) -> anyhow::Result<()> {
    let app = router(AppState::new(db));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("query server listening on {addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
struct QueryRequest {
    sql: String,
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    100
}

async fn query(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<Value>, AppError> {
    let db = state.db.lock().unwrap();
    let rows = db
        .execute_query(&req.sql, req.limit)
        .map_err(AppError::db)?;
    Ok(Json(json!({ "rows": rows })))
}

async fn tables(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let db = state.db.lock().unwrap();
    let names = db.table_names().map_err(AppError::db)?;
    Ok(Json(json!({ "tables": names })))
}

async fn describe_table(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Value>, AppError> {
    let db = state.db.lock().unwrap();
    let columns = db.describe(&name).map_err(AppError::db)?;
    Ok(Json(json!({ "columns": columns })))
}

#[derive(Debug)]
struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    fn db(err: DbError) -> Self {
        let status = if err.is_rejection() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            log::error!("request failed: {}", self.message);
        }
        let body = Json(json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}
