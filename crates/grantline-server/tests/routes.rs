//! Route tests over a real materialized database

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
};
use tempfile::TempDir;
use tower::ServiceExt;

use grantline_db::{materialize, ReadOnlyDatabase};
use grantline_server::{router, AppState};

/// Materialize a tiny database and build the app over it.
fn app(tmp: &TempDir) -> axum::Router {
    let data_dir = tmp.path().join("data");
    std::fs::create_dir_all(&data_dir).unwrap();
    std::fs::write(
        data_dir.join("projects.jsonl"),
        concat!(
            r#"{"appl_id":1,"core_project_num":"U24CA289073","project_title":"Grant A","fiscal_year":2024,"award_amount":500000}"#, "\n",
            r#"{"appl_id":2,"core_project_num":"U24CA289073","project_title":"Grant A","fiscal_year":2025,"award_amount":510000}"#, "\n",
            r#"{"appl_id":3,"core_project_num":"OT2OD032720","project_title":"Grant B","fiscal_year":2024,"award_amount":250000}"#, "\n",
            r#"{"appl_id":4,"core_project_num":"OT2OD032720","project_title":"Grant B","fiscal_year":2025,"award_amount":260000}"#, "\n",
            r#"{"appl_id":5,"core_project_num":"OT2OD032720","project_title":"Grant B","fiscal_year":2026,"award_amount":270000}"#, "\n",
            r#"{"appl_id":6,"core_project_num":"OT2OD032720","project_title":"Grant B","fiscal_year":2027,"award_amount":280000}"#, "\n",
        ),
    )
    .unwrap();
    std::fs::write(
        data_dir.join("publication_links.jsonl"),
        concat!(r#"{"coreproject":"U24CA289073","pmid":111,"applid":1}"#, "\n"),
    )
    .unwrap();
    std::fs::write(data_dir.join("github_core.jsonl"), "").unwrap();

    let db_path = tmp.path().join("grantline.duckdb");
    materialize(&data_dir, &db_path).unwrap();

    let db = ReadOnlyDatabase::open(&db_path).unwrap();
    router(AppState::new(db))
}

async fn body_json(resp: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_query(sql: &str, limit: usize) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/query")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::json!({ "sql": sql, "limit": limit }).to_string(),
        ))
        .unwrap()
}

#[tokio::test]
async fn health_is_ok() {
    let tmp = TempDir::new().unwrap();
    let resp = app(&tmp)
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, serde_json::json!({"status":"ok"}));
}

#[tokio::test]
async fn select_returns_rows_capped_by_limit() {
    let tmp = TempDir::new().unwrap();
    let resp = app(&tmp)
        .oneshot(post_query("SELECT * FROM projects", 5))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    let rows = body["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 5, "six projects exist but limit is 5");
    assert_eq!(rows[0]["core_project_num"], "U24CA289073");
}

#[tokio::test]
async fn drop_statement_is_rejected_with_error_object() {
    let tmp = TempDir::new().unwrap();
    let app = app(&tmp);

    let resp = app
        .clone()
        .oneshot(post_query("DROP TABLE projects", 10))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert!(body["error"].as_str().unwrap().contains("read-only"));

    // The table survived.
    let resp = app
        .oneshot(post_query("SELECT count(*) AS n FROM projects", 10))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["rows"][0]["n"], 6);
}

#[tokio::test]
async fn tables_lists_all_nine() {
    let tmp = TempDir::new().unwrap();
    let resp = app(&tmp)
        .oneshot(Request::builder().uri("/tables").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    let tables = body["tables"].as_array().unwrap();
    assert_eq!(tables.len(), 9);
    assert!(tables.contains(&serde_json::json!("projects")));
    assert!(tables.contains(&serde_json::json!("github_repos")));
}

#[tokio::test]
async fn describe_returns_columns() {
    let tmp = TempDir::new().unwrap();
    let resp = app(&tmp)
        .oneshot(
            Request::builder()
                .uri("/tables/projects")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    let columns = body["columns"].as_array().unwrap();
    assert!(columns
        .iter()
        .any(|c| c["column_name"] == "core_project_num"));
}

#[tokio::test]
async fn describe_unknown_table_is_bad_request() {
    let tmp = TempDir::new().unwrap();
    let resp = app(&tmp)
        .oneshot(
            Request::builder()
                .uri("/tables/nope")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert!(body["error"].as_str().unwrap().contains("unknown table"));
}

#[tokio::test]
async fn query_default_limit_applies_when_omitted() {
    let tmp = TempDir::new().unwrap();
    let req = Request::builder()
        .method("POST")
        .uri("/query")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::json!({ "sql": "SELECT * FROM projects" }).to_string(),
        ))
        .unwrap();

    let resp = app(&tmp).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["rows"].as_array().unwrap().len(), 6);
}
