//! OpenAlex client — work records by PMID filter with cursor pagination
//!
//! PMIDs go into a pipe-separated `ids.pmid` filter. The filter length is
//! provider-limited (max 100 values), so batches stay at 50; within each
//! batch, cursor pagination runs until the provider stops returning a
//! cursor or a page comes back empty.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use grantline_core::ApiClient;

const OPENALEX_BASE: &str = "https://api.openalex.org";
const BATCH_SIZE: usize = 50;
const PER_PAGE: &str = "200";

/// One OpenAlex work record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAlexWork {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub publication_year: Option<i64>,
    #[serde(default)]
    pub publication_date: Option<String>,
    #[serde(default)]
    pub ids: Option<Value>,
    #[serde(default, rename = "type")]
    pub work_type: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub primary_location: Option<Value>,
    #[serde(default)]
    pub open_access: Option<Value>,
    #[serde(default)]
    pub authorships: Option<Value>,
    #[serde(default)]
    pub cited_by_count: Option<i64>,
    #[serde(default)]
    pub fwci: Option<f64>,
    #[serde(default)]
    pub biblio: Option<Value>,
    #[serde(default)]
    pub is_retracted: Option<bool>,
    #[serde(default)]
    pub referenced_works_count: Option<i64>,
    #[serde(default)]
    pub primary_topic: Option<Value>,
    #[serde(default)]
    pub topics: Option<Value>,
    #[serde(default)]
    pub mesh: Option<Value>,
    #[serde(default)]
    pub keywords: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
struct WorksMeta {
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WorksResponse {
    #[serde(default)]
    meta: WorksMeta,
    #[serde(default)]
    results: Vec<OpenAlexWork>,
}

pub struct OpenAlexClient {
    api: ApiClient,
    api_key: Option<String>,
}

impl OpenAlexClient {
    pub fn new() -> Self {
        Self::with_api_key(std::env::var("OPENALEX_API_KEY").ok())
    }

    pub fn with_api_key(api_key: Option<String>) -> Self {
        if api_key.is_none() {
            log::warn!(
                "OPENALEX_API_KEY not set — OpenAlex limits unauthenticated requests to 100/day"
            );
        }
        Self::with_client(
            ApiClient::builder(OPENALEX_BASE).rate_limit(10.0).build(),
            api_key,
        )
    }

    pub fn with_client(api: ApiClient, api_key: Option<String>) -> Self {
        Self { api, api_key }
    }

    fn base_query(&self) -> Vec<(String, String)> {
        let mut query = vec![("per_page".to_string(), PER_PAGE.to_string())];
        if let Some(key) = &self.api_key {
            query.push(("api_key".to_string(), key.clone()));
        }
        query
    }

    /// Work records for a list of PMIDs, batches concatenated in order.
    pub fn fetch_works(&self, pmids: &[i64]) -> Result<Vec<OpenAlexWork>> {
        let mut all = Vec::new();

        for (chunk_idx, chunk) in pmids.chunks(BATCH_SIZE).enumerate() {
            let filter = format!(
                "ids.pmid:{}",
                chunk
                    .iter()
                    .map(|p| p.to_string())
                    .collect::<Vec<_>>()
                    .join("|")
            );

            let mut cursor = "*".to_string();
            let mut batch_results = Vec::new();
            loop {
                let mut query = self.base_query();
                query.push(("filter".to_string(), filter.clone()));
                query.push(("cursor".to_string(), cursor.clone()));

                let resp = self
                    .api
                    .get("/works", &query)
                    .context("OpenAlex works request failed")?;
                let parsed: WorksResponse =
                    serde_json::from_str(&resp.body).context("invalid OpenAlex response")?;

                let page_empty = parsed.results.is_empty();
                batch_results.extend(parsed.results);

                match parsed.meta.next_cursor {
                    Some(next) if !next.is_empty() && !page_empty => cursor = next,
                    _ => break,
                }
            }

            let start = chunk_idx * BATCH_SIZE;
            log::info!(
                "OpenAlex: fetched {}/{} PMIDs (batch {start}-{}, got {} works)",
                start + chunk.len(),
                pmids.len(),
                start + chunk.len(),
                batch_results.len()
            );
            all.extend(batch_results);
        }

        Ok(all)
    }
}

impl Default for OpenAlexClient {
    fn default() -> Self {
        Self::new()
    }
}
