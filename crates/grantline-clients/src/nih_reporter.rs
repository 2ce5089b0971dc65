//! NIH RePORTER client — grant records and grant↔publication links
//!
//! Both endpoints are offset/limit paged POST searches. RePORTER rejects
//! very deep pagination, so each loop also stops at the documented offset
//! ceiling rather than trusting `meta.total` alone.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use grantline_core::ApiClient;

const NIH_REPORTER_BASE: &str = "https://api.reporter.nih.gov";
const PAGE_SIZE: i64 = 500;
const MAX_PROJECT_OFFSET: i64 = 14_999;
const MAX_PUBLICATION_OFFSET: i64 = 9_999;

/// One grant/project-year from `/v2/projects/search`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRecord {
    #[serde(default)]
    pub appl_id: Option<i64>,
    #[serde(default)]
    pub project_num: Option<String>,
    #[serde(default)]
    pub core_project_num: Option<String>,
    #[serde(default)]
    pub project_title: Option<String>,
    #[serde(default)]
    pub fiscal_year: Option<i64>,
    #[serde(default)]
    pub award_amount: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Grant↔publication join row from `/v2/publications/search`.
///
/// Field names are the provider's (`coreproject`, `applid`). PMID may be
/// absent; such rows are excluded from downstream identifier extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicationLinkRecord {
    #[serde(default)]
    pub coreproject: Option<String>,
    #[serde(default)]
    pub pmid: Option<i64>,
    #[serde(default)]
    pub applid: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct SearchMeta {
    total: i64,
}

#[derive(Debug, Deserialize)]
struct ProjectSearchResponse {
    meta: SearchMeta,
    #[serde(default)]
    results: Vec<ProjectRecord>,
}

#[derive(Debug, Deserialize)]
struct PublicationSearchResponse {
    meta: SearchMeta,
    #[serde(default)]
    results: Vec<PublicationLinkRecord>,
}

pub struct NihReporterClient {
    api: ApiClient,
}

impl NihReporterClient {
    pub fn new() -> Self {
        Self::with_client(
            ApiClient::builder(NIH_REPORTER_BASE)
                .rate_limit(1.0)
                .build(),
        )
    }

    pub fn with_client(api: ApiClient) -> Self {
        Self { api }
    }

    /// All project-year records for the given core project numbers.
    pub fn search_projects(&self, core_project_nums: &[String]) -> Result<Vec<ProjectRecord>> {
        let mut all = Vec::new();
        let mut offset = 0i64;

        loop {
            let body = json!({
                "criteria": { "project_nums": core_project_nums },
                "offset": offset,
                "limit": PAGE_SIZE,
            });
            let resp = self
                .api
                .post("/v2/projects/search", &body)
                .context("project search request failed")?;
            let parsed: ProjectSearchResponse =
                serde_json::from_str(&resp.body).context("invalid project search response")?;

            all.extend(parsed.results);
            log::info!(
                "projects: fetched {}/{} (offset={offset})",
                all.len(),
                parsed.meta.total
            );

            if offset + PAGE_SIZE >= parsed.meta.total || offset + PAGE_SIZE > MAX_PROJECT_OFFSET {
                break;
            }
            offset += PAGE_SIZE;
        }

        Ok(all)
    }

    /// All grant↔publication links for the given core project numbers.
    pub fn search_publications(
        &self,
        core_project_nums: &[String],
    ) -> Result<Vec<PublicationLinkRecord>> {
        let mut all = Vec::new();
        let mut offset = 0i64;

        loop {
            let body = json!({
                "criteria": { "core_project_nums": core_project_nums },
                "offset": offset,
                "limit": PAGE_SIZE,
            });
            let resp = self
                .api
                .post("/v2/publications/search", &body)
                .context("publication link search request failed")?;
            let parsed: PublicationSearchResponse = serde_json::from_str(&resp.body)
                .context("invalid publication link search response")?;

            all.extend(parsed.results);
            log::info!(
                "publication links: fetched {}/{} (offset={offset})",
                all.len(),
                parsed.meta.total
            );

            if offset + PAGE_SIZE >= parsed.meta.total
                || offset + PAGE_SIZE > MAX_PUBLICATION_OFFSET
            {
                break;
            }
            offset += PAGE_SIZE;
        }

        Ok(all)
    }
}

impl Default for NihReporterClient {
    fn default() -> Self {
        Self::new()
    }
}
