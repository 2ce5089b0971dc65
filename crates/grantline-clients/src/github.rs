//! GitHub search client — repositories tagged with project-ID topics
//!
//! GitHub's search API rate-limits aggressively (403/429 with Retry-After),
//! so this client runs a wider retry policy than the other providers and no
//! fixed throttle. Repositories matching several topics are merged into one
//! record keyed by repository id.

use std::time::Duration;

use anyhow::{Context, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use grantline_core::{ApiClient, RetryPolicy};

const GITHUB_API_BASE: &str = "https://api.github.com";
const RESULTS_PER_PAGE: usize = 100;

/// Retry schedule for the search API: five total attempts, 2s..120s
/// backoff, 403 retryable, Retry-After honored.
pub fn github_retry_policy() -> RetryPolicy {
    RetryPolicy {
        max_retries: 4,
        backoff_base: Duration::from_secs(2),
        backoff_cap: Some(Duration::from_secs(120)),
        retry_on_forbidden: true,
        honor_retry_after: true,
    }
}

/// One repository search hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubRepo {
    pub id: i64,
    pub name: String,
    pub full_name: String,
    pub html_url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub stargazers_count: i64,
    #[serde(default)]
    pub forks_count: i64,
    #[serde(default)]
    pub open_issues_count: i64,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub pushed_at: Option<String>,
    #[serde(default)]
    pub license: Option<Value>,
    /// Accumulated by `fetch_repos`, not present in API responses.
    #[serde(default)]
    pub core_project_ids: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    total_count: i64,
    #[serde(default)]
    items: Vec<GitHubRepo>,
}

pub struct GitHubClient {
    api: ApiClient,
}

impl GitHubClient {
    pub fn new() -> Self {
        let mut builder = ApiClient::builder(GITHUB_API_BASE)
            .policy(github_retry_policy())
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28");

        match std::env::var("GITHUB_TOKEN") {
            Ok(token) => {
                builder = builder.header("Authorization", format!("Bearer {token}"));
                log::info!("GitHub client: using authenticated requests");
            }
            Err(_) => log::warn!(
                "GitHub client: no GITHUB_TOKEN set, using unauthenticated requests (10 req/min limit)"
            ),
        }

        Self::with_client(builder.build())
    }

    pub fn with_client(api: ApiClient) -> Self {
        Self { api }
    }

    /// All repositories tagged with `topic`, paged until a short or empty
    /// page or the provider-reported total is reached.
    pub fn search_repos_by_topic(&self, topic: &str) -> Result<Vec<GitHubRepo>> {
        let mut repos = Vec::new();
        let mut page = 1u32;

        loop {
            let query = vec![
                ("q".to_string(), format!("topic:{topic}")),
                ("per_page".to_string(), RESULTS_PER_PAGE.to_string()),
                ("page".to_string(), page.to_string()),
            ];
            let resp = self
                .api
                .get("/search/repositories", &query)
                .context("repository search request failed")?;
            let parsed: SearchResponse =
                serde_json::from_str(&resp.body).context("invalid repository search response")?;

            if parsed.items.is_empty() {
                break;
            }
            let got = parsed.items.len();
            repos.extend(parsed.items);

            log::debug!(
                "github search topic={topic} page={page}, got {got} items (total={})",
                parsed.total_count
            );

            if repos.len() as i64 >= parsed.total_count || got < RESULTS_PER_PAGE {
                break;
            }
            page += 1;
        }

        Ok(repos)
    }

    /// Search each core project id as a lower-cased topic and merge results
    /// by repository id.
    ///
    /// A repository found under several topics yields one record whose
    /// `core_project_ids` lists each topic's project id in first-occurrence
    /// order. A topic whose search fails after retries is logged and skipped.
    pub fn fetch_repos(&self, core_project_ids: &[String]) -> Vec<GitHubRepo> {
        let mut merged: Vec<GitHubRepo> = Vec::new();
        let mut by_id: FxHashMap<i64, usize> = FxHashMap::default();

        for project_id in core_project_ids {
            let topic = project_id.to_lowercase();
            log::info!("github: searching repos with topic '{topic}'");

            let results = match self.search_repos_by_topic(&topic) {
                Ok(results) => results,
                Err(e) => {
                    log::error!("github: failed to search topic '{topic}' ({e:#}), skipping");
                    continue;
                }
            };
            log::info!("github: found {} repos for topic '{topic}'", results.len());

            for mut repo in results {
                match by_id.get(&repo.id) {
                    Some(&idx) => {
                        let existing = &mut merged[idx];
                        if !existing.core_project_ids.contains(project_id) {
                            existing.core_project_ids.push(project_id.clone());
                        }
                    }
                    None => {
                        repo.core_project_ids = vec![project_id.clone()];
                        by_id.insert(repo.id, merged.len());
                        merged.push(repo);
                    }
                }
            }
        }

        merged
    }
}

impl Default for GitHubClient {
    fn default() -> Self {
        Self::new()
    }
}
