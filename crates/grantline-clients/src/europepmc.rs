//! Europe PMC client — per-PMID publication metadata
//!
//! One request per PMID, issued concurrently under a counting semaphore.
//! A failed or empty fetch drops that PMID from the result set; it never
//! aborts the batch.

use std::sync::Mutex;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use grantline_core::{ApiClient, Semaphore};

const EUROPEPMC_BASE: &str = "https://www.ebi.ac.uk";
const DEFAULT_CONCURRENCY: usize = 5;

/// Core-result publication metadata, field names as the provider sends them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicationRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub pmid: Option<String>,
    #[serde(default)]
    pub pmcid: Option<String>,
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, rename = "authorString")]
    pub author_string: Option<String>,
    #[serde(default, rename = "pubYear")]
    pub pub_year: Option<String>,
    #[serde(default, rename = "abstractText")]
    pub abstract_text: Option<String>,
    #[serde(default, rename = "citedByCount")]
    pub cited_by_count: Option<i64>,
    #[serde(default, rename = "isOpenAccess")]
    pub is_open_access: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct ArticleResponse {
    #[serde(default)]
    result: Option<PublicationRecord>,
}

pub struct EuropePmcClient {
    api: ApiClient,
    permits: Semaphore,
}

impl EuropePmcClient {
    pub fn new() -> Self {
        Self::with_concurrency(DEFAULT_CONCURRENCY)
    }

    pub fn with_concurrency(concurrency: usize) -> Self {
        Self::with_client(
            ApiClient::builder(EUROPEPMC_BASE).rate_limit(10.0).build(),
            concurrency,
        )
    }

    pub fn with_client(api: ApiClient, concurrency: usize) -> Self {
        Self {
            api,
            permits: Semaphore::new(concurrency.max(1)),
        }
    }

    fn fetch_one(&self, pmid: i64) -> Result<Option<PublicationRecord>> {
        let path = format!("/europepmc/webservices/rest/article/MED/{pmid}");
        let query = vec![
            ("format".to_string(), "json".to_string()),
            ("resultType".to_string(), "core".to_string()),
        ];
        let resp = self.api.get(&path, &query)?;
        let parsed: ArticleResponse =
            serde_json::from_str(&resp.body).context("invalid Europe PMC article response")?;
        Ok(parsed.result)
    }

    /// Fetch metadata for every PMID, tolerating per-identifier failure.
    ///
    /// Results keep input order; failed and empty fetches are logged and
    /// omitted.
    pub fn fetch_publications(&self, pmids: &[i64]) -> Vec<PublicationRecord> {
        log::info!("fetching {} publications from Europe PMC", pmids.len());

        let slots: Vec<Mutex<Option<PublicationRecord>>> =
            pmids.iter().map(|_| Mutex::new(None)).collect();

        std::thread::scope(|scope| {
            for (slot, &pmid) in slots.iter().zip(pmids) {
                // Acquire before spawning so at most `concurrency` fetches
                // are ever in flight.
                let permit = self.permits.acquire();
                scope.spawn(move || {
                    let _permit = permit;
                    match self.fetch_one(pmid) {
                        Ok(Some(record)) => *slot.lock().unwrap() = Some(record),
                        Ok(None) => log::warn!("no Europe PMC result for PMID {pmid}"),
                        Err(e) => {
                            log::error!("failed to fetch PMID {pmid} from Europe PMC: {e:#}")
                        }
                    }
                });
            }
        });

        let publications: Vec<PublicationRecord> = slots
            .into_iter()
            .filter_map(|slot| slot.into_inner().unwrap())
            .collect();

        log::info!(
            "successfully fetched {}/{} publications",
            publications.len(),
            pmids.len()
        );
        publications
    }
}

impl Default for EuropePmcClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fast_policy, ok_json, scripted_client, status};

    fn article(pmid: i64) -> String {
        format!(
            r#"{{"hitCount":1,"result":{{"id":"{pmid}","pmid":"{pmid}","title":"Paper {pmid}","authorString":"Doe J.","pubYear":"2021"}}}}"#
        )
    }

    /// Concurrency 1 makes the scripted response order deterministic.
    fn sequential_client(
        outcomes: Vec<Result<grantline_core::HttpResponse, grantline_core::ApiError>>,
    ) -> EuropePmcClient {
        let (api, _) = scripted_client("https://www.ebi.ac.uk", fast_policy(1), outcomes);
        EuropePmcClient::with_client(api, 1)
    }

    #[test]
    fn results_follow_input_order() {
        let client = sequential_client(vec![ok_json(&article(111)), ok_json(&article(222))]);
        let pubs = client.fetch_publications(&[111, 222]);

        assert_eq!(pubs.len(), 2);
        assert_eq!(pubs[0].pmid.as_deref(), Some("111"));
        assert_eq!(pubs[1].pmid.as_deref(), Some("222"));
    }

    #[test]
    fn failed_identifier_is_dropped_not_fatal() {
        let client = sequential_client(vec![
            ok_json(&article(111)),
            status(500), // retried once by fast_policy(1), then...
            status(500), // ...fails this PMID only
            ok_json(&article(333)),
        ]);
        let pubs = client.fetch_publications(&[111, 222, 333]);

        assert_eq!(pubs.len(), 2);
        let pmids: Vec<&str> = pubs.iter().filter_map(|p| p.pmid.as_deref()).collect();
        assert_eq!(pmids, vec!["111", "333"]);
    }

    #[test]
    fn empty_result_is_dropped() {
        let client = sequential_client(vec![
            ok_json(r#"{"hitCount":0,"result":null}"#),
            ok_json(&article(222)),
        ]);
        let pubs = client.fetch_publications(&[111, 222]);

        assert_eq!(pubs.len(), 1);
        assert_eq!(pubs[0].pmid.as_deref(), Some("222"));
    }

    #[test]
    fn never_returns_more_than_input() {
        let client = sequential_client(vec![ok_json(&article(111))]);
        let pubs = client.fetch_publications(&[111]);
        assert!(pubs.len() <= 1);
    }

    #[test]
    fn empty_input_issues_no_requests() {
        let (api, transport) =
            scripted_client("https://www.ebi.ac.uk", fast_policy(1), vec![]);
        let client = EuropePmcClient::with_client(api, 3);

        assert!(client.fetch_publications(&[]).is_empty());
        assert_eq!(transport.request_count(), 0);
    }

    #[test]
    fn request_path_and_query_match_provider_contract() {
        let (api, transport) = scripted_client(
            "https://www.ebi.ac.uk",
            fast_policy(1),
            vec![ok_json(&article(12345))],
        );
        let client = EuropePmcClient::with_client(api, 1);
        client.fetch_publications(&[12345]);

        let seen = transport.seen.lock().unwrap();
        assert_eq!(
            seen[0].url,
            "https://www.ebi.ac.uk/europepmc/webservices/rest/article/MED/12345"
        );
        assert!(seen[0]
            .query
            .contains(&("resultType".to_string(), "core".to_string())));
    }

    #[test]
    fn provider_field_names_survive_serialization() {
        let record: PublicationRecord = serde_json::from_str(
            r#"{"pmid":"1","authorString":"Doe J.","journalInfo":{"journal":{"title":"J"}}}"#,
        )
        .unwrap();
        let out = serde_json::to_value(&record).unwrap();
        assert_eq!(out["authorString"], "Doe J.");
        assert_eq!(out["journalInfo"]["journal"]["title"], "J");
    }
}
