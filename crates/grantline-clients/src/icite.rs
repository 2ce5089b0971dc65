//! iCite client — citation metrics in fixed-size PMID batches

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use grantline_core::ApiClient;

const ICITE_BASE: &str = "https://icite.od.nih.gov";
const BATCH_SIZE: usize = 200;

/// Per-publication citation metrics.
///
/// `cited_by` is the source of citation-graph expansion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IciteRecord {
    #[serde(default)]
    pub pmid: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub year: Option<i64>,
    #[serde(default)]
    pub citation_count: Option<i64>,
    #[serde(default)]
    pub citations_per_year: Option<f64>,
    #[serde(default)]
    pub relative_citation_ratio: Option<f64>,
    #[serde(default)]
    pub expected_citations_per_year: Option<f64>,
    #[serde(default)]
    pub field_citation_rate: Option<f64>,
    #[serde(default)]
    pub nih_percentile: Option<f64>,
    #[serde(default)]
    pub is_research_article: Option<bool>,
    #[serde(default)]
    pub is_clinical: Option<bool>,
    #[serde(default)]
    pub provisional: Option<bool>,
    #[serde(default)]
    pub cited_by: Option<Vec<i64>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Derived cited→citing edge; produced by graph expansion, never fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationLink {
    pub cited_pmid: i64,
    pub citing_pmid: i64,
}

#[derive(Debug, Deserialize)]
struct MetricsResponse {
    #[serde(default)]
    data: Vec<IciteRecord>,
}

pub struct IciteClient {
    api: ApiClient,
}

impl IciteClient {
    pub fn new() -> Self {
        Self::with_client(ApiClient::builder(ICITE_BASE).rate_limit(5.0).build())
    }

    pub fn with_client(api: ApiClient) -> Self {
        Self { api }
    }

    /// Metrics for all PMIDs, one request per 200-identifier chunk,
    /// results concatenated in chunk order.
    pub fn fetch_metrics(&self, pmids: &[i64]) -> Result<Vec<IciteRecord>> {
        let mut all = Vec::new();

        for (chunk_idx, chunk) in pmids.chunks(BATCH_SIZE).enumerate() {
            let joined = chunk
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join(",");
            let query = vec![
                ("pmids".to_string(), joined),
                ("format".to_string(), "json".to_string()),
            ];
            let resp = self
                .api
                .get("/api/pubs", &query)
                .context("iCite metrics request failed")?;
            let parsed: MetricsResponse =
                serde_json::from_str(&resp.body).context("invalid iCite response")?;

            all.extend(parsed.data);
            let start = chunk_idx * BATCH_SIZE;
            log::info!(
                "iCite: fetched {}/{} (batch {start}-{})",
                all.len(),
                pmids.len(),
                start + chunk.len()
            );
        }

        Ok(all)
    }
}

impl Default for IciteClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fast_policy, ok_json, scripted_client, status};

    fn metrics(pmids: &[i64]) -> String {
        let data: Vec<String> = pmids
            .iter()
            .map(|p| format!(r#"{{"pmid":{p},"citation_count":10,"cited_by":[{}]}}"#, p + 1))
            .collect();
        format!(r#"{{"data":[{}]}}"#, data.join(","))
    }

    #[test]
    fn small_input_is_one_batch() {
        let (api, transport) = scripted_client(
            "https://icite.od.nih.gov",
            fast_policy(2),
            vec![ok_json(&metrics(&[111, 222]))],
        );
        let client = IciteClient::with_client(api);

        let records = client.fetch_metrics(&[111, 222]).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(transport.request_count(), 1);

        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen[0].url, "https://icite.od.nih.gov/api/pubs");
        assert!(seen[0]
            .query
            .contains(&("pmids".to_string(), "111,222".to_string())));
    }

    #[test]
    fn input_is_chunked_at_two_hundred() {
        let pmids: Vec<i64> = (1..=450).collect();
        let (api, transport) = scripted_client(
            "https://icite.od.nih.gov",
            fast_policy(2),
            vec![
                ok_json(&metrics(&pmids[..200])),
                ok_json(&metrics(&pmids[200..400])),
                ok_json(&metrics(&pmids[400..])),
            ],
        );
        let client = IciteClient::with_client(api);

        let records = client.fetch_metrics(&pmids).unwrap();
        assert_eq!(records.len(), 450);
        assert_eq!(transport.request_count(), 3);

        // Chunk order preserved in concatenation.
        assert_eq!(records[0].pmid, Some(1));
        assert_eq!(records[199].pmid, Some(200));
        assert_eq!(records[200].pmid, Some(201));
        assert_eq!(records[449].pmid, Some(450));

        let seen = transport.seen.lock().unwrap();
        let third_chunk: Vec<String> = (401..=450).map(|p| p.to_string()).collect();
        assert!(seen[2]
            .query
            .contains(&("pmids".to_string(), third_chunk.join(","))));
    }

    #[test]
    fn empty_input_issues_no_requests() {
        let (api, transport) =
            scripted_client("https://icite.od.nih.gov", fast_policy(2), vec![]);
        let client = IciteClient::with_client(api);

        assert!(client.fetch_metrics(&[]).unwrap().is_empty());
        assert_eq!(transport.request_count(), 0);
    }

    #[test]
    fn chunk_failure_fails_the_fetch() {
        let (api, _) = scripted_client(
            "https://icite.od.nih.gov",
            fast_policy(1),
            vec![status(503), status(503)],
        );
        let client = IciteClient::with_client(api);

        assert!(client.fetch_metrics(&[111]).is_err());
    }

    #[test]
    fn cited_by_deserializes_as_typed_list() {
        let record: IciteRecord = serde_json::from_str(
            r#"{"pmid":111,"cited_by":[222,333],"relative_citation_ratio":1.5,"journal":"Nature"}"#,
        )
        .unwrap();
        assert_eq!(record.cited_by, Some(vec![222, 333]));
        assert_eq!(record.relative_citation_ratio, Some(1.5));
        assert_eq!(record.extra["journal"], "Nature");
    }
}
