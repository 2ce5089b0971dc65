//! Pipeline orchestration — ten fixed stages, strictly sequential
//!
//! Each stage fetches to completion and hands its whole result list to the
//! sink before the next stage starts; later stages consume earlier stages'
//! identifier sets. A stage-level client failure aborts the run with the
//! stage named in the error; outputs already on disk stay there.

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use rustc_hash::FxHashSet;

use grantline_clients::{
    EuropePmcClient, GitHubClient, IciteClient, NihReporterClient, OpenAlexClient,
};
use grantline_core::{JsonlWriter, ProgressContext};

use crate::collection::CollectionConfig;
use crate::expand::expand_citations;

/// Owns the five provider clients for the duration of one run.
///
/// Client shutdown is structural: every client (and its connection pool)
/// drops exactly once when the pipeline does, on success and failure alike.
pub struct Pipeline {
    nih: NihReporterClient,
    europepmc: EuropePmcClient,
    icite: IciteClient,
    openalex: OpenAlexClient,
    github: GitHubClient,
}

/// Per-stage record counts for one completed run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub projects: usize,
    pub publication_links: usize,
    pub publications: usize,
    pub icite: usize,
    pub citation_links: usize,
    pub citing_icite: usize,
    pub openalex: usize,
    pub citing_openalex: usize,
    pub github_repos: usize,
    pub elapsed: Duration,
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            nih: NihReporterClient::new(),
            europepmc: EuropePmcClient::new(),
            icite: IciteClient::new(),
            openalex: OpenAlexClient::new(),
            github: GitHubClient::new(),
        }
    }

    /// Assemble from pre-built clients; used by tests and offline tooling.
    pub fn with_clients(
        nih: NihReporterClient,
        europepmc: EuropePmcClient,
        icite: IciteClient,
        openalex: OpenAlexClient,
        github: GitHubClient,
    ) -> Self {
        Self {
            nih,
            europepmc,
            icite,
            openalex,
            github,
        }
    }

    /// Run the full collection into `output_dir`.
    pub fn run(
        &self,
        collection: &CollectionConfig,
        output_dir: &Path,
        progress: &ProgressContext,
    ) -> Result<RunSummary> {
        let start = Instant::now();
        let core_nums = collection.normalized_project_numbers();
        log::info!(
            "starting ETL for {} core project(s): {core_nums:?}",
            core_nums.len()
        );

        let writer = JsonlWriter::new(output_dir).context("failed to create output directory")?;
        let mut summary = RunSummary::default();
        let stage = progress.stage_line("pipeline");

        // Stage 1: project records
        stage.set_message("1/10 project records");
        log::info!("step 1/10: fetching project records from NIH RePORTER");
        let projects = self
            .nih
            .search_projects(&core_nums)
            .context("step 1/10: project search failed")?;
        let path = writer.write("projects.jsonl", &projects)?;
        log::info!("wrote {} project records to {}", projects.len(), path.display());
        summary.projects = projects.len();

        // Stage 2: publication links
        stage.set_message("2/10 publication links");
        log::info!("step 2/10: fetching publication links from NIH RePORTER");
        let pub_links = self
            .nih
            .search_publications(&core_nums)
            .context("step 2/10: publication link search failed")?;
        let path = writer.write("publication_links.jsonl", &pub_links)?;
        log::info!(
            "wrote {} publication link records to {}",
            pub_links.len(),
            path.display()
        );
        summary.publication_links = pub_links.len();

        // Stage 3: unique PMIDs (links without a PMID are excluded)
        let pmid_set: std::collections::BTreeSet<i64> =
            pub_links.iter().filter_map(|link| link.pmid).collect();
        let pmids: Vec<i64> = pmid_set.into_iter().collect();
        log::info!("step 3/10: extracted {} unique PMIDs", pmids.len());

        if pmids.is_empty() {
            log::warn!("no PMIDs found, skipping publication and citation fetches (steps 4-9)");
        } else {
            // Stage 4: publication metadata
            stage.set_message(format!("4/10 metadata for {} publications", pmids.len()));
            log::info!("step 4/10: fetching publication metadata from Europe PMC");
            let publications = self.europepmc.fetch_publications(&pmids);
            let path = writer.write("publications.jsonl", &publications)?;
            log::info!(
                "wrote {} publication records to {}",
                publications.len(),
                path.display()
            );
            summary.publications = publications.len();

            // Stage 5: citation metrics
            stage.set_message("5/10 citation metrics");
            log::info!("step 5/10: fetching citation metrics from iCite");
            let icite_records = self
                .icite
                .fetch_metrics(&pmids)
                .context("step 5/10: citation metric fetch failed")?;
            let path = writer.write("icite.jsonl", &icite_records)?;
            log::info!(
                "wrote {} iCite records to {}",
                icite_records.len(),
                path.display()
            );
            summary.icite = icite_records.len();

            // Stage 6: citation-graph expansion
            stage.set_message("6/10 citation graph");
            let seed: FxHashSet<i64> = pmids.iter().copied().collect();
            let expansion = expand_citations(&icite_records, &seed);
            let path = writer.write("citation_links.jsonl", &expansion.links)?;
            log::info!(
                "step 6/10: {} citation links, {} new citing PMIDs ({})",
                expansion.links.len(),
                expansion.new_citing_pmids.len(),
                path.display()
            );
            summary.citation_links = expansion.links.len();

            // Stage 7: metrics for citing publications
            if expansion.new_citing_pmids.is_empty() {
                log::info!("step 7/10: no new citing PMIDs to fetch");
            } else {
                stage.set_message(format!(
                    "7/10 metrics for {} citing publications",
                    expansion.new_citing_pmids.len()
                ));
                log::info!(
                    "step 7/10: fetching iCite records for {} citing publications",
                    expansion.new_citing_pmids.len()
                );
                let citing_icite = self
                    .icite
                    .fetch_metrics(&expansion.new_citing_pmids)
                    .context("step 7/10: citing citation metric fetch failed")?;
                let path = writer.write("citing_icite.jsonl", &citing_icite)?;
                log::info!(
                    "wrote {} citing iCite records to {}",
                    citing_icite.len(),
                    path.display()
                );
                summary.citing_icite = citing_icite.len();
            }

            // Stage 8: OpenAlex works for grant publications
            stage.set_message("8/10 OpenAlex works");
            log::info!(
                "step 8/10: fetching OpenAlex works for {} grant-associated PMIDs",
                pmids.len()
            );
            let works = self
                .openalex
                .fetch_works(&pmids)
                .context("step 8/10: OpenAlex work fetch failed")?;
            let path = writer.write("openalex.jsonl", &works)?;
            log::info!("wrote {} OpenAlex work records to {}", works.len(), path.display());
            summary.openalex = works.len();

            // Stage 9: OpenAlex works for citing publications
            if expansion.new_citing_pmids.is_empty() {
                log::info!("step 9/10: no new citing PMIDs to fetch from OpenAlex");
            } else {
                stage.set_message("9/10 OpenAlex works (citing)");
                log::info!(
                    "step 9/10: fetching OpenAlex works for {} citing PMIDs",
                    expansion.new_citing_pmids.len()
                );
                let citing_works = self
                    .openalex
                    .fetch_works(&expansion.new_citing_pmids)
                    .context("step 9/10: citing OpenAlex work fetch failed")?;
                let path = writer.write("citing_openalex.jsonl", &citing_works)?;
                log::info!(
                    "wrote {} citing OpenAlex work records to {}",
                    citing_works.len(),
                    path.display()
                );
                summary.citing_openalex = citing_works.len();
            }
        }

        // Stage 10: repository search (runs regardless of PMIDs)
        stage.set_message("10/10 repository search");
        log::info!("step 10/10: searching GitHub repos by project ID topics");
        let repos = self.github.fetch_repos(&core_nums);
        let path = writer.write("github_core.jsonl", &repos)?;
        log::info!("wrote {} GitHub repo records to {}", repos.len(), path.display());
        summary.github_repos = repos.len();

        stage.finish_and_clear();
        summary.elapsed = start.elapsed();

        log::info!("=== ETL Summary ===");
        log::info!(
            "projects: {}, publication links: {}, publications: {}",
            summary.projects,
            summary.publication_links,
            summary.publications
        );
        log::info!(
            "icite: {} (+{} citing), openalex: {} (+{} citing), citation links: {}",
            summary.icite,
            summary.citing_icite,
            summary.openalex,
            summary.citing_openalex,
            summary.citation_links
        );
        log::info!("github repos: {}", summary.github_repos);
        log::info!(
            "done in {:.1}s, output: {}",
            summary.elapsed.as_secs_f64(),
            output_dir.display()
        );

        Ok(summary)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}
