//! Citation-graph expansion
//!
//! Pure derivation over already-fetched metric records: no I/O, no failure
//! modes beyond skipping records without a primary identifier.

use rustc_hash::FxHashSet;

use grantline_clients::{CitationLink, IciteRecord};

/// Result of expanding one round of citation metrics.
#[derive(Debug)]
pub struct Expansion {
    /// One edge per cited→citing pair, in record order. Duplicate edges
    /// across distinct cited records are preserved.
    pub links: Vec<CitationLink>,
    /// Citing PMIDs not in the seed set: sorted ascending, deduplicated.
    pub new_citing_pmids: Vec<i64>,
}

/// Derive citation edges and the new citing-identifier set.
///
/// A record without a PMID contributes nothing; a record without a
/// `cited_by` list contributes no edges.
pub fn expand_citations(records: &[IciteRecord], seed: &FxHashSet<i64>) -> Expansion {
    let mut links = Vec::new();
    let mut citing: FxHashSet<i64> = FxHashSet::default();

    for record in records {
        let Some(cited_pmid) = record.pmid else {
            continue;
        };
        for &citing_pmid in record.cited_by.as_deref().unwrap_or_default() {
            links.push(CitationLink {
                cited_pmid,
                citing_pmid,
            });
            citing.insert(citing_pmid);
        }
    }

    let mut new_citing_pmids: Vec<i64> = citing.difference(seed).copied().collect();
    new_citing_pmids.sort_unstable();

    Expansion {
        links,
        new_citing_pmids,
    }
}
