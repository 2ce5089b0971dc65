//! SQL view generation over the JSONL stage outputs
//!
//! Every table gets an explicit (column, type) contract so view creation
//! never depends on JSON type inference, and the projection renames
//! provider fields into the published table schemas (`relative_citation_ratio`
//! → `rcr`, `stargazers_count` → `stars`, nested structs flattened).
//! An optional source file that was never written materializes as an empty
//! relation of the same shape.

use std::path::Path;

/// Materialized table names, in creation order.
pub const TABLE_NAMES: [&str; 9] = [
    "projects",
    "publication_links",
    "publications",
    "icite",
    "citation_links",
    "citing_icite",
    "openalex",
    "citing_openalex",
    "github_repos",
];

type Columns = &'static [(&'static str, &'static str)];

struct TableSpec {
    name: &'static str,
    file: &'static str,
    /// Required sources always read the file (a missing one is an error at
    /// materialization); optional sources fall back to an empty relation.
    required: bool,
    columns: Columns,
    select: &'static str,
}

const PROJECT_COLS: Columns = &[
    ("appl_id", "BIGINT"),
    ("project_num", "VARCHAR"),
    ("core_project_num", "VARCHAR"),
    ("project_title", "VARCHAR"),
    ("fiscal_year", "BIGINT"),
    ("award_amount", "BIGINT"),
    ("direct_cost_amt", "BIGINT"),
    ("indirect_cost_amt", "BIGINT"),
    ("activity_code", "VARCHAR"),
    ("funding_mechanism", "VARCHAR"),
    ("agency_code", "VARCHAR"),
    ("is_active", "BOOLEAN"),
    ("is_new", "BOOLEAN"),
    ("contact_pi_name", "VARCHAR"),
    (
        "organization",
        "STRUCT(org_name VARCHAR, org_city VARCHAR, org_state VARCHAR, org_country VARCHAR)",
    ),
    ("project_start_date", "VARCHAR"),
    ("project_end_date", "VARCHAR"),
    ("budget_start", "VARCHAR"),
    ("budget_end", "VARCHAR"),
    ("award_notice_date", "VARCHAR"),
    ("pref_terms", "VARCHAR"),
    ("abstract_text", "VARCHAR"),
];

const PROJECT_SELECT: &str = "\
    appl_id, project_num, core_project_num, project_title, fiscal_year, award_amount, \
    direct_cost_amt, indirect_cost_amt, activity_code, funding_mechanism, agency_code, \
    is_active, is_new, contact_pi_name, \
    organization.org_name AS org_name, organization.org_city AS org_city, \
    organization.org_state AS org_state, organization.org_country AS org_country, \
    project_start_date, project_end_date, budget_start, budget_end, \
    award_notice_date, pref_terms, abstract_text";

const PUBLICATION_LINK_COLS: Columns = &[
    ("coreproject", "VARCHAR"),
    ("pmid", "BIGINT"),
    ("applid", "BIGINT"),
];

const PUBLICATION_LINK_SELECT: &str =
    "coreproject AS core_project_num, pmid, applid AS appl_id";

const PUBLICATION_COLS: Columns = &[
    ("pmid", "VARCHAR"),
    ("doi", "VARCHAR"),
    ("pmcid", "VARCHAR"),
    ("title", "VARCHAR"),
    ("authorString", "VARCHAR"),
    ("pubYear", "VARCHAR"),
    (
        "journalInfo",
        "STRUCT(journal STRUCT(title VARCHAR, isoabbreviation VARCHAR))",
    ),
    ("citedByCount", "BIGINT"),
    ("isOpenAccess", "VARCHAR"),
    ("language", "VARCHAR"),
    ("pubModel", "VARCHAR"),
    ("source", "VARCHAR"),
    ("abstractText", "VARCHAR"),
    ("firstPublicationDate", "VARCHAR"),
];

const PUBLICATION_SELECT: &str = "\
    try_cast(pmid AS BIGINT) AS pmid, doi, pmcid, title, \
    authorString AS author_string, pubYear AS pub_year, \
    journalInfo.journal.title AS journal_title, \
    journalInfo.journal.isoabbreviation AS journal_abbrev, \
    citedByCount AS cited_by_count, isOpenAccess AS is_open_access, \
    language, pubModel AS pub_model, source, \
    abstractText AS abstract_text, firstPublicationDate AS first_publication_date";

const ICITE_COLS: Columns = &[
    ("pmid", "BIGINT"),
    ("title", "VARCHAR"),
    ("doi", "VARCHAR"),
    ("year", "BIGINT"),
    ("journal", "VARCHAR"),
    ("citation_count", "BIGINT"),
    ("citations_per_year", "DOUBLE"),
    ("relative_citation_ratio", "DOUBLE"),
    ("expected_citations_per_year", "DOUBLE"),
    ("field_citation_rate", "DOUBLE"),
    ("nih_percentile", "DOUBLE"),
    ("is_research_article", "BOOLEAN"),
    ("is_clinical", "BOOLEAN"),
    ("provisional", "BOOLEAN"),
    ("cited_by", "BIGINT[]"),
    ("references", "BIGINT[]"),
];

const ICITE_SELECT: &str = "\
    pmid, title, doi, year, journal, citation_count, citations_per_year, \
    relative_citation_ratio AS rcr, expected_citations_per_year, \
    field_citation_rate, nih_percentile, is_research_article, is_clinical, \
    provisional, cited_by, \"references\", \
    len(cited_by) AS cited_by_count, len(\"references\") AS reference_count";

const CITATION_LINK_COLS: Columns = &[("cited_pmid", "BIGINT"), ("citing_pmid", "BIGINT")];

const CITATION_LINK_SELECT: &str = "cited_pmid, citing_pmid";

const OPENALEX_COLS: Columns = &[
    ("id", "VARCHAR"),
    ("doi", "VARCHAR"),
    ("title", "VARCHAR"),
    ("display_name", "VARCHAR"),
    ("publication_year", "BIGINT"),
    ("publication_date", "VARCHAR"),
    ("ids", "STRUCT(pmid VARCHAR)"),
    ("type", "VARCHAR"),
    ("language", "VARCHAR"),
    ("primary_location", "STRUCT(source STRUCT(display_name VARCHAR))"),
    ("open_access", "STRUCT(is_oa BOOLEAN, oa_status VARCHAR)"),
    ("authorships", "JSON"),
    ("cited_by_count", "BIGINT"),
    ("fwci", "DOUBLE"),
    (
        "biblio",
        "STRUCT(volume VARCHAR, issue VARCHAR, first_page VARCHAR, last_page VARCHAR)",
    ),
    ("is_retracted", "BOOLEAN"),
    ("referenced_works_count", "BIGINT"),
    (
        "primary_topic",
        "STRUCT(display_name VARCHAR, subfield STRUCT(display_name VARCHAR))",
    ),
    ("topics", "JSON"),
    ("mesh", "JSON"),
];

const OPENALEX_SELECT: &str = "\
    id AS openalex_id, doi, title, display_name, publication_year, publication_date, \
    ids.pmid AS pmid_url, \
    try_cast(regexp_extract(ids.pmid, '([0-9]+)$', 1) AS BIGINT) AS pmid, \
    \"type\", language, \
    primary_location.source.display_name AS primary_source, \
    open_access.is_oa AS is_oa, open_access.oa_status AS oa_status, \
    cited_by_count, fwci, \
    biblio.volume AS volume, biblio.issue AS issue, \
    biblio.first_page AS first_page, biblio.last_page AS last_page, \
    is_retracted, referenced_works_count, \
    primary_topic.display_name AS primary_topic, \
    primary_topic.subfield.display_name AS primary_subfield, \
    json_array_length(authorships) AS author_count, \
    json_array_length(topics) AS topic_count, \
    json_array_length(mesh) AS mesh_count";

const GITHUB_COLS: Columns = &[
    ("id", "BIGINT"),
    ("name", "VARCHAR"),
    ("full_name", "VARCHAR"),
    ("html_url", "VARCHAR"),
    ("description", "VARCHAR"),
    ("topics", "VARCHAR[]"),
    ("core_project_ids", "VARCHAR[]"),
    ("language", "VARCHAR"),
    ("stargazers_count", "BIGINT"),
    ("forks_count", "BIGINT"),
    ("open_issues_count", "BIGINT"),
    ("owner", "STRUCT(login VARCHAR, \"type\" VARCHAR)"),
    ("license", "STRUCT(name VARCHAR)"),
    ("created_at", "VARCHAR"),
    ("updated_at", "VARCHAR"),
    ("pushed_at", "VARCHAR"),
    ("private", "BOOLEAN"),
    ("fork", "BOOLEAN"),
    ("archived", "BOOLEAN"),
];

const GITHUB_SELECT: &str = "\
    id AS repo_id, name, full_name, html_url, description, topics, core_project_ids, \
    language, stargazers_count AS stars, forks_count AS forks, \
    open_issues_count AS open_issues, \
    owner.login AS owner_login, owner.\"type\" AS owner_type, \
    license.name AS license_name, \
    created_at, updated_at, pushed_at, \
    private AS is_private, fork AS is_fork, archived AS is_archived";

const SPECS: [TableSpec; 9] = [
    TableSpec {
        name: "projects",
        file: "projects.jsonl",
        required: true,
        columns: PROJECT_COLS,
        select: PROJECT_SELECT,
    },
    TableSpec {
        name: "publication_links",
        file: "publication_links.jsonl",
        required: true,
        columns: PUBLICATION_LINK_COLS,
        select: PUBLICATION_LINK_SELECT,
    },
    TableSpec {
        name: "publications",
        file: "publications.jsonl",
        required: false,
        columns: PUBLICATION_COLS,
        select: PUBLICATION_SELECT,
    },
    TableSpec {
        name: "icite",
        file: "icite.jsonl",
        required: false,
        columns: ICITE_COLS,
        select: ICITE_SELECT,
    },
    TableSpec {
        name: "citation_links",
        file: "citation_links.jsonl",
        required: false,
        columns: CITATION_LINK_COLS,
        select: CITATION_LINK_SELECT,
    },
    TableSpec {
        name: "citing_icite",
        file: "citing_icite.jsonl",
        required: false,
        columns: ICITE_COLS,
        select: ICITE_SELECT,
    },
    TableSpec {
        name: "openalex",
        file: "openalex.jsonl",
        required: false,
        columns: OPENALEX_COLS,
        select: OPENALEX_SELECT,
    },
    TableSpec {
        name: "citing_openalex",
        file: "citing_openalex.jsonl",
        required: false,
        columns: OPENALEX_COLS,
        select: OPENALEX_SELECT,
    },
    TableSpec {
        name: "github_repos",
        file: "github_core.jsonl",
        required: true,
        columns: GITHUB_COLS,
        select: GITHUB_SELECT,
    },
];

/// DuckDB `columns={...}` literal for a typed JSONL read.
fn columns_literal(cols: Columns) -> String {
    let fields: Vec<String> = cols
        .iter()
        .map(|(name, ty)| format!("'{name}': '{ty}'"))
        .collect();
    format!("{{{}}}", fields.join(", "))
}

/// Zero-row relation with the same typed columns, for absent optional files.
fn empty_projection(cols: Columns) -> String {
    cols.iter()
        .map(|(name, ty)| format!("NULL::{ty} AS \"{name}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

fn view_sql(spec: &TableSpec, data_dir: &Path) -> String {
    let path = data_dir.join(spec.file);
    let read_source = || {
        format!(
            "read_json('{}', format='newline_delimited', columns={})",
            path.display(),
            columns_literal(spec.columns)
        )
    };
    let empty_source = || format!("(SELECT {} WHERE false)", empty_projection(spec.columns));

    // A present-but-empty file is a legitimate zero-row stage; a missing
    // required file must surface the real read error at materialization.
    let source = match std::fs::metadata(&path) {
        Ok(meta) if meta.len() > 0 => read_source(),
        Ok(_) => empty_source(),
        Err(_) if spec.required => read_source(),
        Err(_) => empty_source(),
    };
    format!(
        "CREATE OR REPLACE VIEW {} AS SELECT {} FROM {source}",
        spec.name, spec.select
    )
}

/// One `CREATE OR REPLACE VIEW` statement per table, in [`TABLE_NAMES`] order.
pub fn create_views(data_dir: &Path) -> Vec<String> {
    SPECS.iter().map(|spec| view_sql(spec, data_dir)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_view_per_table_in_order() {
        let stmts = create_views(Path::new("/data"));
        assert_eq!(stmts.len(), TABLE_NAMES.len());
        for (stmt, name) in stmts.iter().zip(TABLE_NAMES) {
            assert!(stmt.starts_with(&format!("CREATE OR REPLACE VIEW {name} ")));
        }
    }

    #[test]
    fn required_views_always_read_their_file() {
        // No files exist under /nonexistent, but required sources still
        // reference read_json so materialization reports the real problem.
        let stmts = create_views(Path::new("/nonexistent"));
        assert!(stmts[0].contains("read_json('/nonexistent/projects.jsonl'"));
        assert!(stmts[8].contains("read_json('/nonexistent/github_core.jsonl'"));
    }

    #[test]
    fn missing_optional_file_falls_back_to_empty_relation() {
        let stmts = create_views(Path::new("/nonexistent"));
        let citing = stmts
            .iter()
            .find(|s| s.contains("VIEW citing_icite"))
            .unwrap();
        assert!(citing.contains("WHERE false"));
        assert!(citing.contains("NULL::BIGINT[] AS \"cited_by\""));
        assert!(!citing.contains("read_json"));
    }

    #[test]
    fn empty_file_becomes_empty_relation() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join("publication_links.jsonl"), "").unwrap();

        let stmts = create_views(tmp.path());
        let links = stmts
            .iter()
            .find(|s| s.contains("VIEW publication_links"))
            .unwrap();
        assert!(links.contains("WHERE false"));
    }

    #[test]
    fn existing_optional_file_is_read() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join("icite.jsonl"), "{\"pmid\":1}\n").unwrap();

        let stmts = create_views(tmp.path());
        let icite = stmts
            .iter()
            .find(|s| s.starts_with("CREATE OR REPLACE VIEW icite "))
            .unwrap();
        assert!(icite.contains("read_json"));
        assert!(icite.contains("format='newline_delimited'"));
    }

    #[test]
    fn published_renames_are_present() {
        let stmts = create_views(Path::new("/data"));
        let all = stmts.join("\n");
        assert!(all.contains("relative_citation_ratio AS rcr"));
        assert!(all.contains("stargazers_count AS stars"));
        assert!(all.contains("id AS repo_id"));
        assert!(all.contains("open_access.is_oa AS is_oa"));
        assert!(all.contains("coreproject AS core_project_num"));
    }

    #[test]
    fn columns_literal_quotes_names_and_types() {
        let literal = columns_literal(CITATION_LINK_COLS);
        assert_eq!(literal, "{'cited_pmid': 'BIGINT', 'citing_pmid': 'BIGINT'}");
    }
}
