//! Provider clients for the grant-impact ETL
//!
//! One module per external data provider. Each client wraps a
//! [`grantline_core::ApiClient`] with that provider's request shaping:
//! pagination, batching, identifier filters, and auth headers. Record types
//! live next to the client that produces them and keep unrecognized provider
//! fields in a flattened map so nothing is lost on the way to JSONL.

pub mod europepmc;
pub mod github;
pub mod icite;
pub mod nih_reporter;
pub mod openalex;

pub use europepmc::{EuropePmcClient, PublicationRecord};
pub use github::{GitHubClient, GitHubRepo};
pub use icite::{CitationLink, IciteClient, IciteRecord};
pub use nih_reporter::{NihReporterClient, ProjectRecord, PublicationLinkRecord};
pub use openalex::{OpenAlexClient, OpenAlexWork};
