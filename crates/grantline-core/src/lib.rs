//! Grantline Core - Common infrastructure for the grant-impact ETL
//!
//! This crate provides the pieces every provider client shares: the
//! rate-limited retrying transport, retry policy, concurrency primitives,
//! the JSONL sink, and logging/progress setup.

pub mod error;
pub mod logging;
pub mod progress;
pub mod retry;
pub mod semaphore;
pub mod sink;
pub mod throttle;
pub mod transport;

// Re-exports for convenience
pub use error::ApiError;
pub use logging::init_logging;
pub use progress::ProgressContext;
pub use retry::RetryPolicy;
pub use semaphore::Semaphore;
pub use sink::JsonlWriter;
pub use throttle::Throttle;
pub use transport::{
    ApiClient, HttpRequest, HttpResponse, HttpTransport, Method, ReqwestTransport, SHARED_RUNTIME,
};
