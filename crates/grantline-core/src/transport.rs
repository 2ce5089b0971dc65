//! Rate-limited, retrying HTTP request layer
//!
//! Uses async reqwest internally through a shared tokio runtime, but presents
//! a sync interface to the provider clients. Each [`ApiClient`] owns its own
//! connection pool; only the runtime is shared process-wide.

use std::sync::LazyLock;
use std::time::Duration;

use crate::error::ApiError;
use crate::retry::RetryPolicy;
use crate::throttle::Throttle;

/// Per-request timeout (connect + read + body).
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Connect timeout for the underlying client.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared tokio runtime for HTTP operations.
pub static SHARED_RUNTIME: LazyLock<tokio::runtime::Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// One outgoing request, fully shaped before it reaches the transport.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
}

/// A response the transport actually received, whatever its status.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    /// Parsed `Retry-After` header, when the provider sent one.
    pub retry_after_secs: Option<u64>,
    pub body: String,
}

/// Executes one request. The production implementation is
/// [`ReqwestTransport`]; tests substitute a scripted fake.
///
/// Any received response comes back as `Ok`, including error statuses;
/// `Err` is reserved for connection-level failures.
pub trait HttpTransport: Send + Sync {
    fn execute(&self, req: &HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// reqwest-backed transport with its own connection pool.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .pool_max_idle_per_host(8)
            .build()
            .expect("failed to build HTTP client");
        Self { client }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTransport for ReqwestTransport {
    fn execute(&self, req: &HttpRequest) -> Result<HttpResponse, ApiError> {
        SHARED_RUNTIME.handle().block_on(async {
            let method = match req.method {
                Method::Get => reqwest::Method::GET,
                Method::Post => reqwest::Method::POST,
            };
            let mut builder = self.client.request(method, &req.url).timeout(req.timeout);
            if !req.query.is_empty() {
                builder = builder.query(&req.query);
            }
            for (name, value) in &req.headers {
                builder = builder.header(name, value);
            }
            if let Some(body) = &req.body {
                builder = builder.json(body);
            }

            let response = builder
                .send()
                .await
                .map_err(|e| ApiError::Transport(e.to_string()))?;

            let status = response.status().as_u16();
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok());
            let body = response
                .text()
                .await
                .map_err(|e| ApiError::Transport(e.to_string()))?;

            Ok(HttpResponse {
                status,
                retry_after_secs,
                body,
            })
        })
    }
}

/// Provider-facing request layer: base URL + throttle + retry policy over a
/// transport.
pub struct ApiClient {
    base_url: String,
    throttle: Option<Throttle>,
    policy: RetryPolicy,
    headers: Vec<(String, String)>,
    timeout: Duration,
    transport: Box<dyn HttpTransport>,
}

pub struct ApiClientBuilder {
    base_url: String,
    rate_limit: Option<f64>,
    policy: RetryPolicy,
    headers: Vec<(String, String)>,
    timeout: Duration,
    transport: Option<Box<dyn HttpTransport>>,
}

impl ApiClient {
    pub fn builder(base_url: impl Into<String>) -> ApiClientBuilder {
        ApiClientBuilder {
            base_url: base_url.into(),
            rate_limit: None,
            policy: RetryPolicy::default(),
            headers: Vec::new(),
            timeout: REQUEST_TIMEOUT,
            transport: None,
        }
    }

    /// Issue one request, throttled and retried per the client's policy.
    ///
    /// Retryable statuses (429/5xx, plus 403 when the policy says so) and
    /// transport failures are retried with exponential backoff until the
    /// attempt budget runs out; any other >= 400 status surfaces immediately.
    pub fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&serde_json::Value>,
    ) -> Result<HttpResponse, ApiError> {
        let req = HttpRequest {
            method,
            url: format!("{}{}", self.base_url, path),
            query: query.to_vec(),
            body: body.cloned(),
            headers: self.headers.clone(),
            timeout: self.timeout,
        };

        let mut attempt = 0u32;
        loop {
            if let Some(throttle) = &self.throttle {
                throttle.wait();
            }

            match self.transport.execute(&req) {
                Ok(resp) if self.policy.is_retryable(resp.status) => {
                    if self.policy.honor_retry_after
                        && matches!(resp.status, 429 | 403)
                    {
                        if let Some(secs) = resp.retry_after_secs {
                            log::info!(
                                "{} {path} rate limited, waiting {secs}s (Retry-After)",
                                method.as_str()
                            );
                            std::thread::sleep(Duration::from_secs(secs));
                        }
                    }
                    if attempt < self.policy.max_retries {
                        let wait = self.policy.backoff(attempt);
                        attempt += 1;
                        log::warn!(
                            "{} {path} returned {}, retrying in {:?} (attempt {attempt}/{})",
                            method.as_str(),
                            resp.status,
                            wait,
                            self.policy.max_retries
                        );
                        std::thread::sleep(wait);
                        continue;
                    }
                    return Err(ApiError::Status {
                        status: resp.status,
                        message: format!(
                            "giving up after {} retries",
                            self.policy.max_retries
                        ),
                    });
                }
                Ok(resp) if resp.status >= 400 => {
                    return Err(ApiError::Status {
                        status: resp.status,
                        message: snippet(&resp.body),
                    });
                }
                Ok(resp) => return Ok(resp),
                Err(ApiError::Transport(message)) if attempt < self.policy.max_retries => {
                    let wait = self.policy.backoff(attempt);
                    attempt += 1;
                    log::warn!(
                        "{} {path} failed ({message}), retrying in {:?} (attempt {attempt}/{})",
                        method.as_str(),
                        wait,
                        self.policy.max_retries
                    );
                    std::thread::sleep(wait);
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Convenience for GET-with-query, the common provider shape.
    pub fn get(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<HttpResponse, ApiError> {
        self.request(Method::Get, path, query, None)
    }

    /// Convenience for POST-with-JSON-body.
    pub fn post(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<HttpResponse, ApiError> {
        self.request(Method::Post, path, &[], Some(body))
    }
}

impl ApiClientBuilder {
    /// Throttle to at most `per_second` requests per second.
    pub fn rate_limit(mut self, per_second: f64) -> Self {
        self.rate_limit = Some(per_second);
        self
    }

    pub fn policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Substitute the transport; used by tests and offline tooling.
    pub fn transport(mut self, transport: Box<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> ApiClient {
        ApiClient {
            base_url: self.base_url,
            throttle: self.rate_limit.map(Throttle::new),
            policy: self.policy,
            headers: self.headers,
            timeout: self.timeout,
            transport: self
                .transport
                .unwrap_or_else(|| Box::new(ReqwestTransport::new())),
        }
    }
}

/// First line-ish of a response body, for error messages.
fn snippet(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.len() <= 200 {
        trimmed.to_string()
    } else {
        let mut end = 200;
        while !trimmed.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &trimmed[..end])
    }
}
