//! Minimal HTTP client for fetching sitemaps and pages, with safe logging.
//!
//! - Request options: extra headers and a per-request timeout
//! - Plain GET helpers returning raw bytes or decoded text
//! - Non-2xx responses become [`HttpError::Status`] with a body snippet
//! - Optional *raw* response logging via `GLEANER_HTTP_RAW=1`
//!
//! Each request is sent once; failures go straight back to the caller.
//!
//! Example (no_run):
//! ```rust
//! # async fn demo() -> Result<(), gleaner_http::HttpError> {
//! let client = gleaner_http::HttpClient::new()?;
//! let xml = client
//!     .get_bytes("https://example.com/sitemap.xml", gleaner_http::RequestOpts::default())
//!     .await?;
//! # Ok(()) }
//! ```
//!
//! Observability: structured `tracing` events are emitted for request start,
//! response headers, body snippets (truncated), and final errors. Raw bodies
//! go to target `http.raw` when `GLEANER_HTTP_RAW=1`.

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Response, StatusCode, Url};
use std::env;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;

// ==============================
// Raw logging toggles
// ==============================

const RAW_ENV: &str = "GLEANER_HTTP_RAW";
const RAW_MAX_BODY: usize = 64 * 1024;
const SNIPPET_MAX: usize = 500;

pub const DEFAULT_USER_AGENT: &str = concat!("gleaner/", env!("CARGO_PKG_VERSION"));

static REQUEST_SEQ: AtomicU64 = AtomicU64::new(1);

fn raw_enabled() -> bool {
    matches!(
        env::var(RAW_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

fn next_request_id() -> String {
    format!("r{}", REQUEST_SEQ.fetch_add(1, Ordering::Relaxed))
}

// ==============================
// Errors
// ==============================

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("server returned {status} for {url}: {body_snippet}")]
    Status {
        status: StatusCode,
        url: String,
        body_snippet: String,
    },
}

impl HttpError {
    /// HTTP status for [`HttpError::Status`], `None` for transport failures.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            HttpError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// ==============================
// Request Options
// ==============================

/// Per-request tuning knobs for the HTTP client.
///
/// ```
/// use gleaner_http::RequestOpts;
/// use std::time::Duration;
///
/// let opts = RequestOpts {
///     timeout: Some(Duration::from_secs(30)),
///     ..Default::default()
/// };
///
/// assert_eq!(opts.timeout.unwrap().as_secs(), 30);
/// assert!(opts.headers.is_none());
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestOpts {
    pub timeout: Option<Duration>,
    pub headers: Option<HeaderMap>,
}

// ==============================
// Client
// ==============================

#[derive(Clone, Debug)]
pub struct HttpClient {
    inner: Client,
    pub default_timeout: Duration,
    pub user_agent: String,
}

impl HttpClient {
    /// Construct a client with the default user agent and a 15s timeout.
    ///
    /// ```no_run
    /// use gleaner_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new()?;
    /// assert_eq!(client.default_timeout, Duration::from_secs(15));
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new() -> Result<Self, HttpError> {
        Self::with_user_agent(DEFAULT_USER_AGENT)
    }

    /// Construct a client that sends `user_agent` on every request.
    pub fn with_user_agent(user_agent: &str) -> Result<Self, HttpError> {
        let ua = HeaderValue::from_str(user_agent)
            .map_err(|e| HttpError::Build(format!("invalid user agent: {e}")))?;
        let mut defaults = HeaderMap::new();
        defaults.insert(USER_AGENT, ua);

        let inner = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .default_headers(defaults)
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            inner,
            default_timeout: Duration::from_secs(15),
            user_agent: user_agent.to_string(),
        })
    }

    /// Override the default timeout returned by [`HttpClient::new`].
    ///
    /// ```no_run
    /// use gleaner_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new()?.with_timeout(Duration::from_secs(2));
    /// assert_eq!(client.default_timeout, Duration::from_secs(2));
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.default_timeout = dur;
        self
    }

    /// GET `url` and return the raw body bytes.
    pub async fn get_bytes(&self, url: &str, opts: RequestOpts) -> Result<Vec<u8>, HttpError> {
        let (req_id, resp) = self.send_get(url, opts).await?;
        let bytes = resp.bytes().await.map_err(|e| {
            tracing::warn!(req_id=%req_id, message=%e, "http.network_error.body");
            HttpError::Network(e.to_string())
        })?;
        log_body(&req_id, &bytes);
        Ok(bytes.to_vec())
    }

    /// GET `url` and return the body decoded as text.
    ///
    /// The charset comes from the `Content-Type` header, falling back to UTF-8.
    pub async fn get_text(&self, url: &str, opts: RequestOpts) -> Result<String, HttpError> {
        let (req_id, resp) = self.send_get(url, opts).await?;
        let text = resp.text().await.map_err(|e| {
            tracing::warn!(req_id=%req_id, message=%e, "http.decode_error.text");
            HttpError::Decode(e.to_string())
        })?;
        log_body(&req_id, text.as_bytes());
        Ok(text)
    }

    // ==============================
    // Core request implementation
    // ==============================

    async fn send_get(&self, url: &str, opts: RequestOpts) -> Result<(String, Response), HttpError> {
        let url = Url::parse(url).map_err(|e| HttpError::Url(format!("{url}: {e}")))?;
        let timeout = opts.timeout.unwrap_or(self.default_timeout);

        let mut rb = self.inner.get(url.clone()).timeout(timeout);
        if let Some(hdrs) = opts.headers {
            rb = rb.headers(hdrs);
        }

        let req_id = next_request_id();
        tracing::debug!(
            req_id=%req_id,
            method="GET",
            host_path=%format!("{}{}", url.host_str().unwrap_or("-"), url.path()),
            timeout_ms=timeout.as_millis() as u64,
            "http.request.start"
        );

        let t0 = Instant::now();
        let resp = rb.send().await.map_err(|e| {
            tracing::warn!(req_id=%req_id, url=%url, message=%e, "http.network_error.send");
            HttpError::Network(e.to_string())
        })?;
        let status = resp.status();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-")
            .to_string();

        tracing::debug!(
            req_id=%req_id,
            %status,
            duration_ms=t0.elapsed().as_millis() as u64,
            content_type=%content_type,
            content_length=?resp.content_length(),
            "http.response.headers"
        );

        if status.is_success() {
            return Ok((req_id, resp));
        }

        let body = resp.bytes().await.unwrap_or_default();
        let body_snippet = snip_body(&body);
        tracing::warn!(
            req_id=%req_id,
            %status,
            url=%url,
            body_snippet=%body_snippet,
            "http.error"
        );
        Err(HttpError::Status {
            status,
            url: url.to_string(),
            body_snippet,
        })
    }
}

// ==============================
// Helpers
// ==============================

fn log_body(req_id: &str, body: &[u8]) {
    tracing::trace!(
        req_id=%req_id,
        body_len=body.len(),
        body_snippet=%snip_body(body),
        "http.response.body_snippet"
    );

    if raw_enabled() {
        let truncated = body.len() > RAW_MAX_BODY;
        let shown = &body[..body.len().min(RAW_MAX_BODY)];
        tracing::info!(
            target: "http.raw",
            %req_id,
            body=%String::from_utf8_lossy(shown),
            truncated
        );
    }
}

fn snip_body(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    match text.char_indices().nth(SNIPPET_MAX) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.into_owned(),
    }
}
