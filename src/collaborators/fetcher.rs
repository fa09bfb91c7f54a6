//! Fetcher interface and the reqwest-backed reference implementation.

use std::error::Error as _;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, trace};
use reqwest::header::{HeaderMap, PROXY_AUTHENTICATE, WWW_AUTHENTICATE};

use crate::canonical_url::CanonicalUrl;
use crate::crawl_engine::content_validator::validate_page_content;
use crate::crawl_engine::crawl_types::{CrawlError, CrawlResult, FailureKind};
use crate::utils::{DEFAULT_REQUEST_TIMEOUT, DEFAULT_USER_AGENT};

/// Per-request options handed to a [`Fetcher`]
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Request JavaScript rendering. Fetchers without a renderer fall back
    /// to a static fetch.
    pub use_js: bool,
    pub timeout: Duration,
    pub headers: Vec<(String, String)>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            use_js: false,
            timeout: DEFAULT_REQUEST_TIMEOUT,
            headers: Vec::new(),
        }
    }
}

/// A successful fetch
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub html: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
}

/// Retrieves page HTML.
///
/// Implementations classify their own failures: retryable trouble as
/// [`CrawlError::FetchTransient`], permanent trouble as
/// [`CrawlError::FetchFatal`], credential demands as
/// [`CrawlError::AuthenticationRequired`].
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &CanonicalUrl, options: &FetchOptions) -> CrawlResult<FetchResponse>;
}

/// Static HTTP fetcher on a shared reqwest client
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    /// Build a fetcher with the default user agent and redirect policy.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::Config`] if the TLS backend cannot initialise.
    pub fn new() -> CrawlResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| CrawlError::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Wrap an existing client.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &CanonicalUrl, options: &FetchOptions) -> CrawlResult<FetchResponse> {
        if options.use_js {
            debug!(
                target: "goalscrape::fetcher",
                "JS rendering not available, fetching {url} statically"
            );
        }

        let mut request = self.client.get(url.as_str()).timeout(options.timeout);
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| classify_transport_error(url, &e))?;

        let status = response.status().as_u16();
        let challenge = auth_challenge(response.headers());
        validate_page_content(url.as_str(), Some(status))
            .into_result(url.as_str(), challenge.as_deref())?;

        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| {
                v.to_str()
                    .ok()
                    .map(|v| (k.as_str().to_string(), v.to_string()))
            })
            .collect();

        let html = response
            .text()
            .await
            .map_err(|e| classify_transport_error(url, &e))?;
        trace!(target: "goalscrape::fetcher", "{url}: {status}, {} bytes", html.len());

        Ok(FetchResponse {
            html,
            status,
            headers,
        })
    }
}

/// First token of `WWW-Authenticate` / `Proxy-Authenticate`, e.g. `Basic`.
fn auth_challenge(headers: &HeaderMap) -> Option<String> {
    headers
        .get(WWW_AUTHENTICATE)
        .or_else(|| headers.get(PROXY_AUTHENTICATE))
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split_whitespace().next())
        .map(|scheme| scheme.trim_end_matches(',').to_string())
}

/// Map a reqwest transport error onto the crawl taxonomy.
///
/// Name resolution failures are permanent; timeouts and connection trouble
/// are transient.
fn classify_transport_error(url: &CanonicalUrl, err: &reqwest::Error) -> CrawlError {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }

    let lower = message.to_lowercase();
    let dns_failure = lower.contains("dns")
        || lower.contains("failed to lookup")
        || lower.contains("name or service not known")
        || lower.contains("no such host");

    let status = err.status().map(|s| s.as_u16());
    if dns_failure || err.is_builder() || err.is_redirect() {
        return CrawlError::FetchFatal {
            url: url.to_string(),
            reason: message,
            status,
        };
    }

    if err.is_timeout() || err.is_connect() || FailureKind::classify_message(&lower).is_retryable()
    {
        return CrawlError::FetchTransient {
            url: url.to_string(),
            reason: message,
            status,
        };
    }

    CrawlError::FetchFatal {
        url: url.to_string(),
        reason: message,
        status,
    }
}
