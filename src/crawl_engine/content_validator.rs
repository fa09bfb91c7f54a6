//! HTTP status validation for fetched pages
//!
//! Status codes decide whether a response is usable, retryable, needs
//! credentials, or is a permanent failure. Page bodies are never inspected.

use log::{debug, warn};

use super::crawl_types::{CrawlError, CrawlResult, FailureKind};

/// Result of content validation
#[derive(Debug, Clone)]
pub struct ContentValidationResult {
    /// Whether the content passed validation
    pub is_valid: bool,
    /// Reason for validation failure (if any)
    pub reason: Option<String>,
    pub status: Option<u16>,
    /// How the failure should be handled, when invalid
    pub failure: Option<FailureKind>,
}

impl ContentValidationResult {
    #[must_use]
    pub fn valid(status: Option<u16>) -> Self {
        Self {
            is_valid: true,
            reason: None,
            status,
            failure: None,
        }
    }

    #[must_use]
    pub fn invalid(reason: String, status: u16, failure: FailureKind) -> Self {
        Self {
            is_valid: false,
            reason: Some(reason),
            status: Some(status),
            failure: Some(failure),
        }
    }

    /// Map an invalid result onto the crawl error taxonomy.
    ///
    /// `challenge` names the auth scheme announced by the server, if any.
    ///
    /// # Errors
    ///
    /// `AuthenticationRequired` for 401/407, `FetchTransient` for retryable
    /// statuses, `FetchFatal` for everything else that failed validation.
    pub fn into_result(self, url: &str, challenge: Option<&str>) -> CrawlResult<()> {
        if self.is_valid {
            return Ok(());
        }
        let reason = self.reason.unwrap_or_else(|| "invalid response".to_string());
        match self.failure {
            Some(FailureKind::Auth) => Err(CrawlError::AuthenticationRequired {
                url: url.to_string(),
                challenge_type: challenge.unwrap_or("unknown").to_string(),
            }),
            Some(kind) if kind.is_retryable() => Err(CrawlError::FetchTransient {
                url: url.to_string(),
                reason,
                status: self.status,
            }),
            _ => Err(CrawlError::FetchFatal {
                url: url.to_string(),
                reason,
                status: self.status,
            }),
        }
    }
}

/// Validate a page based on its HTTP status code
///
/// 4xx/5xx are invalid; everything else is accepted.
#[must_use]
pub fn validate_page_content(url: &str, http_status: Option<u16>) -> ContentValidationResult {
    let Some(status) = http_status else {
        debug!(target: "goalscrape::validator", "No HTTP status for {url}, assuming valid");
        return ContentValidationResult::valid(None);
    };

    match FailureKind::from_status(status) {
        Some(kind) => {
            warn!(target: "goalscrape::validator", "HTTP error status {status} for {url}");
            ContentValidationResult::invalid(format!("HTTP error: {status}"), status, kind)
        }
        None => {
            debug!(target: "goalscrape::validator", "HTTP {status} OK for {url}");
            ContentValidationResult::valid(Some(status))
        }
    }
}
