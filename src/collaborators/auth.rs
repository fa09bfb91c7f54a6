//! Authentication escalation.
//!
//! When a fetch reports [`CrawlError::AuthenticationRequired`] the worker
//! asks the [`AuthProvider`] for session artifacts once. Successful artifacts
//! are stored in the run's [`AuthSession`] and sent with every later fetch.

use async_trait::async_trait;
use log::info;
use parking_lot::RwLock;

use crate::canonical_url::CanonicalUrl;
use crate::crawl_engine::crawl_types::{CrawlError, CrawlResult};

/// Credentials produced by an auth flow, replayed as request headers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionArtifacts {
    pub headers: Vec<(String, String)>,
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Obtain session artifacts for `url`, which answered with `challenge_type`.
    async fn authenticate(
        &self,
        url: &CanonicalUrl,
        challenge_type: &str,
    ) -> CrawlResult<SessionArtifacts>;
}

/// Provider that hands out a fixed set of headers, e.g. a bearer token.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialProvider {
    headers: Vec<(String, String)>,
}

impl StaticCredentialProvider {
    #[must_use]
    pub fn new(headers: Vec<(String, String)>) -> Self {
        Self { headers }
    }

    #[must_use]
    pub fn bearer(token: impl AsRef<str>) -> Self {
        Self::new(vec![(
            "Authorization".to_string(),
            format!("Bearer {}", token.as_ref()),
        )])
    }
}

#[async_trait]
impl AuthProvider for StaticCredentialProvider {
    async fn authenticate(
        &self,
        url: &CanonicalUrl,
        challenge_type: &str,
    ) -> CrawlResult<SessionArtifacts> {
        if self.headers.is_empty() {
            return Err(CrawlError::AuthenticationRequired {
                url: url.to_string(),
                challenge_type: challenge_type.to_string(),
            });
        }
        Ok(SessionArtifacts {
            headers: self.headers.clone(),
        })
    }
}

/// Session headers shared by every worker of a run
#[derive(Debug, Default)]
pub struct AuthSession {
    headers: RwLock<Vec<(String, String)>>,
}

impl AuthSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge artifacts in, replacing headers with the same name.
    pub fn install(&self, artifacts: SessionArtifacts) {
        let mut headers = self.headers.write();
        for (name, value) in artifacts.headers {
            headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
            headers.push((name, value));
        }
        info!(target: "goalscrape::auth", "session installed ({} headers)", headers.len());
    }

    #[must_use]
    pub fn headers(&self) -> Vec<(String, String)> {
        self.headers.read().clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        !self.headers.read().is_empty()
    }
}
