//! Crawl scope rules for discovered links.

use std::collections::HashSet;

use crate::canonical_url::CanonicalUrl;
use crate::config::CrawlConfig;

/// Whether `url` falls inside the configured crawl scope.
///
/// Same host as the base URL by default; subdomains and external hosts only
/// when enabled. An `allowed_domains` list and `excluded_patterns` globs
/// narrow the result further.
#[must_use]
pub fn should_visit_url(url: &CanonicalUrl, config: &CrawlConfig) -> bool {
    let url_host = url.host();
    let base_host = config.base_url().host();

    let host_allowed = url_host == base_host
        || config.allow_subdomains() && url_host.ends_with(&format!(".{base_host}"))
        || config.allow_external_domains();
    if !host_allowed {
        return false;
    }

    if let Some(allowed_domains) = config.allowed_domains()
        && !allowed_domains.is_empty()
    {
        let domain_matches = allowed_domains
            .iter()
            .any(|domain| url_host == domain || url_host.ends_with(&format!(".{domain}")));
        if !domain_matches {
            return false;
        }
    }

    !config
        .excluded_patterns_compiled()
        .iter()
        .any(|regex| regex.is_match(url.as_str()))
}

/// Host plus path, query dropped. Two URLs with the same signature are
/// treated as "similar".
#[must_use]
pub fn path_signature(url: &CanonicalUrl) -> String {
    format!("{}{}", url.host(), url.path().trim_end_matches('/'))
}

/// Opt-in filter that admits one URL per host+path signature.
#[derive(Debug, Default)]
pub struct SimilarPathFilter {
    enabled: bool,
    seen: HashSet<String>,
}

impl SimilarPathFilter {
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            seen: HashSet::new(),
        }
    }

    /// Record `url`; returns `false` if a similar URL was admitted before.
    ///
    /// Always `true` when disabled.
    pub fn admit(&mut self, url: &CanonicalUrl) -> bool {
        !self.enabled || self.seen.insert(path_signature(url))
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}
