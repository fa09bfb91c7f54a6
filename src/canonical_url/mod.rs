//! Canonical URL type and the canonicalizer that produces it.
//!
//! Every URL that reaches the frontier or the visited ledger is a
//! [`CanonicalUrl`]; two strings that name the same resource collapse into a
//! single value so dedup can rely on plain equality.

use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use url::{form_urlencoded, Url};

use crate::crawl_engine::crawl_types::{CrawlError, CrawlResult};
use crate::utils::DEFAULT_TRACKING_PARAMS;

/// A URL in canonical form.
///
/// Cheap to clone (shared `Arc<Url>`), hashable, and only constructible
/// through [`Canonicalizer::canonicalize`].
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalUrl(Arc<Url>);

impl CanonicalUrl {
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    #[inline]
    #[must_use]
    pub fn as_url(&self) -> &Url {
        &self.0
    }

    /// Host portion, always present for http(s) URLs.
    #[must_use]
    pub fn host(&self) -> &str {
        self.0.host_str().unwrap_or_default()
    }

    #[must_use]
    pub fn path(&self) -> &str {
        self.0.path()
    }
}

impl fmt::Display for CanonicalUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for CanonicalUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CanonicalUrl({})", self.as_str())
    }
}

impl AsRef<str> for CanonicalUrl {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Serialize for CanonicalUrl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Turns raw or relative URL strings into [`CanonicalUrl`]s.
///
/// Rules applied, in order:
/// - relative references are resolved against the base
/// - only `http`/`https` URLs with a host are accepted
/// - scheme and host are lower-cased and default ports dropped (by `url`)
/// - the fragment is removed
/// - tracking parameters (deny-list plus any `utm_*`) are removed
/// - remaining query pairs are sorted by key, then value
///
/// The transform is pure and idempotent.
#[derive(Debug, Clone)]
pub struct Canonicalizer {
    tracking_params: HashSet<String>,
}

impl Default for Canonicalizer {
    fn default() -> Self {
        Self::new(DEFAULT_TRACKING_PARAMS.iter().copied())
    }
}

impl Canonicalizer {
    /// Build a canonicalizer with a custom tracking-parameter deny-list.
    ///
    /// Names are matched case-insensitively.
    pub fn new<I, S>(tracking_params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            tracking_params: tracking_params
                .into_iter()
                .map(|p| p.as_ref().to_ascii_lowercase())
                .collect(),
        }
    }

    /// Canonicalize `raw`, resolving it against `base` when it is relative.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::InvalidUrl`] for empty or unparsable input, a
    /// non-http(s) scheme, or a missing host.
    pub fn canonicalize(
        &self,
        raw: &str,
        base: Option<&CanonicalUrl>,
    ) -> CrawlResult<CanonicalUrl> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(invalid(raw, "empty URL"));
        }

        let parsed = match base {
            Some(base) => base.as_url().join(trimmed),
            None => Url::parse(trimmed),
        };
        let mut url = parsed.map_err(|e| invalid(raw, &e.to_string()))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(raw, &format!("unsupported scheme '{}'", url.scheme())));
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(invalid(raw, "missing host"));
        }

        url.set_fragment(None);
        self.rewrite_query(&mut url);

        Ok(CanonicalUrl(Arc::new(url)))
    }

    /// Whether `name` is stripped as a tracking parameter.
    #[must_use]
    pub fn is_tracking_param(&self, name: &str) -> bool {
        let lower = name.to_ascii_lowercase();
        lower.starts_with("utm_") || self.tracking_params.contains(&lower)
    }

    fn rewrite_query(&self, url: &mut Url) {
        if url.query().is_none() {
            return;
        }

        let mut pairs: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| !k.is_empty() && !self.is_tracking_param(k))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        if pairs.is_empty() {
            url.set_query(None);
            return;
        }

        pairs.sort();
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs.iter())
            .finish();
        url.set_query(Some(&query));
    }
}

fn invalid(raw: &str, reason: &str) -> CrawlError {
    CrawlError::InvalidUrl {
        url: raw.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canon(raw: &str) -> String {
        Canonicalizer::default()
            .canonicalize(raw, None)
            .map(|u| u.to_string())
            .unwrap_or_else(|e| panic!("{raw} should canonicalize: {e}"))
    }

    #[test]
    fn lowercases_scheme_and_host_and_drops_default_port() {
        assert_eq!(canon("HTTPS://Example.COM:443/Docs"), "https://example.com/Docs");
        assert_eq!(canon("http://example.com:80/"), "http://example.com/");
        assert_eq!(canon("http://example.com:8080/"), "http://example.com:8080/");
    }

    #[test]
    fn strips_fragment_and_tracking_params_and_sorts_query() {
        assert_eq!(
            canon("https://example.com/a?z=1&utm_source=x&a=2&fbclid=abc#section"),
            "https://example.com/a?a=2&z=1"
        );
        assert_eq!(canon("https://example.com/a?UTM_Medium=x"), "https://example.com/a");
        assert_eq!(canon("https://example.com/a?"), "https://example.com/a");
    }

    #[test]
    fn sorts_repeated_keys_by_value() {
        assert_eq!(canon("https://e.com/?b=2&a=9&b=1"), "https://e.com/?a=9&b=1&b=2");
    }

    #[test]
    fn resolves_relative_against_base() {
        let c = Canonicalizer::default();
        let base = c
            .canonicalize("https://example.com/docs/guide/", None)
            .expect("base parses");
        let joined = c
            .canonicalize("../api?x=1#frag", Some(&base))
            .expect("relative resolves");
        assert_eq!(joined.as_str(), "https://example.com/docs/api?x=1");
    }

    #[test]
    fn rejects_non_http_and_garbage() {
        let c = Canonicalizer::default();
        assert!(c.canonicalize("mailto:a@b.com", None).is_err());
        assert!(c.canonicalize("javascript:void(0)", None).is_err());
        assert!(c.canonicalize("   ", None).is_err());
        assert!(c.canonicalize("not a url", None).is_err());
        assert!(matches!(
            c.canonicalize("ftp://example.com/file", None),
            Err(CrawlError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn custom_deny_list_is_case_insensitive() {
        let c = Canonicalizer::new(["SessionId"]);
        let url = c
            .canonicalize("https://e.com/p?sessionid=1&keep=2", None)
            .expect("parses");
        assert_eq!(url.as_str(), "https://e.com/p?keep=2");
        assert!(c.is_tracking_param("utm_campaign"));
        assert!(!c.is_tracking_param("fbclid"));
    }

    #[test]
    fn canonicalization_is_idempotent_on_examples() {
        let c = Canonicalizer::default();
        for raw in [
            "HTTP://A.com/x/../y/?b=2&a=1#f",
            "https://a.com/search?q=hello+world&q=%20x",
            "https://a.com/?flag",
            "https://a.com/%7Euser/",
        ] {
            let once = c.canonicalize(raw, None).expect("parses");
            let twice = c.canonicalize(once.as_str(), None).expect("re-parses");
            assert_eq!(once, twice, "not idempotent for {raw}");
        }
    }
}
