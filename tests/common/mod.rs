//! Test utilities for the scheduler suites: an in-memory site, scripted
//! estimators and recording event sinks.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use kodegen_tools_goalscrape::collaborators::{FetchOptions, FetchResponse, Fetcher, ValueEstimator};
use kodegen_tools_goalscrape::crawl_events::{CrawlEvent, EventSink};
use kodegen_tools_goalscrape::{
    CanonicalUrl, CancellationToken, CrawlError, CrawlResult, Goal, LinkCandidate, Metrics,
};
use parking_lot::Mutex;

pub const HOST: &str = "https://site.test";

/// Absolute URL on the mock host
#[allow(dead_code)]
pub fn url(path: &str) -> String {
    format!("{HOST}{path}")
}

/// Creates a test HTML document with the given title, text and links
#[allow(dead_code)]
pub fn create_test_html(title: &str, body: &str, links: &[String]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<li><a href="{href}">link to {href}</a></li>"#))
        .collect();
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><title>{title}</title></head>
<body>
    <h1>{title}</h1>
    <p>{body}</p>
    <ul>{anchors}</ul>
</body>
</html>"#
    )
}

enum MockPage {
    Html { html: String, protected: bool },
    Status(u16),
}

/// In-memory site keyed by canonical URL string
#[derive(Default)]
pub struct MockSite {
    pages: HashMap<String, MockPage>,
    fetches: DashMap<String, usize>,
    delay: Option<Duration>,
}

#[allow(dead_code)]
impl MockSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, path: &str, title: &str, body: &str, links: &[&str]) -> Self {
        let links: Vec<String> = links.iter().map(|l| (*l).to_string()).collect();
        self.pages.insert(
            url(path),
            MockPage::Html {
                html: create_test_html(title, body, &links),
                protected: false,
            },
        );
        self
    }

    /// Page that answers `AuthenticationRequired` until an Authorization
    /// header is sent
    pub fn protected_page(mut self, path: &str, title: &str, body: &str) -> Self {
        self.pages.insert(
            url(path),
            MockPage::Html {
                html: create_test_html(title, body, &[]),
                protected: true,
            },
        );
        self
    }

    pub fn status(mut self, path: &str, status: u16) -> Self {
        self.pages.insert(url(path), MockPage::Status(status));
        self
    }

    /// Every fetch waits this long first
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// `n` pages under `/p/{i}`, each linking to every other one; `/` links
    /// to all of them.
    pub fn fully_connected(n: usize) -> Self {
        let paths: Vec<String> = (0..n).map(|i| format!("/p/{i}")).collect();
        let refs: Vec<&str> = paths.iter().map(String::as_str).collect();
        let mut site = Self::new().page("/", "Index", "Start page of the mesh", &refs);
        for (i, path) in paths.iter().enumerate() {
            let others: Vec<&str> = refs.iter().copied().filter(|p| *p != path.as_str()).collect();
            site = site.page(path, &format!("Page {i}"), &format!("Mesh page number {i}"), &others);
        }
        site
    }

    pub fn fetch_count(&self, url: &str) -> usize {
        self.fetches.get(url).map_or(0, |c| *c)
    }

    pub fn max_fetches_per_url(&self) -> usize {
        self.fetches.iter().map(|e| *e.value()).max().unwrap_or(0)
    }

    pub fn total_fetches(&self) -> usize {
        self.fetches.iter().map(|e| *e.value()).sum()
    }
}

#[async_trait]
impl Fetcher for MockSite {
    async fn fetch(&self, url: &CanonicalUrl, options: &FetchOptions) -> CrawlResult<FetchResponse> {
        *self.fetches.entry(url.to_string()).or_insert(0) += 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let (html, status) = match self.pages.get(url.as_str()) {
            None => (String::new(), 404),
            Some(MockPage::Status(status)) => (String::new(), *status),
            Some(MockPage::Html { html, protected }) => {
                let authorized = options
                    .headers
                    .iter()
                    .any(|(name, _)| name.eq_ignore_ascii_case("authorization"));
                if *protected && !authorized {
                    return Err(CrawlError::AuthenticationRequired {
                        url: url.to_string(),
                        challenge_type: "Bearer".into(),
                    });
                }
                (html.clone(), 200)
            }
        };
        Ok(FetchResponse {
            html,
            status,
            headers: Vec::new(),
        })
    }
}

/// Raises the token from inside the first fetch, then answers normally
#[allow(dead_code)]
pub struct CancelDuringFetch {
    pub site: MockSite,
    pub token: CancellationToken,
}

#[async_trait]
impl Fetcher for CancelDuringFetch {
    async fn fetch(&self, url: &CanonicalUrl, options: &FetchOptions) -> CrawlResult<FetchResponse> {
        self.token.cancel();
        self.site.fetch(url, options).await
    }
}

/// Site where every page links to `fanout` pages nobody has seen before
pub struct EndlessSite {
    fanout: usize,
    next_id: AtomicUsize,
    pub fetches: AtomicUsize,
}

#[allow(dead_code)]
impl EndlessSite {
    pub fn new(fanout: usize) -> Self {
        Self {
            fanout,
            next_id: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Fetcher for EndlessSite {
    async fn fetch(&self, _url: &CanonicalUrl, _: &FetchOptions) -> CrawlResult<FetchResponse> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let links: Vec<String> = (0..self.fanout)
            .map(|_| format!("/gen/{}", self.next_id.fetch_add(1, Ordering::SeqCst)))
            .collect();
        Ok(FetchResponse {
            html: create_test_html("Generated", "Fresh words every time", &links),
            status: 200,
            headers: Vec::new(),
        })
    }
}

/// Scores everything with one fixed value
pub struct FixedEstimator(pub f64);

#[async_trait]
impl ValueEstimator for FixedEstimator {
    async fn score_content(&self, _text: &str, _goal: &Goal) -> CrawlResult<Metrics> {
        Ok(Metrics::uniform(self.0))
    }

    async fn score_link(&self, _link: &LinkCandidate, _goal: &Goal) -> CrawlResult<f64> {
        Ok(self.0)
    }
}

/// Never answers within any reasonable estimator budget
pub struct StalledEstimator;

#[async_trait]
impl ValueEstimator for StalledEstimator {
    async fn score_content(&self, _text: &str, _goal: &Goal) -> CrawlResult<Metrics> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(Metrics::uniform(1.0))
    }

    async fn score_link(&self, _link: &LinkCandidate, _goal: &Goal) -> CrawlResult<f64> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(1.0)
    }
}

/// Keeps every event it sees
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<CrawlEvent>>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn kinds(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(CrawlEvent::kind).collect()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.events.lock().iter().filter(|e| e.kind() == kind).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: CrawlEvent) {
        self.events.lock().push(event);
    }
}

/// Raises the token once `after` pages have been committed
pub struct CancelAfterPages {
    token: CancellationToken,
    after: usize,
    seen: AtomicUsize,
}

#[allow(dead_code)]
impl CancelAfterPages {
    pub fn new(token: CancellationToken, after: usize) -> Self {
        Self {
            token,
            after,
            seen: AtomicUsize::new(0),
        }
    }
}

impl EventSink for CancelAfterPages {
    fn emit(&self, event: CrawlEvent) {
        if matches!(event, CrawlEvent::PageProcessed { .. })
            && self.seen.fetch_add(1, Ordering::SeqCst) + 1 >= self.after
        {
            self.token.cancel();
        }
    }
}

/// Distinct page URLs in output order
#[allow(dead_code)]
pub fn unique_urls(pages: &[kodegen_tools_goalscrape::PageRecord]) -> HashSet<String> {
    pages.iter().map(|p| p.url.to_string()).collect()
}
