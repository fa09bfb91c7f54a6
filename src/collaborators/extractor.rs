//! Content and link extraction interfaces, with a scraper-based reference
//! implementation.

use std::collections::HashSet;

use scraper::{ElementRef, Html, Node, Selector};

use crate::canonical_url::CanonicalUrl;
use crate::crawl_engine::crawl_types::EntityMention;
use crate::utils::{normalize_whitespace, safe_truncate_chars, LINK_CONTEXT_MAX_CHARS};

/// Elements whose text never counts as page content
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "svg"];

const MAX_ENTITIES: usize = 32;

/// Text content pulled out of a page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedContent {
    pub title: String,
    /// Clean text; empty means the page had no usable content
    pub text: String,
    pub content_type: String,
    pub entities: Vec<EntityMention>,
}

/// A link as found in the markup, before canonicalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLink {
    pub href: String,
    pub anchor_text: String,
    pub context: String,
}

/// Turns HTML into clean text, a title and entity mentions.
pub trait ContentExtractor: Send + Sync {
    fn extract(&self, html: &str, url: &CanonicalUrl) -> ExtractedContent;
}

/// Finds outbound links with their anchor text and surrounding context.
pub trait LinkExtractor: Send + Sync {
    fn extract_links(&self, html: &str, base: &CanonicalUrl) -> Vec<RawLink>;
}

/// HTML extractor on top of `scraper`
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlExtractor;

impl HtmlExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn extract_title(document: &Html) -> String {
        for selector in ["title", "h1"] {
            if let Ok(selector) = Selector::parse(selector)
                && let Some(elem) = document.select(&selector).next()
            {
                let title = normalize_whitespace(&elem.text().collect::<String>());
                if !title.is_empty() {
                    return title;
                }
            }
        }
        String::new()
    }

    fn extract_text(document: &Html) -> String {
        let root = Selector::parse("body")
            .ok()
            .and_then(|s| document.select(&s).next())
            .unwrap_or_else(|| document.root_element());

        let mut text = String::new();
        for node in root.descendants() {
            let Node::Text(t) = node.value() else {
                continue;
            };
            let inside_skipped = node.ancestors().any(|a| {
                a.value()
                    .as_element()
                    .is_some_and(|e| SKIPPED_ELEMENTS.contains(&e.name()))
            });
            if inside_skipped {
                continue;
            }
            let t = t.trim();
            if !t.is_empty() {
                if !text.is_empty() {
                    text.push(' ');
                }
                text.push_str(t);
            }
        }
        normalize_whitespace(&text)
    }

    fn extract_entities(document: &Html) -> Vec<EntityMention> {
        let Ok(selector) = Selector::parse("h1, h2, h3") else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        document
            .select(&selector)
            .filter_map(|h| {
                let name = normalize_whitespace(&h.text().collect::<String>());
                (!name.is_empty() && seen.insert(name.to_lowercase())).then(|| EntityMention {
                    name,
                    kind: "heading".to_string(),
                })
            })
            .take(MAX_ENTITIES)
            .collect()
    }

    fn count(document: &Html, selector: &str) -> usize {
        Selector::parse(selector)
            .map(|s| document.select(&s).count())
            .unwrap_or_default()
    }

    /// Coarse page classification from structural markers.
    fn classify(document: &Html, text: &str) -> String {
        let code_blocks = Self::count(document, "pre, code");
        let links = Self::count(document, "a[href]");
        let words = text.split_whitespace().count();

        let kind = if text.is_empty() {
            "empty"
        } else if code_blocks >= 3 {
            "documentation"
        } else if Self::count(document, "article") > 0 {
            "article"
        } else if links > 30 && words < links * 5 {
            "listing"
        } else {
            "page"
        };
        kind.to_string()
    }
}

impl ContentExtractor for HtmlExtractor {
    fn extract(&self, html: &str, _url: &CanonicalUrl) -> ExtractedContent {
        let document = Html::parse_document(html);
        let text = Self::extract_text(&document);
        ExtractedContent {
            title: Self::extract_title(&document),
            content_type: Self::classify(&document, &text),
            entities: Self::extract_entities(&document),
            text,
        }
    }
}

impl LinkExtractor for HtmlExtractor {
    fn extract_links(&self, html: &str, _base: &CanonicalUrl) -> Vec<RawLink> {
        let document = Html::parse_document(html);
        let Ok(selector) = Selector::parse("a[href]") else {
            return Vec::new();
        };

        document
            .select(&selector)
            .filter_map(|anchor| {
                let href = anchor.value().attr("href")?.trim();
                let lower = href.to_ascii_lowercase();
                if href.is_empty()
                    || href.starts_with('#')
                    || lower.starts_with("javascript:")
                    || lower.starts_with("mailto:")
                    || lower.starts_with("tel:")
                {
                    return None;
                }
                Some(RawLink {
                    href: href.to_string(),
                    anchor_text: normalize_whitespace(&anchor.text().collect::<String>()),
                    context: link_context(anchor),
                })
            })
            .collect()
    }
}

/// Text of the anchor's parent element, truncated.
fn link_context(anchor: ElementRef<'_>) -> String {
    let parent_text = anchor
        .parent()
        .and_then(ElementRef::wrap)
        .map(|p| normalize_whitespace(&p.text().collect::<String>()))
        .unwrap_or_default();
    safe_truncate_chars(&parent_text, LINK_CONTEXT_MAX_CHARS).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical_url::Canonicalizer;

    fn base() -> CanonicalUrl {
        Canonicalizer::default()
            .canonicalize("https://example.com/docs/", None)
            .expect("valid base")
    }

    const PAGE: &str = r##"
        <html><head><title> Async  Guide </title><style>body { color: red }</style></head>
        <body>
          <h1>Async Guide</h1>
          <script>var tracking = 1;</script>
          <p>Learn about <a href="runtime">the runtime</a> and tasks.</p>
          <h2>Executors</h2>
          <a href="#top">top</a>
          <a href="mailto:x@example.com">mail</a>
          <a href="https://other.org/page?x=1">elsewhere</a>
        </body></html>
    "##;

    #[test]
    fn extracts_title_text_and_entities() {
        let content = HtmlExtractor.extract(PAGE, &base());
        assert_eq!(content.title, "Async Guide");
        assert!(content.text.contains("Learn about the runtime and tasks."));
        assert!(!content.text.contains("tracking"));
        assert!(!content.text.contains("color"));
        let names: Vec<&str> = content.entities.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Async Guide", "Executors"]);
        assert_eq!(content.content_type, "page");
    }

    #[test]
    fn empty_body_yields_empty_text() {
        let content = HtmlExtractor.extract("<html><body>  </body></html>", &base());
        assert!(content.text.is_empty());
        assert_eq!(content.content_type, "empty");
    }

    #[test]
    fn extracts_links_with_context() {
        let links = HtmlExtractor.extract_links(PAGE, &base());
        let hrefs: Vec<&str> = links.iter().map(|l| l.href.as_str()).collect();
        assert_eq!(hrefs, vec!["runtime", "https://other.org/page?x=1"]);
        assert_eq!(links[0].anchor_text, "the runtime");
        assert_eq!(links[0].context, "Learn about the runtime and tasks.");
    }
}
