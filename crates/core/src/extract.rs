//! The directive-driven extraction engine.
//!
//! Applies the resolved site config to one page: text replacements, the
//! tidy and prune pre-passes over the whole document, XPath directives
//! for title/body/author/date with a per-field readability fallback,
//! strip directives on the chosen body, and next-page detection.

use crate::parse::Document;
use crate::preprocess;
use crate::readability;
use crate::siteconfig::{ConfigResolver, SiteConfig, StripProcessor, TextReplacer, XPathEvaluator};
use crate::{DistillError, Result};
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Extracts title, body, and metadata from one page of markup.
///
/// `process` never fails on missing directives; it returns `Ok(false)`
/// only when neither the directives nor the heuristic produced a body.
pub struct ContentExtractor {
    resolver: Arc<ConfigResolver>,
    evaluator: XPathEvaluator,

    pub content_block: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub date: Option<String>,
    pub language: Option<String>,
    pub next_page_url: Option<String>,

    site_config: Option<Arc<SiteConfig>>,
}

impl ContentExtractor {
    pub fn new(resolver: Arc<ConfigResolver>) -> Self {
        Self {
            resolver,
            evaluator: XPathEvaluator::new(),
            content_block: None,
            title: None,
            author: None,
            date: None,
            language: None,
            next_page_url: None,
            site_config: None,
        }
    }

    /// The site config resolved by the last `process` call
    pub fn site_config(&self) -> Option<&Arc<SiteConfig>> {
        self.site_config.as_ref()
    }

    /// Clear per-page state before reuse
    pub fn reset(&mut self) {
        self.content_block = None;
        self.title = None;
        self.author = None;
        self.date = None;
        self.language = None;
        self.next_page_url = None;
        self.site_config = None;
    }

    /// Run the extraction pipeline over one page.
    ///
    /// Returns true iff a content block was produced.
    pub fn process(&mut self, html: &str, url: &Url) -> Result<bool> {
        self.reset();

        let host = url
            .host_str()
            .ok_or_else(|| DistillError::InvalidUrl(format!("no host in {url}")))?;
        let config = self.resolver.build_for_host(host);

        let html = TextReplacer::from_config(&config).apply(html);
        let html = if config.should_tidy() {
            preprocess::tidy_html(&html)
        } else {
            html
        };
        // prune runs at the same stage as tidy, over the whole document
        let html = if config.should_prune() {
            preprocess::prune_unlikely(&html)
        } else {
            html
        };

        let doc = Document::parse(&html)?;

        self.title = self.evaluator.first_string(&doc, &html, &config.title);
        let mut body = self.evaluator.first_outer_html(&doc, &html, &config.body);
        self.author = self.evaluator.first_string(&doc, &html, &config.author);
        self.date = self.evaluator.first_string(&doc, &html, &config.date);

        // autodetect runs per field, only for what the directives missed
        if config.should_autodetect() {
            if self.title.is_none() {
                self.title = readability::detect_title(&doc);
            }
            if body.is_none() {
                debug!(host, "body directives produced nothing, using heuristic");
                body = readability::detect_body(&doc);
            }
        }

        if let Some(block) = body.take() {
            body = Some(StripProcessor::from_config(&config).apply(&block));
        }

        self.next_page_url = self
            .evaluator
            .first_link(&doc, &html, &config.next_page_link);
        self.language = readability::document_language(&doc);

        self.content_block = body;
        self.site_config = Some(config);

        Ok(self.content_block.is_some())
    }

    /// Evaluate the config's `single_page_link` directives against a page
    /// and resolve the first hit relative to that page's URL.
    pub fn find_single_page_link(&self, html: &str, url: &Url) -> Option<Url> {
        let host = url.host_str()?;
        let config = self.resolver.build_for_host(host);
        if config.single_page_link.is_empty() {
            return None;
        }

        let doc = Document::parse(html).ok()?;
        let candidate = self
            .evaluator
            .first_link(&doc, html, &config.single_page_link)?;
        url.join(candidate.trim()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::siteconfig::ConfigFileStore;
    use std::fs;
    use tempfile::TempDir;

    fn extractor_with(files: &[(&str, &str)]) -> (ContentExtractor, TempDir) {
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            fs::write(dir.path().join(name), content).unwrap();
        }
        let store = ConfigFileStore::new(&[dir.path()]);
        let resolver = Arc::new(ConfigResolver::new(store));
        (ContentExtractor::new(resolver), dir)
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_directive_extraction() {
        let (mut extractor, _dir) = extractor_with(&[(
            "example.org.txt",
            "title: //h1\nbody: //article\nprune: no\n",
        )]);

        let html = "<html><body><h1>X</h1><article><p>Y</p></article></body></html>";
        let ok = extractor
            .process(html, &url("http://example.org/a"))
            .unwrap();

        assert!(ok);
        assert_eq!(extractor.title.as_deref(), Some("X"));
        assert!(extractor.content_block.as_deref().unwrap().contains("<p>Y</p>"));
    }

    #[test]
    fn test_find_replace_applied_before_parsing() {
        let (mut extractor, _dir) = extractor_with(&[(
            "example.org.txt",
            "body: //article\nreplace_string(<span class=\"junk\">): <span>\nprune: no\n",
        )]);

        let html = r#"<html><body><article><span class="junk">kept text</span></article></body></html>"#;
        extractor
            .process(html, &url("http://example.org/a"))
            .unwrap();

        let block = extractor.content_block.unwrap();
        assert!(!block.contains("junk"));
        assert!(block.contains("kept text"));
    }

    #[test]
    fn test_autodetect_fills_missing_fields_only() {
        let (mut extractor, _dir) = extractor_with(&[(
            "example.org.txt",
            "title: //h2[@class='missing']\nprune: no\n",
        )]);

        let html = r#"
            <html><head><title>Doc Title</title></head><body>
            <article class="post"><p>A long enough paragraph with commas, clauses, and
            sufficient text for the heuristic scorer to accept it as the content block
            of this small test document, which it should.</p></article>
            </body></html>
        "#;
        let ok = extractor
            .process(html, &url("http://example.org/a"))
            .unwrap();

        assert!(ok);
        // directive missed, heuristic supplied both fields
        assert_eq!(extractor.title.as_deref(), Some("Doc Title"));
        assert!(extractor.content_block.unwrap().contains("long enough paragraph"));
    }

    #[test]
    fn test_autodetect_disabled_returns_false() {
        let (mut extractor, _dir) = extractor_with(&[(
            "example.org.txt",
            "body: //article[@id='missing']\nautodetect_on_failure: no\n",
        )]);

        let html = r#"<html><body><div class="post"><p>Plenty of content, with commas,
            and enough length to be detected if the heuristic were allowed to run here.</p>
            </div></body></html>"#;
        let ok = extractor
            .process(html, &url("http://example.org/a"))
            .unwrap();

        assert!(!ok);
        assert!(extractor.content_block.is_none());
    }

    #[test]
    fn test_strip_applies_to_body_subtree() {
        let (mut extractor, _dir) = extractor_with(&[(
            "example.org.txt",
            "body: //article\nstrip_id_or_class: promo\nprune: no\n",
        )]);

        let html = r#"<html><body><article><p>Keep</p><div class="promo">Buy now</div></article></body></html>"#;
        extractor
            .process(html, &url("http://example.org/a"))
            .unwrap();

        let block = extractor.content_block.unwrap();
        assert!(block.contains("Keep"));
        assert!(!block.contains("Buy now"));
    }

    #[test]
    fn test_prune_removes_boilerplate_before_selection() {
        // no prune directive, so the default (enabled) applies
        let (mut extractor, _dir) = extractor_with(&[("example.org.txt", "body: //article\n")]);

        let html = r#"<html><body><article><p>Keep this prose</p>
            <div class="sidebar">Related links</div></article></body></html>"#;
        extractor
            .process(html, &url("http://example.org/a"))
            .unwrap();

        let block = extractor.content_block.unwrap();
        assert!(block.contains("Keep this prose"));
        assert!(!block.contains("Related links"));
    }

    #[test]
    fn test_prune_disabled_keeps_boilerplate() {
        let (mut extractor, _dir) =
            extractor_with(&[("example.org.txt", "body: //article\nprune: no\n")]);

        let html = r#"<html><body><article><p>Keep this prose</p>
            <div class="sidebar">Related links</div></article></body></html>"#;
        extractor
            .process(html, &url("http://example.org/a"))
            .unwrap();

        let block = extractor.content_block.unwrap();
        assert!(block.contains("Related links"));
    }

    #[test]
    fn test_next_page_link_first_hit_wins() {
        let (mut extractor, _dir) = extractor_with(&[(
            "example.org.txt",
            "body: //article\nnext_page_link: //a[@rel='next']/@href\nnext_page_link: //a[@class='more']/@href\nprune: no\n",
        )]);

        let html = r#"<html><body><article><p>Y</p></article>
            <a rel="next" href="/page/2">Next</a>
            <a class="more" href="/never">More</a></body></html>"#;
        extractor
            .process(html, &url("http://example.org/a"))
            .unwrap();

        assert_eq!(extractor.next_page_url.as_deref(), Some("/page/2"));
    }

    #[test]
    fn test_language_detection() {
        let (mut extractor, _dir) = extractor_with(&[("example.org.txt", "body: //article\nprune: no\n")]);

        let html = r#"<html lang="de"><body><article><p>Inhalt</p></article></body></html>"#;
        extractor
            .process(html, &url("http://example.org/a"))
            .unwrap();

        assert_eq!(extractor.language.as_deref(), Some("de"));
    }

    #[test]
    fn test_no_config_falls_back_to_heuristic() {
        let (mut extractor, _dir) = extractor_with(&[]);

        let html = r#"<html><head><title>T</title></head><body>
            <article class="post"><p>Heuristics alone must find this block, which carries
            commas, length, and a content-marked class name for scoring purposes.</p></article>
            </body></html>"#;
        let ok = extractor
            .process(html, &url("http://no-rules.example/a"))
            .unwrap();

        assert!(ok);
        assert_eq!(extractor.title.as_deref(), Some("T"));
    }

    #[test]
    fn test_find_single_page_link() {
        let (extractor, _dir) = extractor_with(&[(
            "example.org.txt",
            "single_page_link: //link[@rel='print']/@href\n",
        )]);

        let html = r#"<html><head><link rel="print" href="/print/1"></head><body></body></html>"#;
        let link = extractor.find_single_page_link(html, &url("http://example.org/a"));

        assert_eq!(link.unwrap().as_str(), "http://example.org/print/1");
    }

    #[test]
    fn test_find_single_page_link_absent_without_directive() {
        let (extractor, _dir) = extractor_with(&[("example.org.txt", "body: //article\n")]);

        let html = r#"<html><head><link rel="print" href="/print/1"></head><body></body></html>"#;
        assert!(extractor
            .find_single_page_link(html, &url("http://example.org/a"))
            .is_none());
    }
}
