//! The article pipeline: URL normalization and policy checks, fetch,
//! MIME dispatch, single-page promotion, extraction, multi-page
//! composition, and post-processing.

use crate::article::Article;
use crate::extract::ContentExtractor;
use crate::fetch::{self, FetchConfig, FetchedResponse};
use crate::metadata;
use crate::mime::{DispatchAction, DispatchEntry, MimeDispatcher, MimeInfo};
use crate::postprocess;
use crate::siteconfig::{ConfigResolver, ResolverConfig};
use crate::{DistillError, Result};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// Paragraph appended when a multi-page article could not be fully
/// retrieved.
const TRUNCATION_NOTICE: &str =
    "<p><em>This article appears to continue on subsequent pages, which could not be retrieved.</em></p>";

/// What to do with links in the final content block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkPolicy {
    #[default]
    Preserve,
    Footnotes,
    Remove,
}

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Enable verbose logging
    pub debug: bool,
    /// Absolutize relative URLs in the content block
    pub rewrite_relative_urls: bool,
    /// Follow `single_page_link` directives
    pub singlepage: bool,
    /// Follow `next_page_link` directives
    pub multipage: bool,
    /// HTML shown when extraction produced no content
    pub error_message: String,
    /// Substring allowlist; when non-empty, the blocklist is ignored
    pub allowed_urls: Vec<String>,
    /// Substring blocklist
    pub blocked_urls: Vec<String>,
    /// Run the sanitizer over extracted content
    pub xss_filter: bool,
    /// Link handling for the final block
    pub content_links: LinkPolicy,
    /// MIME dispatch table; `None` selects the stock table
    pub content_type_exc: Option<HashMap<String, DispatchEntry>>,
    /// Word count cap for the summary
    pub summary_words: usize,
    /// HTTP client settings
    pub fetch: FetchConfig,
    /// Rule-file resolution settings
    pub resolver: ResolverConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            debug: false,
            rewrite_relative_urls: true,
            singlepage: true,
            multipage: true,
            error_message: "[unable to retrieve full-text content]".to_string(),
            allowed_urls: Vec::new(),
            blocked_urls: Vec::new(),
            xss_filter: true,
            content_links: LinkPolicy::Preserve,
            content_type_exc: None,
            summary_words: metadata::SUMMARY_WORDS,
            fetch: FetchConfig::default(),
            resolver: ResolverConfig::default(),
        }
    }
}

/// Hook for extracting text from an already-downloaded PDF body
pub type PdfTextFn = dyn Fn(&[u8]) -> Option<String> + Send + Sync;

/// Turns a URL into a clean, readable [`Article`].
pub struct Pipeline {
    config: PipelineConfig,
    client: reqwest::Client,
    resolver: Arc<ConfigResolver>,
    dispatcher: MimeDispatcher,
    pdf_text: Option<Box<PdfTextFn>>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let client = fetch::build_client(&config.fetch)?;
        let resolver = Arc::new(ConfigResolver::from_config(&config.resolver));
        let dispatcher = match &config.content_type_exc {
            Some(table) => MimeDispatcher::new(table.clone()),
            None => MimeDispatcher::with_defaults(),
        };

        Ok(Self {
            config,
            client,
            resolver,
            dispatcher,
            pdf_text: None,
        })
    }

    /// Install a PDF text extractor used for `link`-dispatched PDFs.
    ///
    /// The hook receives the downloaded body; the pipeline never fetches
    /// the PDF a second time.
    pub fn with_pdf_text(mut self, hook: Box<PdfTextFn>) -> Self {
        self.pdf_text = Some(hook);
        self
    }

    /// The shared config resolver
    pub fn resolver(&self) -> Arc<ConfigResolver> {
        self.resolver.clone()
    }

    /// Fetch a URL and extract a readable article from it.
    pub async fn fetch_content(&self, raw_url: &str) -> Result<Article> {
        let url = normalize_url(raw_url)?;
        if self.config.debug {
            debug!(url = %url, "processing article request");
        }
        self.check_policy(url.as_str())?;

        let host = url
            .host_str()
            .ok_or_else(|| DistillError::InvalidUrl(format!("no host in {url}")))?;
        let site = self.resolver.build_for_host(host);

        let response =
            fetch::fetch_url(&self.client, &url, &site.http_headers, self.config.fetch.timeout)
                .await?;
        self.check_policy(&response.effective_url)?;

        let mime = self.dispatcher.dispatch(response.content_type());
        if let Some(article) = self.apply_dispatch(&response, mime.as_ref())? {
            return Ok(article);
        }

        let mut effective = Url::parse(&response.effective_url)
            .map_err(|e| DistillError::InvalidUrl(e.to_string()))?;
        let mut html = response.text_utf8();
        let mut status = response.status;
        let mut content_type = mime.as_ref().map(|m| m.mime.clone());

        // OpenGraph always comes from the originally fetched page
        let open_graph = metadata::open_graph(&html);

        let mut extractor = ContentExtractor::new(self.resolver.clone());

        // single-page promotion happens strictly before extraction
        let mut promoted = false;
        if self.config.singlepage {
            if let Some(single) = extractor.find_single_page_link(&html, &effective) {
                if single != effective {
                    match self.promote_single_page(&single).await {
                        Some((page, page_mime)) => {
                            // the promoted response goes through the same
                            // exclude/link dispatch as the original fetch
                            if let Some(article) =
                                self.apply_dispatch(&page, page_mime.as_ref())?
                            {
                                return Ok(article);
                            }
                            debug!(url = %single, "promoted to single-page view");
                            effective = Url::parse(&page.effective_url)
                                .unwrap_or_else(|_| single.clone());
                            html = page.text_utf8();
                            status = page.status;
                            content_type = page_mime.map(|m| m.mime);
                            promoted = true;
                        }
                        None => {
                            debug!(url = %single, "single-page fetch failed, keeping original");
                        }
                    }
                }
            }
        }

        let extracted = extractor.process(&html, &effective)?;

        if !extracted {
            return Ok(Article {
                status,
                html: self.config.error_message.clone(),
                title: extractor.title.clone().unwrap_or_default(),
                language: extractor.language.clone(),
                url: effective.to_string(),
                content_type,
                open_graph,
                summary: None,
            });
        }

        let mut content = extractor
            .content_block
            .clone()
            .expect("extraction succeeded");

        // later pages reuse the extractor; the first page owns the metadata
        let title = extractor.title.clone().unwrap_or_default();
        let language = extractor.language.clone();

        if !promoted && self.config.multipage {
            content = self
                .compose_multipage(content, &mut extractor, &effective)
                .await;
        }

        if self.config.xss_filter {
            content = ammonia::Builder::default()
                .add_generic_attributes(["id", "class"])
                .clean(&content)
                .to_string();
        }

        if self.config.rewrite_relative_urls {
            content = postprocess::absolutize_urls(&content, &effective);
        }

        match self.config.content_links {
            LinkPolicy::Footnotes if !is_wikipedia(&effective) => {
                content = postprocess::links_to_footnotes(&content);
            }
            _ => {}
        }

        content = postprocess::finalize(&content);

        if self.config.content_links == LinkPolicy::Remove {
            content = postprocess::remove_links(&content);
        }

        let summary = Some(metadata::summary(
            &metadata::html_to_text(&content),
            self.config.summary_words,
        ));

        Ok(Article {
            status,
            html: content,
            title,
            language,
            url: effective.to_string(),
            content_type,
            open_graph,
            summary,
        })
    }

    /// Fetch the single-page candidate. `None` (a policy rejection or a
    /// failed fetch) keeps the original page; the caller re-runs MIME
    /// dispatch on the returned response.
    async fn promote_single_page(
        &self,
        url: &Url,
    ) -> Option<(FetchedResponse, Option<MimeInfo>)> {
        if self.check_policy(url.as_str()).is_err() {
            return None;
        }

        let host = url.host_str()?;
        let site = self.resolver.build_for_host(host);
        let response =
            fetch::fetch_url(&self.client, url, &site.http_headers, self.config.fetch.timeout)
                .await
                .ok()?;

        let mime = self.dispatcher.dispatch(response.content_type());
        Some((response, mime))
    }

    /// Enforce a dispatch decision on a fetched response: `Exclude`
    /// fails the request, `Link` yields the stub article, and no action
    /// proceeds to extraction.
    fn apply_dispatch(
        &self,
        response: &FetchedResponse,
        mime: Option<&MimeInfo>,
    ) -> Result<Option<Article>> {
        let Some(info) = mime else {
            return Ok(None);
        };

        match info.action {
            Some(DispatchAction::Exclude) => Err(DistillError::PolicyBlocked(format!(
                "content type {} is excluded",
                info.mime
            ))),
            Some(DispatchAction::Link) => Ok(Some(self.link_stub_article(response, info))),
            None => Ok(None),
        }
    }

    /// Follow `next_page_link` pages, appending each page's content block
    /// to the first page's. Any failure abandons the loop and appends a
    /// truncation notice; the first page's extraction always survives.
    async fn compose_multipage(
        &self,
        first_block: String,
        extractor: &mut ContentExtractor,
        first_url: &Url,
    ) -> String {
        let mut blocks = vec![first_block];
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(first_url.to_string());

        let mut cursor = first_url.clone();
        let mut next = extractor.next_page_url.clone();

        while let Some(candidate) = next.take() {
            let resolved = match cursor.join(candidate.trim()) {
                Ok(url) => url,
                Err(err) => {
                    debug!(%err, candidate, "next page URL did not resolve");
                    blocks.push(TRUNCATION_NOTICE.to_string());
                    break;
                }
            };

            if !visited.insert(resolved.to_string()) {
                debug!(url = %resolved, "next page already visited");
                blocks.push(TRUNCATION_NOTICE.to_string());
                break;
            }

            let host = resolved.host_str().map(str::to_string).unwrap_or_default();
            let site = self.resolver.build_for_host(&host);
            let response = match fetch::fetch_url(
                &self.client,
                &resolved,
                &site.http_headers,
                self.config.fetch.timeout,
            )
            .await
            {
                Ok(response) => response,
                Err(err) => {
                    warn!(%err, url = %resolved, "next page fetch failed");
                    blocks.push(TRUNCATION_NOTICE.to_string());
                    break;
                }
            };

            let mime = self.dispatcher.dispatch(response.content_type());
            if mime.is_some_and(|m| m.action.is_some()) {
                debug!(url = %resolved, "next page dispatched away from extraction");
                blocks.push(TRUNCATION_NOTICE.to_string());
                break;
            }

            let page_url = Url::parse(&response.effective_url).unwrap_or_else(|_| resolved.clone());
            visited.insert(page_url.to_string());
            let page_html = response.text_utf8();

            match extractor.process(&page_html, &page_url) {
                Ok(true) => {
                    blocks.push(extractor.content_block.clone().expect("extraction succeeded"));
                    cursor = page_url;
                    next = extractor.next_page_url.clone();
                }
                Ok(false) | Err(_) => {
                    debug!(url = %page_url, "next page extraction failed");
                    blocks.push(TRUNCATION_NOTICE.to_string());
                    break;
                }
            }
        }

        blocks.join("\n")
    }

    /// Synthesize the stub article for a `link`-dispatched response
    fn link_stub_article(&self, response: &FetchedResponse, info: &MimeInfo) -> Article {
        let url = &response.effective_url;
        let name = info.name.clone().unwrap_or_else(|| info.mime.clone());

        let html = if info.ttype == "image" {
            format!(r#"<a href="{url}"><img src="{url}" alt="{name}" /></a>"#)
        } else if info.mime == "application/pdf" {
            let mut html = format!(r#"<a href="{url}">Download {name}</a>"#);
            if let Some(text) = self
                .pdf_text
                .as_ref()
                .and_then(|hook| hook(&response.body))
            {
                html.push_str(&format!("\n<pre>{}</pre>", escape_text(&text)));
            }
            html
        } else if info.mime == "text/plain" {
            format!("<pre>{}</pre>", escape_text(&response.text_utf8()))
        } else {
            format!(r#"<a href="{url}">Download {name}</a>"#)
        };

        Article {
            status: 200,
            html,
            title: name,
            language: None,
            url: url.clone(),
            content_type: Some(info.mime.clone()),
            open_graph: BTreeMap::new(),
            summary: None,
        }
    }

    /// Enforce the allow/block URL policy
    fn check_policy(&self, url: &str) -> Result<()> {
        let lower = url.to_lowercase();

        if !self.config.allowed_urls.is_empty() {
            let allowed = self
                .config
                .allowed_urls
                .iter()
                .any(|needle| lower.contains(&needle.to_lowercase()));
            if allowed {
                return Ok(());
            }
            return Err(DistillError::PolicyBlocked(url.to_string()));
        }

        let blocked = self
            .config
            .blocked_urls
            .iter()
            .any(|needle| lower.contains(&needle.to_lowercase()));
        if blocked {
            return Err(DistillError::PolicyBlocked(url.to_string()));
        }

        Ok(())
    }
}

/// Normalize user input into a fetchable URL.
///
/// `feed://` becomes `http://`, schemaless input gets `http://`
/// prepended, anything else must parse as-is. Normalization is
/// idempotent for URLs that already carry a scheme.
pub fn normalize_url(input: &str) -> Result<Url> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DistillError::InvalidUrl("empty URL".to_string()));
    }

    let rewritten = if let Some(rest) = trimmed.strip_prefix("feed://") {
        format!("http://{rest}")
    } else if !trimmed.contains("://") {
        format!("http://{trimmed}")
    } else {
        trimmed.to_string()
    };

    let url = Url::parse(&rewritten).map_err(|e| DistillError::InvalidUrl(e.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(DistillError::InvalidUrl(format!(
            "unsupported scheme: {}",
            url.scheme()
        )));
    }
    if url.host_str().is_none() {
        return Err(DistillError::InvalidUrl(format!("no host in {url}")));
    }

    Ok(url)
}

fn is_wikipedia(url: &Url) -> bool {
    url.host_str()
        .is_some_and(|host| host == "wikipedia.org" || host.ends_with(".wikipedia.org"))
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
