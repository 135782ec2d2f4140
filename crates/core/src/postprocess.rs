//! Content-block post-processing: URL absolutization, link policies,
//! whitespace normalization, and wrapper-nesting collapse.

use crate::parse::Document;
use lol_html::html_content::ContentType;
use lol_html::{HtmlRewriter, Settings, element};
use once_cell::sync::Lazy;
use regex::Regex;
use std::cell::RefCell;
use url::Url;

static ABSOLUTE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^https?://").unwrap());
static MULTISPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());
static INTERTAG_WS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"</(p|div|section|article|header|footer|li|ul|ol|blockquote|h[1-6])>\s+<").unwrap()
});
static EMPTY_P_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<p(?:\s[^>]*)?>\s*</p>").unwrap());

/// Wrapper tags collapsed when they hold a single child and no text
const WRAPPER_TAGS: &[&str] = &["div", "article", "section", "header", "footer"];

/// Tags serialized by inner HTML when they end up as the block root
const CONTAINER_TAGS: &[&str] = &["div", "article", "section", "header", "footer", "li", "td"];

/// Rewrite `a@href`, `img@src`, and `iframe@src` to absolute URLs.
///
/// Values go through a `%20` round-trip so surrounding whitespace is
/// trimmed while internal spaces survive. Already-absolute values are
/// kept; values that fail to resolve are left untouched.
pub fn absolutize_urls(html: &str, effective_url: &Url) -> String {
    let base = collapsed_base(effective_url);

    let mut output = String::new();
    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: vec![
                element!("a", |el| {
                    rewrite_attr(el, "href", &base);
                    Ok(())
                }),
                element!("img", |el| {
                    rewrite_attr(el, "src", &base);
                    Ok(())
                }),
                element!("iframe", |el| {
                    rewrite_attr(el, "src", &base);
                    Ok(())
                }),
            ],
            ..Settings::default()
        },
        |chunk: &[u8]| output.push_str(&String::from_utf8_lossy(chunk)),
    );

    if rewriter.write(html.as_bytes()).is_err() || rewriter.end().is_err() {
        return html.to_string();
    }
    output
}

fn rewrite_attr(el: &mut lol_html::html_content::Element<'_, '_>, attr: &str, base: &Url) {
    if let Some(value) = el.get_attribute(attr) {
        if let Some(resolved) = resolve_attr_url(&value, base) {
            el.set_attribute(attr, &resolved).ok();
        }
    }
}

fn resolve_attr_url(value: &str, base: &Url) -> Option<String> {
    let spaced = value.replace("%20", " ");
    let cleaned = spaced.trim().replace(' ', "%20");
    if cleaned.is_empty() {
        return None;
    }
    if ABSOLUTE_RE.is_match(&cleaned) {
        return Some(cleaned);
    }
    base.join(&cleaned).ok().map(|url| url.to_string())
}

/// Collapse `//` runs in the base path before resolution
fn collapsed_base(base: &Url) -> Url {
    let mut base = base.clone();
    let path = base.path().to_string();
    if path.contains("//") {
        base.set_path(&path.replace("//", "/"));
    }
    base
}

/// Append a numbered footnote marker after each link and a footnote list
/// carrying the targets at the end of the block.
pub fn links_to_footnotes(html: &str) -> String {
    let targets: RefCell<Vec<String>> = RefCell::new(Vec::new());
    let mut output = String::new();

    {
        let mut rewriter = HtmlRewriter::new(
            Settings {
                element_content_handlers: vec![element!("a[href]", |el| {
                    let href = el.get_attribute("href").unwrap_or_default();
                    if href.is_empty() {
                        return Ok(());
                    }
                    let mut targets = targets.borrow_mut();
                    targets.push(href);
                    el.after(
                        &format!("<sup class=\"footnote\">[{}]</sup>", targets.len()),
                        ContentType::Html,
                    );
                    Ok(())
                })],
                ..Settings::default()
            },
            |chunk: &[u8]| output.push_str(&String::from_utf8_lossy(chunk)),
        );

        if rewriter.write(html.as_bytes()).is_err() || rewriter.end().is_err() {
            return html.to_string();
        }
    }

    let targets = targets.into_inner();
    if !targets.is_empty() {
        output.push_str("\n<ol class=\"footnotes\">");
        for href in &targets {
            let escaped = href.replace('"', "&quot;");
            output.push_str(&format!("<li><a href=\"{escaped}\">{escaped}</a></li>"));
        }
        output.push_str("</ol>");
    }

    output
}

/// Strip all `<a>` tags, keeping their text
pub fn remove_links(html: &str) -> String {
    let mut output = String::new();
    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: vec![element!("a", |el| {
                el.remove_and_keep_content();
                Ok(())
            })],
            ..Settings::default()
        },
        |chunk: &[u8]| output.push_str(&String::from_utf8_lossy(chunk)),
    );

    if rewriter.write(html.as_bytes()).is_err() || rewriter.end().is_err() {
        return html.to_string();
    }
    output
}

/// Final cleanup of the content block: whitespace normalization, empty
/// text-node removal, wrapper collapse, root serialization, and empty
/// paragraph removal.
pub fn finalize(html: &str) -> String {
    let normalized = normalize_whitespace(html);
    let collapsed = collapse_wrappers(&normalized);
    EMPTY_P_RE.replace_all(&collapsed, "").trim().to_string()
}

/// Collapse whitespace runs and drop whitespace-only text nodes between
/// block boundaries.
pub fn normalize_whitespace(html: &str) -> String {
    let collapsed = MULTISPACE_RE.replace_all(html, " ");
    INTERTAG_WS_RE
        .replace_all(&collapsed, "</$1><")
        .trim()
        .to_string()
}

/// Descend through single-child chains of wrapper elements and serialize
/// the surviving root: inner HTML for container tags, outer HTML for
/// everything else.
pub fn collapse_wrappers(html: &str) -> String {
    let Ok(doc) = Document::parse_fragment(html) else {
        return html.to_string();
    };
    let root = doc.root();
    let top = root.element_children();

    // several top-level siblings (e.g. composed pages): nothing to collapse
    if top.len() != 1 || root.has_own_text() {
        return html.to_string();
    }

    let mut current = top.into_iter().next().expect("one child");
    loop {
        if !WRAPPER_TAGS.contains(&current.tag_name().as_str()) {
            break;
        }
        let children = current.element_children();
        if children.len() == 1 && !current.has_own_text() {
            current = children.into_iter().next().expect("one child");
        } else {
            break;
        }
    }

    if CONTAINER_TAGS.contains(&current.tag_name().as_str()) {
        current.inner_html().trim().to_string()
    } else {
        current.outer_html()
    }
}
