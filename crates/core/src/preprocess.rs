//! Document cleanup passes run before directive extraction.
//!
//! `tidy_html` is the pre-parse pass selected by the `tidy` directive;
//! `prune_unlikely` runs over the whole document at the same stage when
//! `prune` is in effect, ahead of any directive or heuristic selection.

use lol_html::{HtmlRewriter, Settings, element};
use once_cell::sync::Lazy;
use regex::Regex;

static COMMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

static UNLIKELY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(banner|breadcrumbs?|combx|comment|community|disqus|extra|foot|header|menu|related|remark|rss|shoutbox|sidebar|sponsor|ad-break|agegate|pagination|pager|popup)",
    )
    .unwrap()
});

static POSITIVE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(article|body|content|entry|hentry|h-entry|main|page|post|text|blog|story)")
        .unwrap()
});

/// Tidy pre-pass: drop script/style/noscript subtrees and comments,
/// collapse whitespace runs.
pub fn tidy_html(html: &str) -> String {
    let mut output = String::new();
    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: vec![
                element!("script", |el| {
                    el.remove();
                    Ok(())
                }),
                element!("style", |el| {
                    el.remove();
                    Ok(())
                }),
                element!("noscript", |el| {
                    el.remove();
                    Ok(())
                }),
            ],
            ..Settings::default()
        },
        |chunk: &[u8]| output.push_str(&String::from_utf8_lossy(chunk)),
    );

    let cleaned = if rewriter.write(html.as_bytes()).is_err() || rewriter.end().is_err() {
        html.to_string()
    } else {
        output
    };

    let cleaned = COMMENT_RE.replace_all(&cleaned, "");
    WHITESPACE_RE.replace_all(&cleaned, " ").trim().to_string()
}

/// Remove subtrees whose id or class marks them as boilerplate, keeping
/// elements that also match a positive content pattern.
pub fn prune_unlikely(html: &str) -> String {
    let mut output = String::new();
    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: vec![element!("*", |el| {
                let id = el.get_attribute("id").unwrap_or_default();
                let class = el.get_attribute("class").unwrap_or_default();
                let marker = format!("{id} {class}");

                if UNLIKELY_RE.is_match(&marker) && !POSITIVE_RE.is_match(&marker) {
                    el.remove();
                }
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tidy_removes_scripts_and_comments() {
        let html = r#"<html><head><script>alert(1);</script><style>p{}</style></head>
            <body><!-- hidden --><p>Content</p></body></html>"#;

        let tidied = tidy_html(html);

        assert!(!tidied.contains("alert"));
        assert!(!tidied.contains("p{}"));
        assert!(!tidied.contains("hidden"));
        assert!(tidied.contains("<p>Content</p>"));
    }

    #[test]
    fn test_tidy_collapses_whitespace() {
        let tidied = tidy_html("<p>a\n\n   b</p>");
        assert_eq!(tidied, "<p>a b</p>");
    }

    #[test]
    fn test_prune_removes_unlikely_blocks() {
        let html = r#"<div class="post"><p>Body</p><div class="sidebar">Nav</div></div>"#;
        let pruned = prune_unlikely(html);

        assert!(pruned.contains("Body"));
        assert!(!pruned.contains("Nav"));
    }

    #[test]
    fn test_prune_keeps_positive_matches() {
        // "header" is unlikely, but "post-header" also matches a positive pattern
        let html = r#"<div class="post-header">Title area</div>"#;
        let pruned = prune_unlikely(html);
        assert!(pruned.contains("Title area"));
    }
}
