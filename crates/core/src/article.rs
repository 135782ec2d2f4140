//! The pipeline's result record.

use serde::Serialize;
use std::collections::BTreeMap;

/// A processed article.
///
/// Always well-formed: when extraction fails, `html` carries the
/// configured error message and `status` the HTTP status observed while
/// fetching.
#[derive(Debug, Clone, Serialize)]
pub struct Article {
    /// HTTP status observed for the (final) page fetch
    pub status: u16,
    /// The cleaned content block, or the configured error message
    pub html: String,
    /// Extracted or detected title
    pub title: String,
    /// Primary language subtag, when known
    pub language: Option<String>,
    /// Effective URL after redirects and single-page promotion
    pub url: String,
    /// Parsed content type of the response
    pub content_type: Option<String>,
    /// `og:*` properties of the original page, keys with `:` -> `_`
    pub open_graph: BTreeMap<String, String>,
    /// First words of the content, when extraction succeeded
    pub summary: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_article_serializes() {
        let article = Article {
            status: 200,
            html: "<p>Body</p>".to_string(),
            title: "Title".to_string(),
            language: Some("en".to_string()),
            url: "http://example.org/a".to_string(),
            content_type: Some("text/html".to_string()),
            open_graph: BTreeMap::new(),
            summary: Some("Body".to_string()),
        };

        let json = serde_json::to_value(&article).unwrap();
        assert_eq!(json["status"], 200);
        assert_eq!(json["title"], "Title");
    }
}
