//! HTML parsing and read-only DOM navigation.
//!
//! Wraps the html5ever-backed `scraper` types with the small query
//! surface the extraction pipeline needs. All DOM mutation in this crate
//! happens through streaming rewrites; this module is only for querying.

use scraper::{Html, Selector};

use crate::{DistillError, Result};

/// A parsed HTML document queried with CSS selectors.
pub struct Document {
    html: Html,
}

impl Document {
    /// Parse a full HTML document
    pub fn parse(html: &str) -> Result<Self> {
        Ok(Self {
            html: Html::parse_document(html),
        })
    }

    /// Parse an HTML fragment (a content block without html/body wrappers)
    pub fn parse_fragment(html: &str) -> Result<Self> {
        Ok(Self {
            html: Html::parse_fragment(html),
        })
    }

    /// Select elements using a CSS selector
    pub fn select(&'_ self, selector: &str) -> Result<Vec<Element<'_>>> {
        let sel = Selector::parse(selector)
            .map_err(|e| DistillError::HtmlParseError(format!("Invalid selector: {}", e)))?;

        Ok(self
            .html
            .select(&sel)
            .map(|element| Element { element })
            .collect())
    }

    /// Content of the `<title>` element, if present
    pub fn title(&self) -> Option<String> {
        let selector = Selector::parse("title").ok()?;
        self.html
            .select(&selector)
            .next()
            .map(|el| el.text().collect::<String>())
    }

    /// All text content of the document
    pub fn text_content(&self) -> String {
        self.html
            .root_element()
            .text()
            .collect::<Vec<_>>()
            .join(" ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// The document root element
    pub fn root(&'_ self) -> Element<'_> {
        Element {
            element: self.html.root_element(),
        }
    }
}

/// A single element in the parsed tree.
#[derive(Clone, Debug)]
pub struct Element<'a> {
    element: scraper::ElementRef<'a>,
}

impl<'a> Element<'a> {
    /// HTML content inside this element, excluding its own tags
    pub fn inner_html(&self) -> String {
        self.element.inner_html()
    }

    /// HTML content including this element's own tags
    pub fn outer_html(&self) -> String {
        self.element.html()
    }

    /// Concatenated, whitespace-normalized text of this element
    pub fn text(&self) -> String {
        self.element
            .text()
            .collect::<Vec<_>>()
            .join(" ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Attribute value, if present
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.element.value().attr(name)
    }

    /// Lowercase tag name
    pub fn tag_name(&self) -> String {
        self.element.value().name().to_lowercase()
    }

    /// Select descendants using a CSS selector
    pub fn select(&'_ self, selector: &str) -> Result<Vec<Element<'_>>> {
        let sel = Selector::parse(selector)
            .map_err(|e| DistillError::HtmlParseError(format!("Invalid selector: {}", e)))?;

        Ok(self
            .element
            .select(&sel)
            .map(|element| Element { element })
            .collect())
    }

    /// Direct element children, in document order
    pub fn element_children(&self) -> Vec<Element<'a>> {
        self.element
            .children()
            .filter_map(scraper::ElementRef::wrap)
            .map(|element| Element { element })
            .collect()
    }

    /// Whether this element has direct non-whitespace text children
    pub fn has_own_text(&self) -> bool {
        self.element.children().any(|child| {
            child
                .value()
                .as_text()
                .is_some_and(|text| !text.trim().is_empty())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_HTML: &str = r#"
        <!DOCTYPE html>
        <html lang="en">
        <head><title>Test Page</title></head>
        <body>
            <h1>Heading</h1>
            <p class="content">Paragraph 1</p>
            <p class="content">Paragraph 2</p>
            <a href="https://example.com">Link</a>
        </body>
        </html>
    "#;

    #[test]
    fn test_parse_document() {
        let doc = Document::parse(SAMPLE_HTML).unwrap();
        assert_eq!(doc.title(), Some("Test Page".to_string()));
    }

    #[test]
    fn test_select_elements() {
        let doc = Document::parse(SAMPLE_HTML).unwrap();
        let elements = doc.select("p.content").unwrap();

        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].text(), "Paragraph 1");
    }

    #[test]
    fn test_element_attributes() {
        let doc = Document::parse(SAMPLE_HTML).unwrap();
        let elements = doc.select("a").unwrap();

        assert_eq!(elements[0].attr("href"), Some("https://example.com"));
        assert_eq!(elements[0].text(), "Link");
    }

    #[test]
    fn test_invalid_selector() {
        let doc = Document::parse(SAMPLE_HTML).unwrap();
        let result = doc.select("[[invalid");
        assert!(matches!(result, Err(DistillError::HtmlParseError(_))));
    }

    #[test]
    fn test_fragment_children() {
        let doc = Document::parse_fragment("<div><article><p>Text</p></article></div>").unwrap();
        let root_children = doc.root().element_children();

        assert_eq!(root_children.len(), 1);
        assert_eq!(root_children[0].tag_name(), "div");
        assert!(!root_children[0].has_own_text());

        let inner = root_children[0].element_children();
        assert_eq!(inner[0].tag_name(), "article");
    }

    #[test]
    fn test_has_own_text() {
        let doc = Document::parse_fragment("<div>direct text<span>nested</span></div>").unwrap();
        let div = &doc.root().element_children()[0];
        assert!(div.has_own_text());
    }
}
