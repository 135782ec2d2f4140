//! Readability-style heuristic scoring.
//!
//! The fallback used when no XPath directive produced a title or body:
//! candidate containers are scored by tag, class/id patterns, text and
//! comma density, and link density, and the best-scoring subtree becomes
//! the content block. Also answers document-language questions for the
//! extractor.

use crate::parse::{Document, Element};
use once_cell::sync::Lazy;
use regex::Regex;
use whatlang::Lang;

/// Tags considered potential content containers
const CANDIDATE_TAGS: &[&str] = &[
    "article",
    "main",
    "section",
    "div",
    "td",
    "pre",
    "blockquote",
];

/// Candidates below this score are not worth returning
const MIN_SCORE: f64 = 10.0;

/// Candidates with less text than this are skipped outright
const MIN_TEXT_LENGTH: usize = 25;

const POSITIVE_WEIGHT: f64 = 25.0;
const CHARS_PER_POINT: usize = 100;
const MAX_DENSITY_POINTS: f64 = 3.0;

static POSITIVE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(article|body|content|entry|hentry|h-entry|main|page|post|text|blog|story)")
        .unwrap()
});

static NEGATIVE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(banner|breadcrumbs?|combx|comment|community|disqus|extra|foot|header|menu|related|remark|rss|shoutbox|sidebar|sponsor|ad-break|agegate|pagination|pager|popup)",
    )
    .unwrap()
});

fn base_tag_score(tag: &str) -> f64 {
    match tag {
        "article" | "main" => 10.0,
        "section" => 8.0,
        "div" => 5.0,
        "td" | "blockquote" => 3.0,
        "pre" => 0.0,
        _ => 0.0,
    }
}

fn class_id_weight(element: &Element<'_>) -> f64 {
    for attr in ["id", "class"] {
        if let Some(value) = element.attr(attr) {
            if POSITIVE_RE.is_match(value) {
                return POSITIVE_WEIGHT;
            }
            if NEGATIVE_RE.is_match(value) {
                return -POSITIVE_WEIGHT;
            }
        }
    }
    0.0
}

fn content_density(text: &str) -> f64 {
    let char_points =
        ((text.chars().count() / CHARS_PER_POINT) as f64).min(MAX_DENSITY_POINTS);
    let comma_points = (text.matches(',').count() as f64).min(MAX_DENSITY_POINTS);
    char_points + comma_points
}

/// Ratio of link text to total text, 0.0 to 1.0
pub fn link_density(element: &Element<'_>) -> f64 {
    let text_length = element.text().chars().count();
    if text_length == 0 {
        return 0.0;
    }

    let link_text_length: usize = element
        .select("a")
        .unwrap_or_default()
        .iter()
        .map(|link| link.text().chars().count())
        .sum();

    link_text_length as f64 / text_length as f64
}

fn score(element: &Element<'_>) -> f64 {
    let text = element.text();
    let raw = base_tag_score(&element.tag_name())
        + class_id_weight(element)
        + content_density(&text);

    let density = link_density(element);
    let content_rich = text.chars().count() > 500 || class_id_weight(element) > 0.0;
    let penalty = if content_rich {
        1.0 - density * 0.5
    } else {
        1.0 - density
    };

    raw * penalty
}

/// Heuristic body detection: the outer HTML of the best-scoring
/// candidate container, or `None` when nothing scores above threshold.
pub fn detect_body(doc: &Document) -> Option<String> {
    let mut best: Option<(f64, String)> = None;

    for tag in CANDIDATE_TAGS {
        let Ok(elements) = doc.select(tag) else {
            continue;
        };
        for element in elements {
            if element.text().chars().count() < MIN_TEXT_LENGTH {
                continue;
            }
            let value = score(&element);
            if best.as_ref().is_none_or(|(top, _)| value > *top) {
                best = Some((value, element.outer_html()));
            }
        }
    }

    match best {
        Some((top, html)) if top >= MIN_SCORE => Some(html),
        _ => None,
    }
}

/// Heuristic title detection: og:title, twitter:title, `<title>`, first h1
pub fn detect_title(doc: &Document) -> Option<String> {
    for selector in [
        "meta[property=\"og:title\"]",
        "meta[name=\"twitter:title\"]",
    ] {
        if let Ok(elements) = doc.select(selector) {
            if let Some(content) = elements
                .first()
                .and_then(|el| el.attr("content"))
                .map(str::trim)
                .filter(|c| !c.is_empty())
            {
                return Some(content.to_string());
            }
        }
    }

    if let Some(title) = doc.title().map(|t| t.trim().to_string()) {
        if !title.is_empty() {
            return Some(title);
        }
    }

    doc.select("h1")
        .unwrap_or_default()
        .first()
        .map(|el| el.text())
        .filter(|t| !t.is_empty())
}

/// Document language from lang attributes and standard meta declarations,
/// falling back to statistical detection over the page text.
pub fn document_language(doc: &Document) -> Option<String> {
    if let Some(lang) = doc
        .select("html")
        .unwrap_or_default()
        .first()
        .and_then(|el| el.attr("lang"))
    {
        if let Some(primary) = primary_tag(lang) {
            return Some(primary);
        }
    }

    for selector in [
        "meta[http-equiv=\"content-language\" i]",
        "meta[name=\"language\"]",
        "meta[property=\"og:locale\"]",
    ] {
        if let Ok(elements) = doc.select(selector) {
            if let Some(value) = elements.first().and_then(|el| el.attr("content")) {
                if let Some(primary) = primary_tag(value) {
                    return Some(primary);
                }
            }
        }
    }

    detect_text_language(&doc.text_content())
}

/// Reduce a language tag to its lowercase primary subtag (`en-US` -> `en`)
fn primary_tag(tag: &str) -> Option<String> {
    let primary = tag
        .trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_lowercase();
    if primary.is_empty() || !primary.chars().all(|c| c.is_ascii_alphabetic()) {
        None
    } else {
        Some(primary)
    }
}

const MIN_DETECT_LENGTH: usize = 50;
const MIN_DETECT_CONFIDENCE: f64 = 0.25;

fn detect_text_language(text: &str) -> Option<String> {
    if text.trim().len() < MIN_DETECT_LENGTH {
        return None;
    }

    let info = whatlang::detect(text)?;
    if info.confidence() < MIN_DETECT_CONFIDENCE {
        return None;
    }
    Some(lang_to_code(info.lang()))
}

fn lang_to_code(lang: Lang) -> String {
    match lang {
        Lang::Eng => "en".to_string(),
        Lang::Rus => "ru".to_string(),
        Lang::Cmn => "zh".to_string(),
        Lang::Spa => "es".to_string(),
        Lang::Fra => "fr".to_string(),
        Lang::Deu => "de".to_string(),
        Lang::Jpn => "ja".to_string(),
        Lang::Kor => "ko".to_string(),
        Lang::Por => "pt".to_string(),
        Lang::Ita => "it".to_string(),
        Lang::Nld => "nl".to_string(),
        Lang::Pol => "pl".to_string(),
        Lang::Tur => "tr".to_string(),
        Lang::Swe => "sv".to_string(),
        Lang::Dan => "da".to_string(),
        Lang::Fin => "fi".to_string(),
        Lang::Heb => "he".to_string(),
        Lang::Ara => "ar".to_string(),
        _ => format!("{:?}", lang).to_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_body_prefers_article() {
        let html = r#"
            <html><body>
                <div class="sidebar">Short nav text</div>
                <article class="post">
                    <p>This is a long paragraph with plenty of content, commas, and prose.
                    It continues with more sentences, additional clauses, and enough text
                    to comfortably clear the density thresholds used by the scorer.</p>
                </article>
            </body></html>
        "#;

        let doc = Document::parse(html).unwrap();
        let body = detect_body(&doc).unwrap();
        assert!(body.starts_with("<article"));
        assert!(body.contains("long paragraph"));
    }

    #[test]
    fn test_detect_body_rejects_nav_only_page() {
        let html = r##"
            <html><body>
                <nav><a href="#">One</a><a href="#">Two</a><a href="#">Three</a></nav>
            </body></html>
        "##;

        let doc = Document::parse(html).unwrap();
        assert!(detect_body(&doc).is_none());
    }

    #[test]
    fn test_detect_title_priority() {
        let html = r#"
            <html><head>
                <meta property="og:title" content="OG Title">
                <title>Doc Title</title>
            </head><body><h1>H1 Title</h1></body></html>
        "#;
        let doc = Document::parse(html).unwrap();
        assert_eq!(detect_title(&doc), Some("OG Title".to_string()));

        let html = "<html><head><title>Doc Title</title></head><body></body></html>";
        let doc = Document::parse(html).unwrap();
        assert_eq!(detect_title(&doc), Some("Doc Title".to_string()));

        let html = "<html><body><h1>Only Heading</h1></body></html>";
        let doc = Document::parse(html).unwrap();
        assert_eq!(detect_title(&doc), Some("Only Heading".to_string()));
    }

    #[test]
    fn test_language_from_lang_attribute() {
        let html = r#"<html lang="en-US"><body></body></html>"#;
        let doc = Document::parse(html).unwrap();
        assert_eq!(document_language(&doc), Some("en".to_string()));
    }

    #[test]
    fn test_language_from_meta() {
        let html = r#"<html><head><meta http-equiv="Content-Language" content="fr"></head><body></body></html>"#;
        let doc = Document::parse(html).unwrap();
        assert_eq!(document_language(&doc), Some("fr".to_string()));
    }

    #[test]
    fn test_language_detected_from_text() {
        let html = r#"<html><body><p>Esto es una prueba del sistema de detección de
            idiomas en español. Debería funcionar bien con suficiente texto.</p></body></html>"#;
        let doc = Document::parse(html).unwrap();
        assert_eq!(document_language(&doc), Some("es".to_string()));
    }

    #[test]
    fn test_link_density() {
        let html = r##"<html><body><div id="d">Some text <a href="#">link</a> more text</div></body></html>"##;
        let doc = Document::parse(html).unwrap();
        let div = &doc.select("#d").unwrap()[0];
        let density = link_density(div);
        assert!(density > 0.0 && density < 1.0);
    }
}
