//! OpenGraph collection and summary generation.

use crate::parse::Document;
use std::collections::BTreeMap;

/// Default word count for summaries
pub const SUMMARY_WORDS: usize = 55;

/// Collect `og:*` properties from the original page markup.
///
/// Keys have `:` replaced with `_` (`og:title` -> `og_title`); the first
/// occurrence of a property wins.
pub fn open_graph(html: &str) -> BTreeMap<String, String> {
    let mut properties = BTreeMap::new();

    let Ok(doc) = Document::parse(html) else {
        return properties;
    };
    let Ok(elements) = doc.select("meta[property^=\"og:\"]") else {
        return properties;
    };

    for element in elements {
        let (Some(property), Some(content)) = (element.attr("property"), element.attr("content"))
        else {
            continue;
        };
        let key = property.replace(':', "_");
        properties.entry(key).or_insert_with(|| content.to_string());
    }

    properties
}

/// Strip tags and whitespace from markup
pub fn html_to_text(html: &str) -> String {
    match Document::parse(html) {
        Ok(doc) => doc.text_content(),
        Err(_) => html.to_string(),
    }
}

/// First `max_words` whitespace-separated words of the text, with an
/// ellipsis appended when truncated.
pub fn summary(text: &str, max_words: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= max_words {
        return words.join(" ");
    }
    let mut result = words[..max_words].join(" ");
    result.push('…');
    result
}
