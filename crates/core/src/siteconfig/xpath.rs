use crate::parse::Document;
use std::cell::RefCell;
use std::collections::HashSet;
use sxd_document::parser as xml_parser;
use sxd_xpath::{Context, Factory, Value};
use tracing::{debug, warn};

/// A directive XPath translated to a CSS query, with an optional
/// attribute tail (`//a/@href` selects the `href` value).
#[derive(Debug, Clone, PartialEq)]
pub struct CssQuery {
    pub selector: String,
    pub attr: Option<String>,
}

/// Translate the directive XPath subset to a CSS query.
///
/// Handled forms: `//tag`, `//*[@id='v']`, `//tag[@attr='v']`,
/// `//tag[contains(@class, 'v')]`, descendant (`//`) and child (`/`)
/// chains, and a trailing `/@attr`. Anything else returns `None` and is
/// left to the raw XPath engine.
pub fn xpath_to_css(xpath: &str) -> Option<CssQuery> {
    let mut expr = xpath.trim();
    if !expr.starts_with("//") {
        return None;
    }

    let mut attr = None;
    if let Some((head, tail)) = expr.rsplit_once("/@") {
        if is_name(tail) {
            attr = Some(tail.to_string());
            expr = head.trim_end();
        } else {
            return None;
        }
    }

    if expr.is_empty() {
        return None;
    }

    let mut descendant_parts = Vec::new();
    for segment in expr.split("//").skip(1) {
        if segment.is_empty() {
            return None;
        }
        let mut child_steps = Vec::new();
        for step in segment.split('/') {
            child_steps.push(step_to_css(step)?);
        }
        descendant_parts.push(child_steps.join(" > "));
    }

    if descendant_parts.is_empty() {
        return None;
    }

    Some(CssQuery {
        selector: descendant_parts.join(" "),
        attr,
    })
}

/// Translate one location step (`tag[pred][pred]...`) to CSS.
fn step_to_css(step: &str) -> Option<String> {
    let step = step.trim();
    if step.is_empty() {
        return None;
    }

    let (tag, mut rest) = match step.find('[') {
        Some(pos) => (&step[..pos], &step[pos..]),
        None => (step, ""),
    };

    if tag != "*" && !is_name(tag) {
        return None;
    }
    let mut css = if tag == "*" && !rest.is_empty() {
        String::new()
    } else {
        tag.to_string()
    };

    while !rest.is_empty() {
        let close = rest.find(']')?;
        let predicate = &rest[1..close];
        rest = &rest[close + 1..];

        css.push_str(&predicate_to_css(predicate)?);
    }

    Some(css)
}

fn predicate_to_css(predicate: &str) -> Option<String> {
    let predicate = predicate.trim();

    // positional [1] is implied by first-match evaluation
    if predicate == "1" {
        return Some(String::new());
    }

    // [contains(@attr, 'value')]
    if let Some(inner) = predicate
        .strip_prefix("contains(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let (attr, value) = inner.split_once(',')?;
        let attr = attr.trim().strip_prefix('@')?;
        let value = unquote(value.trim())?;
        if !is_name(attr) || value.contains(['"', '\\']) {
            return None;
        }
        return Some(format!("[{attr}*=\"{value}\"]"));
    }

    // [@attr='value'] or [@attr]
    if let Some(inner) = predicate.strip_prefix('@') {
        match inner.split_once('=') {
            Some((attr, value)) => {
                let attr = attr.trim();
                let value = unquote(value.trim())?;
                if !is_name(attr) || value.contains(['"', '\\']) {
                    return None;
                }
                return Some(format!("[{attr}=\"{value}\"]"));
            }
            None => {
                let attr = inner.trim();
                if !is_name(attr) {
                    return None;
                }
                return Some(format!("[{attr}]"));
            }
        }
    }

    None
}

fn unquote(value: &str) -> Option<String> {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 && (bytes[0] == b'\'' || bytes[0] == b'"') && bytes[bytes.len() - 1] == bytes[0]
    {
        Some(value[1..value.len() - 1].to_string())
    } else {
        None
    }
}

fn is_name(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Evaluates directive XPath expressions against a parsed document.
///
/// Expressions in the supported subset run as CSS queries; the rest fall
/// back to the sxd XPath engine over the raw markup, which only succeeds
/// on well-formed documents. Malformed expressions are reported to the
/// logger once and treated as "no match".
pub struct XPathEvaluator {
    factory: Factory,
    reported: RefCell<HashSet<String>>,
}

impl XPathEvaluator {
    pub fn new() -> Self {
        Self {
            factory: Factory::new(),
            reported: RefCell::new(HashSet::new()),
        }
    }

    /// First expression producing a non-empty text value wins
    pub fn first_string(&self, doc: &Document, raw_html: &str, exprs: &[String]) -> Option<String> {
        for expr in exprs {
            if let Some(value) = self.eval_string(doc, raw_html, expr) {
                if !value.trim().is_empty() {
                    return Some(value.trim().to_string());
                }
            }
        }
        None
    }

    /// First expression producing markup wins; all nodes matched by that
    /// expression are concatenated.
    pub fn first_outer_html(
        &self,
        doc: &Document,
        raw_html: &str,
        exprs: &[String],
    ) -> Option<String> {
        for expr in exprs {
            if let Some(query) = xpath_to_css(expr) {
                let Ok(elements) = doc.select(&query.selector) else {
                    self.report(expr);
                    continue;
                };
                if let Some(attr) = &query.attr {
                    // attribute values carry no markup, treat as text
                    if let Some(value) = elements.iter().find_map(|el| el.attr(attr)) {
                        if !value.trim().is_empty() {
                            return Some(value.trim().to_string());
                        }
                    }
                    continue;
                }
                if !elements.is_empty() {
                    let parts: Vec<String> = elements.iter().map(|el| el.outer_html()).collect();
                    return Some(parts.join("\n"));
                }
            } else if let Some(value) = self.sxd_string(raw_html, expr) {
                if !value.trim().is_empty() {
                    return Some(value);
                }
            }
        }
        None
    }

    /// First expression yielding a link wins: an attribute query returns
    /// its value, an element query returns the first `href` found.
    pub fn first_link(&self, doc: &Document, raw_html: &str, exprs: &[String]) -> Option<String> {
        for expr in exprs {
            if let Some(query) = xpath_to_css(expr) {
                let Ok(elements) = doc.select(&query.selector) else {
                    self.report(expr);
                    continue;
                };
                let attr = query.attr.as_deref().unwrap_or("href");
                if let Some(value) = elements
                    .iter()
                    .find_map(|el| el.attr(attr))
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
                {
                    return Some(value);
                }
            } else if let Some(value) = self.sxd_string(raw_html, expr) {
                let value = value.trim().to_string();
                if !value.is_empty() {
                    return Some(value);
                }
            }
        }
        None
    }

    fn eval_string(&self, doc: &Document, raw_html: &str, expr: &str) -> Option<String> {
        if let Some(query) = xpath_to_css(expr) {
            let Ok(elements) = doc.select(&query.selector) else {
                self.report(expr);
                return None;
            };
            return match &query.attr {
                Some(attr) => elements
                    .iter()
                    .find_map(|el| el.attr(attr))
                    .map(|v| v.to_string()),
                None => elements.first().map(|el| el.text()),
            };
        }
        self.sxd_string(raw_html, expr)
    }

    /// Raw XPath fallback. Requires the markup to parse as XML; real-world
    /// tag soup usually does not, in which case this is a silent miss.
    fn sxd_string(&self, raw_html: &str, expr: &str) -> Option<String> {
        let xpath = match self.factory.build(expr) {
            Ok(Some(xpath)) => xpath,
            Ok(None) | Err(_) => {
                self.report(expr);
                return None;
            }
        };

        let package = match xml_parser::parse(raw_html) {
            Ok(package) => package,
            Err(err) => {
                debug!(%err, "markup is not well-formed, raw XPath skipped");
                return None;
            }
        };

        let context = Context::new();
        match xpath.evaluate(&context, package.as_document().root()) {
            Ok(Value::String(s)) => Some(s),
            Ok(Value::Nodeset(nodeset)) => nodeset.document_order_first().map(|n| n.string_value()),
            Ok(_) => None,
            Err(err) => {
                warn!(expr, %err, "XPath evaluation failed");
                None
            }
        }
    }

    fn report(&self, expr: &str) {
        let mut reported = self.reported.borrow_mut();
        if reported.insert(expr.to_string()) {
            warn!(expr, "unsupported or malformed XPath, treated as no match");
        }
    }
}

impl Default for XPathEvaluator {
    fn default() -> Self {
        Self::new()
    }
}
