//! Content-type dispatch.
//!
//! Non-HTML responses are routed by a configuration-supplied table whose
//! entries say whether a mime type becomes a download link or excludes
//! the URL entirely. Lookup tries the full mime first, then the
//! top-level type.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static MIME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"([-\w]+)/([-\w+]+)").unwrap());

/// What to do with a matched content type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchAction {
    /// Synthesize a link/stub article for the resource
    Link,
    /// Refuse to process the URL
    Exclude,
}

/// One dispatch table entry
#[derive(Debug, Clone)]
pub struct DispatchEntry {
    pub action: DispatchAction,
    pub name: String,
}

impl DispatchEntry {
    pub fn link(name: &str) -> Self {
        Self {
            action: DispatchAction::Link,
            name: name.to_string(),
        }
    }

    pub fn exclude(name: &str) -> Self {
        Self {
            action: DispatchAction::Exclude,
            name: name.to_string(),
        }
    }
}

/// Parsed content type plus the dispatch decision, when any
#[derive(Debug, Clone)]
pub struct MimeInfo {
    pub mime: String,
    pub ttype: String,
    pub subtype: String,
    pub action: Option<DispatchAction>,
    pub name: Option<String>,
}

/// Decides whether a response becomes "link", "exclude", or falls
/// through to extraction.
#[derive(Debug, Clone)]
pub struct MimeDispatcher {
    table: HashMap<String, DispatchEntry>,
}

impl MimeDispatcher {
    pub fn new(table: HashMap<String, DispatchEntry>) -> Self {
        Self { table }
    }

    /// The stock dispatch table
    pub fn with_defaults() -> Self {
        let mut table = HashMap::new();
        table.insert("application/pdf".to_string(), DispatchEntry::link("PDF"));
        table.insert("image".to_string(), DispatchEntry::link("Image"));
        table.insert("text/plain".to_string(), DispatchEntry::link("plain text"));
        table.insert("audio".to_string(), DispatchEntry::exclude("Audio"));
        table.insert("video".to_string(), DispatchEntry::exclude("Video"));
        Self::new(table)
    }

    /// Parse a Content-Type header and look it up in the table.
    ///
    /// Returns `None` when the header is absent or unparseable. A parsed
    /// mime with no table hit has `action`/`name` unset.
    pub fn dispatch(&self, content_type: Option<&str>) -> Option<MimeInfo> {
        let content_type = content_type?;
        let captures = MIME_RE.captures(content_type)?;

        let ttype = captures[1].to_lowercase();
        let subtype = captures[2].to_lowercase();
        let mime = format!("{ttype}/{subtype}");

        let entry = self.table.get(&mime).or_else(|| self.table.get(&ttype));

        Some(MimeInfo {
            mime,
            ttype,
            subtype,
            action: entry.map(|e| e.action),
            name: entry.map(|e| e.name.clone()),
        })
    }
}

impl Default for MimeDispatcher {
    fn default() -> Self {
        Self::with_defaults()
    }
}
