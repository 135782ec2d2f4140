use crate::error::Result;
use crate::siteconfig::directives::{Directive, HtmlParser, SiteConfig};
use std::path::Path;
use tracing::debug;

/// Site-rule file parser.
///
/// One directive per line, `key: value`, `#` starts a comment. Lines
/// without a colon and unknown keys are skipped, never fatal.
#[derive(Debug)]
pub struct ConfigParser;

impl ConfigParser {
    /// Parse a single rule file
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<SiteConfig> {
        let content = std::fs::read_to_string(&path)?;
        Ok(Self::parse_string(&content))
    }

    /// Parse rule directives from a string
    pub fn parse_string(content: &str) -> SiteConfig {
        let mut config = SiteConfig::new();

        for line in content.lines() {
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(directive) = parse_directive(line) {
                config.add_directive(directive);
            }
        }

        config
    }
}

/// Parse one directive line. Returns `None` for lines that carry nothing
/// usable (no colon, empty key or value, unknown key).
pub fn parse_directive(line: &str) -> Option<Directive> {
    let (key, value) = line.split_once(':')?;
    let key = key.trim();
    let value = value.trim();

    if key.is_empty() || value.is_empty() {
        return None;
    }

    match key {
        "title" => Some(Directive::Title(value.to_string())),
        "body" => Some(Directive::Body(value.to_string())),
        "author" => Some(Directive::Author(value.to_string())),
        "date" => Some(Directive::Date(value.to_string())),

        "strip" => Some(Directive::Strip(value.to_string())),
        "strip_id_or_class" => Some(Directive::StripIdOrClass(value.to_string())),
        "strip_image_src" => Some(Directive::StripImageSrc(value.to_string())),

        "tidy" => Some(Directive::Tidy(parse_boolean(value))),
        "prune" => Some(Directive::Prune(parse_boolean(value))),
        "autodetect_on_failure" => Some(Directive::AutodetectOnFailure(parse_boolean(value))),

        "parser" => match HtmlParser::from_directive(value) {
            Some(parser) => Some(Directive::Parser(parser)),
            None => {
                debug!(value, "unknown parser value, directive ignored");
                None
            }
        },

        "single_page_link" => Some(Directive::SinglePageLink(value.to_string())),
        "next_page_link" => Some(Directive::NextPageLink(value.to_string())),

        "find_string" => Some(Directive::FindString(value.to_string())),
        "replace_string" => Some(Directive::ReplaceString(value.to_string())),

        "test_url" => Some(Directive::TestUrl(value.to_string())),

        _ => parse_parenthesized(key, value).or_else(|| {
            debug!(key, "unknown directive, skipped");
            None
        }),
    }
}

/// Handle the `http_header(Name): value` and `replace_string(find): replace`
/// forms, where the parenthesized token binds an extra argument.
fn parse_parenthesized(key: &str, value: &str) -> Option<Directive> {
    if let Some(name) = key
        .strip_prefix("http_header(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        return Some(Directive::HttpHeader(name.to_string(), value.to_string()));
    }

    if let Some(find) = key
        .strip_prefix("replace_string(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        return Some(Directive::FindReplace(find.to_string(), value.to_string()));
    }

    None
}

/// Booleans are true iff the value is `yes` or `true`; anything else is false.
fn parse_boolean(value: &str) -> bool {
    matches!(value, "yes" | "true")
}
