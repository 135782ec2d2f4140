use crate::siteconfig::directives::SiteConfig;
use crate::siteconfig::xpath::xpath_to_css;
use lol_html::{ElementContentHandlers, HtmlRewriter, Selector, Settings};
use std::borrow::Cow;
use tracing::debug;

/// Applies `find_string`/`replace_string` pairs as literal substring
/// replacements, in declaration order.
pub struct TextReplacer {
    replacements: Vec<(String, String)>,
}

impl TextReplacer {
    pub fn from_config(config: &SiteConfig) -> Self {
        Self {
            replacements: config
                .replacements()
                .map(|(f, r)| (f.to_string(), r.to_string()))
                .collect(),
        }
    }

    pub fn apply(&self, html: &str) -> String {
        let mut result = html.to_string();
        for (find, replace) in &self.replacements {
            if !find.is_empty() {
                result = result.replace(find, replace);
            }
        }
        result
    }
}

/// Removes nodes matched by `strip`, `strip_id_or_class`, and
/// `strip_image_src` directives from a content block.
pub struct StripProcessor {
    selectors: Vec<String>,
}

impl StripProcessor {
    pub fn from_config(config: &SiteConfig) -> Self {
        let mut selectors = Vec::new();

        for xpath in &config.strip {
            match xpath_to_css(xpath) {
                // an attribute tail makes no sense for node removal
                Some(query) if query.attr.is_none() => selectors.push(query.selector),
                _ => debug!(xpath, "strip directive not translatable, skipped"),
            }
        }

        for pattern in &config.strip_id_or_class {
            if pattern.contains(['"', '\\']) {
                continue;
            }
            selectors.push(format!("[id*=\"{pattern}\"]"));
            selectors.push(format!("[class*=\"{pattern}\"]"));
        }

        for pattern in &config.strip_image_src {
            if pattern.contains(['"', '\\']) {
                continue;
            }
            selectors.push(format!("img[src*=\"{pattern}\"]"));
        }

        Self { selectors }
    }

    /// Remove every matching element from the given markup
    pub fn apply(&self, html: &str) -> String {
        if self.selectors.is_empty() {
            return html.to_string();
        }

        let mut handlers: Vec<(Cow<Selector>, ElementContentHandlers)> = Vec::new();
        for selector in &self.selectors {
            let parsed: Selector = match selector.parse() {
                Ok(parsed) => parsed,
                Err(err) => {
                    debug!(selector, ?err, "invalid strip selector, skipped");
                    continue;
                }
            };
            handlers.push((
                Cow::Owned(parsed),
                ElementContentHandlers::default().element(|el| {
                    el.remove();
                    Ok(())
                }),
            ));
        }

        let mut output = String::new();
        let mut rewriter = HtmlRewriter::new(
            Settings {
                element_content_handlers: handlers,
                ..Settings::default()
            },
            |chunk: &[u8]| output.push_str(&String::from_utf8_lossy(chunk)),
        );

        if rewriter.write(html.as_bytes()).is_err() || rewriter.end().is_err() {
            return html.to_string();
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::siteconfig::directives::Directive;

    #[test]
    fn test_text_replacement_in_order() {
        let mut config = SiteConfig::new();
        config.add_directive(Directive::FindReplace("<p />".to_string(), "<br />".to_string()));
        config.add_directive(Directive::FindReplace("<br />".to_string(), "<hr />".to_string()));

        let replacer = TextReplacer::from_config(&config);
        let result = replacer.apply("<div><p />text</div>");

        // first pair rewrites, second pair sees the result
        assert!(result.contains("<hr />"));
        assert!(!result.contains("<p />"));
    }

    #[test]
    fn test_strip_by_xpath() {
        let mut config = SiteConfig::new();
        config.add_directive(Directive::Strip("//div[@id='sidebar']".to_string()));

        let html = r#"<div id="sidebar">Sidebar</div><div id="main">Main content</div>"#;
        let result = StripProcessor::from_config(&config).apply(html);

        assert!(!result.contains("Sidebar"));
        assert!(result.contains("Main content"));
    }

    #[test]
    fn test_strip_id_or_class() {
        let mut config = SiteConfig::new();
        config.add_directive(Directive::StripIdOrClass("advertisement".to_string()));

        let html = r#"<div class="advertisement unit">Ad</div><p id="advertisement-2">Ad2</p><div class="main">Main</div>"#;
        let result = StripProcessor::from_config(&config).apply(html);

        assert!(!result.contains("Ad"));
        assert!(result.contains("Main"));
    }

    #[test]
    fn test_strip_image_src() {
        let mut config = SiteConfig::new();
        config.add_directive(Directive::StripImageSrc("/ads/".to_string()));

        let html = r#"<img src="/ads/banner.jpg" /><img src="/images/logo.png" />"#;
        let result = StripProcessor::from_config(&config).apply(html);

        assert!(!result.contains("/ads/banner.jpg"));
        assert!(result.contains("/images/logo.png"));
    }

    #[test]
    fn test_strip_untranslatable_directive_ignored() {
        let mut config = SiteConfig::new();
        config.add_directive(Directive::Strip("//div[position() > 1]".to_string()));

        let html = "<div>one</div><div>two</div>";
        let result = StripProcessor::from_config(&config).apply(html);
        assert_eq!(result, html);
    }

    #[test]
    fn test_no_directives_is_identity() {
        let config = SiteConfig::new();
        let html = "<article><p>Body</p></article>";
        assert_eq!(StripProcessor::from_config(&config).apply(html), html);
    }
}
