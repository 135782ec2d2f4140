use tracing::debug;

/// HTML parser selected by the `parser` directive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HtmlParser {
    #[default]
    Libxml,
    Html5lib,
}

impl HtmlParser {
    pub fn from_directive(value: &str) -> Option<Self> {
        match value {
            "libxml" => Some(Self::Libxml),
            "html5lib" => Some(Self::Html5lib),
            _ => None,
        }
    }
}

/// Represents a single site-rule directive
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// XPath expressions for content extraction
    Title(String),
    Body(String),
    Author(String),
    Date(String),

    /// Strip directives for removing unwanted elements
    Strip(String),
    StripIdOrClass(String),
    StripImageSrc(String),

    /// Behavior options
    Tidy(bool),
    Prune(bool),
    AutodetectOnFailure(bool),
    Parser(HtmlParser),

    /// Pagination
    SinglePageLink(String),
    NextPageLink(String),

    /// Text replacement; the paired form carries both sides at once
    FindString(String),
    ReplaceString(String),
    FindReplace(String, String),

    /// HTTP configuration
    HttpHeader(String, String),

    /// Testing
    TestUrl(String),
}

/// Site configuration containing all directives for one hostname.
///
/// Multi-valued fields keep insertion order and drop duplicates on merge.
/// `find_string`/`replace_string` are positional pairs and are concatenated
/// on merge, never deduplicated. The tri-state booleans distinguish
/// declared-true, declared-false, and undeclared; defaults are applied by
/// the `should_*` accessors only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SiteConfig {
    /// Extraction directives (multiple allowed, evaluated in order)
    pub title: Vec<String>,
    pub body: Vec<String>,
    pub author: Vec<String>,
    pub date: Vec<String>,

    /// Strip directives
    pub strip: Vec<String>,
    pub strip_id_or_class: Vec<String>,
    pub strip_image_src: Vec<String>,

    /// Behavior options
    pub tidy: Option<bool>,
    pub prune: Option<bool>,
    pub autodetect_on_failure: Option<bool>,
    pub parser: Option<HtmlParser>,

    /// Pagination
    pub single_page_link: Vec<String>,
    pub next_page_link: Vec<String>,

    /// Text replacement (index-aligned pairs)
    pub find_string: Vec<String>,
    pub replace_string: Vec<String>,

    /// Extra HTTP headers sent when fetching pages for this host
    pub http_headers: Vec<(String, String)>,

    /// Test URLs for rule maintainers
    pub test_urls: Vec<String>,

    /// Host string of the rule file this config was loaded from
    pub cache_key: Option<String>,
}

fn extend_unique(dst: &mut Vec<String>, src: &[String]) {
    for value in src {
        if !dst.contains(value) {
            dst.push(value.clone());
        }
    }
}

impl SiteConfig {
    /// Create a new empty site config
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a directive to this config
    pub fn add_directive(&mut self, directive: Directive) {
        match directive {
            Directive::Title(xpath) => self.title.push(xpath),
            Directive::Body(xpath) => self.body.push(xpath),
            Directive::Author(xpath) => self.author.push(xpath),
            Directive::Date(xpath) => self.date.push(xpath),

            Directive::Strip(xpath) => self.strip.push(xpath),
            Directive::StripIdOrClass(pattern) => self.strip_id_or_class.push(pattern),
            Directive::StripImageSrc(pattern) => self.strip_image_src.push(pattern),

            Directive::Tidy(value) => self.tidy = Some(value),
            Directive::Prune(value) => self.prune = Some(value),
            Directive::AutodetectOnFailure(value) => self.autodetect_on_failure = Some(value),
            Directive::Parser(parser) => self.parser = Some(parser),

            Directive::SinglePageLink(xpath) => self.single_page_link.push(xpath),
            Directive::NextPageLink(xpath) => self.next_page_link.push(xpath),

            Directive::FindString(find) => self.find_string.push(find),
            Directive::ReplaceString(replace) => self.replace_string.push(replace),
            Directive::FindReplace(find, replace) => {
                self.find_string.push(find);
                self.replace_string.push(replace);
            }

            Directive::HttpHeader(name, value) => self.http_headers.push((name, value)),

            Directive::TestUrl(url) => self.test_urls.push(url),
        }
    }

    /// Merge another config into this one.
    ///
    /// Multi-valued lists take the set-union preserving first-seen order.
    /// Scalar options from `other` only fill slots this config left
    /// undeclared; a value already declared here always survives.
    /// Replacement pairs are concatenated without deduplication so index
    /// alignment is preserved.
    pub fn merge(&mut self, other: &SiteConfig) {
        extend_unique(&mut self.title, &other.title);
        extend_unique(&mut self.body, &other.body);
        extend_unique(&mut self.author, &other.author);
        extend_unique(&mut self.date, &other.date);

        extend_unique(&mut self.strip, &other.strip);
        extend_unique(&mut self.strip_id_or_class, &other.strip_id_or_class);
        extend_unique(&mut self.strip_image_src, &other.strip_image_src);

        extend_unique(&mut self.single_page_link, &other.single_page_link);
        extend_unique(&mut self.next_page_link, &other.next_page_link);

        extend_unique(&mut self.test_urls, &other.test_urls);

        if self.tidy.is_none() {
            self.tidy = other.tidy;
        }
        if self.prune.is_none() {
            self.prune = other.prune;
        }
        if self.autodetect_on_failure.is_none() {
            self.autodetect_on_failure = other.autodetect_on_failure;
        }
        if self.parser.is_none() {
            self.parser = other.parser;
        }

        self.find_string.extend(other.find_string.iter().cloned());
        self.replace_string.extend(other.replace_string.iter().cloned());

        for (name, value) in &other.http_headers {
            if !self.http_headers.iter().any(|(n, v)| n == name && v == value) {
                self.http_headers.push((name.clone(), value.clone()));
            }
        }
    }

    /// Effective tidy setting (default: true)
    pub fn should_tidy(&self) -> bool {
        self.tidy.unwrap_or(true)
    }

    /// Effective prune setting (default: true)
    pub fn should_prune(&self) -> bool {
        self.prune.unwrap_or(true)
    }

    /// Effective autodetect-on-failure setting (default: true)
    pub fn should_autodetect(&self) -> bool {
        self.autodetect_on_failure.unwrap_or(true)
    }

    /// Effective parser (default: libxml)
    pub fn effective_parser(&self) -> HtmlParser {
        self.parser.unwrap_or_default()
    }

    /// Iterate index-aligned `(find, replace)` pairs.
    ///
    /// A dangling `find_string` with no matching `replace_string` (or the
    /// reverse) is dropped rather than mispaired.
    pub fn replacements(&self) -> impl Iterator<Item = (&str, &str)> {
        if self.find_string.len() != self.replace_string.len() {
            debug!(
                finds = self.find_string.len(),
                replaces = self.replace_string.len(),
                "unbalanced find_string/replace_string, extra entries ignored"
            );
        }
        self.find_string
            .iter()
            .zip(self.replace_string.iter())
            .map(|(f, r)| (f.as_str(), r.as_str()))
    }

    /// Check if this config carries no directives at all
    pub fn is_empty(&self) -> bool {
        self.title.is_empty()
            && self.body.is_empty()
            && self.author.is_empty()
            && self.date.is_empty()
            && self.strip.is_empty()
            && self.strip_id_or_class.is_empty()
            && self.strip_image_src.is_empty()
            && self.single_page_link.is_empty()
            && self.next_page_link.is_empty()
            && self.find_string.is_empty()
            && self.replace_string.is_empty()
            && self.http_headers.is_empty()
            && self.test_urls.is_empty()
            && self.tidy.is_none()
            && self.prune.is_none()
            && self.autodetect_on_failure.is_none()
            && self.parser.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_directive() {
        let mut config = SiteConfig::new();
        config.add_directive(Directive::Title("//h1".to_string()));
        config.add_directive(Directive::Body("//article".to_string()));

        assert_eq!(config.title, vec!["//h1"]);
        assert_eq!(config.body, vec!["//article"]);
    }

    #[test]
    fn test_merge_lists_deduplicate() {
        let mut site = SiteConfig::new();
        site.add_directive(Directive::Title("//h1".to_string()));

        let mut global = SiteConfig::new();
        global.add_directive(Directive::Title("//h1".to_string()));
        global.add_directive(Directive::Title("//h2".to_string()));

        site.merge(&global);
        assert_eq!(site.title, vec!["//h1", "//h2"]);
    }

    #[test]
    fn test_merge_declared_boolean_survives() {
        let mut site = SiteConfig::new();
        site.add_directive(Directive::Tidy(false));

        let mut global = SiteConfig::new();
        global.add_directive(Directive::Tidy(true));
        global.add_directive(Directive::Prune(false));

        site.merge(&global);

        // site's declared value wins; undeclared slots are filled
        assert_eq!(site.tidy, Some(false));
        assert_eq!(site.prune, Some(false));
    }

    #[test]
    fn test_merge_with_empty_is_identity() {
        let mut config = SiteConfig::new();
        config.add_directive(Directive::Title("//h1".to_string()));
        config.add_directive(Directive::Prune(false));
        config.add_directive(Directive::FindReplace("a".to_string(), "b".to_string()));

        let before = config.clone();
        config.merge(&SiteConfig::new());
        assert_eq!(config, before);
    }

    #[test]
    fn test_merge_replacements_concatenated() {
        let mut first = SiteConfig::new();
        first.add_directive(Directive::FindReplace("x".to_string(), "y".to_string()));

        let mut second = SiteConfig::new();
        second.add_directive(Directive::FindReplace("x".to_string(), "y".to_string()));
        second.add_directive(Directive::FindReplace("p".to_string(), "q".to_string()));

        first.merge(&second);

        // no deduplication, pairs stay aligned
        assert_eq!(first.find_string.len(), 3);
        assert_eq!(first.replace_string.len(), 3);
        let pairs: Vec<_> = first.replacements().collect();
        assert_eq!(pairs, vec![("x", "y"), ("x", "y"), ("p", "q")]);
    }

    #[test]
    fn test_replacements_drop_dangling_entry() {
        let mut config = SiteConfig::new();
        config.add_directive(Directive::FindString("one".to_string()));
        config.add_directive(Directive::FindString("two".to_string()));
        config.add_directive(Directive::ReplaceString("1".to_string()));

        let pairs: Vec<_> = config.replacements().collect();
        assert_eq!(pairs, vec![("one", "1")]);
    }

    #[test]
    fn test_tri_state_defaults() {
        let config = SiteConfig::new();
        assert!(config.should_tidy());
        assert!(config.should_prune());
        assert!(config.should_autodetect());
        assert_eq!(config.effective_parser(), HtmlParser::Libxml);
        assert_eq!(config.tidy, None);
    }

    #[test]
    fn test_is_empty() {
        let config = SiteConfig::new();
        assert!(config.is_empty());

        let mut config = SiteConfig::new();
        config.add_directive(Directive::Strip("//aside".to_string()));
        assert!(!config.is_empty());

        let mut config = SiteConfig::new();
        config.add_directive(Directive::Prune(false));
        assert!(!config.is_empty());
    }
}
