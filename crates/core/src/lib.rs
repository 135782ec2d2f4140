pub mod article;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod metadata;
pub mod mime;
pub mod parse;
pub mod pipeline;
pub mod postprocess;
pub mod preprocess;
pub mod readability;
pub mod siteconfig;

pub use article::Article;
pub use error::{DistillError, Result};
pub use extract::ContentExtractor;
pub use fetch::{FetchConfig, FetchedResponse, fetch_url};
pub use mime::{DispatchAction, DispatchEntry, MimeDispatcher, MimeInfo};
pub use parse::{Document, Element};
pub use pipeline::{LinkPolicy, Pipeline, PipelineConfig, normalize_url};
pub use siteconfig::{
    ConfigFileStore, ConfigParser, ConfigResolver, Directive, HtmlParser, ResolverConfig,
    SiteConfig, XPathEvaluator,
};
