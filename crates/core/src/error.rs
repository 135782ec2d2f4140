use thiserror::Error;

/// Main error type for the extraction pipeline
#[derive(Error, Debug)]
pub enum DistillError {
    /// HTTP request errors
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Request timeout
    #[error("Request timed out after {timeout} seconds")]
    Timeout { timeout: u64 },

    /// Invalid URL provided
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// URL or response rejected by the allow/block policy
    #[error("Blocked by policy: {0}")]
    PolicyBlocked(String),

    /// Response body exceeded the configured cap
    #[error("Response body too large: {bytes} bytes")]
    BodyTooLarge { bytes: usize },

    /// HTML parsing errors
    #[error("Failed to parse HTML: {0}")]
    HtmlParseError(String),

    /// Site configuration errors
    #[error("Site configuration error: {0}")]
    SiteConfigError(String),

    /// XPath evaluation errors
    #[error("XPath error: {0}")]
    XPathError(String),

    /// Filesystem errors while reading rule files
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for DistillError
pub type Result<T> = std::result::Result<T, DistillError>;
