//! HTTP fetching.
//!
//! Produces the response contract the pipeline consumes: status, headers,
//! raw body bytes, and the effective URL after all redirects. Body bytes
//! are decoded to UTF-8 from the charset advertised in the headers, a
//! `<meta charset>` probe of the first 4 KB, or statistical detection.

use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use url::Url;

use crate::{DistillError, Result};

/// Upper bound on response bodies (10 MB)
pub const MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

static CHARSET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)charset\s*=\s*["']?([^"'\s;]+)"#).unwrap());

static META_CHARSET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)<meta\s+[^>]*?charset\s*=\s*["']?([^"'\s/>]+)"#).unwrap());

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Request timeout in seconds
    pub timeout: u64,
    /// User-Agent sent with every request
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: 30,
            user_agent: "Mozilla/5.0 (compatible; Distill/1.0; +https://github.com/distill-rs/distill)"
                .to_string(),
        }
    }
}

/// A fetched HTTP response.
///
/// `effective_url` reflects all redirects followed by the transport.
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
    pub effective_url: String,
}

impl FetchedResponse {
    /// The Content-Type header, if present
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type").map(String::as_str)
    }

    /// Decode the body to UTF-8 text
    pub fn text_utf8(&self) -> String {
        decode_body(&self.body, self.content_type())
    }
}

/// Build the shared HTTP client for the pipeline
pub fn build_client(config: &FetchConfig) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout))
        .user_agent(&config.user_agent)
        .redirect(reqwest::redirect::Policy::limited(10))
        .default_headers({
            let mut headers = reqwest::header::HeaderMap::new();
            headers.insert(
                reqwest::header::ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"
                    .parse()
                    .expect("static header value"),
            );
            headers
        })
        .build()
        .map_err(DistillError::HttpError)
}

/// Fetch a URL, following redirects.
///
/// `extra_headers` come from the matched site config's `http_header`
/// directives. Non-2xx statuses are not an error here; the pipeline
/// needs the observed status for its error-message result.
pub async fn fetch_url(
    client: &Client,
    url: &Url,
    extra_headers: &[(String, String)],
    timeout: u64,
) -> Result<FetchedResponse> {
    let mut request = client.get(url.clone());
    for (name, value) in extra_headers {
        request = request.header(name, value);
    }

    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            DistillError::Timeout { timeout }
        } else {
            DistillError::HttpError(e)
        }
    })?;

    let status = response.status().as_u16();
    let effective_url = response.url().to_string();

    let mut headers = HashMap::new();
    for (name, value) in response.headers() {
        if let Ok(value) = value.to_str() {
            headers.insert(name.as_str().to_lowercase(), value.to_string());
        }
    }

    if let Some(length) = response.content_length() {
        if length as usize > MAX_BODY_SIZE {
            return Err(DistillError::BodyTooLarge {
                bytes: length as usize,
            });
        }
    }

    let body = response.bytes().await.map_err(DistillError::HttpError)?;
    if body.len() > MAX_BODY_SIZE {
        return Err(DistillError::BodyTooLarge { bytes: body.len() });
    }

    Ok(FetchedResponse {
        status,
        headers,
        body,
        effective_url,
    })
}

/// Decode body bytes to a String: charset header, then meta probe of the
/// first 4 KB, then chardetng detection.
fn decode_body(body: &[u8], content_type: Option<&str>) -> String {
    if let Some(ct) = content_type {
        if let Some(captures) = CHARSET_RE.captures(ct) {
            if let Some(encoding) =
                encoding_rs::Encoding::for_label(captures[1].to_lowercase().as_bytes())
            {
                let (decoded, _, _) = encoding.decode(body);
                return decoded.into_owned();
            }
        }
    }

    let probe = &body[..body.len().min(4096)];
    let probe_str = String::from_utf8_lossy(probe);
    if let Some(captures) = META_CHARSET_RE.captures(&probe_str) {
        if let Some(encoding) =
            encoding_rs::Encoding::for_label(captures[1].to_lowercase().as_bytes())
        {
            let (decoded, _, _) = encoding.decode(body);
            return decoded.into_owned();
        }
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(body, true);
    let encoding = detector.guess(None, true);
    let (decoded, _, _) = encoding.decode(body);
    decoded.into_owned()
}
