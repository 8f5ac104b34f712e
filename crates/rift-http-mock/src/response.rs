//! Mocked response description, converted to a native response by adapters.

use bytes::Bytes;
use hyper::header::CONTENT_TYPE;
use hyper::http::{HeaderName, HeaderValue};
use hyper::HeaderMap;
use std::fmt;
use std::str::FromStr;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const TEXT_HTML: &str = "text/html; charset=utf-8";
const APPLICATION_JSON: &str = "application/json";

#[derive(Debug, Clone, PartialEq)]
pub struct MockResponse {
    status: u16,
    headers: HeaderMap,
    content: Bytes,
    http_version: Option<String>,
}

impl Default for MockResponse {
    fn default() -> Self {
        Self::new(200)
    }
}

impl MockResponse {
    pub fn new(status: u16) -> Self {
        MockResponse {
            status,
            headers: HeaderMap::new(),
            content: Bytes::new(),
            http_version: None,
        }
    }

    /// Append a header. Invalid names or values are ignored.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (HeaderName::from_str(name), HeaderValue::from_str(value)) {
            self.headers.append(name, value);
        }
        self
    }

    pub fn merge_headers<H, K, V>(mut self, headers: H) -> Self
    where
        H: IntoIterator<Item = (K, V)>,
        HeaderName: TryFrom<K>,
        HeaderValue: TryFrom<V>,
    {
        for (key, value) in headers {
            if let (Ok(name), Ok(value)) = (HeaderName::try_from(key), HeaderValue::try_from(value))
            {
                self.headers.append(name, value);
            }
        }
        self
    }

    /// Replace the `Content-Type` header.
    pub fn content_type(mut self, content_type: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(content_type) {
            self.headers.insert(CONTENT_TYPE, value);
        }
        self
    }

    /// Raw body; leaves headers untouched.
    pub fn content(mut self, content: impl Into<Bytes>) -> Self {
        self.content = content.into();
        self
    }

    pub fn text(self, text: impl Into<String>) -> Self {
        self.content(text.into()).default_content_type(TEXT_PLAIN)
    }

    pub fn html(self, html: impl Into<String>) -> Self {
        self.content(html.into()).default_content_type(TEXT_HTML)
    }

    pub fn json(self, value: &serde_json::Value) -> Self {
        self.content(value.to_string())
            .default_content_type(APPLICATION_JSON)
    }

    pub fn http_version(mut self, version: impl Into<String>) -> Self {
        self.http_version = Some(version.into());
        self
    }

    fn default_content_type(self, content_type: &str) -> Self {
        if self.headers.contains_key(CONTENT_TYPE) {
            self
        } else {
            self.content_type(content_type)
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.content
    }

    pub fn text_body(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }

    pub fn json_body(&self) -> Option<serde_json::Value> {
        serde_json::from_slice(&self.content).ok()
    }

    pub fn version(&self) -> Option<&str> {
        self.http_version.as_deref()
    }
}

impl From<u16> for MockResponse {
    fn from(status: u16) -> Self {
        MockResponse::new(status)
    }
}

impl fmt::Display for MockResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Response [{}]>", self.status)
    }
}
