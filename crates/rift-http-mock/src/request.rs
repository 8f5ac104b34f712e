//! Read-only request descriptor handed to the router by a transport adapter.

use crate::error::{Error, Result};
use crate::pattern::MultiItems;
use bytes::Bytes;
use hyper::http::{HeaderName, HeaderValue};
use hyper::{HeaderMap, Uri};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Default port for a scheme, if it has one.
pub fn scheme_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    }
}

/// Absolute URL of an outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestUrl {
    pub scheme: String,
    pub host: String,
    /// Explicit port, `None` when the URL relies on the scheme default.
    pub port: Option<u16>,
    /// Raw (percent-encoded) path, always starting with `/`.
    pub path: String,
    /// Raw query string without the leading `?`, empty when absent.
    pub query: String,
}

impl RequestUrl {
    /// Parse an absolute URL.
    pub fn parse(url: &str) -> Result<Self> {
        let uri = Uri::from_str(url).map_err(|_| Error::InvalidUrl(url.to_string()))?;
        Self::from_uri(&uri)
    }

    /// Build from an absolute `Uri`.
    pub fn from_uri(uri: &Uri) -> Result<Self> {
        let (Some(scheme), Some(host)) = (uri.scheme_str(), uri.host()) else {
            return Err(Error::InvalidUrl(uri.to_string()));
        };
        let scheme = scheme.to_ascii_lowercase();
        let port = uri.port_u16().filter(|p| Some(*p) != scheme_port(&scheme));
        let path = match uri.path() {
            "" => "/".to_string(),
            p => p.to_string(),
        };

        Ok(RequestUrl {
            host: host.to_ascii_lowercase(),
            port,
            path,
            query: uri.query().unwrap_or_default().to_string(),
            scheme,
        })
    }

    /// Port used for the connection: the explicit one or the scheme default.
    pub fn effective_port(&self) -> Option<u16> {
        self.port.or_else(|| scheme_port(&self.scheme))
    }

    /// Percent-decoded path.
    pub fn decoded_path(&self) -> String {
        urlencoding::decode(&self.path)
            .map(|p| p.into_owned())
            .unwrap_or_else(|_| self.path.clone())
    }
}

impl fmt::Display for RequestUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        f.write_str(&self.path)?;
        if !self.query.is_empty() {
            write!(f, "?{}", self.query)?;
        }
        Ok(())
    }
}

/// Decode one `application/x-www-form-urlencoded` component.
fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|v| v.into_owned())
        .unwrap_or(spaced)
}

/// Parse a query string (or urlencoded body) into ordered multi-items, keeping blank values.
pub fn parse_query(query: &str) -> MultiItems {
    let query = query.strip_prefix('?').unwrap_or(query);
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (decode_component(key), decode_component(value)),
            None => (decode_component(pair), String::new()),
        })
        .collect()
}

/// Parse `Cookie` header values into a set of name/value pairs.
pub fn parse_cookies<'a>(headers: impl IntoIterator<Item = &'a str>) -> BTreeSet<(String, String)> {
    headers
        .into_iter()
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            Some((name.trim().to_string(), value.to_string()))
        })
        .filter(|(name, _)| !name.is_empty())
        .collect()
}

/// An outgoing request as seen by the router.
///
/// Built once per request by an adapter and never mutated by the router.
#[derive(Debug, Clone)]
pub struct Request {
    method: String,
    url: RequestUrl,
    headers: HeaderMap,
    body: Bytes,
}

impl Request {
    pub fn new(method: impl AsRef<str>, url: &str) -> Result<Self> {
        Ok(Self::from_parts(method, RequestUrl::parse(url)?, HeaderMap::new(), Bytes::new()))
    }

    pub fn from_parts(
        method: impl AsRef<str>,
        url: RequestUrl,
        headers: HeaderMap,
        body: Bytes,
    ) -> Self {
        Request {
            method: method.as_ref().to_ascii_uppercase(),
            url,
            headers,
            body,
        }
    }

    pub fn get(url: &str) -> Result<Self> {
        Self::new("GET", url)
    }

    pub fn post(url: &str) -> Result<Self> {
        Self::new("POST", url)
    }

    /// Append a header. Invalid names or values are ignored.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (HeaderName::from_str(name), HeaderValue::from_str(value)) {
            self.headers.append(name, value);
        }
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Set a JSON body and content type.
    pub fn json(self, value: &serde_json::Value) -> Self {
        self.header("content-type", "application/json")
            .body(value.to_string())
    }

    /// Set an urlencoded form body and content type.
    pub fn form<K: AsRef<str>, V: AsRef<str>>(self, fields: &[(K, V)]) -> Self {
        let encoded = fields
            .iter()
            .map(|(k, v)| {
                format!(
                    "{}={}",
                    urlencoding::encode(k.as_ref()),
                    urlencoding::encode(v.as_ref())
                )
            })
            .collect::<Vec<_>>()
            .join("&");
        self.header("content-type", "application/x-www-form-urlencoded")
            .body(encoded)
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &RequestUrl {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn content(&self) -> &Bytes {
        &self.body
    }

    /// Query parameters in request order.
    pub fn params(&self) -> MultiItems {
        parse_query(&self.url.query)
    }

    /// Headers as multi-items with lowercase names.
    pub fn header_items(&self) -> MultiItems {
        self.headers
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect()
    }

    pub fn cookies(&self) -> BTreeSet<(String, String)> {
        parse_cookies(
            self.headers
                .get_all(hyper::header::COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok()),
        )
    }

    /// Form fields of an urlencoded body. `None` for multipart bodies.
    pub fn form_data(&self) -> Option<MultiItems> {
        let content_type = self
            .headers
            .get(hyper::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if content_type.starts_with("multipart/form-data") {
            return None;
        }
        let body = std::str::from_utf8(&self.body).ok()?;
        Some(parse_query(body))
    }

    pub fn json_body(&self) -> Option<serde_json::Value> {
        serde_json::from_slice(&self.body).ok()
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Request({}, '{}')>", self.method, self.url)
    }
}
