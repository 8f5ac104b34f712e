//! Leaf patterns: one request attribute compared with one lookup.

use super::items::MultiItems;
use super::lookup::Lookup;
use super::matcher::{Context, Match};
use super::url::{parse_url, RawUrl};
use crate::error::{Error, Result};
use crate::request::{parse_query, Request};
use bytes::Bytes;
use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::Arc;

/// Request attribute a leaf pattern inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PatternKind {
    Method,
    Scheme,
    Host,
    Port,
    Path,
    Params,
    Headers,
    Cookies,
    Url,
    Content,
    Data,
    Json,
}

impl PatternKind {
    pub const ALL: [PatternKind; 12] = [
        PatternKind::Method,
        PatternKind::Scheme,
        PatternKind::Host,
        PatternKind::Port,
        PatternKind::Path,
        PatternKind::Params,
        PatternKind::Headers,
        PatternKind::Cookies,
        PatternKind::Url,
        PatternKind::Content,
        PatternKind::Data,
        PatternKind::Json,
    ];

    /// Keyword used by the pattern builder.
    pub fn key(&self) -> &'static str {
        match self {
            PatternKind::Method => "method",
            PatternKind::Scheme => "scheme",
            PatternKind::Host => "host",
            PatternKind::Port => "port",
            PatternKind::Path => "path",
            PatternKind::Params => "params",
            PatternKind::Headers => "headers",
            PatternKind::Cookies => "cookies",
            PatternKind::Url => "url",
            PatternKind::Content => "content",
            PatternKind::Data => "data",
            PatternKind::Json => "json",
        }
    }

    fn name(&self) -> &'static str {
        match self {
            PatternKind::Method => "Method",
            PatternKind::Scheme => "Scheme",
            PatternKind::Host => "Host",
            PatternKind::Port => "Port",
            PatternKind::Path => "Path",
            PatternKind::Params => "Params",
            PatternKind::Headers => "Headers",
            PatternKind::Cookies => "Cookies",
            PatternKind::Url => "URL",
            PatternKind::Content => "Content",
            PatternKind::Data => "Data",
            PatternKind::Json => "JSON",
        }
    }

    /// Supported lookups, the first one is the default.
    pub fn lookups(&self) -> &'static [Lookup] {
        match self {
            PatternKind::Method | PatternKind::Scheme | PatternKind::Port => {
                &[Lookup::Equal, Lookup::In]
            }
            PatternKind::Host => &[Lookup::Equal, Lookup::Regex, Lookup::In],
            PatternKind::Path => &[
                Lookup::Equal,
                Lookup::Regex,
                Lookup::StartsWith,
                Lookup::In,
            ],
            PatternKind::Params | PatternKind::Headers | PatternKind::Cookies => {
                &[Lookup::Contains, Lookup::Equal]
            }
            PatternKind::Url => &[Lookup::Equal, Lookup::Regex, Lookup::StartsWith],
            PatternKind::Content | PatternKind::Data => &[Lookup::Equal, Lookup::Contains],
            PatternKind::Json => &[Lookup::Equal],
        }
    }

    pub fn default_lookup(&self) -> Lookup {
        self.lookups()[0]
    }

    pub fn supports(&self, lookup: Lookup) -> bool {
        self.lookups().contains(&lookup)
    }

    /// Whether the builder accepts a `__`-separated value path for this kind.
    pub fn supports_path(&self) -> bool {
        matches!(self, PatternKind::Json)
    }
}

impl FromStr for PatternKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        PatternKind::ALL
            .into_iter()
            .find(|kind| kind.key() == s)
            .ok_or_else(|| Error::InvalidPattern(s.to_string()))
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A compiled regex compared by its source text.
#[derive(Debug, Clone)]
pub struct CompiledRegex(Arc<Regex>);

impl CompiledRegex {
    pub fn new(pattern: &str) -> std::result::Result<Self, regex::Error> {
        Ok(CompiledRegex(Arc::new(Regex::new(pattern)?)))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Search `value`, returning named groups that participated.
    pub fn captures(&self, value: &str) -> Option<Context> {
        let captures = self.0.captures(value)?;
        Some(
            self.0
                .capture_names()
                .flatten()
                .filter_map(|name| {
                    captures
                        .name(name)
                        .map(|m| (name.to_string(), m.as_str().to_string()))
                })
                .collect(),
        )
    }
}

impl From<Regex> for CompiledRegex {
    fn from(regex: Regex) -> Self {
        CompiledRegex(Arc::new(regex))
    }
}

impl PartialEq for CompiledRegex {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for CompiledRegex {}

impl Hash for CompiledRegex {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

/// Raw value handed to a pattern constructor, before cleaning.
#[derive(Debug, Clone)]
pub enum LookupValue {
    None,
    Text(String),
    Texts(Vec<String>),
    Port(Option<u16>),
    Ports(Vec<Option<u16>>),
    Regex(Regex),
    Pairs(Vec<(String, String)>),
    Bytes(Bytes),
    Json(serde_json::Value),
    RawUrl(RawUrl),
}

impl From<&str> for LookupValue {
    fn from(v: &str) -> Self {
        LookupValue::Text(v.to_string())
    }
}

impl From<String> for LookupValue {
    fn from(v: String) -> Self {
        LookupValue::Text(v)
    }
}

impl From<&String> for LookupValue {
    fn from(v: &String) -> Self {
        LookupValue::Text(v.clone())
    }
}

impl From<Vec<&str>> for LookupValue {
    fn from(v: Vec<&str>) -> Self {
        LookupValue::Texts(v.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<String>> for LookupValue {
    fn from(v: Vec<String>) -> Self {
        LookupValue::Texts(v)
    }
}

impl<const N: usize> From<[&str; N]> for LookupValue {
    fn from(v: [&str; N]) -> Self {
        LookupValue::Texts(v.into_iter().map(str::to_string).collect())
    }
}

impl From<u16> for LookupValue {
    fn from(v: u16) -> Self {
        LookupValue::Port(Some(v))
    }
}

impl From<Option<u16>> for LookupValue {
    fn from(v: Option<u16>) -> Self {
        LookupValue::Port(v)
    }
}

impl From<Vec<u16>> for LookupValue {
    fn from(v: Vec<u16>) -> Self {
        LookupValue::Ports(v.into_iter().map(Some).collect())
    }
}

impl<const N: usize> From<[u16; N]> for LookupValue {
    fn from(v: [u16; N]) -> Self {
        LookupValue::Ports(v.into_iter().map(Some).collect())
    }
}

impl From<Regex> for LookupValue {
    fn from(v: Regex) -> Self {
        LookupValue::Regex(v)
    }
}

impl From<Vec<(&str, &str)>> for LookupValue {
    fn from(v: Vec<(&str, &str)>) -> Self {
        LookupValue::Pairs(
            v.into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

impl<const N: usize> From<[(&str, &str); N]> for LookupValue {
    fn from(v: [(&str, &str); N]) -> Self {
        LookupValue::from(v.to_vec())
    }
}

impl From<Vec<(String, String)>> for LookupValue {
    fn from(v: Vec<(String, String)>) -> Self {
        LookupValue::Pairs(v)
    }
}

impl From<&[u8]> for LookupValue {
    fn from(v: &[u8]) -> Self {
        LookupValue::Bytes(Bytes::copy_from_slice(v))
    }
}

impl From<Vec<u8>> for LookupValue {
    fn from(v: Vec<u8>) -> Self {
        LookupValue::Bytes(Bytes::from(v))
    }
}

impl From<Bytes> for LookupValue {
    fn from(v: Bytes) -> Self {
        LookupValue::Bytes(v)
    }
}

impl From<serde_json::Value> for LookupValue {
    fn from(v: serde_json::Value) -> Self {
        LookupValue::Json(v)
    }
}

impl From<RawUrl> for LookupValue {
    fn from(v: RawUrl) -> Self {
        LookupValue::RawUrl(v)
    }
}

/// Cleaned pattern value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PatternValue {
    Text(String),
    Texts(Vec<String>),
    Port(Option<u16>),
    Ports(Vec<Option<u16>>),
    Regex(CompiledRegex),
    Items(MultiItems),
    Cookies(BTreeSet<(String, String)>),
    Bytes(Bytes),
    Json(String),
}

impl PatternValue {
    /// Whether the value is empty; the builder drops empty non-equality leaves.
    pub fn is_empty(&self) -> bool {
        match self {
            PatternValue::Text(v) | PatternValue::Json(v) => v.is_empty(),
            PatternValue::Texts(v) => v.is_empty(),
            PatternValue::Port(v) => v.is_none(),
            PatternValue::Ports(v) => v.is_empty(),
            PatternValue::Regex(_) => false,
            PatternValue::Items(v) => v.is_empty(),
            PatternValue::Cookies(v) => v.is_empty(),
            PatternValue::Bytes(v) => v.is_empty(),
        }
    }
}

impl fmt::Display for PatternValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternValue::Text(v) => write!(f, "{v:?}"),
            PatternValue::Texts(v) => write!(f, "{v:?}"),
            PatternValue::Port(Some(p)) => write!(f, "{p}"),
            PatternValue::Port(None) => f.write_str("None"),
            PatternValue::Ports(v) => write!(f, "{v:?}"),
            PatternValue::Regex(r) => write!(f, "re({:?})", r.as_str()),
            PatternValue::Items(items) => write!(f, "{:?}", items.pairs()),
            PatternValue::Cookies(c) => write!(f, "{c:?}"),
            PatternValue::Bytes(b) => write!(f, "b{:?}", String::from_utf8_lossy(b)),
            PatternValue::Json(j) => f.write_str(j),
        }
    }
}

/// Request value extracted for one leaf.
#[derive(Debug, Clone)]
enum Parsed {
    Text(String),
    Port(Option<u16>),
    Items(MultiItems),
    Cookies(BTreeSet<(String, String)>),
    Bytes(Bytes),
    Json(String),
}

/// Serialize JSON with object keys sorted so equal documents compare equal.
pub(crate) fn canonical_json(value: &serde_json::Value) -> String {
    use serde_json::Value;
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let body = entries
                .into_iter()
                .map(|(k, v)| format!("{}:{}", Value::String(k.clone()), canonical_json(v)))
                .collect::<Vec<_>>()
                .join(",");
            format!("{{{body}}}")
        }
        Value::Array(items) => {
            let body = items
                .iter()
                .map(canonical_json)
                .collect::<Vec<_>>()
                .join(",");
            format!("[{body}]")
        }
        other => other.to_string(),
    }
}

/// Follow a `__`-separated path into a JSON document, digits index arrays.
fn navigate_json<'a>(value: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
    path.split("__").try_fold(value, |current, bit| {
        match (bit.parse::<usize>(), current) {
            (Ok(index), serde_json::Value::Array(items)) => items.get(index),
            _ => current.get(bit),
        }
    })
}

/// A single attribute predicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Leaf {
    kind: PatternKind,
    lookup: Lookup,
    value: PatternValue,
    path: Option<String>,
    base: Option<Box<Leaf>>,
}

impl Leaf {
    /// Build a leaf, using the kind's default lookup when `lookup` is `None`.
    pub fn new(
        kind: PatternKind,
        value: impl Into<LookupValue>,
        lookup: Option<Lookup>,
    ) -> Result<Self> {
        Self::with_path(kind, value, lookup, None)
    }

    /// Build a leaf reading a nested value, e.g. `foo__0__bar` for JSON bodies.
    pub fn with_path(
        kind: PatternKind,
        value: impl Into<LookupValue>,
        lookup: Option<Lookup>,
        path: Option<String>,
    ) -> Result<Self> {
        let lookup = lookup.unwrap_or_else(|| kind.default_lookup());
        if !kind.supports(lookup) {
            return Err(Error::UnsupportedLookup {
                pattern: kind.key(),
                lookup,
            });
        }
        let value = clean(kind, lookup, value.into())?;
        Ok(Leaf {
            kind,
            lookup,
            value,
            path: path.filter(|p| !p.is_empty()),
            base: None,
        })
    }

    pub fn kind(&self) -> PatternKind {
        self.kind
    }

    pub fn lookup(&self) -> Lookup {
        self.lookup
    }

    pub fn value(&self) -> &PatternValue {
        &self.value
    }

    pub fn json_path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn base(&self) -> Option<&Leaf> {
        self.base.as_deref()
    }

    /// An equality leaf from an already normalized value.
    pub(crate) fn exact(kind: PatternKind, value: PatternValue) -> Self {
        Leaf {
            kind,
            lookup: Lookup::Equal,
            value,
            path: None,
            base: None,
        }
    }

    pub(crate) fn set_base(&mut self, base: Option<Leaf>) {
        self.base = base.map(Box::new);
    }

    pub fn matches(&self, request: &Request) -> Match {
        let Some(mut value) = self.parse(request) else {
            return Match::new(false);
        };

        if let Some(base) = &self.base {
            let base_match = base.match_value(&value);
            if !base_match.is_match() {
                return base_match;
            }
            value = self.strip_base(value);
        }

        self.match_value(&value)
    }

    fn parse(&self, request: &Request) -> Option<Parsed> {
        let url = request.url();
        let parsed = match self.kind {
            PatternKind::Method => Parsed::Text(request.method().to_string()),
            PatternKind::Scheme => Parsed::Text(url.scheme.clone()),
            PatternKind::Host => Parsed::Text(url.host.clone()),
            PatternKind::Port => Parsed::Port(url.effective_port()),
            PatternKind::Path => Parsed::Text(url.decoded_path()),
            PatternKind::Params => Parsed::Items(request.params()),
            PatternKind::Headers => Parsed::Items(request.header_items()),
            PatternKind::Cookies => Parsed::Cookies(request.cookies()),
            PatternKind::Url => Parsed::Text(url.to_string()),
            PatternKind::Content => Parsed::Bytes(request.content().clone()),
            PatternKind::Data => Parsed::Items(request.form_data()?),
            PatternKind::Json => {
                let json = request.json_body()?;
                let value = match &self.path {
                    Some(path) => navigate_json(&json, path)?,
                    None => &json,
                };
                Parsed::Json(canonical_json(value))
            }
        };
        Some(parsed)
    }

    fn strip_base(&self, value: Parsed) -> Parsed {
        match (&value, self.base.as_deref().map(|b| &b.value)) {
            (Parsed::Text(path), Some(PatternValue::Text(base))) if self.kind == PatternKind::Path => {
                let rest = path.get(base.len()..).unwrap_or_default();
                if rest.starts_with('/') {
                    Parsed::Text(rest.to_string())
                } else {
                    Parsed::Text(format!("/{rest}"))
                }
            }
            _ => value,
        }
    }

    fn match_value(&self, value: &Parsed) -> Match {
        match self.lookup {
            Lookup::Equal => Match::new(self.equal(value)),
            Lookup::Regex => match (value, &self.value) {
                (Parsed::Text(v), PatternValue::Regex(regex)) => match regex.captures(v) {
                    Some(context) => Match::with_context(true, context),
                    None => Match::new(false),
                },
                _ => Match::new(false),
            },
            Lookup::StartsWith => Match::new(match (value, &self.value) {
                (Parsed::Text(v), PatternValue::Text(prefix)) => v.starts_with(prefix.as_str()),
                _ => false,
            }),
            Lookup::Contains => Match::new(self.contains(value)),
            Lookup::In => Match::new(match (value, &self.value) {
                (Parsed::Text(v), PatternValue::Texts(options)) => options.contains(v),
                (Parsed::Port(v), PatternValue::Ports(options)) => options.contains(v),
                _ => false,
            }),
        }
    }

    fn equal(&self, value: &Parsed) -> bool {
        match (value, &self.value) {
            (Parsed::Text(v), PatternValue::Text(p)) => v == p,
            (Parsed::Port(v), PatternValue::Port(p)) => v == p,
            (Parsed::Items(v), PatternValue::Items(p)) => p.equals(v),
            (Parsed::Cookies(v), PatternValue::Cookies(p)) => v == p,
            (Parsed::Bytes(v), PatternValue::Bytes(p)) => v == p,
            (Parsed::Json(v), PatternValue::Json(p)) => v == p,
            _ => false,
        }
    }

    fn contains(&self, value: &Parsed) -> bool {
        match (value, &self.value) {
            (Parsed::Items(v), PatternValue::Items(p)) => p.contained_in(v),
            (Parsed::Cookies(v), PatternValue::Cookies(p)) => p.is_subset(v),
            (Parsed::Bytes(v), PatternValue::Bytes(p)) => {
                p.is_empty() || v.windows(p.len()).any(|w| w == p.as_ref())
            }
            _ => false,
        }
    }
}

impl fmt::Display for Leaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.kind.name())?;
        if let Some(path) = &self.path {
            write!(f, "[{path}]")?;
        }
        write!(f, " {} {}", self.lookup, self.value)?;
        if let Some(base) = &self.base {
            write!(f, " base={base}")?;
        }
        f.write_str(">")
    }
}

fn invalid(kind: PatternKind, reason: impl Into<String>) -> Error {
    Error::InvalidValue {
        pattern: kind.key(),
        reason: reason.into(),
    }
}

fn leading_slash(path: String) -> String {
    if path.starts_with('/') {
        path
    } else {
        format!("/{path}")
    }
}

/// Normalize a raw value for the given kind and lookup.
fn clean(kind: PatternKind, lookup: Lookup, value: LookupValue) -> Result<PatternValue> {
    use LookupValue as V;
    use PatternValue as P;

    if lookup == Lookup::Regex {
        return match value {
            V::Text(pattern) => Ok(P::Regex(CompiledRegex::new(&pattern)?)),
            V::Regex(regex) => Ok(P::Regex(regex.into())),
            other if kind == PatternKind::Url => Err(Error::InvalidUrl(format!("{other:?}"))),
            other => Err(invalid(kind, format!("expected a regex, got {other:?}"))),
        };
    }

    match kind {
        PatternKind::Method | PatternKind::Scheme | PatternKind::Host => {
            let normalize = |v: String| match kind {
                PatternKind::Method => v.to_ascii_uppercase(),
                _ => v.to_ascii_lowercase(),
            };
            match (lookup, value) {
                (Lookup::In, V::Texts(values)) => Ok(P::Texts(values.into_iter().map(normalize).collect())),
                (Lookup::In, V::Text(v)) => Ok(P::Texts(vec![normalize(v)])),
                (Lookup::Equal, V::Text(v)) => Ok(P::Text(normalize(v))),
                (_, other) => Err(invalid(kind, format!("unexpected value {other:?}"))),
            }
        }
        PatternKind::Port => match (lookup, value) {
            (Lookup::In, V::Ports(ports)) => Ok(P::Ports(ports)),
            (Lookup::In, V::Port(port)) => Ok(P::Ports(vec![port])),
            (Lookup::Equal, V::Port(port)) => Ok(P::Port(port)),
            (Lookup::Equal, V::None) => Ok(P::Port(None)),
            (Lookup::Equal, V::Text(text)) => text
                .parse::<u16>()
                .map(|p| P::Port(Some(p)))
                .map_err(|_| invalid(kind, format!("{text:?} is not a port"))),
            (_, other) => Err(invalid(kind, format!("unexpected value {other:?}"))),
        },
        PatternKind::Path => match (lookup, value) {
            (Lookup::In, V::Texts(paths)) => {
                Ok(P::Texts(paths.into_iter().map(leading_slash).collect()))
            }
            (Lookup::In, V::Text(path)) => Ok(P::Texts(vec![leading_slash(path)])),
            (Lookup::Equal | Lookup::StartsWith, V::Text(path)) => Ok(P::Text(leading_slash(path))),
            (_, other) => Err(invalid(kind, format!("unexpected value {other:?}"))),
        },
        PatternKind::Params | PatternKind::Data => match value {
            V::None => Ok(P::Items(MultiItems::new())),
            V::Text(query) => Ok(P::Items(parse_query(&query))),
            V::Pairs(pairs) => Ok(P::Items(pairs.into_iter().collect())),
            other => Err(invalid(kind, format!("unexpected value {other:?}"))),
        },
        PatternKind::Headers => match value {
            V::None => Ok(P::Items(MultiItems::new())),
            V::Pairs(pairs) => Ok(P::Items(
                pairs
                    .into_iter()
                    .collect::<MultiItems>()
                    .map_keys(str::to_ascii_lowercase),
            )),
            other => Err(invalid(kind, format!("unexpected value {other:?}"))),
        },
        PatternKind::Cookies => match value {
            V::None => Ok(P::Cookies(BTreeSet::new())),
            V::Pairs(pairs) => Ok(P::Cookies(pairs.into_iter().collect())),
            other => Err(invalid(kind, format!("unexpected value {other:?}"))),
        },
        PatternKind::Url => match (lookup, value) {
            (Lookup::Equal, V::Text(url)) if !url.is_empty() => {
                Ok(P::Text(parse_url(&url)?.to_url_string()?))
            }
            (Lookup::Equal, V::RawUrl(raw)) => Ok(P::Text(raw.to_parsed()?.to_url_string()?)),
            (Lookup::StartsWith, V::Text(prefix)) => Ok(P::Text(prefix)),
            (_, other) => Err(Error::InvalidUrl(format!("{other:?}"))),
        },
        PatternKind::Content => match value {
            V::Text(text) => Ok(P::Bytes(Bytes::from(text))),
            V::Bytes(bytes) => Ok(P::Bytes(bytes)),
            other => Err(invalid(kind, format!("unexpected value {other:?}"))),
        },
        PatternKind::Json => match value {
            V::Json(json) => Ok(P::Json(canonical_json(&json))),
            V::Text(text) => Ok(P::Json(canonical_json(&serde_json::Value::String(text)))),
            other => Err(invalid(kind, format!("unexpected value {other:?}"))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(url: &str) -> Request {
        Request::get(url).unwrap()
    }

    #[test]
    fn test_kind_registry() {
        assert_eq!("method".parse::<PatternKind>().unwrap(), PatternKind::Method);
        assert_eq!("json".parse::<PatternKind>().unwrap(), PatternKind::Json);
        assert!(matches!(
            "foo".parse::<PatternKind>(),
            Err(Error::InvalidPattern(name)) if name == "foo"
        ));
        assert_eq!(PatternKind::Params.default_lookup(), Lookup::Contains);
        assert_eq!(PatternKind::Path.default_lookup(), Lookup::Equal);
    }

    #[test]
    fn test_unsupported_lookup() {
        let err = Leaf::new(PatternKind::Scheme, "http", Some(Lookup::Regex)).unwrap_err();
        assert!(matches!(
            err,
            Error::UnsupportedLookup {
                pattern: "scheme",
                lookup: Lookup::Regex
            }
        ));
    }

    #[test]
    fn test_method_leaf() {
        let req = request("https://foo.bar/");
        assert!(Leaf::new(PatternKind::Method, "get", None).unwrap().matches(&req).is_match());
        assert!(!Leaf::new(PatternKind::Method, "POST", None).unwrap().matches(&req).is_match());
        let any_of = Leaf::new(PatternKind::Method, ["post", "get"], Some(Lookup::In)).unwrap();
        assert!(any_of.matches(&req).is_match());
    }

    #[test]
    fn test_scheme_and_host_leaves() {
        let req = request("https://foo.bar/");
        assert!(Leaf::new(PatternKind::Scheme, "HTTPS", None).unwrap().matches(&req).is_match());
        assert!(!Leaf::new(PatternKind::Scheme, "http", None).unwrap().matches(&req).is_match());
        assert!(Leaf::new(PatternKind::Host, "foo.bar", None).unwrap().matches(&req).is_match());
        let regex = Leaf::new(PatternKind::Host, r"^(?P<sub>\w+)\.bar$", Some(Lookup::Regex)).unwrap();
        let matched = regex.matches(&req);
        assert!(matched.is_match());
        assert_eq!(matched.context()["sub"], "foo");
    }

    #[test]
    fn test_port_leaf_uses_scheme_default() {
        let port = |p: Option<u16>| Leaf::new(PatternKind::Port, p, None).unwrap();
        assert!(port(Some(443)).matches(&request("https://foo.bar/")).is_match());
        assert!(!port(Some(80)).matches(&request("https://foo.bar/")).is_match());
        assert!(port(Some(80)).matches(&request("http://foo.bar/")).is_match());
        assert!(port(Some(8080)).matches(&request("https://foo.bar:8080/baz/")).is_match());

        let any_of = Leaf::new(PatternKind::Port, [80, 443], Some(Lookup::In)).unwrap();
        assert!(any_of.matches(&request("https://foo.bar/")).is_match());
        assert!(!any_of.matches(&request("https://foo.bar:8443/")).is_match());
    }

    #[test]
    fn test_path_leaf() {
        let req = request("https://foo.bar/baz/?ham=spam");
        assert!(Leaf::new(PatternKind::Path, "/baz/", None).unwrap().matches(&req).is_match());
        assert!(Leaf::new(PatternKind::Path, "baz/", None).unwrap().matches(&req).is_match());
        assert!(!Leaf::new(PatternKind::Path, "/ham/", None).unwrap().matches(&req).is_match());

        let regex = Leaf::new(PatternKind::Path, r"/(?P<slug>\w+)/", Some(Lookup::Regex)).unwrap();
        let matched = regex.matches(&req);
        assert!(matched.is_match());
        assert_eq!(matched.context().get("slug").map(String::as_str), Some("baz"));

        let prefix = Leaf::new(PatternKind::Path, "/ba", Some(Lookup::StartsWith)).unwrap();
        assert!(prefix.matches(&req).is_match());
    }

    #[test]
    fn test_path_in_adds_leading_slash() {
        let req = request("https://foo.bar/baz/");
        let any_of = Leaf::new(PatternKind::Path, ["ham/", "baz/"], Some(Lookup::In)).unwrap();
        assert_eq!(
            any_of.value(),
            &PatternValue::Texts(vec!["/ham/".into(), "/baz/".into()])
        );
        assert!(any_of.matches(&req).is_match());

        let single = Leaf::new(PatternKind::Path, "baz/", Some(Lookup::In)).unwrap();
        assert!(single.matches(&req).is_match());
        let other = Leaf::new(PatternKind::Path, ["spam/"], Some(Lookup::In)).unwrap();
        assert!(!other.matches(&req).is_match());
    }

    #[test]
    fn test_path_leaf_compares_decoded() {
        let req = request("https://foo.bar/%C3%A4pple/");
        assert!(Leaf::new(PatternKind::Path, "/äpple/", None).unwrap().matches(&req).is_match());
    }

    #[test]
    fn test_params_leaf() {
        let params = |q: &str| Leaf::new(PatternKind::Params, q, None).unwrap();
        assert!(params("x=1").matches(&request("https://foo.bar/?x=1")).is_match());
        assert!(!params("x=1&y=2").matches(&request("https://foo.bar/?x=1")).is_match());
        assert!(params("").matches(&request("https://foo.bar/")).is_match());

        let exact = Leaf::new(PatternKind::Params, "x=1", Some(Lookup::Equal)).unwrap();
        assert!(!exact.matches(&request("https://foo.bar/?x=1&y=2")).is_match());
    }

    #[test]
    fn test_headers_leaf_is_case_insensitive_on_names() {
        let req = request("https://foo.bar/")
            .header("X-Foo", "bar")
            .header("Accept", "text/plain");
        let contains = Leaf::new(PatternKind::Headers, [("x-FOO", "bar")], None).unwrap();
        assert!(contains.matches(&req).is_match());

        let equal = Leaf::new(PatternKind::Headers, [("x-foo", "bar")], Some(Lookup::Equal)).unwrap();
        assert!(!equal.matches(&req).is_match());
    }

    #[test]
    fn test_cookies_leaf() {
        let req = request("https://foo.bar/").header("cookie", "foo=bar; ham=spam");
        let contains = Leaf::new(PatternKind::Cookies, [("foo", "bar")], None).unwrap();
        assert!(contains.matches(&req).is_match());
        let missing = Leaf::new(PatternKind::Cookies, [("foo", "bar"), ("egg", "yolk")], None).unwrap();
        assert!(!missing.matches(&req).is_match());
        let equal =
            Leaf::new(PatternKind::Cookies, [("ham", "spam"), ("foo", "bar")], Some(Lookup::Equal)).unwrap();
        assert!(equal.matches(&req).is_match());
    }

    #[test]
    fn test_url_leaf() {
        let req = request("https://foo.bar/baz/");
        let eq = |u: &str| Leaf::new(PatternKind::Url, u, None).unwrap();
        assert!(eq("https://foo.bar/baz/").matches(&req).is_match());
        assert!(eq("https://foo.bar:443/baz/").matches(&req).is_match());
        assert!(!eq("https://foo.bar/ham/").matches(&req).is_match());
        assert!(eq("https://foo.bar").matches(&request("https://foo.bar/")).is_match());

        let regex = Leaf::new(
            PatternKind::Url,
            r"https?://foo.bar/(?P<slug>\w+)/",
            Some(Lookup::Regex),
        )
        .unwrap();
        assert_eq!(regex.matches(&req).context()["slug"], "baz");

        let prefix = Leaf::new(PatternKind::Url, "https://foo.bar/b", Some(Lookup::StartsWith)).unwrap();
        assert!(prefix.matches(&req).is_match());

        assert!(matches!(
            Leaf::new(PatternKind::Url, "", None),
            Err(Error::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_content_and_data_leaves() {
        let req = Request::post("https://foo.bar/")
            .unwrap()
            .form(&[("foo", "bar"), ("ham", "spam")]);
        assert!(Leaf::new(PatternKind::Content, "foo=bar", Some(Lookup::Contains))
            .unwrap()
            .matches(&req)
            .is_match());
        assert!(Leaf::new(PatternKind::Data, [("ham", "spam"), ("foo", "bar")], None)
            .unwrap()
            .matches(&req)
            .is_match());
        assert!(Leaf::new(PatternKind::Data, [("foo", "bar")], Some(Lookup::Contains))
            .unwrap()
            .matches(&req)
            .is_match());
        assert!(!Leaf::new(PatternKind::Data, [("foo", "bar")], None)
            .unwrap()
            .matches(&req)
            .is_match());
    }

    #[test]
    fn test_json_leaf() {
        let req = Request::post("https://foo.bar/")
            .unwrap()
            .json(&json!({"foo": "bar", "ham": [{"egg": 1}, {"egg": 2}]}));

        let whole = Leaf::new(
            PatternKind::Json,
            json!({"ham": [{"egg": 1}, {"egg": 2}], "foo": "bar"}),
            None,
        )
        .unwrap();
        assert!(whole.matches(&req).is_match());

        let nested =
            Leaf::with_path(PatternKind::Json, json!(2), None, Some("ham__1__egg".into())).unwrap();
        assert!(nested.matches(&req).is_match());

        let text = Leaf::with_path(PatternKind::Json, "bar", None, Some("foo".into())).unwrap();
        assert!(text.matches(&req).is_match());

        let missing = Leaf::with_path(PatternKind::Json, "x", None, Some("nope".into())).unwrap();
        assert!(!missing.matches(&req).is_match());

        assert!(!whole.matches(&request("https://foo.bar/")).is_match());
    }

    #[test]
    fn test_equality_and_hash_of_leaves() {
        use std::collections::HashSet;
        let a = Leaf::new(PatternKind::Method, "get", None).unwrap();
        let b = Leaf::new(PatternKind::Method, "GET", None).unwrap();
        let c = Leaf::new(PatternKind::Path, r"^/x", Some(Lookup::Regex)).unwrap();
        let d = Leaf::new(PatternKind::Path, r"^/x", Some(Lookup::Regex)).unwrap();
        assert_eq!(a, b);
        assert_eq!(c, d);
        let set: HashSet<_> = [a, b, c, d].into_iter().collect();
        assert_eq!(set.len(), 2);
    }
}
