//! URL parsing into component patterns, and merging of base patterns.

use super::leaf::{Leaf, PatternKind};
use super::lookup::Lookup;
use super::Pattern;
use crate::error::{Error, Result};
use crate::request::scheme_port;
use regex::Regex;
use std::fmt::Write as _;

/// A pre-split URL as handed over by low-level transports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawUrl {
    pub scheme: String,
    pub host: String,
    pub port: Option<u16>,
    /// Path including any query string.
    pub path: String,
}

impl RawUrl {
    pub fn new(
        scheme: impl Into<String>,
        host: impl Into<String>,
        port: Option<u16>,
        path: impl Into<String>,
    ) -> Self {
        RawUrl {
            scheme: scheme.into(),
            host: host.into(),
            port,
            path: path.into(),
        }
    }

    pub fn to_parsed(&self) -> Result<ParsedUrl> {
        let host = if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        let port = self.port.map(|p| format!(":{p}")).unwrap_or_default();
        parse_url(&format!("{}://{host}{port}{}", self.scheme, self.path))
    }
}

/// URL given to the pattern builder or a router base.
#[derive(Debug, Clone)]
pub enum UrlInput {
    Text(String),
    Raw(RawUrl),
    Regex(Regex),
}

impl From<&str> for UrlInput {
    fn from(v: &str) -> Self {
        UrlInput::Text(v.to_string())
    }
}

impl From<String> for UrlInput {
    fn from(v: String) -> Self {
        UrlInput::Text(v)
    }
}

impl From<RawUrl> for UrlInput {
    fn from(v: RawUrl) -> Self {
        UrlInput::Raw(v)
    }
}

impl From<Regex> for UrlInput {
    fn from(v: Regex) -> Self {
        UrlInput::Regex(v)
    }
}

/// Components of a possibly partial URL. Absent parts are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedUrl {
    pub scheme: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub path: Option<String>,
    pub query: Option<String>,
}

impl ParsedUrl {
    /// Absolute form with a `/` path fallback and the default port dropped.
    pub fn to_url_string(&self) -> Result<String> {
        let (Some(scheme), Some(host)) = (&self.scheme, &self.host) else {
            return Err(Error::InvalidUrl(format!("{self:?}")));
        };
        let mut url = format!("{scheme}://{host}");
        if let Some(port) = self.port.filter(|p| Some(*p) != scheme_port(scheme)) {
            let _ = write!(url, ":{port}");
        }
        url.push_str(&encode_path(self.path.as_deref().unwrap_or("/")));
        if let Some(query) = &self.query {
            let _ = write!(url, "?{query}");
        }
        Ok(url)
    }

    /// Percent-decoded path.
    pub fn decoded_path(&self) -> Option<String> {
        self.path.as_ref().map(|path| {
            urlencoding::decode(path)
                .map(|p| p.into_owned())
                .unwrap_or_else(|_| path.clone())
        })
    }
}

/// Percent-encode characters a request line would never carry verbatim.
fn encode_path(path: &str) -> String {
    path.chars()
        .map(|c| {
            if c.is_ascii_graphic() {
                c.to_string()
            } else {
                urlencoding::encode(c.encode_utf8(&mut [0; 4])).into_owned()
            }
        })
        .collect()
}

/// Split a URL into its components.
///
/// Accepts absolute URLs, scheme-relative `//host/path` forms and bare paths.
/// Hosts may carry the `*` wildcard prefix used by base URLs.
pub fn parse_url(url: &str) -> Result<ParsedUrl> {
    let url = url.split('#').next().unwrap_or_default();
    let mut parsed = ParsedUrl::default();

    let rest = if let Some((scheme, rest)) = url.split_once("://") {
        if scheme.is_empty() || !scheme.chars().all(|c| c.is_ascii_alphanumeric() || "+-.".contains(c)) {
            return Err(Error::InvalidUrl(url.to_string()));
        }
        parsed.scheme = Some(scheme.to_ascii_lowercase());
        Some(rest)
    } else {
        url.strip_prefix("//")
    };

    let tail = match rest {
        Some(rest) => {
            let end = rest.find(['/', '?']).unwrap_or(rest.len());
            let (authority, tail) = rest.split_at(end);
            parse_authority(authority, &mut parsed).map_err(|_| Error::InvalidUrl(url.to_string()))?;
            tail
        }
        None => url,
    };

    let (path, query) = match tail.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (tail, None),
    };
    parsed.path = Some(path.to_string()).filter(|p| !p.is_empty());
    parsed.query = query.filter(|q| !q.is_empty()).map(str::to_string);
    Ok(parsed)
}

fn parse_authority(authority: &str, parsed: &mut ParsedUrl) -> std::result::Result<(), ()> {
    let authority = authority.rsplit('@').next().unwrap_or_default();
    let (host, port) = if authority.starts_with('[') {
        let end = authority.find(']').ok_or(())?;
        let (host, rest) = authority.split_at(end + 1);
        (host, rest.strip_prefix(':'))
    } else {
        match authority.split_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (authority, None),
        }
    };

    parsed.host = Some(host.to_ascii_lowercase()).filter(|h| !h.is_empty());
    parsed.port = match port.filter(|p| !p.is_empty()) {
        Some(port) => Some(port.parse().map_err(|_| ())?),
        None => None,
    };
    Ok(())
}

/// Component patterns derived from a URL, in scheme, host, port, path, params order.
pub type Bases = Vec<Leaf>;

/// Derive component patterns from a URL.
///
/// With `exact` the path and query must equal the URL's; otherwise the path is a
/// prefix and the query a subset. `all` (or a missing URL) yields no patterns and a
/// regex yields a single URL regex pattern.
pub fn parse_url_patterns(url: Option<&UrlInput>, exact: bool) -> Result<Bases> {
    let mut bases = Bases::new();
    let parsed = match url {
        None => return Ok(bases),
        Some(UrlInput::Text(text)) if text.is_empty() || text == "all" => return Ok(bases),
        Some(UrlInput::Regex(regex)) => {
            bases.push(Leaf::new(PatternKind::Url, regex.clone(), Some(Lookup::Regex))?);
            return Ok(bases);
        }
        Some(UrlInput::Text(text)) => parse_url(text)?,
        Some(UrlInput::Raw(raw)) => raw.to_parsed()?,
    };

    let default_port = parsed.scheme.as_deref().and_then(scheme_port);

    if let Some(scheme) = parsed.scheme.as_deref().filter(|s| *s != "all") {
        bases.push(Leaf::new(PatternKind::Scheme, scheme, None)?);
    }
    if let Some(host) = &parsed.host {
        let leaf = if let Some(domain) = host.strip_prefix("*.") {
            let regex = format!(r"^.+\.{}$", regex::escape(domain));
            Leaf::new(PatternKind::Host, regex, Some(Lookup::Regex))?
        } else if let Some(domain) = host.strip_prefix('*') {
            let regex = format!(r"^(.+\.)?{}$", regex::escape(domain));
            Leaf::new(PatternKind::Host, regex, Some(Lookup::Regex))?
        } else {
            Leaf::new(PatternKind::Host, host.as_str(), None)?
        };
        bases.push(leaf);
    }
    if let Some(port) = parsed.port.filter(|p| Some(*p) != default_port) {
        bases.push(Leaf::new(PatternKind::Port, port, None)?);
    }
    if let Some(path) = parsed.decoded_path() {
        let lookup = if exact { Lookup::Equal } else { Lookup::StartsWith };
        bases.push(Leaf::new(PatternKind::Path, path, Some(lookup))?);
    }
    if let Some(query) = &parsed.query {
        let lookup = if exact { Lookup::Equal } else { Lookup::Contains };
        bases.push(Leaf::new(PatternKind::Params, query.as_str(), Some(lookup))?);
    }

    Ok(bases)
}

/// Merge base patterns into a pattern.
///
/// A pattern with a host leaf is absolute and gets no bases. Otherwise each leaf
/// takes the base of its kind unless it already has one or the base is an exact
/// match. Bases not taken by any leaf are AND-ed in front of the pattern.
pub fn merge_patterns(mut pattern: Pattern, mut bases: Bases) -> Pattern {
    if bases.is_empty() {
        return pattern;
    }

    if !pattern.is_noop() {
        if pattern.leaves().iter().any(|l| l.kind() == PatternKind::Host) {
            bases.clear();
        } else {
            for leaf in pattern.leaves_mut() {
                let base = bases
                    .iter()
                    .position(|b| b.kind() == leaf.kind())
                    .map(|i| bases.remove(i));
                if leaf.base().is_some() || base.as_ref().is_some_and(|b| b.lookup() == Lookup::Equal) {
                    continue;
                }
                leaf.set_base(base);
            }
        }
    }

    if bases.is_empty() {
        return pattern;
    }
    super::combine(bases.into_iter().map(Pattern::from)) & pattern
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Request;

    fn kinds(bases: &Bases) -> Vec<PatternKind> {
        bases.iter().map(Leaf::kind).collect()
    }

    #[test]
    fn test_parse_url() {
        let url = parse_url("HTTPS://Foo.Bar:8080/baz/?ham=spam#frag").unwrap();
        assert_eq!(url.scheme.as_deref(), Some("https"));
        assert_eq!(url.host.as_deref(), Some("foo.bar"));
        assert_eq!(url.port, Some(8080));
        assert_eq!(url.path.as_deref(), Some("/baz/"));
        assert_eq!(url.query.as_deref(), Some("ham=spam"));

        let url = parse_url("//foo.bar").unwrap();
        assert_eq!(url.scheme, None);
        assert_eq!(url.host.as_deref(), Some("foo.bar"));
        assert_eq!(url.path, None);

        let url = parse_url("/baz/").unwrap();
        assert_eq!(url.host, None);
        assert_eq!(url.path.as_deref(), Some("/baz/"));

        let url = parse_url("http://[::1]:9000/").unwrap();
        assert_eq!(url.host.as_deref(), Some("[::1]"));
        assert_eq!(url.port, Some(9000));

        assert!(parse_url("https://foo.bar:port/").is_err());
    }

    #[test]
    fn test_url_string_normalization() {
        let url = |s: &str| parse_url(s).unwrap().to_url_string().unwrap();
        assert_eq!(url("https://foo.bar"), "https://foo.bar/");
        assert_eq!(url("https://foo.bar:443/baz/"), "https://foo.bar/baz/");
        assert_eq!(url("http://foo.bar:8000/?x=1"), "http://foo.bar:8000/?x=1");
        assert_eq!(url("https://foo.bar/äpple/"), "https://foo.bar/%C3%A4pple/");
        assert!(parse_url("/baz/").unwrap().to_url_string().is_err());
    }

    #[test]
    fn test_raw_url() {
        let raw = RawUrl::new("https", "::1", Some(8443), "/baz/?x=1");
        assert_eq!(
            raw.to_parsed().unwrap().to_url_string().unwrap(),
            "https://[::1]:8443/baz/?x=1"
        );
    }

    #[test]
    fn test_parse_url_patterns_exact() {
        let input = UrlInput::from("https://foo.bar:8080/baz/?ham=spam");
        let bases = parse_url_patterns(Some(&input), true).unwrap();
        assert_eq!(
            kinds(&bases),
            vec![
                PatternKind::Scheme,
                PatternKind::Host,
                PatternKind::Port,
                PatternKind::Path,
                PatternKind::Params
            ]
        );
        assert_eq!(bases[3].lookup(), Lookup::Equal);
        assert_eq!(bases[4].lookup(), Lookup::Equal);

        let bases = parse_url_patterns(Some(&input), false).unwrap();
        assert_eq!(bases[3].lookup(), Lookup::StartsWith);
        assert_eq!(bases[4].lookup(), Lookup::Contains);
    }

    #[test]
    fn test_parse_url_patterns_defaults() {
        assert!(parse_url_patterns(None, true).unwrap().is_empty());
        assert!(parse_url_patterns(Some(&"all".into()), true).unwrap().is_empty());
        assert!(parse_url_patterns(Some(&"all://".into()), true).unwrap().is_empty());

        // default port and missing path produce no patterns
        let bases = parse_url_patterns(Some(&"https://foo.bar:443".into()), true).unwrap();
        assert_eq!(kinds(&bases), vec![PatternKind::Scheme, PatternKind::Host]);

        let regex = Regex::new(r"https://foo\.bar/.+").unwrap();
        let bases = parse_url_patterns(Some(&regex.into()), true).unwrap();
        assert_eq!(kinds(&bases), vec![PatternKind::Url]);
        assert_eq!(bases[0].lookup(), Lookup::Regex);
    }

    #[test]
    fn test_wildcard_hosts() {
        let host = |url: &str| {
            let bases = parse_url_patterns(Some(&url.into()), true).unwrap();
            Pattern::from(bases[1].clone())
        };
        let get = |url: &str| Request::get(url).unwrap();

        let sub = host("https://*.foo.bar");
        assert!(sub.matches(&get("https://api.foo.bar/")).is_match());
        assert!(!sub.matches(&get("https://foo.bar/")).is_match());

        let any = host("https://*foo.bar");
        assert!(any.matches(&get("https://api.foo.bar/")).is_match());
        assert!(any.matches(&get("https://foo.bar/")).is_match());
        assert!(!any.matches(&get("https://foo.baz/")).is_match());

        let all = parse_url_patterns(Some(&"all://*.foo.bar".into()), true).unwrap();
        assert_eq!(kinds(&all), vec![PatternKind::Host]);
    }

    #[test]
    fn test_merge_patterns_sets_bases() {
        let bases = parse_url_patterns(Some(&"https://foo.bar/api/".into()), false).unwrap();
        let merged = merge_patterns(Pattern::path("/baz/"), bases);

        let leaves = merged.leaves();
        let path = leaves.iter().find(|l| l.kind() == PatternKind::Path).unwrap();
        assert_eq!(path.base().map(Leaf::lookup), Some(Lookup::StartsWith));

        assert!(merged.matches(&Request::get("https://foo.bar/api/baz/").unwrap()).is_match());
        assert!(!merged.matches(&Request::get("https://foo.bar/baz/").unwrap()).is_match());
        assert!(!merged.matches(&Request::get("http://foo.bar/api/baz/").unwrap()).is_match());
    }

    #[test]
    fn test_merge_patterns_skips_absolute_patterns() {
        let bases = parse_url_patterns(Some(&"https://foo.bar/api/".into()), false).unwrap();
        let pattern = Pattern::host("ham.spam") & Pattern::path("/baz/");
        let merged = merge_patterns(pattern.clone(), bases);
        assert_eq!(merged, pattern);
    }

    #[test]
    fn test_merge_patterns_into_noop() {
        let bases = parse_url_patterns(Some(&"https://foo.bar/".into()), false).unwrap();
        let merged = merge_patterns(Pattern::Noop, bases);
        assert_eq!(merged.leaves().len(), 3);
        assert!(merged.matches(&Request::get("https://foo.bar/anything").unwrap()).is_match());
    }

    #[test]
    fn test_merge_patterns_drops_exact_bases() {
        let bases = parse_url_patterns(Some(&"https://foo.bar/baz/".into()), true).unwrap();
        let merged = merge_patterns(Pattern::path("/ham/"), bases);
        let leaves = merged.leaves();
        assert_eq!(leaves.len(), 3);
        assert!(leaves.iter().all(|l| l.base().is_none()));
        assert!(merged.matches(&Request::get("https://foo.bar/ham/").unwrap()).is_match());
    }
}
