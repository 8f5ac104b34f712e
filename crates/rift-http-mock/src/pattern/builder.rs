use super::leaf::{Leaf, LookupValue, PatternKind};
use super::lookup::Lookup;
use super::url::{merge_patterns, parse_url_patterns, UrlInput};
use super::Pattern;
use crate::error::{Error, Result};

/// AND together all non-noop patterns; an empty input yields [`Pattern::Noop`].
pub fn combine(patterns: impl IntoIterator<Item = Pattern>) -> Pattern {
    patterns
        .into_iter()
        .fold(Pattern::Noop, |combined, pattern| combined & pattern)
}

/// Keyword pattern builder.
///
/// Keys take the form `<pattern>[__<path>][__<lookup>]`, for example `method`,
/// `path__regex` or `json__foo__0__bar`. The `url` key is split into scheme, host,
/// port, path and params patterns and merged as bases.
///
/// ```ignore
/// let pattern = M::new()
///     .lookup("method", "GET")
///     .lookup("url", "https://foo.bar/baz/")
///     .build()?;
/// ```
#[derive(Debug, Default)]
pub struct M {
    patterns: Vec<Pattern>,
    lookups: Vec<(String, LookupValue)>,
}

impl M {
    pub fn new() -> Self {
        Self::default()
    }

    /// Include an already built pattern.
    pub fn pattern(mut self, pattern: Pattern) -> Self {
        self.patterns.push(pattern);
        self
    }

    pub fn lookup(mut self, key: impl Into<String>, value: impl Into<LookupValue>) -> Self {
        self.lookups.push((key.into(), value.into()));
        self
    }

    pub fn build(self) -> Result<Pattern> {
        let mut patterns = self.patterns;
        let mut extras = None;

        for (key, value) in self.lookups {
            if key == "url" {
                extras = Some(parse_url_patterns(url_input(value)?.as_ref(), true)?);
                continue;
            }

            let leaf = parse_lookup(&key, value)?;

            // empty values only constrain under equality
            if leaf.value().is_empty() && leaf.lookup() != Lookup::Equal {
                continue;
            }
            patterns.push(Pattern::Leaf(leaf));
        }

        let combined = combine(patterns);
        Ok(match extras {
            Some(bases) => merge_patterns(combined, bases),
            None => combined,
        })
    }
}

fn parse_lookup(key: &str, value: LookupValue) -> Result<Leaf> {
    let (kind, rest) = key.split_once("__").unwrap_or((key, ""));
    let kind: PatternKind = kind.parse()?;

    if kind.supports_path() {
        let (path, lookup_name) = rest.rsplit_once("__").unwrap_or(("", rest));
        match lookup_name.parse::<Lookup>() {
            Ok(lookup) => Leaf::with_path(kind, value, Some(lookup), Some(path.to_string())),
            Err(_) => Leaf::with_path(kind, value, None, Some(rest.to_string())),
        }
    } else {
        let lookup = match rest {
            "" => None,
            name => Some(name.parse::<Lookup>()?),
        };
        Leaf::new(kind, value, lookup)
    }
}

fn url_input(value: LookupValue) -> Result<Option<UrlInput>> {
    match value {
        LookupValue::None => Ok(None),
        LookupValue::Text(text) => Ok(Some(UrlInput::Text(text))),
        LookupValue::RawUrl(raw) => Ok(Some(UrlInput::Raw(raw))),
        LookupValue::Regex(regex) => Ok(Some(UrlInput::Regex(regex))),
        other => Err(Error::InvalidUrl(format!("{other:?}"))),
    }
}

/// Build a [`Pattern`] from keyword lookups, as with [`M`].
///
/// ```ignore
/// let pattern = m!(method = "GET", path__regex = r"^/users/(?P<id>\d+)/$")?;
/// ```
#[macro_export]
macro_rules! m {
    ($($key:ident = $value:expr),* $(,)?) => {
        $crate::pattern::M::new()
            $(.lookup(stringify!($key), $value))*
            .build()
    };
}
