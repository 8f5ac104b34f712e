//! Composable request patterns.
//!
//! A [`Pattern`] is a small expression tree of attribute [`Leaf`] predicates joined
//! with `&`, `|` and `!`. Patterns compare structurally, so two routes built from the
//! same lookups share an identity. Matching a pattern yields a [`Match`] whose context
//! collects named regex groups.

mod builder;
mod items;
mod leaf;
mod lookup;
mod matcher;
mod url;

pub use builder::{combine, M};
pub use items::MultiItems;
pub use leaf::{CompiledRegex, Leaf, LookupValue, PatternKind, PatternValue};
pub use lookup::Lookup;
pub use matcher::{Context, Match};
pub use url::{merge_patterns, parse_url, parse_url_patterns, Bases, ParsedUrl, RawUrl, UrlInput};

use crate::error::Result;
use crate::request::Request;
use std::fmt;
use std::ops::{BitAnd, BitOr, Not};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Pattern {
    /// Matches every request. Absorbed by the combinators.
    #[default]
    Noop,
    Leaf(Leaf),
    And(Box<Pattern>, Box<Pattern>),
    Or(Box<Pattern>, Box<Pattern>),
    Not(Box<Pattern>),
}

impl Pattern {
    /// A leaf pattern, using the kind's default lookup when `lookup` is `None`.
    pub fn leaf(
        kind: PatternKind,
        value: impl Into<LookupValue>,
        lookup: Option<Lookup>,
    ) -> Result<Self> {
        Ok(Pattern::Leaf(Leaf::new(kind, value, lookup)?))
    }

    /// A regex leaf for `host`, `path` or `url`.
    pub fn regex(kind: PatternKind, regex: &str) -> Result<Self> {
        Self::leaf(kind, regex, Some(Lookup::Regex))
    }

    pub fn method(method: &str) -> Self {
        Self::exact(PatternKind::Method, PatternValue::Text(method.to_ascii_uppercase()))
    }

    pub fn scheme(scheme: &str) -> Self {
        Self::exact(PatternKind::Scheme, PatternValue::Text(scheme.to_ascii_lowercase()))
    }

    pub fn host(host: &str) -> Self {
        Self::exact(PatternKind::Host, PatternValue::Text(host.to_ascii_lowercase()))
    }

    pub fn port(port: u16) -> Self {
        Self::exact(PatternKind::Port, PatternValue::Port(Some(port)))
    }

    pub fn path(path: &str) -> Self {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        Self::exact(PatternKind::Path, PatternValue::Text(path))
    }

    fn exact(kind: PatternKind, value: PatternValue) -> Self {
        Pattern::Leaf(Leaf::exact(kind, value))
    }

    pub fn is_noop(&self) -> bool {
        matches!(self, Pattern::Noop)
    }

    pub fn matches(&self, request: &Request) -> Match {
        match self {
            Pattern::Noop => Match::new(true),
            Pattern::Leaf(leaf) => leaf.matches(request),
            Pattern::And(a, b) => {
                let a = a.matches(request);
                if !a.is_match() {
                    return a;
                }
                let b = b.matches(request);
                if !b.is_match() {
                    return b;
                }
                a.merge(b)
            }
            Pattern::Or(a, b) => {
                let a = a.matches(request);
                if a.is_match() {
                    return a;
                }
                b.matches(request)
            }
            Pattern::Not(p) => !p.matches(request),
        }
    }

    /// All leaves in evaluation order.
    pub fn leaves(&self) -> Vec<&Leaf> {
        let mut leaves = Vec::new();
        self.collect_leaves(&mut leaves);
        leaves
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Leaf>) {
        match self {
            Pattern::Noop => {}
            Pattern::Leaf(leaf) => out.push(leaf),
            Pattern::And(a, b) | Pattern::Or(a, b) => {
                a.collect_leaves(out);
                b.collect_leaves(out);
            }
            Pattern::Not(p) => p.collect_leaves(out),
        }
    }

    pub(crate) fn leaves_mut(&mut self) -> Vec<&mut Leaf> {
        let mut leaves = Vec::new();
        self.collect_leaves_mut(&mut leaves);
        leaves
    }

    fn collect_leaves_mut<'a>(&'a mut self, out: &mut Vec<&'a mut Leaf>) {
        match self {
            Pattern::Noop => {}
            Pattern::Leaf(leaf) => out.push(leaf),
            Pattern::And(a, b) | Pattern::Or(a, b) => {
                a.collect_leaves_mut(out);
                b.collect_leaves_mut(out);
            }
            Pattern::Not(p) => p.collect_leaves_mut(out),
        }
    }
}

impl From<Leaf> for Pattern {
    fn from(leaf: Leaf) -> Self {
        Pattern::Leaf(leaf)
    }
}

impl BitAnd for Pattern {
    type Output = Pattern;

    fn bitand(self, rhs: Pattern) -> Pattern {
        match (self, rhs) {
            (Pattern::Noop, p) | (p, Pattern::Noop) => p,
            (a, b) => Pattern::And(Box::new(a), Box::new(b)),
        }
    }
}

impl BitOr for Pattern {
    type Output = Pattern;

    fn bitor(self, rhs: Pattern) -> Pattern {
        match (self, rhs) {
            (Pattern::Noop, p) | (p, Pattern::Noop) => p,
            (a, b) => Pattern::Or(Box::new(a), Box::new(b)),
        }
    }
}

impl Not for Pattern {
    type Output = Pattern;

    fn not(self) -> Pattern {
        match self {
            Pattern::Noop => Pattern::Noop,
            p => Pattern::Not(Box::new(p)),
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Noop => f.write_str("<Noop>"),
            Pattern::Leaf(leaf) => write!(f, "{leaf}"),
            Pattern::And(a, b) => write!(f, "({a} AND {b})"),
            Pattern::Or(a, b) => write!(f, "({a} OR {b})"),
            Pattern::Not(p) => write!(f, "~{p}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn get(url: &str) -> Request {
        Request::get(url).unwrap()
    }

    #[test]
    fn test_noop_absorption() {
        let p = Pattern::method("GET");
        assert_eq!(Pattern::Noop & p.clone(), p);
        assert_eq!(p.clone() & Pattern::Noop, p);
        assert_eq!(Pattern::Noop | p.clone(), p);
        assert_eq!(!Pattern::Noop, Pattern::Noop);
        assert!(Pattern::Noop.matches(&get("https://foo.bar/")).is_match());
    }

    #[test]
    fn test_combinators() {
        let req = get("https://foo.bar/baz/");
        let get_ = Pattern::method("GET");
        let post = Pattern::method("POST");
        let baz = Pattern::path("/baz/");

        assert!((get_.clone() & baz.clone()).matches(&req).is_match());
        assert!(!(post.clone() & baz.clone()).matches(&req).is_match());
        assert!((post.clone() | baz.clone()).matches(&req).is_match());
        assert!((!post.clone()).matches(&req).is_match());
        assert!(!(!get_.clone()).matches(&req).is_match());
        assert!((get_ & !(post | Pattern::path("/ham/"))).matches(&req).is_match());
    }

    #[test]
    fn test_and_merges_contexts() {
        let req = get("https://foo.bar/baz/");
        let host = Pattern::regex(PatternKind::Host, r"(?P<sub>\w+)\.bar").unwrap();
        let path = Pattern::regex(PatternKind::Path, r"/(?P<slug>\w+)/").unwrap();
        let matched = (host & path).matches(&req);
        assert!(matched.is_match());
        assert_eq!(matched.context()["sub"], "foo");
        assert_eq!(matched.context()["slug"], "baz");
    }

    #[test]
    fn test_structural_equality() {
        let a = Pattern::method("get") & Pattern::path("baz/");
        let b = Pattern::method("GET") & Pattern::path("/baz/");
        let c = Pattern::path("/baz/") & Pattern::method("GET");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_leaves_in_order() {
        let p = Pattern::scheme("https") & !(Pattern::host("foo.bar") | Pattern::port(8080));
        let kinds: Vec<_> = p.leaves().iter().map(|l| l.kind()).collect();
        assert_eq!(
            kinds,
            vec![PatternKind::Scheme, PatternKind::Host, PatternKind::Port]
        );
    }

    #[test]
    fn test_display() {
        let p = Pattern::method("GET") & !Pattern::path("/baz/");
        assert_eq!(
            p.to_string(),
            r#"(<Method eq "GET"> AND ~<Path eq "/baz/">)"#
        );
    }

    fn method_strategy() -> impl Strategy<Value = Pattern> {
        prop_oneof![
            Just(Pattern::method("GET")),
            Just(Pattern::method("POST")),
            Just(Pattern::path("/baz/")),
            Just(Pattern::path("/ham/")),
            Just(Pattern::Noop),
        ]
    }

    fn pattern_strategy() -> impl Strategy<Value = Pattern> {
        method_strategy().prop_recursive(3, 16, 2, |inner| {
            prop_oneof![
                (inner.clone(), inner.clone()).prop_map(|(a, b)| a & b),
                (inner.clone(), inner.clone()).prop_map(|(a, b)| a | b),
                inner.prop_map(|p| !p),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_and_is_commutative_for_matching(a in pattern_strategy(), b in pattern_strategy()) {
            for url in ["https://foo.bar/baz/", "https://foo.bar/ham/", "https://foo.bar/"] {
                let req = get(url);
                prop_assert_eq!(
                    (a.clone() & b.clone()).matches(&req).is_match(),
                    (b.clone() & a.clone()).matches(&req).is_match()
                );
            }
        }

        #[test]
        fn prop_or_is_either(a in pattern_strategy(), b in pattern_strategy()) {
            // noop is absorbed by `|` rather than matching everything
            prop_assume!(!a.is_noop() && !b.is_noop());
            let req = get("https://foo.bar/baz/");
            prop_assert_eq!(
                (a.clone() | b.clone()).matches(&req).is_match(),
                a.matches(&req).is_match() || b.matches(&req).is_match()
            );
        }

        #[test]
        fn prop_double_negation(p in pattern_strategy()) {
            let req = get("https://foo.bar/ham/");
            prop_assert_eq!((!!p.clone()).matches(&req).is_match(), p.matches(&req).is_match());
        }
    }
}
