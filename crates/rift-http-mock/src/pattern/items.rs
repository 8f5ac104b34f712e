//! Ordered multi-valued maps used by header, query and form patterns.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

/// Ordered `(key, value)` pairs allowing duplicate keys.
///
/// Comparison groups values per key (keys sorted, values in insertion order),
/// so `x=1&y=2` equals `y=2&x=1` but `x=1&x=2` differs from `x=2&x=1`.
#[derive(Debug, Clone, Default)]
pub struct MultiItems {
    pairs: Vec<(String, String)>,
}

impl MultiItems {
    /// Wildcard value: matches any single request value at its position.
    pub const ANY: &'static str = "<ANY>";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// All values of a key, in order.
    pub fn get_list(&self, key: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Values grouped per key, keys sorted.
    pub fn grouped(&self) -> BTreeMap<&str, Vec<&str>> {
        let mut grouped: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (key, value) in &self.pairs {
            grouped.entry(key.as_str()).or_default().push(value.as_str());
        }
        grouped
    }

    /// Map every key, e.g. to lowercase header names.
    pub fn map_keys(self, f: impl Fn(&str) -> String) -> Self {
        self.pairs.into_iter().map(|(k, v)| (f(&k), v)).collect()
    }

    /// Exact multi-map equality; wildcard values in `self` match anything.
    pub fn equals(&self, request: &MultiItems) -> bool {
        let expected = self.grouped();
        let actual = request.grouped();
        expected.len() == actual.len()
            && expected
                .iter()
                .all(|(key, values)| actual.get(key).is_some_and(|a| values_match(values, a)))
    }

    /// Every key of `self` must be present in `request` with the same ordered values.
    pub fn contained_in(&self, request: &MultiItems) -> bool {
        if self.len() > request.len() {
            return false;
        }
        let actual = request.grouped();
        self.grouped()
            .iter()
            .all(|(key, values)| actual.get(key).is_some_and(|a| values_match(values, a)))
    }
}

fn values_match(expected: &[&str], actual: &[&str]) -> bool {
    expected.len() == actual.len()
        && expected
            .iter()
            .zip(actual)
            .all(|(e, a)| *e == MultiItems::ANY || e == a)
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MultiItems {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        MultiItems {
            pairs: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl PartialEq for MultiItems {
    fn eq(&self, other: &Self) -> bool {
        self.grouped() == other.grouped()
    }
}

impl Eq for MultiItems {}

impl Hash for MultiItems {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.grouped().hash(state);
    }
}
