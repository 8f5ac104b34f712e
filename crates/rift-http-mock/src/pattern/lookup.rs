//! Lookup operators a pattern applies to the parsed request value.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Comparison operator of a leaf pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub enum Lookup {
    /// Exact equality after normalization
    #[serde(rename = "eq")]
    Equal,
    /// Regex search, named groups populate the match context
    #[serde(rename = "regex")]
    Regex,
    /// Prefix test
    #[serde(rename = "startswith")]
    StartsWith,
    /// Containment (substring, sub-multimap or subset depending on the pattern)
    #[serde(rename = "contains")]
    Contains,
    /// Membership in a list of alternatives
    #[serde(rename = "in")]
    In,
}

impl Lookup {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lookup::Equal => "eq",
            Lookup::Regex => "regex",
            Lookup::StartsWith => "startswith",
            Lookup::Contains => "contains",
            Lookup::In => "in",
        }
    }
}

impl FromStr for Lookup {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "eq" => Ok(Lookup::Equal),
            "regex" => Ok(Lookup::Regex),
            "startswith" => Ok(Lookup::StartsWith),
            "contains" => Ok(Lookup::Contains),
            "in" => Ok(Lookup::In),
            other => Err(Error::InvalidLookup(other.to_string())),
        }
    }
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
