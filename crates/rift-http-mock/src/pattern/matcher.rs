//! Match results and captured context.

use std::collections::BTreeMap;
use std::ops::Not;

/// Named values captured while matching, e.g. regex named groups.
pub type Context = BTreeMap<String, String>;

/// Outcome of matching a pattern against a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Match {
    matches: bool,
    context: Context,
}

impl Match {
    pub fn new(matches: bool) -> Self {
        Match {
            matches,
            context: Context::new(),
        }
    }

    pub fn with_context(matches: bool, context: Context) -> Self {
        Match { matches, context }
    }

    #[inline]
    pub fn is_match(&self) -> bool {
        self.matches
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn into_context(self) -> Context {
        self.context
    }

    /// Combine two successful matches, later captures win on key collisions.
    pub(crate) fn merge(mut self, other: Match) -> Match {
        self.context.extend(other.context);
        self.matches = self.matches && other.matches;
        self
    }
}

impl From<bool> for Match {
    fn from(matches: bool) -> Self {
        Match::new(matches)
    }
}

/// Flips the outcome and keeps the captured context.
impl Not for Match {
    type Output = Match;

    fn not(mut self) -> Match {
        self.matches = !self.matches;
        self
    }
}
