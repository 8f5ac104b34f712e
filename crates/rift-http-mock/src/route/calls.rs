use crate::request::Request;
use crate::response::MockResponse;
use std::ops::Index;
use std::sync::Arc;

/// A recorded resolution. Shared between the router's log and the route's log.
#[derive(Debug, Clone)]
pub struct Call {
    pub request: Request,
    /// `None` when the route raised or passed the request through.
    pub response: Option<MockResponse>,
}

impl Call {
    pub fn has_response(&self) -> bool {
        self.response.is_some()
    }
}

/// Append-only call log.
#[derive(Debug, Clone, Default)]
pub struct CallList(Vec<Arc<Call>>);

impl CallList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn called(&self) -> bool {
        !self.0.is_empty()
    }

    pub fn call_count(&self) -> usize {
        self.0.len()
    }

    pub fn last(&self) -> Option<&Arc<Call>> {
        self.0.last()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<Call>> {
        self.0.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Call>> {
        self.0.iter()
    }

    pub(crate) fn push(&mut self, call: Arc<Call>) {
        self.0.push(call);
    }

    pub(crate) fn clear(&mut self) {
        self.0.clear();
    }
}

impl Index<usize> for CallList {
    type Output = Call;

    fn index(&self, index: usize) -> &Call {
        &self.0[index]
    }
}

impl<'a> IntoIterator for &'a CallList {
    type Item = &'a Arc<Call>;
    type IntoIter = std::slice::Iter<'a, Arc<Call>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
