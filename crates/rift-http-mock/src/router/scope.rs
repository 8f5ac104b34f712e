use super::Router;
use crate::error::Result;
use std::ops::Deref;

/// A mocking session over a router.
///
/// Entering snapshots the router. [`MockScope::finish`] checks that every route
/// was called (when `assert_all_called` is set) and rolls back; dropping the
/// scope without finishing only rolls back. Scopes nest.
#[must_use = "the scope rolls back when dropped"]
pub struct MockScope {
    router: Router,
    finished: bool,
}

impl MockScope {
    pub(super) fn new(router: Router) -> Self {
        router.snapshot();
        MockScope {
            router,
            finished: false,
        }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// End the scope, asserting all routes were called if configured to.
    pub fn finish(mut self) -> Result<()> {
        self.finished = true;
        let result = if self.router.config().assert_all_called {
            self.router.assert_all_called()
        } else {
            Ok(())
        };
        self.router.rollback();
        result
    }
}

impl Deref for MockScope {
    type Target = Router;

    fn deref(&self) -> &Router {
        &self.router
    }
}

impl Drop for MockScope {
    fn drop(&mut self) {
        if !self.finished {
            self.router.rollback();
        }
    }
}
