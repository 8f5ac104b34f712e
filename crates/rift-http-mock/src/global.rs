//! Process-wide ambient router.
//!
//! Most code should construct and pass a [`Router`] explicitly. The ambient
//! router is for adapters that cannot be handed one. It does not assert that all
//! routes were called unless `RIFT_MOCK_ASSERT_ALL_CALLED` says otherwise, and
//! `RIFT_MOCK_*` overrides are read once, on first use.

use crate::config::RouterConfig;
use crate::error::Result;
use crate::router::{MockScope, Router};
use once_cell::sync::Lazy;
use tracing::{debug, warn};

static ROUTER: Lazy<Router> = Lazy::new(|| {
    let config = ambient_config().with_env_overrides().unwrap_or_else(|e| {
        warn!("Ignoring invalid mock router environment: {}", e);
        ambient_config()
    });
    let router = Router::new();
    if let Err(e) = router.configure(config) {
        warn!("Failed to configure the ambient mock router: {}", e);
    }
    router
});

fn ambient_config() -> RouterConfig {
    RouterConfig {
        assert_all_called: false,
        ..Default::default()
    }
}

/// The ambient router. Clones share its state.
pub fn router() -> Router {
    ROUTER.clone()
}

/// Begin a mocking session on the ambient router.
pub fn start() {
    debug!("Starting ambient mock router session");
    ROUTER.snapshot();
}

/// End the session started by [`start`], restoring the routes and calls from
/// before it. Fails, after restoring, if `assert_all_called` is set and a route
/// registered during the session was never called.
pub fn stop() -> Result<()> {
    let result = if ROUTER.config().assert_all_called {
        ROUTER.assert_all_called()
    } else {
        Ok(())
    };
    ROUTER.rollback();
    debug!("Stopped ambient mock router session");
    result
}

/// A scope over the ambient router.
pub fn scope() -> MockScope {
    ROUTER.scope()
}
