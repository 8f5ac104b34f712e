//! Router state: routes, call log, configuration and the snapshot stack.

use super::scope::MockScope;
use crate::config::RouterConfig;
use crate::error::{Error, Result};
use crate::pattern::{
    merge_patterns, parse_url_patterns, Bases, Context, LookupValue, Pattern, UrlInput, M,
};
use crate::request::Request;
use crate::response::MockResponse;
use crate::route::{Call, CallList, Route, RouteList};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

struct RouterSnapshot {
    routes: RouteList,
    calls: CallList,
    config: RouterConfig,
    bases: Bases,
}

pub(super) struct RouterState {
    pub(super) routes: RouteList,
    pub(super) calls: CallList,
    pub(super) config: RouterConfig,
    bases: Bases,
    snapshots: Vec<RouterSnapshot>,
}

/// An ordered set of routes resolved first-match-wins.
///
/// `Router` is a cheap handle over shared state, so it can be cloned into
/// adapters and side effects.
#[derive(Clone)]
pub struct Router {
    pub(super) inner: Arc<RwLock<RouterState>>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

fn base_patterns(config: &RouterConfig) -> Result<Bases> {
    config.validate()?;
    let base_url = config.base_url.as_deref().map(UrlInput::from);
    parse_url_patterns(base_url.as_ref(), false)
}

impl Router {
    pub fn new() -> Self {
        Router {
            inner: Arc::new(RwLock::new(RouterState {
                routes: RouteList::new(),
                calls: CallList::new(),
                config: RouterConfig::default(),
                bases: Bases::new(),
                snapshots: Vec::new(),
            })),
        }
    }

    pub fn with_config(config: RouterConfig) -> Result<Self> {
        let router = Self::new();
        router.configure(config)?;
        Ok(router)
    }

    pub fn config(&self) -> RouterConfig {
        self.inner.read().config.clone()
    }

    /// Replace the configuration. Routes added afterwards use the new base URL;
    /// a rollback restores the previous configuration.
    pub fn configure(&self, config: RouterConfig) -> Result<()> {
        let bases = base_patterns(&config)?;
        debug!(
            "Router configured (assert_all_called={}, assert_all_mocked={}, base_url={:?})",
            config.assert_all_called, config.assert_all_mocked, config.base_url
        );
        let mut state = self.inner.write();
        state.config = config;
        state.bases = bases;
        Ok(())
    }

    /// Register a route for the pattern, merged with the base URL.
    pub fn route(&self, pattern: Pattern) -> Route {
        self.add(Route::new(pattern), None)
    }

    pub fn route_named(&self, pattern: Pattern, name: &str) -> Route {
        self.add(Route::new(pattern), Some(name))
    }

    /// Register a route. A route with an equal pattern, or the given name, is
    /// updated in place and returned instead, so registering the same pattern
    /// twice (e.g. two `post` calls) never yields two routes. Use
    /// [`Router::queue`] for routes that should answer one after another.
    pub fn add(&self, route: Route, name: Option<&str>) -> Route {
        let mut state = self.inner.write();
        route.set_pattern(merge_patterns(route.pattern(), state.bases.clone()));
        let route = state.routes.add(route, name);
        debug!("Registered {} ({} routes)", route, state.routes.len());
        route
    }

    /// Append a route even if an equal pattern is registered. Routes queued on the
    /// same pattern fire one after another: a route is dropped once it has served a
    /// request and a later route shares its pattern.
    pub fn queue(&self, route: Route) -> Route {
        let mut state = self.inner.write();
        route.set_pattern(merge_patterns(route.pattern(), state.bases.clone()));
        state.routes.push(route.clone());
        debug!("Queued {} ({} routes)", route, state.routes.len());
        route
    }

    /// Register a route for a method and optional URL.
    pub fn request(&self, method: &str, url: impl Into<LookupValue>) -> Result<Route> {
        let pattern = M::new()
            .lookup("method", method)
            .lookup("url", url)
            .build()?;
        Ok(self.route(pattern))
    }

    pub fn get(&self, url: impl Into<LookupValue>) -> Result<Route> {
        self.request("GET", url)
    }

    pub fn post(&self, url: impl Into<LookupValue>) -> Result<Route> {
        self.request("POST", url)
    }

    pub fn put(&self, url: impl Into<LookupValue>) -> Result<Route> {
        self.request("PUT", url)
    }

    pub fn patch(&self, url: impl Into<LookupValue>) -> Result<Route> {
        self.request("PATCH", url)
    }

    pub fn delete(&self, url: impl Into<LookupValue>) -> Result<Route> {
        self.request("DELETE", url)
    }

    pub fn head(&self, url: impl Into<LookupValue>) -> Result<Route> {
        self.request("HEAD", url)
    }

    pub fn options(&self, url: impl Into<LookupValue>) -> Result<Route> {
        self.request("OPTIONS", url)
    }

    pub fn routes(&self) -> RouteList {
        self.inner.read().routes.clone()
    }

    pub(super) fn routes_snapshot(&self) -> Vec<Route> {
        self.inner.read().routes.to_vec()
    }

    /// Name a registered route. Names are unique: fails with
    /// [`Error::DuplicateName`] if another route holds the name.
    pub fn rename(&self, route: &Route, name: &str) -> Result<Route> {
        let route = self.inner.write().routes.rename(route, name)?;
        debug!("Renamed {}", route);
        Ok(route)
    }

    pub fn route_by_name(&self, name: &str) -> Option<Route> {
        self.inner.read().routes.by_name(name)
    }

    /// Remove a route by name.
    pub fn pop(&self, name: &str) -> Result<Route> {
        self.inner
            .write()
            .routes
            .pop(name)
            .ok_or_else(|| Error::RouteNotFound(name.to_string()))
    }

    pub fn pop_or(&self, name: &str, default: Route) -> Route {
        self.inner.write().routes.pop(name).unwrap_or(default)
    }

    pub fn calls(&self) -> CallList {
        self.inner.read().calls.clone()
    }

    /// Clear the call logs of the router and every route.
    pub fn reset(&self) {
        let mut state = self.inner.write();
        state.calls.clear();
        for route in state.routes.iter() {
            route.reset();
        }
    }

    /// Remove all routes.
    pub fn clear(&self) {
        self.inner.write().routes.clear();
    }

    pub fn snapshot(&self) {
        let mut state = self.inner.write();
        for route in state.routes.iter() {
            route.snapshot();
        }
        let snapshot = RouterSnapshot {
            routes: state.routes.clone(),
            calls: state.calls.clone(),
            config: state.config.clone(),
            bases: state.bases.clone(),
        };
        state.snapshots.push(snapshot);
        trace!("Router snapshot depth {}", state.snapshots.len());
    }

    /// Restore the state of the last snapshot. Does nothing without one.
    pub fn rollback(&self) {
        let mut state = self.inner.write();
        let Some(snapshot) = state.snapshots.pop() else {
            return;
        };
        state.routes = snapshot.routes;
        state.calls = snapshot.calls;
        state.config = snapshot.config;
        state.bases = snapshot.bases;
        for route in state.routes.iter() {
            route.rollback();
        }
        trace!("Router rolled back to depth {}", state.snapshots.len());
    }

    /// Fail if any registered route has not been called.
    pub fn assert_all_called(&self) -> Result<()> {
        let not_called: Vec<String> = self
            .inner
            .read()
            .routes
            .iter()
            .filter(|route| !route.called())
            .map(ToString::to_string)
            .collect();
        if not_called.is_empty() {
            Ok(())
        } else {
            Err(Error::NotCalled { routes: not_called })
        }
    }

    /// First route whose pattern matches, without running it or recording a call.
    pub fn match_request(&self, request: &Request) -> Option<(Route, Context)> {
        self.routes_snapshot().into_iter().find_map(|route| {
            let matched = route.pattern().matches(request);
            matched.is_match().then(|| (route, matched.into_context()))
        })
    }

    /// Start a scope that rolls back everything registered within it.
    pub fn scope(&self) -> MockScope {
        MockScope::new(self.clone())
    }

    pub(super) fn record(
        &self,
        request: &Request,
        response: Option<MockResponse>,
        route: Option<&Route>,
    ) {
        let call = Arc::new(Call {
            request: request.clone(),
            response,
        });
        let mut state = self.inner.write();
        state.calls.push(call.clone());
        if let Some(route) = route {
            route.record(call);
        }
    }

    /// Drop a route that just served a request when a later route shares its pattern.
    pub(super) fn shadow(&self, route: &Route) {
        let mut state = self.inner.write();
        let Some(index) = state.routes.position(route) else {
            return;
        };
        let pattern = route.pattern();
        if state.routes.iter().skip(index + 1).any(|r| r.has_pattern(&pattern)) {
            state.routes.remove_at(index);
            debug!("{} served its request and is shadowed by a later route", route);
        }
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.read();
        f.debug_struct("Router")
            .field("routes", &state.routes.len())
            .field("calls", &state.calls.call_count())
            .field("config", &state.config)
            .field("snapshots", &state.snapshots.len())
            .finish()
    }
}
