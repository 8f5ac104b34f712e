//! The `Route` handle: a pattern bound to a mocked outcome and its call log.

use super::behavior::{Behavior, Effect, EffectSequence, Outcome, SideEffectResult};
use super::calls::{Call, CallList};
use crate::error::{Error, MockedError, Result};
use crate::pattern::{Context, Pattern};
use crate::request::Request;
use crate::response::MockResponse;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

#[derive(Clone)]
struct RouteSnapshot {
    pattern: Pattern,
    name: Option<String>,
    return_value: Option<MockResponse>,
    side_effect: Option<Behavior>,
    pass_through: bool,
    calls: CallList,
}

struct RouteState {
    pattern: Pattern,
    name: Option<String>,
    return_value: Option<MockResponse>,
    side_effect: Option<Behavior>,
    pass_through: bool,
    calls: CallList,
    snapshots: Vec<RouteSnapshot>,
}

/// A registered route.
///
/// `Route` is a cheap handle; clones share state, so a handle returned at
/// registration observes later updates made through the router. Two handles are
/// equal when they point at the same route.
#[derive(Clone)]
pub struct Route {
    inner: Arc<RwLock<RouteState>>,
}

/// What a matched route decided, before any side effect has run.
pub(crate) enum Prepared {
    PassThrough,
    Respond(MockResponse),
    Raise(MockedError),
    Exhausted,
    Call(Behavior),
}

/// Final outcome of a route for one request.
pub(crate) enum RouteOutcome {
    Respond(MockResponse),
    PassThrough,
    Raise(MockedError),
    Exhausted,
}

impl Route {
    pub fn new(pattern: Pattern) -> Self {
        Route {
            inner: Arc::new(RwLock::new(RouteState {
                pattern,
                name: None,
                return_value: None,
                side_effect: None,
                pass_through: false,
                calls: CallList::new(),
                snapshots: Vec::new(),
            })),
        }
    }

    pub fn pattern(&self) -> Pattern {
        self.inner.read().pattern.clone()
    }

    pub(crate) fn set_pattern(&self, pattern: Pattern) {
        self.inner.write().pattern = pattern;
    }

    pub fn name(&self) -> Option<String> {
        self.inner.read().name.clone()
    }

    pub(crate) fn set_name(&self, name: impl Into<String>) -> Route {
        self.inner.write().name = Some(name.into());
        self.clone()
    }

    pub(crate) fn clear_name(&self) {
        self.inner.write().name = None;
    }

    pub fn return_value(&self) -> Option<MockResponse> {
        self.inner.read().return_value.clone()
    }

    pub fn has_side_effect(&self) -> bool {
        self.inner.read().side_effect.is_some()
    }

    pub fn is_pass_through(&self) -> bool {
        self.inner.read().pass_through
    }

    /// Set the static response and side effect together, clearing pass-through.
    pub fn mock(&self, return_value: Option<MockResponse>, side_effect: Option<Behavior>) -> Route {
        {
            let mut state = self.inner.write();
            state.return_value = return_value;
            state.side_effect = side_effect;
            state.pass_through = false;
        }
        self.clone()
    }

    /// Respond with an empty response of the given status.
    pub fn respond(&self, status: u16) -> Route {
        self.respond_with(MockResponse::new(status))
    }

    pub fn respond_with(&self, response: MockResponse) -> Route {
        self.mock(Some(response), None)
    }

    /// Set only the static response. Any side effect still takes precedence.
    pub fn set_return_value(&self, response: Option<MockResponse>) -> Route {
        {
            let mut state = self.inner.write();
            state.return_value = response;
            state.pass_through = false;
        }
        self.clone()
    }

    /// Set only the side effect, keeping the static response as a fallback.
    pub fn set_side_effect(&self, side_effect: Option<Behavior>) -> Route {
        {
            let mut state = self.inner.write();
            state.side_effect = side_effect;
            state.pass_through = false;
        }
        self.clone()
    }

    pub fn side_effect<F>(&self, f: F) -> Route
    where
        F: Fn(&Request, &Context) -> SideEffectResult + Send + Sync + 'static,
    {
        self.set_side_effect(Some(Behavior::callable(f)))
    }

    pub fn side_effect_with_route<F>(&self, f: F) -> Route
    where
        F: Fn(&Request, &Context, &Route) -> SideEffectResult + Send + Sync + 'static,
    {
        self.set_side_effect(Some(Behavior::with_route(f)))
    }

    pub fn side_effect_async<F, Fut>(&self, f: F) -> Route
    where
        F: Fn(Request, Context) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = SideEffectResult> + Send + 'static,
    {
        self.set_side_effect(Some(Behavior::future(f)))
    }

    /// Serve the effects in order; afterwards fall back to the static response or fail.
    pub fn side_effects<E: Into<Effect>>(&self, effects: impl IntoIterator<Item = E>) -> Route {
        self.set_side_effect(Some(Behavior::sequence(effects)))
    }

    /// Serve the effects in order, starting over after the last one.
    pub fn cycle<E: Into<Effect>>(&self, effects: impl IntoIterator<Item = E>) -> Route {
        self.set_side_effect(Some(Behavior::cycle(effects)))
    }

    pub fn raises(&self, error: impl Into<MockedError>) -> Route {
        self.set_side_effect(Some(Behavior::raise(error)))
    }

    pub fn pass_through(&self, value: bool) -> Route {
        self.inner.write().pass_through = value;
        self.clone()
    }

    pub fn calls(&self) -> CallList {
        self.inner.read().calls.clone()
    }

    pub fn called(&self) -> bool {
        self.inner.read().calls.called()
    }

    pub fn call_count(&self) -> usize {
        self.inner.read().calls.call_count()
    }

    /// Clear the call log.
    pub fn reset(&self) {
        self.inner.write().calls.clear();
    }

    pub fn is_same(&self, other: &Route) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn pattern_eq(&self, other: &Route) -> bool {
        self.is_same(other) || self.inner.read().pattern == other.inner.read().pattern
    }

    pub(crate) fn has_pattern(&self, pattern: &Pattern) -> bool {
        self.inner.read().pattern == *pattern
    }

    /// Take over pattern and behavior of `other`, keeping this route's calls and name.
    pub(crate) fn absorb(&self, other: &Route) {
        if self.is_same(other) {
            return;
        }
        let (pattern, return_value, side_effect, pass_through) = {
            let other = other.inner.read();
            (
                other.pattern.clone(),
                other.return_value.clone(),
                other.side_effect.clone(),
                other.pass_through,
            )
        };
        let mut state = self.inner.write();
        state.pattern = pattern;
        state.return_value = return_value;
        state.side_effect = side_effect;
        state.pass_through = pass_through;
    }

    pub(crate) fn snapshot(&self) {
        let mut state = self.inner.write();
        let snapshot = RouteSnapshot {
            pattern: state.pattern.clone(),
            name: state.name.clone(),
            return_value: state.return_value.clone(),
            side_effect: state.side_effect.clone(),
            pass_through: state.pass_through,
            calls: state.calls.clone(),
        };
        state.snapshots.push(snapshot);
        trace!("Route snapshot depth {}", state.snapshots.len());
    }

    pub(crate) fn rollback(&self) {
        let mut state = self.inner.write();
        let Some(snapshot) = state.snapshots.pop() else {
            return;
        };
        state.pattern = snapshot.pattern;
        state.name = snapshot.name;
        state.return_value = snapshot.return_value;
        state.side_effect = snapshot.side_effect;
        state.pass_through = snapshot.pass_through;
        state.calls = snapshot.calls;
    }

    pub(crate) fn record(&self, call: Arc<Call>) {
        self.inner.write().calls.push(call);
    }

    /// Match the request and pick the outcome. Sequences advance here, side
    /// effects run later without the route lock held.
    pub(crate) fn prepare(&self, request: &Request) -> Option<(Prepared, Context)> {
        let mut guard = self.inner.write();
        let state = &mut *guard;
        let matched = state.pattern.matches(request);
        if !matched.is_match() {
            return None;
        }
        let context = matched.into_context();

        if state.pass_through {
            return Some((Prepared::PassThrough, context));
        }

        let fallback = &state.return_value;
        let prepared = match &mut state.side_effect {
            Some(Behavior::Raise(error)) => Prepared::Raise(error.clone()),
            Some(Behavior::Sequence(sequence)) => Self::next_effect(sequence, fallback),
            Some(behavior) => Prepared::Call(behavior.clone()),
            None => Prepared::Respond(fallback.clone().unwrap_or_default()),
        };
        Some((prepared, context))
    }

    fn next_effect(sequence: &mut EffectSequence, fallback: &Option<MockResponse>) -> Prepared {
        match sequence.advance() {
            Some(Effect::Response(response)) => Prepared::Respond(response),
            Some(Effect::Error(error)) => Prepared::Raise(error),
            None => match fallback {
                Some(response) => Prepared::Respond(response.clone()),
                None => Prepared::Exhausted,
            },
        }
    }

    /// Run a prepared outcome. `Ok(None)` means the side effect declined the request.
    pub(crate) fn run(
        &self,
        prepared: Prepared,
        request: &Request,
        context: &Context,
    ) -> Result<Option<RouteOutcome>> {
        let result = match prepared {
            Prepared::Call(Behavior::Callable(effect)) => effect.call(request, context, self),
            Prepared::Call(Behavior::Async(_)) => {
                return Err(Error::AsyncSideEffect {
                    route: self.clone(),
                })
            }
            other => return Ok(Some(Self::settle(other))),
        };
        Ok(Self::side_effect_outcome(result))
    }

    pub(crate) async fn run_async(
        &self,
        prepared: Prepared,
        request: &Request,
        context: &Context,
    ) -> Option<RouteOutcome> {
        let result = match prepared {
            Prepared::Call(Behavior::Callable(effect)) => effect.call(request, context, self),
            Prepared::Call(Behavior::Async(effect)) => {
                effect
                    .call(request.clone(), context.clone(), self.clone())
                    .await
            }
            other => return Some(Self::settle(other)),
        };
        Self::side_effect_outcome(result)
    }

    fn settle(prepared: Prepared) -> RouteOutcome {
        match prepared {
            Prepared::PassThrough => RouteOutcome::PassThrough,
            Prepared::Respond(response) => RouteOutcome::Respond(response),
            Prepared::Raise(error) => RouteOutcome::Raise(error),
            Prepared::Exhausted | Prepared::Call(_) => RouteOutcome::Exhausted,
        }
    }

    fn side_effect_outcome(result: SideEffectResult) -> Option<RouteOutcome> {
        match result {
            Ok(Some(Outcome::Respond(response))) => Some(RouteOutcome::Respond(response)),
            Ok(Some(Outcome::PassThrough)) => Some(RouteOutcome::PassThrough),
            Ok(None) => None,
            Err(error) => Some(RouteOutcome::Raise(error)),
        }
    }
}

impl PartialEq for Route {
    fn eq(&self, other: &Self) -> bool {
        self.is_same(other)
    }
}

impl Eq for Route {}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.read();
        f.debug_struct("Route")
            .field("name", &state.name)
            .field("pattern", &state.pattern)
            .field("pass_through", &state.pass_through)
            .field("calls", &state.calls.call_count())
            .finish()
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.read();
        match &state.name {
            Some(name) => write!(f, "<Route '{}' {}>", name, state.pattern),
            None => write!(f, "<Route {}>", state.pattern),
        }
    }
}
