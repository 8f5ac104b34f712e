//! Side effects and response sequences a route can produce instead of a static response.

use super::Route;
use crate::error::{MockedError, TransportErrorKind};
use crate::pattern::Context;
use crate::request::Request;
use crate::response::MockResponse;
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// What a side effect decided for a matched request.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Respond(MockResponse),
    PassThrough,
}

impl From<MockResponse> for Outcome {
    fn from(response: MockResponse) -> Self {
        Outcome::Respond(response)
    }
}

impl From<u16> for Outcome {
    fn from(status: u16) -> Self {
        Outcome::Respond(MockResponse::new(status))
    }
}

/// `Ok(None)` means the route does not match after all and resolution moves on.
pub type SideEffectResult = Result<Option<Outcome>, MockedError>;

pub trait SideEffect: Send + Sync {
    fn call(&self, request: &Request, context: &Context, route: &Route) -> SideEffectResult;
}

impl<F> SideEffect for F
where
    F: Fn(&Request, &Context) -> SideEffectResult + Send + Sync,
{
    fn call(&self, request: &Request, context: &Context, _route: &Route) -> SideEffectResult {
        self(request, context)
    }
}

/// Adapts a closure that also wants the route it is attached to.
pub struct WithRoute<F>(pub F);

impl<F> SideEffect for WithRoute<F>
where
    F: Fn(&Request, &Context, &Route) -> SideEffectResult + Send + Sync,
{
    fn call(&self, request: &Request, context: &Context, route: &Route) -> SideEffectResult {
        (self.0)(request, context, route)
    }
}

/// A side effect that may suspend. Only supported by async resolution.
#[async_trait]
pub trait AsyncSideEffect: Send + Sync {
    async fn call(&self, request: Request, context: Context, route: Route) -> SideEffectResult;
}

#[async_trait]
impl<F, Fut> AsyncSideEffect for F
where
    F: Fn(Request, Context) -> Fut + Send + Sync,
    Fut: Future<Output = SideEffectResult> + Send + 'static,
{
    async fn call(&self, request: Request, context: Context, _route: Route) -> SideEffectResult {
        self(request, context).await
    }
}

/// One entry of a response sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Response(MockResponse),
    Error(MockedError),
}

impl From<MockResponse> for Effect {
    fn from(response: MockResponse) -> Self {
        Effect::Response(response)
    }
}

impl From<u16> for Effect {
    fn from(status: u16) -> Self {
        Effect::Response(MockResponse::new(status))
    }
}

impl From<MockedError> for Effect {
    fn from(error: MockedError) -> Self {
        Effect::Error(error)
    }
}

impl From<TransportErrorKind> for Effect {
    fn from(kind: TransportErrorKind) -> Self {
        Effect::Error(MockedError::mock(kind))
    }
}

/// Cursor over an ordered list of effects.
///
/// A one-shot sequence is exhausted after its last entry; a cycling one wraps.
#[derive(Debug, Clone)]
pub struct EffectSequence {
    effects: Vec<Effect>,
    position: usize,
    cycle: bool,
}

impl EffectSequence {
    pub fn once(effects: Vec<Effect>) -> Self {
        EffectSequence {
            effects,
            position: 0,
            cycle: false,
        }
    }

    pub fn cycle(effects: Vec<Effect>) -> Self {
        EffectSequence {
            effects,
            position: 0,
            cycle: true,
        }
    }

    /// Remaining entries before exhaustion, `None` for a cycling sequence.
    pub fn remaining(&self) -> Option<usize> {
        (!self.cycle).then(|| self.effects.len().saturating_sub(self.position))
    }

    pub(crate) fn advance(&mut self) -> Option<Effect> {
        if self.position >= self.effects.len() {
            if !self.cycle || self.effects.is_empty() {
                return None;
            }
            self.position = 0;
        }
        let effect = self.effects.get(self.position).cloned();
        self.position += 1;
        effect
    }
}

/// A route's dynamic behavior, taking precedence over its static response.
#[derive(Clone)]
pub enum Behavior {
    Callable(Arc<dyn SideEffect>),
    Async(Arc<dyn AsyncSideEffect>),
    Raise(MockedError),
    Sequence(EffectSequence),
}

impl Behavior {
    pub fn callable<F>(f: F) -> Self
    where
        F: Fn(&Request, &Context) -> SideEffectResult + Send + Sync + 'static,
    {
        Behavior::Callable(Arc::new(f))
    }

    pub fn with_route<F>(f: F) -> Self
    where
        F: Fn(&Request, &Context, &Route) -> SideEffectResult + Send + Sync + 'static,
    {
        Behavior::Callable(Arc::new(WithRoute(f)))
    }

    pub fn future<F, Fut>(f: F) -> Self
    where
        F: Fn(Request, Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = SideEffectResult> + Send + 'static,
    {
        Behavior::Async(Arc::new(f))
    }

    pub fn raise(error: impl Into<MockedError>) -> Self {
        Behavior::Raise(error.into())
    }

    pub fn sequence<E: Into<Effect>>(effects: impl IntoIterator<Item = E>) -> Self {
        Behavior::Sequence(EffectSequence::once(effects.into_iter().map(Into::into).collect()))
    }

    pub fn cycle<E: Into<Effect>>(effects: impl IntoIterator<Item = E>) -> Self {
        Behavior::Sequence(EffectSequence::cycle(effects.into_iter().map(Into::into).collect()))
    }

    pub fn is_async(&self) -> bool {
        matches!(self, Behavior::Async(_))
    }
}

impl fmt::Debug for Behavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Behavior::Callable(_) => f.write_str("Callable"),
            Behavior::Async(_) => f.write_str("Async"),
            Behavior::Raise(error) => f.debug_tuple("Raise").field(error).finish(),
            Behavior::Sequence(sequence) => f.debug_tuple("Sequence").field(sequence).finish(),
        }
    }
}
