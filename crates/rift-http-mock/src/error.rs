//! Error types for pattern building, route resolution and router assertions.

use crate::pattern::Lookup;
use crate::route::Route;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the mock router.
///
/// Configuration errors are raised immediately at registration time. Resolution
/// errors carry the route that produced them when there is one.
#[derive(Debug, Error)]
pub enum Error {
    #[error("'{0}' is not a valid pattern")]
    InvalidPattern(String),

    #[error("'{0}' is not a valid lookup")]
    InvalidLookup(String),

    #[error("'{pattern}' pattern does not support '{lookup}' lookup")]
    UnsupportedLookup {
        pattern: &'static str,
        lookup: Lookup,
    },

    #[error("Invalid url: {0:?}")]
    InvalidUrl(String),

    #[error("Invalid value for '{pattern}' pattern: {reason}")]
    InvalidValue {
        pattern: &'static str,
        reason: String,
    },

    #[error("Invalid regex: {0}")]
    InvalidRegex(#[from] regex::Error),

    #[error("Request {method} {url} not mocked")]
    Unmocked { method: String, url: String },

    #[error("Request marked to pass through by {route}")]
    PassThrough { route: Route },

    #[error("Side effects of {route} are exhausted")]
    SideEffectExhausted { route: Route },

    #[error("{route} raised: {source}")]
    Mocked { route: Route, source: MockedError },

    #[error("{route} has an async side effect, resolve it with resolve_async")]
    AsyncSideEffect { route: Route },

    #[error("Some mocked requests were not called: {}", .routes.join(", "))]
    NotCalled { routes: Vec<String> },

    #[error("Route '{0}' not found")]
    RouteNotFound(String),

    #[error("Route name '{0}' is already in use")]
    DuplicateName(String),

    #[error("Invalid mocked response: {0}")]
    InvalidResponse(String),

    #[error("Pass-through dispatch failed: {0}")]
    Dispatch(MockedError),

    #[error(transparent)]
    Config(#[from] anyhow::Error),
}

impl Error {
    /// Whether this error was caused by an invalid pattern, lookup, url or config value.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::InvalidPattern(_)
                | Error::InvalidLookup(_)
                | Error::UnsupportedLookup { .. }
                | Error::InvalidUrl(_)
                | Error::InvalidValue { .. }
                | Error::InvalidRegex(_)
                | Error::DuplicateName(_)
                | Error::Config(_)
        )
    }

    /// Whether this is the pass-through signal rather than a failure.
    pub fn is_pass_through(&self) -> bool {
        matches!(self, Error::PassThrough { .. })
    }

    /// The route that produced this error, if any.
    pub fn route(&self) -> Option<&Route> {
        match self {
            Error::PassThrough { route }
            | Error::SideEffectExhausted { route }
            | Error::Mocked { route, .. }
            | Error::AsyncSideEffect { route } => Some(route),
            _ => None,
        }
    }

    /// The mocked error a route raised, if this is one.
    pub fn mocked(&self) -> Option<&MockedError> {
        match self {
            Error::Mocked { source, .. } | Error::Dispatch(source) => Some(source),
            _ => None,
        }
    }
}

/// Transport error categories a route can simulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    Connect,
    ConnectTimeout,
    ReadTimeout,
    WriteTimeout,
    PoolTimeout,
    Network,
    Protocol,
    Proxy,
    UnsupportedProtocol,
}

impl TransportErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportErrorKind::Connect => "ConnectError",
            TransportErrorKind::ConnectTimeout => "ConnectTimeout",
            TransportErrorKind::ReadTimeout => "ReadTimeout",
            TransportErrorKind::WriteTimeout => "WriteTimeout",
            TransportErrorKind::PoolTimeout => "PoolTimeout",
            TransportErrorKind::Network => "NetworkError",
            TransportErrorKind::Protocol => "ProtocolError",
            TransportErrorKind::Proxy => "ProxyError",
            TransportErrorKind::UnsupportedProtocol => "UnsupportedProtocol",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            TransportErrorKind::ConnectTimeout
                | TransportErrorKind::ReadTimeout
                | TransportErrorKind::WriteTimeout
                | TransportErrorKind::PoolTimeout
        )
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error a route is configured to raise instead of responding.
#[derive(Debug, Clone, Error)]
pub enum MockedError {
    /// A simulated transport failure, propagated to the client as-is.
    #[error("{kind}: {message}")]
    Transport {
        kind: TransportErrorKind,
        message: String,
    },

    /// Any other error raised by a side effect.
    #[error("{0}")]
    Custom(Arc<dyn std::error::Error + Send + Sync>),
}

impl MockedError {
    pub fn transport(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        MockedError::Transport {
            kind,
            message: message.into(),
        }
    }

    /// A transport error with the default "Mock Error" message.
    pub fn mock(kind: TransportErrorKind) -> Self {
        Self::transport(kind, "Mock Error")
    }

    pub fn custom<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        MockedError::Custom(Arc::new(error))
    }

    pub fn kind(&self) -> Option<TransportErrorKind> {
        match self {
            MockedError::Transport { kind, .. } => Some(*kind),
            MockedError::Custom(_) => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, MockedError::Transport { .. })
    }
}

// MockedError::Custom holds a trait object, so compare by rendering.
impl PartialEq for MockedError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                MockedError::Transport { kind, message },
                MockedError::Transport {
                    kind: other_kind,
                    message: other_message,
                },
            ) => kind == other_kind && message == other_message,
            (MockedError::Custom(a), MockedError::Custom(b)) => {
                Arc::ptr_eq(a, b) || a.to_string() == b.to_string()
            }
            _ => false,
        }
    }
}

impl From<TransportErrorKind> for MockedError {
    fn from(kind: TransportErrorKind) -> Self {
        MockedError::mock(kind)
    }
}
