//! Rift mock router: the matching and resolution engine behind HTTP client test doubles.
//!
//! A [`Router`] owns an ordered list of [`Route`]s. Each route binds a composable
//! request [`Pattern`] to a mocked outcome (a static [`MockResponse`], a side effect,
//! a sequence of responses/errors, or pass-through) and records every call it serves.
//!
//! Transport integration lives behind the [`adapter`] module: an adapter turns a live
//! request into a [`Request`] descriptor, asks the router to resolve it, and turns the
//! resulting [`MockResponse`] back into its native response type.
//!
//! ```ignore
//! use rift_http_mock::{m, Request, Router, RouterConfig};
//!
//! let router = Router::with_config(RouterConfig {
//!     base_url: Some("https://api.example.com/v1/".into()),
//!     ..Default::default()
//! })?;
//! let users = router.route(m!(method = "GET", path__regex = r"^/users/(?P<id>\d+)/$")?);
//! users.respond(200);
//!
//! let resolved = router.resolve(&Request::get("https://api.example.com/v1/users/7/")?)?;
//! assert_eq!(resolved.context["id"], "7");
//! assert_eq!(users.call_count(), 1);
//! ```

pub mod adapter;
pub mod config;
pub mod error;
pub mod global;
pub mod pattern;
pub mod request;
pub mod response;
pub mod route;
pub mod router;

pub use config::RouterConfig;
pub use error::{Error, MockedError, Result, TransportErrorKind};
pub use pattern::{Context, Lookup, LookupValue, Match, Pattern, PatternKind, M};
pub use request::{Request, RequestUrl};
pub use response::MockResponse;
pub use route::{Call, CallList, Effect, Outcome, Route, RouteList};
pub use router::{MockScope, Resolved, Router};
