//! The router: registration, resolution and mocking scopes.

mod core;
mod resolve;
mod scope;

pub use core::Router;
pub use resolve::Resolved;
pub use scope::MockScope;
