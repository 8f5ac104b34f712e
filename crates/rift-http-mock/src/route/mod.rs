//! Routes: patterns bound to mocked outcomes, with their call logs.

mod behavior;
mod calls;
mod core;
mod list;

pub use behavior::{
    AsyncSideEffect, Behavior, Effect, EffectSequence, Outcome, SideEffect, SideEffectResult,
    WithRoute,
};
pub use calls::{Call, CallList};
pub use core::Route;
pub use list::RouteList;

pub(crate) use core::RouteOutcome;
