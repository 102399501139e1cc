//! Middleware contract and onion-model composition.

pub mod compose;
pub mod middleware;

pub use compose::{Next, compose};
pub use middleware::{Middleware, MiddlewareFn, MiddlewareObj};
