//! The middleware contract.
//!
//! A unit of per-update processing is either a plain function of
//! `(Context, Next)` or an object exposing a `middleware()` accessor that
//! yields such a function. The two shapes form the closed union
//! [`Middleware`]; [`Middleware::unwrap`] resolves it to a callable
//! exactly once, at composition time, so the hot path never inspects
//! shapes again.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::context::Context;
use crate::error::WeaveResult;
use crate::pipeline::compose::Next;

/// The resolved, callable form of a middleware.
pub type MiddlewareFn =
    Arc<dyn Fn(Context, Next) -> BoxFuture<'static, WeaveResult<()>> + Send + Sync>;

/// A middleware object: anything that can compile itself to a callable.
///
/// Registration builders such as composers and routers implement this;
/// `middleware()` is where their registered handlers are compiled.
pub trait MiddlewareObj: Send + Sync {
    /// Compiles this object into its callable form.
    fn middleware(&self) -> MiddlewareFn;
}

/// The closed two-variant middleware union.
#[derive(Clone)]
pub enum Middleware {
    /// A plain function.
    Func(MiddlewareFn),
    /// An object with a `middleware()` accessor.
    Object(Arc<dyn MiddlewareObj>),
}

impl Middleware {
    /// Wraps an async function as middleware.
    ///
    /// The function receives the context and the continuation into the
    /// rest of the chain; it decides whether and when to run the
    /// continuation.
    pub fn from_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(Context, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = WeaveResult<()>> + Send + 'static,
    {
        Middleware::Func(Arc::new(move |ctx, next| Box::pin(f(ctx, next))))
    }

    /// Wraps a middleware object.
    pub fn from_obj(obj: impl MiddlewareObj + 'static) -> Self {
        Middleware::Object(Arc::new(obj))
    }

    /// Resolves this union to a callable.
    pub fn unwrap(&self) -> MiddlewareFn {
        match self {
            Middleware::Func(f) => Arc::clone(f),
            Middleware::Object(obj) => obj.middleware(),
        }
    }

    /// Middleware that does nothing but run its continuation.
    pub fn pass_through() -> Self {
        Middleware::Func(pass_through_fn())
    }

    /// Middleware that ends the chain silently: it neither does anything
    /// nor runs its continuation.
    pub fn noop() -> Self {
        Middleware::from_fn(|_ctx, _next| async { Ok(()) })
    }
}

impl<T: MiddlewareObj + 'static> From<T> for Middleware {
    fn from(obj: T) -> Self {
        Middleware::from_obj(obj)
    }
}

/// The callable form of [`Middleware::pass_through`].
pub fn pass_through_fn() -> MiddlewareFn {
    Arc::new(|ctx, next| next.run(ctx))
}

impl std::fmt::Debug for Middleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Middleware::Func(_) => f.write_str("Middleware::Func"),
            Middleware::Object(_) => f.write_str("Middleware::Object"),
        }
    }
}
