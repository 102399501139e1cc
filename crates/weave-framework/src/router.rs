//! Named-route dispatch.
//!
//! A [`Router`] externalizes the "which route" decision to a
//! caller-supplied function. The decision, and any state merge it
//! requests, happens at dispatch time, not at registration time, so the
//! router compiles to a `lazy` combinator.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;
use tracing::debug;

use weave_core::combinators::lazy;
use weave_core::{Context, Middleware, MiddlewareFn, MiddlewareObj, WeaveResult};

/// A routing decision: the route name plus state entries to merge into
/// the context before the routed handler runs.
#[derive(Clone, Debug, Default)]
pub struct Route {
    /// The route name to dispatch to.
    pub name: String,
    /// State entries merged into the dispatch state.
    pub state: HashMap<String, Value>,
}

impl Route {
    /// A route with no state to merge.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: HashMap::new(),
        }
    }

    /// Adds a state entry to merge.
    pub fn with_state(mut self, key: impl Into<String>, value: Value) -> Self {
        self.state.insert(key.into(), value);
        self
    }
}

/// The caller-supplied decision function.
pub type RouteFn =
    Arc<dyn Fn(Context) -> BoxFuture<'static, WeaveResult<Option<Route>>> + Send + Sync>;

/// A named-route dispatch table.
///
/// Returning `None` from the decision function, or a name with no
/// registered handler, runs the `otherwise` handler, by default a
/// pass-through to the rest of the enclosing chain.
pub struct Router {
    route_fn: RouteFn,
    routes: HashMap<String, Middleware>,
    otherwise: Middleware,
}

impl Router {
    /// Creates a router with a synchronous decision function.
    pub fn new<F>(route_fn: F) -> Self
    where
        F: Fn(&Context) -> Option<Route> + Send + Sync + 'static,
    {
        Self::with_route_fn(Arc::new(move |ctx| {
            let decision = route_fn(&ctx);
            Box::pin(async move { Ok(decision) })
        }))
    }

    /// Creates a router with an asynchronous decision function.
    pub fn new_async<F, Fut>(route_fn: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = WeaveResult<Option<Route>>> + Send + 'static,
    {
        Self::with_route_fn(Arc::new(move |ctx| Box::pin(route_fn(ctx))))
    }

    fn with_route_fn(route_fn: RouteFn) -> Self {
        Self {
            route_fn,
            routes: HashMap::new(),
            otherwise: Middleware::pass_through(),
        }
    }

    /// Registers a handler under a route name.
    pub fn register(mut self, name: impl Into<String>, middleware: impl Into<Middleware>) -> Self {
        self.routes.insert(name.into(), middleware.into());
        self
    }

    /// Sets the fallback handler for unmatched decisions.
    pub fn otherwise(mut self, middleware: impl Into<Middleware>) -> Self {
        self.otherwise = middleware.into();
        self
    }
}

impl MiddlewareObj for Router {
    fn middleware(&self) -> MiddlewareFn {
        let route_fn = Arc::clone(&self.route_fn);
        let routes: Arc<HashMap<String, MiddlewareFn>> = Arc::new(
            self.routes
                .iter()
                .map(|(name, mw)| (name.clone(), mw.unwrap()))
                .collect(),
        );
        let otherwise = self.otherwise.unwrap();
        lazy(move |ctx| {
            let route_fn = Arc::clone(&route_fn);
            let routes = Arc::clone(&routes);
            let otherwise = Arc::clone(&otherwise);
            async move {
                let Some(route) = route_fn(ctx.clone()).await? else {
                    return Ok(Middleware::Func(otherwise));
                };
                for (key, value) in route.state {
                    ctx.state_set(key, value);
                }
                match routes.get(&route.name) {
                    Some(handler) => Ok(Middleware::Func(Arc::clone(handler))),
                    None => {
                        debug!(route = %route.name, "no handler registered for route");
                        Ok(Middleware::Func(otherwise))
                    }
                }
            }
        })
        .unwrap()
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes.len())
            .finish_non_exhaustive()
    }
}
