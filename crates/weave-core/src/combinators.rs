//! Generic control-flow combinators over the middleware pipeline.
//!
//! These are the predicate-driven building blocks the routing layer is
//! assembled from: branching, filtering, keyed dispatch, deferred
//! selection, and the two side-effect primitives `tap` and `fork`.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::debug;

use crate::context::Context;
use crate::error::WeaveResult;
use crate::pipeline::compose::{Next, compose};
use crate::pipeline::middleware::Middleware;

// ─── Predicate ────────────────────────────────────────────────────────────────

/// A decision over the context: a constant, a synchronous function, or an
/// asynchronous function.
///
/// A constant predicate lets [`branch`] resolve at composition time, so
/// the choice is free at every dispatch. Asynchronous predicates may fail;
/// their errors propagate like any handler error.
#[derive(Clone)]
pub enum Predicate {
    /// A fixed decision.
    Value(bool),
    /// A synchronous decision.
    Sync(Arc<dyn Fn(&Context) -> bool + Send + Sync>),
    /// An asynchronous, fallible decision.
    Async(Arc<dyn Fn(Context) -> BoxFuture<'static, WeaveResult<bool>> + Send + Sync>),
}

impl Predicate {
    /// A synchronous predicate.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Context) -> bool + Send + Sync + 'static,
    {
        Predicate::Sync(Arc::new(f))
    }

    /// An asynchronous predicate.
    pub fn async_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = WeaveResult<bool>> + Send + 'static,
    {
        Predicate::Async(Arc::new(move |ctx| Box::pin(f(ctx))))
    }

    /// Evaluates the predicate for one dispatch.
    pub async fn check(&self, ctx: &Context) -> WeaveResult<bool> {
        match self {
            Predicate::Value(v) => Ok(*v),
            Predicate::Sync(f) => Ok(f(ctx)),
            Predicate::Async(f) => f(ctx.clone()).await,
        }
    }

    /// The constant decision, when there is one.
    pub fn as_const(&self) -> Option<bool> {
        match self {
            Predicate::Value(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<bool> for Predicate {
    fn from(value: bool) -> Self {
        Predicate::Value(value)
    }
}

impl std::fmt::Debug for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Predicate::Value(v) => f.debug_tuple("Predicate::Value").field(v).finish(),
            Predicate::Sync(_) => f.write_str("Predicate::Sync"),
            Predicate::Async(_) => f.write_str("Predicate::Async"),
        }
    }
}

// ─── Keyed selection ──────────────────────────────────────────────────────────

/// A dispatch key: a constant, a synchronous function, or an asynchronous
/// function of the context.
#[derive(Clone)]
pub enum Selector {
    /// A fixed key.
    Value(String),
    /// A synchronous key function.
    Sync(Arc<dyn Fn(&Context) -> String + Send + Sync>),
    /// An asynchronous, fallible key function.
    Async(Arc<dyn Fn(Context) -> BoxFuture<'static, WeaveResult<String>> + Send + Sync>),
}

impl Selector {
    /// A synchronous key function.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Context) -> String + Send + Sync + 'static,
    {
        Selector::Sync(Arc::new(f))
    }

    /// An asynchronous key function.
    pub fn async_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = WeaveResult<String>> + Send + 'static,
    {
        Selector::Async(Arc::new(move |ctx| Box::pin(f(ctx))))
    }

    /// Resolves the key for one dispatch.
    pub async fn resolve(&self, ctx: &Context) -> WeaveResult<String> {
        match self {
            Selector::Value(v) => Ok(v.clone()),
            Selector::Sync(f) => Ok(f(ctx)),
            Selector::Async(f) => f(ctx.clone()).await,
        }
    }
}

impl From<&str> for Selector {
    fn from(value: &str) -> Self {
        Selector::Value(value.to_string())
    }
}

impl From<String> for Selector {
    fn from(value: String) -> Self {
        Selector::Value(value)
    }
}

// ─── Combinators ──────────────────────────────────────────────────────────────

/// Runs `on_true` or `on_false` depending on `predicate`.
///
/// The chosen branch receives the outer continuation, so a pass-through
/// branch continues the enclosing chain transparently.
pub fn branch(
    predicate: impl Into<Predicate>,
    on_true: Middleware,
    on_false: Middleware,
) -> Middleware {
    let predicate = predicate.into();
    // A constant decision is taken here, once.
    if let Some(value) = predicate.as_const() {
        return if value { on_true } else { on_false };
    }
    let on_true = on_true.unwrap();
    let on_false = on_false.unwrap();
    Middleware::from_fn(move |ctx, next| {
        let predicate = predicate.clone();
        let on_true = Arc::clone(&on_true);
        let on_false = Arc::clone(&on_false);
        async move {
            let chosen = if predicate.check(&ctx).await? {
                on_true
            } else {
                on_false
            };
            chosen(ctx, next).await
        }
    })
}

/// Runs `middleware` only when `predicate` holds; otherwise passes
/// through to the rest of the chain.
pub fn optional(
    predicate: impl Into<Predicate>,
    middleware: Vec<Middleware>,
) -> Middleware {
    branch(
        predicate,
        Middleware::Func(compose(middleware)),
        Middleware::pass_through(),
    )
}

/// Silently ends the chain when `predicate` is false.
pub fn filter(predicate: impl Into<Predicate>) -> Middleware {
    branch(predicate, Middleware::pass_through(), Middleware::noop())
}

/// Silently ends the chain when `predicate` is true; the inverse of
/// [`filter`].
pub fn drop_if(predicate: impl Into<Predicate>) -> Middleware {
    branch(predicate, Middleware::noop(), Middleware::pass_through())
}

/// Runs the handler registered under the resolved key.
///
/// An unmatched key is not an error: control passes through to the rest
/// of the chain with no handler run.
pub fn dispatch(
    selector: impl Into<Selector>,
    routes: HashMap<String, Middleware>,
) -> Middleware {
    let selector = selector.into();
    let routes: Arc<HashMap<String, crate::pipeline::MiddlewareFn>> = Arc::new(
        routes
            .into_iter()
            .map(|(key, mw)| (key, mw.unwrap()))
            .collect(),
    );
    Middleware::from_fn(move |ctx, next| {
        let selector = selector.clone();
        let routes = Arc::clone(&routes);
        async move {
            let key = selector.resolve(&ctx).await?;
            match routes.get(&key) {
                Some(handler) => handler(ctx, next).await,
                None => next.run(ctx).await,
            }
        }
    })
}

/// Defers middleware *selection* to dispatch time.
///
/// `factory` is invoked with the context once per dispatch; the
/// middleware it yields is unwrapped and run in place. Used whenever the
/// final predicate depends on information only known at dispatch time.
pub fn lazy<F, Fut>(factory: F) -> Middleware
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = WeaveResult<Middleware>> + Send + 'static,
{
    let factory = Arc::new(factory);
    Middleware::from_fn(move |ctx, next| {
        let factory = Arc::clone(&factory);
        async move {
            let selected = factory(ctx.clone()).await?.unwrap();
            selected(ctx, next).await
        }
    })
}

/// Runs `middleware` to completion against a no-op continuation, then
/// resumes the outer chain.
///
/// For side effects that must finish first but should not redirect
/// control flow; errors from the side chain still propagate.
pub fn tap(middleware: Middleware) -> Middleware {
    let side = middleware.unwrap();
    Middleware::from_fn(move |ctx, next| {
        let side = Arc::clone(&side);
        async move {
            let end = Next::terminal(&ctx);
            side(ctx.clone(), end).await?;
            next.run(ctx).await
        }
    })
}

/// Schedules `middleware` to run alongside the outer chain.
///
/// A deliberate at-most-once, no-guarantee primitive: the side chain is
/// detached, never awaited by its parent dispatch, and its result or
/// error is discarded (logged at debug level).
pub fn fork(middleware: Middleware) -> Middleware {
    let side = middleware.unwrap();
    Middleware::from_fn(move |ctx, next| {
        let side = Arc::clone(&side);
        async move {
            let side_ctx = ctx.clone();
            tokio::spawn(async move {
                let end = Next::terminal(&side_ctx);
                if let Err(error) = side(side_ctx, end).await {
                    debug!(%error, "forked chain failed; error discarded");
                }
            });
            next.run(ctx).await
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::model::Update;

    fn ctx() -> Context {
        Context::new(Update::default())
    }

    fn counting(counter: &Arc<AtomicUsize>) -> Middleware {
        let counter = Arc::clone(counter);
        Middleware::from_fn(move |ctx, next| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                next.run(ctx).await
            }
        })
    }

    async fn run(mw: Middleware, ctx: Context) -> WeaveResult<()> {
        let chain = mw.unwrap();
        let next = Next::terminal(&ctx);
        chain(ctx, next).await
    }

    #[tokio::test]
    async fn branch_selects_by_async_predicate() {
        let yes = Arc::new(AtomicUsize::new(0));
        let no = Arc::new(AtomicUsize::new(0));

        let mw = branch(
            Predicate::async_fn(|_ctx| async { Ok(true) }),
            counting(&yes),
            counting(&no),
        );
        run(mw, ctx()).await.unwrap();

        assert_eq!(yes.load(Ordering::SeqCst), 1);
        assert_eq!(no.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn constant_branch_folds_at_composition_time() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mw = branch(false, Middleware::noop(), counting(&hits));
        run(mw, ctx()).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn filter_ends_chain_silently() {
        let hits = Arc::new(AtomicUsize::new(0));
        let chain = compose([filter(Predicate::new(|_| false)), counting(&hits)]);

        let ctx = ctx();
        let next = Next::terminal(&ctx);
        chain(ctx, next).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn drop_if_is_the_inverse_of_filter() {
        let hits = Arc::new(AtomicUsize::new(0));
        let chain = compose([drop_if(Predicate::new(|_| false)), counting(&hits)]);

        let ctx = ctx();
        let next = Next::terminal(&ctx);
        chain(ctx, next).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn dispatch_runs_exactly_the_keyed_handler() {
        let a = Arc::new(AtomicUsize::new(0));
        let b = Arc::new(AtomicUsize::new(0));
        let routes = HashMap::from([
            ("a".to_string(), counting(&a)),
            ("b".to_string(), counting(&b)),
        ]);

        let mw = dispatch(Selector::new(|_| "a".to_string()), routes);
        run(mw, ctx()).await.unwrap();

        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert_eq!(b.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn dispatch_unmatched_key_is_not_an_error() {
        let a = Arc::new(AtomicUsize::new(0));
        let routes = HashMap::from([("a".to_string(), counting(&a))]);

        let mw = dispatch("missing", routes);
        run(mw, ctx()).await.unwrap();
        assert_eq!(a.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn lazy_selects_at_dispatch_time() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let mw = lazy(move |_ctx| {
            let counter = Arc::clone(&counter);
            async move { Ok(counting(&counter)) }
        });

        run(mw.clone(), ctx()).await.unwrap();
        run(mw, ctx()).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn tap_completes_side_chain_before_resuming() {
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let side_log = Arc::clone(&order);
        let side = Middleware::from_fn(move |_ctx, _next| {
            let side_log = Arc::clone(&side_log);
            async move {
                tokio::task::yield_now().await;
                side_log.lock().push("side");
                Ok(())
            }
        });

        let tail_log = Arc::clone(&order);
        let tail = Middleware::from_fn(move |_ctx, _next| {
            let tail_log = Arc::clone(&tail_log);
            async move {
                tail_log.lock().push("tail");
                Ok(())
            }
        });

        let chain = compose([tap(side), tail]);
        let ctx = ctx();
        let next = Next::terminal(&ctx);
        chain(ctx, next).await.unwrap();

        assert_eq!(*order.lock(), vec!["side", "tail"]);
    }

    #[tokio::test]
    async fn fork_detaches_and_discards_errors() {
        let forked = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&forked);

        let side = Middleware::from_fn(move |_ctx, _next| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(crate::error::WeaveError::msg("discarded"))
            }
        });

        let main = Arc::new(AtomicUsize::new(0));
        let chain = compose([fork(side), counting(&main)]);

        let ctx = ctx();
        let next = Next::terminal(&ctx);
        chain(ctx, next).await.unwrap();
        assert_eq!(main.load(Ordering::SeqCst), 1);

        // The detached task settles on its own schedule.
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(forked.load(Ordering::SeqCst), 1);
    }
}
