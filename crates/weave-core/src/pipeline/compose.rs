//! Onion-model composition.
//!
//! [`compose`] turns an ordered list of middleware into one callable.
//! Each middleware may run code both before and after delegating to the
//! next one through its [`Next`] continuation. Two guards protect a
//! running chain:
//!
//! - the step cursor is strictly increasing for the lifetime of one
//!   dispatch, so a continuation invoked twice rejects with
//!   [`WeaveError::NextCalledMultipleTimes`] and no handler runs twice;
//! - every continuation is sealed to the dispatch it was created for, so
//!   handing it a context from another dispatch rejects with
//!   [`WeaveError::InvalidContext`].
//!
//! A continuation past the end of its own chain delegates to the
//! enclosing chain's continuation, which is what lets a composed chain be
//! nested transparently inside another chain.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::future::BoxFuture;

use crate::context::Context;
use crate::error::{WeaveError, WeaveResult};
use crate::pipeline::middleware::{Middleware, MiddlewareFn, pass_through_fn};

/// The continuation into the rest of a chain.
///
/// `Next` is cloneable so that a misbehaving handler *can* call it twice;
/// the step cursor turns the second call into a rejection instead of a
/// re-entrant chain.
#[derive(Clone)]
pub struct Next {
    steps: Arc<[MiddlewareFn]>,
    index: usize,
    cursor: Arc<AtomicUsize>,
    seal: u64,
    outer: Option<Box<Next>>,
}

impl Next {
    /// A terminal continuation for `ctx`: running it completes the
    /// dispatch without invoking anything further.
    ///
    /// This is what a dispatcher passes when invoking the root chain, and
    /// what side chains (`tap`, `fork`) run against.
    pub fn terminal(ctx: &Context) -> Self {
        Self {
            steps: Vec::new().into(),
            index: 0,
            cursor: Arc::new(AtomicUsize::new(0)),
            seal: ctx.seal(),
            outer: None,
        }
    }

    fn entry(steps: Arc<[MiddlewareFn]>, seal: u64, outer: Next) -> Self {
        Self {
            steps,
            index: 0,
            cursor: Arc::new(AtomicUsize::new(0)),
            seal,
            outer: Some(Box::new(outer)),
        }
    }

    /// Runs the next step of the chain.
    ///
    /// Rejects when `ctx` belongs to another dispatch or when this
    /// continuation's step has already been passed.
    pub fn run(self, ctx: Context) -> BoxFuture<'static, WeaveResult<()>> {
        Box::pin(async move {
            if ctx.seal() != self.seal {
                return Err(WeaveError::InvalidContext);
            }
            // Admit index only if the cursor has not moved past it yet.
            let admitted = self
                .cursor
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |cur| {
                    (self.index >= cur).then_some(self.index + 1)
                });
            if admitted.is_err() {
                return Err(WeaveError::NextCalledMultipleTimes);
            }

            match self.steps.get(self.index) {
                Some(step) => {
                    let successor = Next {
                        steps: Arc::clone(&self.steps),
                        index: self.index + 1,
                        cursor: Arc::clone(&self.cursor),
                        seal: self.seal,
                        outer: self.outer.clone(),
                    };
                    step(ctx, successor).await
                }
                // Past the end of this chain: delegate to the enclosing
                // chain's continuation.
                None => match self.outer {
                    Some(outer) => outer.run(ctx).await,
                    None => Ok(()),
                },
            }
        })
    }
}

impl std::fmt::Debug for Next {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next")
            .field("index", &self.index)
            .field("steps", &self.steps.len())
            .field("seal", &self.seal)
            .finish_non_exhaustive()
    }
}

/// Composes an ordered list of middleware into one callable.
///
/// An empty list is the identity pass-through; a single element resolves
/// to that element alone; longer lists get the guarded step machine. Each
/// element is `unwrap`ped here, once.
pub fn compose<I>(middleware: I) -> MiddlewareFn
where
    I: IntoIterator<Item = Middleware>,
{
    let mut steps: Vec<MiddlewareFn> = middleware.into_iter().map(|m| m.unwrap()).collect();
    match steps.len() {
        0 => pass_through_fn(),
        1 => steps.remove(0),
        _ => {
            let steps: Arc<[MiddlewareFn]> = steps.into();
            Arc::new(move |ctx: Context, outer: Next| {
                Next::entry(Arc::clone(&steps), ctx.seal(), outer).run(ctx)
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::model::Update;

    fn ctx() -> Context {
        Context::new(Update::default())
    }

    /// Records its tag into a shared log before and after running next().
    fn logging(tag: usize, log: &Arc<parking_lot::Mutex<Vec<(usize, &'static str)>>>) -> Middleware {
        let log = Arc::clone(log);
        Middleware::from_fn(move |ctx, next| {
            let log = Arc::clone(&log);
            async move {
                log.lock().push((tag, "enter"));
                next.run(ctx).await?;
                log.lock().push((tag, "exit"));
                Ok(())
            }
        })
    }

    #[tokio::test]
    async fn runs_in_registration_order_with_onion_unwinding() {
        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let chain = compose([logging(1, &log), logging(2, &log), logging(3, &log)]);

        let ctx = ctx();
        let next = Next::terminal(&ctx);
        chain(ctx, next).await.unwrap();

        assert_eq!(
            *log.lock(),
            vec![
                (1, "enter"),
                (2, "enter"),
                (3, "enter"),
                (3, "exit"),
                (2, "exit"),
                (1, "exit"),
            ]
        );
    }

    #[tokio::test]
    async fn empty_compose_invokes_continuation_exactly_once() {
        let chain = compose([]);
        let invoked = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&invoked);

        let tail = Middleware::from_fn(move |_ctx, _next| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });
        let outer = compose([Middleware::Func(chain), tail]);

        let ctx = ctx();
        let next = Next::terminal(&ctx);
        outer(ctx, next).await.unwrap();
        assert_eq!(invoked.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn double_next_rejects_and_runs_no_handler_twice() {
        let later_runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&later_runs);

        let misbehaving = Middleware::from_fn(|ctx, next| async move {
            next.clone().run(ctx.clone()).await?;
            next.run(ctx).await
        });
        let later = Middleware::from_fn(move |ctx, next| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                next.run(ctx).await
            }
        });

        let chain = compose([misbehaving, later]);
        let ctx = ctx();
        let err = chain(ctx.clone(), Next::terminal(&ctx)).await.unwrap_err();

        assert!(matches!(err, WeaveError::NextCalledMultipleTimes));
        assert_eq!(later_runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn foreign_context_is_rejected() {
        let hijacking = Middleware::from_fn(|_ctx, next| async move {
            let foreign = Context::new(Update::default());
            next.run(foreign).await
        });
        let chain = compose([hijacking, Middleware::pass_through()]);

        let ctx = ctx();
        let err = chain(ctx.clone(), Next::terminal(&ctx)).await.unwrap_err();
        assert!(matches!(err, WeaveError::InvalidContext));
    }

    #[tokio::test]
    async fn nested_chain_delegates_to_outer_continuation() {
        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let inner = compose([logging(10, &log), logging(11, &log)]);
        let outer = compose([logging(1, &log), Middleware::Func(inner), logging(2, &log)]);

        let ctx = ctx();
        outer(ctx.clone(), Next::terminal(&ctx)).await.unwrap();

        assert_eq!(
            *log.lock(),
            vec![
                (1, "enter"),
                (10, "enter"),
                (11, "enter"),
                (2, "enter"),
                (2, "exit"),
                (11, "exit"),
                (10, "exit"),
                (1, "exit"),
            ]
        );
    }

    #[tokio::test]
    async fn handler_errors_propagate_unchanged() {
        let failing = Middleware::from_fn(|_ctx, _next| async { Err(WeaveError::msg("boom")) });
        let chain = compose([Middleware::pass_through(), failing]);

        let ctx = ctx();
        let err = chain(ctx.clone(), Next::terminal(&ctx)).await.unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[tokio::test]
    async fn single_element_compose_is_the_element() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let only = Middleware::from_fn(move |ctx, next| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                next.run(ctx).await
            }
        });

        let chain = compose([only]);
        let ctx = ctx();
        chain(ctx.clone(), Next::terminal(&ctx)).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
