//! Type and text routing combinators.
//!
//! [`mount`] gates a sub-chain on the update's classification, matching a
//! registered kind against the update type *or* any subtype, which is why
//! a type-level registration and a subtype-level registration can both
//! fire for the same update. [`on_match`] tries compiled triggers against
//! the update's single matchable text; the first trigger that matches
//! wins, writes its capture to the context, and short-circuits the rest.

use std::sync::Arc;

use weave_core::combinators::{Predicate, optional};
use weave_core::pipeline::compose;
use weave_core::{Middleware, UpdateKind};

use crate::trigger::{self, IntoTriggers};

/// Conversion of registration arguments into a kind list.
pub trait IntoKinds {
    /// The kinds to match against.
    fn into_kinds(self) -> Vec<UpdateKind>;
}

impl IntoKinds for UpdateKind {
    fn into_kinds(self) -> Vec<UpdateKind> {
        vec![self]
    }
}

impl IntoKinds for Vec<UpdateKind> {
    fn into_kinds(self) -> Vec<UpdateKind> {
        self
    }
}

impl<const N: usize> IntoKinds for [UpdateKind; N] {
    fn into_kinds(self) -> Vec<UpdateKind> {
        self.to_vec()
    }
}

/// Runs `middleware` only for updates whose type or any subtype is one of
/// `kinds`; every other update passes through untouched.
pub fn mount(kinds: impl IntoKinds, middleware: Vec<Middleware>) -> Middleware {
    let kinds = kinds.into_kinds();
    assert!(!kinds.is_empty(), "at least one update kind must be provided");
    optional(
        Predicate::new(move |ctx| kinds.iter().any(|kind| ctx.has_kind(*kind))),
        middleware,
    )
}

/// Runs `middleware` when any trigger matches the update's matchable
/// text.
///
/// Triggers are tried in registration order; the first match wins, is
/// written to the context's `match` slot, and short-circuits the
/// remaining triggers. When no trigger matches (or the update has no
/// matchable text), control passes to the outer continuation, distinct
/// from `filter`'s silent-end policy.
pub fn on_match(triggers: impl IntoTriggers, middleware: Vec<Middleware>) -> Middleware {
    let triggers = Arc::new(trigger::compile(triggers));
    let chain = compose(middleware);
    Middleware::from_fn(move |ctx, next| {
        let triggers = Arc::clone(&triggers);
        let chain = Arc::clone(&chain);
        async move {
            let text = ctx.text().map(str::to_owned);
            if let Some(text) = text {
                for trigger in triggers.iter() {
                    if let Some(capture) = trigger.apply(&text, &ctx) {
                        ctx.set_matched(capture);
                        return chain(ctx, next).await;
                    }
                }
            }
            next.run(ctx).await
        }
    })
}

/// Text-message routing: `mount(text, on_match(triggers, …))`.
pub fn hears(triggers: impl IntoTriggers, middleware: Vec<Middleware>) -> Middleware {
    mount(UpdateKind::Text, vec![on_match(triggers, middleware)])
}

/// Callback-payload routing: `mount(callback_query, on_match(…))`.
pub fn action(triggers: impl IntoTriggers, middleware: Vec<Middleware>) -> Middleware {
    mount(UpdateKind::CallbackQuery, vec![on_match(triggers, middleware)])
}

/// Inline-query routing: `mount(inline_query, on_match(…))`.
pub fn inline_query(triggers: impl IntoTriggers, middleware: Vec<Middleware>) -> Middleware {
    mount(UpdateKind::InlineQuery, vec![on_match(triggers, middleware)])
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use regex::Regex;

    use weave_core::{Chat, ChatKind, Context, Message, Next, Update, User};

    use super::*;
    use crate::trigger::Trigger;

    fn hello_world_update() -> Update {
        let mut msg = Message::new(1, Chat::new(1, ChatKind::Private));
        msg.from = Some(User::new(42));
        msg.text = Some("hello world".to_string());
        Update::from_message(msg)
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

    async fn run(mw: Middleware, ctx: &Context) {
        let chain = mw.unwrap();
        chain(ctx.clone(), Next::terminal(ctx)).await.unwrap();
    }

    #[tokio::test]
    async fn mount_matches_type_and_subtype() {
        let by_type = Arc::new(AtomicUsize::new(0));
        let by_subtype = Arc::new(AtomicUsize::new(0));
        let voice = Arc::new(AtomicUsize::new(0));

        let ctx = Context::new(hello_world_update());
        run(mount(UpdateKind::Message, vec![counting(&by_type)]), &ctx).await;
        run(mount(UpdateKind::Text, vec![counting(&by_subtype)]), &ctx).await;
        run(mount(UpdateKind::Voice, vec![counting(&voice)]), &ctx).await;

        assert_eq!(by_type.load(Ordering::SeqCst), 1);
        assert_eq!(by_subtype.load(Ordering::SeqCst), 1);
        assert_eq!(voice.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn hears_literal_sets_whole_match() {
        let hits = Arc::new(AtomicUsize::new(0));
        let ctx = Context::new(hello_world_update());

        run(hears("hello world", vec![counting(&hits)]), &ctx).await;

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(ctx.matched().unwrap().get(0), Some("hello world"));
    }

    #[tokio::test]
    async fn hears_regex_captures_groups() {
        let hits = Arc::new(AtomicUsize::new(0));
        let ctx = Context::new(hello_world_update());

        run(
            hears(Regex::new("hello (.+)").unwrap(), vec![counting(&hits)]),
            &ctx,
        )
        .await;

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(ctx.matched().unwrap().get(1), Some("world"));
    }

    #[tokio::test]
    async fn first_matching_trigger_wins() {
        let hits = Arc::new(AtomicUsize::new(0));
        let ctx = Context::new(hello_world_update());

        run(
            hears(
                vec![
                    Regex::new("nope").unwrap().into(),
                    Trigger::from("hello world"),
                    Regex::new("hello (.+)").unwrap().into(),
                ],
                vec![counting(&hits)],
            ),
            &ctx,
        )
        .await;

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        // The literal won, so no group 1 exists.
        assert_eq!(ctx.matched().unwrap().get(1), None);
    }

    #[tokio::test]
    async fn no_match_passes_to_outer_continuation() {
        let matched = Arc::new(AtomicUsize::new(0));
        let after = Arc::new(AtomicUsize::new(0));
        let ctx = Context::new(hello_world_update());

        let chain = compose([
            hears("goodbye", vec![counting(&matched)]),
            counting(&after),
        ]);
        chain(ctx.clone(), Next::terminal(&ctx)).await.unwrap();

        assert_eq!(matched.load(Ordering::SeqCst), 0);
        assert_eq!(after.load(Ordering::SeqCst), 1);
    }
}
