//! Entity-span routing.
//!
//! [`entity`] scans the ordered entity list on a message or channel post
//! and runs its sub-chain once, on the first span whose predicate holds,
//! not once per matching span. [`entity_text`] specializes the predicate
//! to trigger-style matching against the substring a span covers, and is
//! the base of the email/url/mention/… helpers.

use std::sync::Arc;

use weave_core::model::message::utf16_slice;
use weave_core::pipeline::compose;
use weave_core::{Context, EntityKind, MessageEntity, Middleware};

use crate::trigger::{self, IntoTriggers, Trigger};

/// Predicate over an entity span, the substring it covers, and the
/// context.
pub type EntityPredicate = Arc<dyn Fn(&MessageEntity, &str, &Context) -> bool + Send + Sync>;

/// Runs `middleware` once, on the first entity span satisfying
/// `predicate`; updates without such a span pass through untouched.
pub fn entity<F>(predicate: F, middleware: Vec<Middleware>) -> Middleware
where
    F: Fn(&MessageEntity, &str, &Context) -> bool + Send + Sync + 'static,
{
    let predicate: EntityPredicate = Arc::new(predicate);
    let chain = compose(middleware);
    Middleware::from_fn(move |ctx, next| {
        let predicate = Arc::clone(&predicate);
        let chain = Arc::clone(&chain);
        async move {
            let matched = ctx
                .entity_message()
                .and_then(|msg| msg.text_and_entities())
                .map(|(text, entities)| {
                    entities.iter().any(|span| {
                        let covered = utf16_slice(text, span.offset, span.length);
                        predicate(span, &covered, &ctx)
                    })
                })
                .unwrap_or(false);
            if matched {
                chain(ctx, next).await
            } else {
                next.run(ctx).await
            }
        }
    })
}

/// Entity routing with trigger-style matching on the covered substring.
///
/// The first trigger producing a match wins and is written to the
/// context's `match` slot, exactly as text matching does.
pub fn entity_text(
    kind: EntityKind,
    triggers: impl IntoTriggers,
    middleware: Vec<Middleware>,
) -> Middleware {
    let triggers = trigger::compile(triggers);
    entity(
        move |span, covered, ctx| {
            if span.kind != kind {
                return false;
            }
            for trigger in &triggers {
                if let Some(capture) = trigger.apply(covered, ctx) {
                    ctx.set_matched(capture);
                    return true;
                }
            }
            false
        },
        middleware,
    )
}

/// Prepends `prefix` to literal triggers that lack it; other trigger
/// shapes are left alone.
fn prefixed(triggers: Vec<Trigger>, prefix: char) -> Vec<Trigger> {
    triggers
        .into_iter()
        .map(|trigger| match trigger {
            Trigger::Literal(s) if !s.starts_with(prefix) => {
                Trigger::Literal(format!("{prefix}{s}"))
            }
            other => other,
        })
        .collect()
}

/// Routes on `@username` mention spans; bare literals get the `@` prefix.
pub fn mention(triggers: impl IntoTriggers, middleware: Vec<Middleware>) -> Middleware {
    entity_text(
        EntityKind::Mention,
        prefixed(trigger::compile(triggers), '@'),
        middleware,
    )
}

/// Routes on `#hashtag` spans; bare literals get the `#` prefix.
pub fn hashtag(triggers: impl IntoTriggers, middleware: Vec<Middleware>) -> Middleware {
    entity_text(
        EntityKind::Hashtag,
        prefixed(trigger::compile(triggers), '#'),
        middleware,
    )
}

/// Routes on `$CASHTAG` spans; bare literals get the `$` prefix.
pub fn cashtag(triggers: impl IntoTriggers, middleware: Vec<Middleware>) -> Middleware {
    entity_text(
        EntityKind::Cashtag,
        prefixed(trigger::compile(triggers), '$'),
        middleware,
    )
}

/// Routes on email spans.
pub fn email(triggers: impl IntoTriggers, middleware: Vec<Middleware>) -> Middleware {
    entity_text(EntityKind::Email, triggers, middleware)
}

/// Routes on bare URL spans.
pub fn url(triggers: impl IntoTriggers, middleware: Vec<Middleware>) -> Middleware {
    entity_text(EntityKind::Url, triggers, middleware)
}

/// Routes on phone-number spans.
pub fn phone(triggers: impl IntoTriggers, middleware: Vec<Middleware>) -> Middleware {
    entity_text(EntityKind::PhoneNumber, triggers, middleware)
}

/// Routes on text-link spans (text with an attached URL).
pub fn text_link(triggers: impl IntoTriggers, middleware: Vec<Middleware>) -> Middleware {
    entity_text(EntityKind::TextLink, triggers, middleware)
}

/// Routes on text-mention spans (mentions of users without usernames).
pub fn text_mention(triggers: impl IntoTriggers, middleware: Vec<Middleware>) -> Middleware {
    entity_text(EntityKind::TextMention, triggers, middleware)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use weave_core::{Chat, ChatKind, Message, Next, Update};

    fn update_with_entities(text: &str, entities: Vec<MessageEntity>) -> Update {
        let mut msg = Message::new(1, Chat::new(1, ChatKind::Group));
        msg.text = Some(text.to_string());
        msg.entities = entities;
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
    async fn runs_once_on_first_matching_entity() {
        let hits = Arc::new(AtomicUsize::new(0));
        let update = update_with_entities(
            "#a #b",
            vec![
                MessageEntity::new(EntityKind::Hashtag, 0, 2),
                MessageEntity::new(EntityKind::Hashtag, 3, 2),
            ],
        );
        let ctx = Context::new(update);

        run(
            entity(
                |span, _covered, _ctx| span.kind == EntityKind::Hashtag,
                vec![counting(&hits)],
            ),
            &ctx,
        )
        .await;

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn hashtag_helper_prefixes_bare_literals() {
        let hits = Arc::new(AtomicUsize::new(0));
        let update = update_with_entities(
            "talking about #weave today",
            vec![MessageEntity::new(EntityKind::Hashtag, 14, 6)],
        );
        let ctx = Context::new(update);

        run(hashtag("weave", vec![counting(&hits)]), &ctx).await;

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(ctx.matched().unwrap().get(0), Some("#weave"));
    }

    #[tokio::test]
    async fn wrong_entity_kind_passes_through() {
        let hits = Arc::new(AtomicUsize::new(0));
        let update = update_with_entities(
            "user@example.com",
            vec![MessageEntity::new(EntityKind::Email, 0, 16)],
        );
        let ctx = Context::new(update);

        run(mention("someone", vec![counting(&hits)]), &ctx).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        run(email("user@example.com", vec![counting(&hits)]), &ctx).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
