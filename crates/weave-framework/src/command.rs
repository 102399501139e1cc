//! Command routing.
//!
//! A command match requires a recognized bot-command entity at offset
//! zero whose covered substring equals one of the accepted forms. The
//! accepted forms depend on dispatch-time information: in group-like
//! chats, once the bot's own identity is known, the `@botname`-suffixed
//! form is accepted as well, which is why the combinator is built on
//! `lazy`. While the identity is unknown, the suffixed form is silently
//! never accepted.

use serde_json::Value;

use weave_core::combinators::lazy;
use weave_core::pipeline::compose;
use weave_core::{EntityKind, Middleware, UpdateKind};

use crate::entity::entity;
use crate::routing::mount;

/// Conversion of registration arguments into a command list.
pub trait IntoCommands {
    /// The command names to accept.
    fn into_commands(self) -> Vec<String>;
}

impl IntoCommands for &str {
    fn into_commands(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl IntoCommands for String {
    fn into_commands(self) -> Vec<String> {
        vec![self]
    }
}

impl IntoCommands for Vec<&str> {
    fn into_commands(self) -> Vec<String> {
        self.into_iter().map(str::to_string).collect()
    }
}

impl IntoCommands for Vec<String> {
    fn into_commands(self) -> Vec<String> {
        self
    }
}

impl<const N: usize> IntoCommands for [&str; N] {
    fn into_commands(self) -> Vec<String> {
        self.into_iter().map(str::to_string).collect()
    }
}

/// Normalizes command names to their fixed-prefix form.
fn normalize(names: impl IntoCommands) -> Vec<String> {
    let commands: Vec<String> = names
        .into_commands()
        .into_iter()
        .map(|name| {
            if name.starts_with('/') {
                name
            } else {
                format!("/{name}")
            }
        })
        .collect();
    assert!(
        !commands.is_empty(),
        "at least one command name must be provided"
    );
    commands
}

/// Routes slash commands.
///
/// Matches a text message carrying a bot-command entity at offset zero
/// whose covered substring equals one of `names` (normalized to `/name`),
/// or `name@botname` in group-like chats once the identity is known.
pub fn command(names: impl IntoCommands, middleware: Vec<Middleware>) -> Middleware {
    let commands = normalize(names);
    let chain = Middleware::Func(compose(middleware));
    mount(
        UpdateKind::Text,
        vec![lazy(move |ctx| {
            let commands = commands.clone();
            let chain = chain.clone();
            async move {
                let suffixed: Vec<String> = match (ctx.me(), ctx.chat()) {
                    (Some(me), Some(chat)) if chat.kind.is_group_like() => {
                        commands.iter().map(|c| format!("{c}@{me}")).collect()
                    }
                    _ => Vec::new(),
                };
                Ok(entity(
                    move |span, covered, _ctx| {
                        span.offset == 0
                            && span.kind == EntityKind::BotCommand
                            && (commands.iter().any(|c| c == covered)
                                || suffixed.iter().any(|c| c == covered))
                    },
                    vec![chain.clone()],
                ))
            }
        })],
    )
}

/// Routes `/start`, exposing the deep-link payload.
///
/// Any text after the command is trimmed and stored in the dispatch state
/// under `"start_payload"` before the handlers run.
pub fn start(middleware: Vec<Middleware>) -> Middleware {
    let payload = Middleware::from_fn(|ctx, next| async move {
        let payload = ctx
            .text()
            .and_then(|text| text.split_once(char::is_whitespace))
            .map(|(_, rest)| rest.trim().to_string())
            .filter(|rest| !rest.is_empty());
        if let Some(payload) = payload {
            ctx.state_set("start_payload", Value::String(payload));
        }
        next.run(ctx).await
    });
    let mut chain = vec![payload];
    chain.extend(middleware);
    command("start", chain)
}

/// Routes `/help`.
pub fn help(middleware: Vec<Middleware>) -> Middleware {
    command("help", middleware)
}

/// Routes `/settings`.
pub fn settings(middleware: Vec<Middleware>) -> Middleware {
    command("settings", middleware)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use weave_core::{Chat, ChatKind, Context, Message, MessageEntity, Next, Update, User};

    fn command_update(chat_kind: ChatKind, text: &str, entity_len: usize) -> Update {
        let mut msg = Message::new(1, Chat::new(1, chat_kind));
        msg.from = Some(User::new(42));
        msg.text = Some(text.to_string());
        msg.entities = vec![MessageEntity::new(EntityKind::BotCommand, 0, entity_len)];
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

    async fn run(mw: &Middleware, ctx: &Context) {
        let chain = mw.unwrap();
        chain(ctx.clone(), Next::terminal(ctx)).await.unwrap();
    }

    #[tokio::test]
    async fn matches_plain_command() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mw = command("start", vec![counting(&hits)]);

        let ctx = Context::new(command_update(ChatKind::Private, "/start", 6));
        run(&mw, &ctx).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn accepts_suffixed_form_in_groups_when_identity_known() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mw = command("start", vec![counting(&hits)]);

        let ctx = Context::from_parts(
            command_update(ChatKind::Supergroup, "/start@botname", 14),
            Some("botname".to_string()),
            None,
            false,
        );
        run(&mw, &ctx).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rejects_other_bots_suffix() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mw = command("start", vec![counting(&hits)]);

        let ctx = Context::from_parts(
            command_update(ChatKind::Supergroup, "/start@otherbot", 15),
            Some("botname".to_string()),
            None,
            false,
        );
        run(&mw, &ctx).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn suffix_never_accepted_while_identity_unknown() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mw = command("start", vec![counting(&hits)]);

        let ctx = Context::new(command_update(ChatKind::Supergroup, "/start@botname", 14));
        run(&mw, &ctx).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn suffixed_form_needs_a_group_like_chat() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mw = command("start", vec![counting(&hits)]);

        let ctx = Context::from_parts(
            command_update(ChatKind::Private, "/start@botname", 14),
            Some("botname".to_string()),
            None,
            false,
        );
        run(&mw, &ctx).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn entity_must_start_at_offset_zero() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mw = command("start", vec![counting(&hits)]);

        let mut msg = Message::new(1, Chat::new(1, ChatKind::Private));
        msg.text = Some("say /start".to_string());
        msg.entities = vec![MessageEntity::new(EntityKind::BotCommand, 4, 6)];
        let ctx = Context::new(Update::from_message(msg));

        run(&mw, &ctx).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn start_exposes_deep_link_payload() {
        let seen = Arc::new(parking_lot::Mutex::new(None));
        let capture = Arc::clone(&seen);
        let handler = Middleware::from_fn(move |ctx, next| {
            let capture = Arc::clone(&capture);
            async move {
                *capture.lock() = ctx.state_get("start_payload");
                next.run(ctx).await
            }
        });

        let mw = start(vec![handler]);
        let ctx = Context::new(command_update(ChatKind::Private, "/start ref-17", 6));
        run(&mw, &ctx).await;

        assert_eq!(*seen.lock(), Some(Value::String("ref-17".to_string())));
    }
}
