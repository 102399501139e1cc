//! The registration builder.
//!
//! A [`Composer`] collects middleware in registration order and compiles
//! them into one pipeline in its `middleware()` accessor. Because it is
//! itself a middleware object, composers nest: registering a composer
//! inside another splices its pipeline in transparently.

use std::collections::HashMap;
use std::future::Future;

use weave_core::combinators::{self, Predicate, Selector};
use weave_core::pipeline::compose;
use weave_core::{ChatKind, Context, MemberStatus, Middleware, MiddlewareFn, MiddlewareObj, Next, WeaveResult};

use crate::command;
use crate::entity;
use crate::gate::{self, AclSpec};
use crate::routing;
use crate::trigger::IntoTriggers;

/// An ordered collection of middleware compiled on demand.
///
/// All registration methods consume and return the composer, so chains
/// read top to bottom in registration order:
///
/// ```rust,ignore
/// let bot = Composer::new()
///     .use_fn(|ctx, next| async move { next.run(ctx).await })
///     .command("start", greeting())
///     .hears("ping", pong());
/// ```
#[derive(Clone, Default)]
pub struct Composer {
    handlers: Vec<Middleware>,
}

impl Composer {
    /// Creates an empty composer.
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Registers a middleware.
    pub fn use_(mut self, middleware: impl Into<Middleware>) -> Self {
        self.handlers.push(middleware.into());
        self
    }

    /// Registers an async function as middleware.
    pub fn use_fn<F, Fut>(self, f: F) -> Self
    where
        F: Fn(Context, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = WeaveResult<()>> + Send + 'static,
    {
        self.use_(Middleware::from_fn(f))
    }

    /// Registers a handler for the given update kinds (types or
    /// subtypes).
    pub fn on(self, kinds: impl routing::IntoKinds, middleware: impl Into<Middleware>) -> Self {
        self.use_(routing::mount(kinds, vec![middleware.into()]))
    }

    /// Registers a handler for text messages matching a trigger.
    pub fn hears(self, triggers: impl IntoTriggers, middleware: impl Into<Middleware>) -> Self {
        self.use_(routing::hears(triggers, vec![middleware.into()]))
    }

    /// Registers a handler for callback payloads matching a trigger.
    pub fn action(self, triggers: impl IntoTriggers, middleware: impl Into<Middleware>) -> Self {
        self.use_(routing::action(triggers, vec![middleware.into()]))
    }

    /// Registers a handler for inline queries matching a trigger.
    pub fn inline_query(
        self,
        triggers: impl IntoTriggers,
        middleware: impl Into<Middleware>,
    ) -> Self {
        self.use_(routing::inline_query(triggers, vec![middleware.into()]))
    }

    /// Registers a slash-command handler.
    pub fn command(
        self,
        names: impl command::IntoCommands,
        middleware: impl Into<Middleware>,
    ) -> Self {
        self.use_(command::command(names, vec![middleware.into()]))
    }

    /// Registers a `/start` handler; the deep-link payload lands in the
    /// dispatch state under `"start_payload"`.
    pub fn start(self, middleware: impl Into<Middleware>) -> Self {
        self.use_(command::start(vec![middleware.into()]))
    }

    /// Registers a `/help` handler.
    pub fn help(self, middleware: impl Into<Middleware>) -> Self {
        self.use_(command::help(vec![middleware.into()]))
    }

    /// Registers a `/settings` handler.
    pub fn settings(self, middleware: impl Into<Middleware>) -> Self {
        self.use_(command::settings(vec![middleware.into()]))
    }

    /// Registers an entity-span handler.
    pub fn entity<F>(self, predicate: F, middleware: impl Into<Middleware>) -> Self
    where
        F: Fn(&weave_core::MessageEntity, &str, &Context) -> bool + Send + Sync + 'static,
    {
        self.use_(entity::entity(predicate, vec![middleware.into()]))
    }

    /// Registers a mention handler.
    pub fn mention(self, triggers: impl IntoTriggers, middleware: impl Into<Middleware>) -> Self {
        self.use_(entity::mention(triggers, vec![middleware.into()]))
    }

    /// Registers a hashtag handler.
    pub fn hashtag(self, triggers: impl IntoTriggers, middleware: impl Into<Middleware>) -> Self {
        self.use_(entity::hashtag(triggers, vec![middleware.into()]))
    }

    /// Registers a cashtag handler.
    pub fn cashtag(self, triggers: impl IntoTriggers, middleware: impl Into<Middleware>) -> Self {
        self.use_(entity::cashtag(triggers, vec![middleware.into()]))
    }

    /// Registers an email handler.
    pub fn email(self, triggers: impl IntoTriggers, middleware: impl Into<Middleware>) -> Self {
        self.use_(entity::email(triggers, vec![middleware.into()]))
    }

    /// Registers a URL handler.
    pub fn url(self, triggers: impl IntoTriggers, middleware: impl Into<Middleware>) -> Self {
        self.use_(entity::url(triggers, vec![middleware.into()]))
    }

    /// Registers a phone-number handler.
    pub fn phone(self, triggers: impl IntoTriggers, middleware: impl Into<Middleware>) -> Self {
        self.use_(entity::phone(triggers, vec![middleware.into()]))
    }

    /// Registers a text-link handler.
    pub fn text_link(self, triggers: impl IntoTriggers, middleware: impl Into<Middleware>) -> Self {
        self.use_(entity::text_link(triggers, vec![middleware.into()]))
    }

    /// Registers a text-mention handler.
    pub fn text_mention(
        self,
        triggers: impl IntoTriggers,
        middleware: impl Into<Middleware>,
    ) -> Self {
        self.use_(entity::text_mention(triggers, vec![middleware.into()]))
    }

    /// Silently ends the chain for updates failing `predicate`.
    pub fn filter(self, predicate: impl Into<Predicate>) -> Self {
        self.use_(combinators::filter(predicate))
    }

    /// Silently ends the chain for updates satisfying `predicate`.
    pub fn drop_if(self, predicate: impl Into<Predicate>) -> Self {
        self.use_(combinators::drop_if(predicate))
    }

    /// Registers a branch.
    pub fn branch(
        self,
        predicate: impl Into<Predicate>,
        on_true: impl Into<Middleware>,
        on_false: impl Into<Middleware>,
    ) -> Self {
        self.use_(combinators::branch(
            predicate,
            on_true.into(),
            on_false.into(),
        ))
    }

    /// Registers middleware that runs only when `predicate` holds.
    pub fn optional(
        self,
        predicate: impl Into<Predicate>,
        middleware: impl Into<Middleware>,
    ) -> Self {
        self.use_(combinators::optional(predicate, vec![middleware.into()]))
    }

    /// Registers a keyed dispatch table.
    pub fn dispatch(
        self,
        selector: impl Into<Selector>,
        routes: HashMap<String, Middleware>,
    ) -> Self {
        self.use_(combinators::dispatch(selector, routes))
    }

    /// Registers dispatch-time middleware selection.
    pub fn lazy<F, Fut>(self, factory: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = WeaveResult<Middleware>> + Send + 'static,
    {
        self.use_(combinators::lazy(factory))
    }

    /// Registers a side effect that completes before the chain resumes.
    pub fn tap(self, middleware: impl Into<Middleware>) -> Self {
        self.use_(combinators::tap(middleware.into()))
    }

    /// Registers a detached, fire-and-forget side chain.
    pub fn fork(self, middleware: impl Into<Middleware>) -> Self {
        self.use_(combinators::fork(middleware.into()))
    }

    /// Registers a sender allow-list gate.
    pub fn acl(self, spec: impl Into<AclSpec>, middleware: impl Into<Middleware>) -> Self {
        self.use_(gate::acl(spec, vec![middleware.into()]))
    }

    /// Registers a membership-status gate.
    pub fn member_status(
        self,
        statuses: Vec<MemberStatus>,
        middleware: impl Into<Middleware>,
    ) -> Self {
        self.use_(gate::member_status(statuses, vec![middleware.into()]))
    }

    /// Registers an administrators-only gate.
    pub fn admin(self, middleware: impl Into<Middleware>) -> Self {
        self.use_(gate::admin(vec![middleware.into()]))
    }

    /// Registers a creator-only gate.
    pub fn creator(self, middleware: impl Into<Middleware>) -> Self {
        self.use_(gate::creator(vec![middleware.into()]))
    }

    /// Registers a chat-kind gate.
    pub fn chat_type(self, kinds: Vec<ChatKind>, middleware: impl Into<Middleware>) -> Self {
        self.use_(gate::chat_type(kinds, vec![middleware.into()]))
    }

    /// Registers a private-chat gate.
    pub fn private_chat(self, middleware: impl Into<Middleware>) -> Self {
        self.use_(gate::private_chat(vec![middleware.into()]))
    }

    /// Registers a group-chat gate.
    pub fn group_chat(self, middleware: impl Into<Middleware>) -> Self {
        self.use_(gate::group_chat(vec![middleware.into()]))
    }

    /// Number of registered middleware.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns `true` when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl MiddlewareObj for Composer {
    fn middleware(&self) -> MiddlewareFn {
        compose(self.handlers.clone())
    }
}

impl std::fmt::Debug for Composer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Composer")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use weave_core::{Chat, ChatKind, Message, Update, User};

    fn text_update(text: &str) -> Update {
        let mut msg = Message::new(1, Chat::new(1, ChatKind::Private));
        msg.from = Some(User::new(42));
        msg.text = Some(text.to_string());
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

    async fn dispatch(composer: &Composer, update: Update) {
        let chain = composer.middleware();
        let ctx = Context::new(update);
        let next = Next::terminal(&ctx);
        chain(ctx, next).await.unwrap();
    }

    #[tokio::test]
    async fn handlers_run_in_registration_order() {
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let mut composer = Composer::new();
        for tag in 1..=3 {
            let log = Arc::clone(&order);
            composer = composer.use_fn(move |ctx, next| {
                let log = Arc::clone(&log);
                async move {
                    log.lock().push(tag);
                    next.run(ctx).await
                }
            });
        }

        dispatch(&composer, text_update("hi")).await;
        assert_eq!(*order.lock(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn nested_composer_splices_in() {
        let inner_hits = Arc::new(AtomicUsize::new(0));
        let after_hits = Arc::new(AtomicUsize::new(0));

        let inner = Composer::new().use_(counting(&inner_hits));
        let outer = Composer::new().use_(inner).use_(counting(&after_hits));

        dispatch(&outer, text_update("hi")).await;
        assert_eq!(inner_hits.load(Ordering::SeqCst), 1);
        assert_eq!(after_hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn type_and_subtype_registrations_both_fire() {
        let message_hits = Arc::new(AtomicUsize::new(0));
        let text_hits = Arc::new(AtomicUsize::new(0));

        let composer = Composer::new()
            .on(weave_core::UpdateKind::Message, counting(&message_hits))
            .on(weave_core::UpdateKind::Text, counting(&text_hits));

        dispatch(&composer, text_update("hi")).await;
        assert_eq!(message_hits.load(Ordering::SeqCst), 1);
        assert_eq!(text_hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn filter_gates_later_registrations() {
        let hits = Arc::new(AtomicUsize::new(0));
        let composer = Composer::new()
            .filter(Predicate::new(|ctx| ctx.text() == Some("let me in")))
            .use_(counting(&hits));

        dispatch(&composer, text_update("hi")).await;
        dispatch(&composer, text_update("let me in")).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
