//! Per-dispatch context and update classification.
//!
//! A [`Context`] wraps exactly one inbound [`Update`]. It is created
//! immediately before dispatch, cloned cheaply through the whole pipeline
//! (the clone shares one inner allocation), and discarded when the
//! dispatch settles; it is never reused across updates.
//!
//! Classification (`kind`, `sub_kinds`) is derived once per context and
//! memoized. The `state`, `match` and `session` slots are the only mutable
//! parts; all three are scoped to the single in-flight dispatch that owns
//! the context, so no cross-dispatch synchronization is needed.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde_json::Value;

use crate::api::BoxedApiClient;
use crate::error::{WeaveError, WeaveResult};
use crate::model::{Chat, Message, Update, UpdateKind, User};

/// Source of per-dispatch seal ids.
static NEXT_SEAL: AtomicU64 = AtomicU64::new(1);

/// Captured groups from a trigger match.
///
/// Group 0 is the whole match; further groups follow the trigger's own
/// numbering. Valid only during the dispatch that set it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchCapture {
    groups: Vec<Option<String>>,
}

impl MatchCapture {
    /// Builds a capture set from explicit groups.
    pub fn new(groups: Vec<Option<String>>) -> Self {
        Self { groups }
    }

    /// Builds a capture set whose only group is the whole match.
    pub fn whole(text: impl Into<String>) -> Self {
        Self {
            groups: vec![Some(text.into())],
        }
    }

    /// Returns group `index`, if it participated in the match.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.groups.get(index).and_then(|g| g.as_deref())
    }

    /// Number of groups, counting the whole match.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Returns `true` when no group was captured.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

struct ContextInner {
    update: Update,
    me: Option<String>,
    api: Option<BoxedApiClient>,
    channel_mode: bool,
    seal: u64,
    kind: OnceLock<Option<UpdateKind>>,
    sub_kinds: OnceLock<Vec<UpdateKind>>,
    state: Mutex<HashMap<String, Value>>,
    matched: Mutex<Option<MatchCapture>>,
    session: Mutex<Option<Value>>,
}

/// The per-dispatch value handed to every handler.
///
/// Cloning is cheap and yields a handle to the same dispatch; the seal id
/// ties every clone to the dispatch that created it.
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl Context {
    /// Creates a context for one update, with no bot identity and no
    /// capability client attached.
    pub fn new(update: Update) -> Self {
        Self::from_parts(update, None, None, false)
    }

    /// Creates a fully configured context.
    ///
    /// `me` is the bot's own username when the identity lookup has
    /// completed. `channel_mode` opts channel posts into message-subtype
    /// derivation.
    pub fn from_parts(
        update: Update,
        me: Option<String>,
        api: Option<BoxedApiClient>,
        channel_mode: bool,
    ) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                update,
                me,
                api,
                channel_mode,
                seal: NEXT_SEAL.fetch_add(1, Ordering::Relaxed),
                kind: OnceLock::new(),
                sub_kinds: OnceLock::new(),
                state: Mutex::new(HashMap::new()),
                matched: Mutex::new(None),
                session: Mutex::new(None),
            }),
        }
    }

    /// The wrapped update.
    pub fn update(&self) -> &Update {
        &self.inner.update
    }

    /// The dispatch seal id stamped into this context at construction.
    pub fn seal(&self) -> u64 {
        self.inner.seal
    }

    /// The bot's own username, once known.
    pub fn me(&self) -> Option<&str> {
        self.inner.me.as_deref()
    }

    /// The attached capability client, if any.
    pub fn api(&self) -> Option<&BoxedApiClient> {
        self.inner.api.as_ref()
    }

    // ─── Classification ──────────────────────────────────────────────────────

    /// The canonical update type, derived once.
    pub fn kind(&self) -> Option<UpdateKind> {
        *self.inner.kind.get_or_init(|| self.inner.update.kind())
    }

    /// The ordered message subtypes, derived once.
    ///
    /// Subtypes exist only for `message` updates, or also for
    /// `channel_post` updates when the context was built in channel
    /// compatibility mode; every other classification has none.
    pub fn sub_kinds(&self) -> &[UpdateKind] {
        self.inner.sub_kinds.get_or_init(|| {
            let source = match self.kind() {
                Some(UpdateKind::Message) => self.inner.update.message.as_ref(),
                Some(UpdateKind::ChannelPost) if self.inner.channel_mode => {
                    self.inner.update.channel_post.as_ref()
                }
                _ => None,
            };
            source.map(Message::sub_kinds).unwrap_or_default()
        })
    }

    /// Returns `true` when `kind` equals the update type or any subtype.
    pub fn has_kind(&self, kind: UpdateKind) -> bool {
        self.kind() == Some(kind) || self.sub_kinds().contains(&kind)
    }

    /// A human-readable classification such as `message::text,forward`,
    /// used in capability errors.
    pub fn classification(&self) -> String {
        match self.kind() {
            None => "unknown".to_string(),
            Some(kind) => {
                let subs = self.sub_kinds();
                if subs.is_empty() {
                    kind.to_string()
                } else {
                    let labels: Vec<&str> = subs.iter().map(|s| s.as_str()).collect();
                    format!("{}::{}", kind, labels.join(","))
                }
            }
        }
    }

    // ─── Derived accessors ───────────────────────────────────────────────────

    /// The new-message payload, when this is a `message` update.
    pub fn message(&self) -> Option<&Message> {
        self.inner.update.message.as_ref()
    }

    /// The message payload from any message-bearing variant, in priority
    /// order: message, edited message, channel post, edited channel post,
    /// then the message a callback button was attached to.
    pub fn any_message(&self) -> Option<&Message> {
        let u = &self.inner.update;
        u.message
            .as_ref()
            .or(u.edited_message.as_ref())
            .or(u.channel_post.as_ref())
            .or(u.edited_channel_post.as_ref())
            .or_else(|| u.callback_query.as_ref().and_then(|q| q.message.as_deref()))
    }

    /// The message payload entity scanning applies to: a new message or a
    /// channel post.
    pub fn entity_message(&self) -> Option<&Message> {
        let u = &self.inner.update;
        u.message.as_ref().or(u.channel_post.as_ref())
    }

    /// The chat this update relates to, trying each variant in priority
    /// order.
    pub fn chat(&self) -> Option<&Chat> {
        let u = &self.inner.update;
        self.any_message()
            .map(|m| &m.chat)
            .or_else(|| u.my_chat_member.as_ref().map(|m| &m.chat))
            .or_else(|| u.chat_member.as_ref().map(|m| &m.chat))
            .or_else(|| u.chat_join_request.as_ref().map(|r| &r.chat))
    }

    /// The acting user, trying each variant in priority order.
    pub fn from(&self) -> Option<&User> {
        let u = &self.inner.update;
        self.any_message()
            .and_then(|m| m.from.as_ref())
            .or_else(|| u.callback_query.as_ref().map(|q| &q.from))
            .or_else(|| u.inline_query.as_ref().map(|q| &q.from))
            .or_else(|| u.chosen_inline_result.as_ref().map(|r| &r.from))
            .or_else(|| u.shipping_query.as_ref().map(|q| &q.from))
            .or_else(|| u.pre_checkout_query.as_ref().map(|q| &q.from))
            .or_else(|| u.poll_answer.as_ref().and_then(|a| a.user.as_ref()))
            .or_else(|| u.my_chat_member.as_ref().map(|m| &m.from))
            .or_else(|| u.chat_member.as_ref().map(|m| &m.from))
            .or_else(|| u.chat_join_request.as_ref().map(|r| &r.from))
    }

    /// The single matchable text of this update: message or caption text,
    /// else callback payload, else inline query text.
    pub fn text(&self) -> Option<&str> {
        let u = &self.inner.update;
        self.any_message()
            .and_then(|m| m.text.as_deref().or(m.caption.as_deref()))
            .or_else(|| u.callback_query.as_ref().and_then(|q| q.data.as_deref()))
            .or_else(|| u.inline_query.as_ref().map(|q| q.query.as_str()))
    }

    // ─── Capability assertions ───────────────────────────────────────────────

    /// The chat, or a capability error naming `method`.
    pub fn expect_chat(&self, method: &'static str) -> WeaveResult<&Chat> {
        self.chat().ok_or_else(|| WeaveError::Capability {
            method,
            classification: self.classification(),
        })
    }

    /// The sender, or a capability error naming `method`.
    pub fn expect_from(&self, method: &'static str) -> WeaveResult<&User> {
        self.from().ok_or_else(|| WeaveError::Capability {
            method,
            classification: self.classification(),
        })
    }

    /// The capability client, or a capability error naming `method`.
    pub fn expect_api(&self, method: &'static str) -> WeaveResult<&BoxedApiClient> {
        self.api().ok_or_else(|| WeaveError::Capability {
            method,
            classification: self.classification(),
        })
    }

    // ─── Per-dispatch mutable slots ──────────────────────────────────────────

    /// Reads a value from the per-dispatch state bag.
    pub fn state_get(&self, key: &str) -> Option<Value> {
        self.inner.state.lock().get(key).cloned()
    }

    /// Writes a value into the per-dispatch state bag.
    pub fn state_set(&self, key: impl Into<String>, value: Value) {
        self.inner.state.lock().insert(key.into(), value);
    }

    /// Removes and returns a value from the per-dispatch state bag.
    pub fn state_remove(&self, key: &str) -> Option<Value> {
        self.inner.state.lock().remove(key)
    }

    /// The capture set written by the most recent trigger match.
    pub fn matched(&self) -> Option<MatchCapture> {
        self.inner.matched.lock().clone()
    }

    /// Stores a trigger capture set.
    pub fn set_matched(&self, capture: MatchCapture) {
        *self.inner.matched.lock() = Some(capture);
    }

    /// The session value loaded for this dispatch, if any.
    pub fn session(&self) -> Option<Value> {
        self.inner.session.lock().clone()
    }

    /// Replaces the session value; it is persisted after the chain
    /// completes.
    pub fn set_session(&self, value: Value) {
        *self.inner.session.lock() = Some(value);
    }

    /// Clears the session value; the stored entry is deleted after the
    /// chain completes.
    pub fn clear_session(&self) {
        *self.inner.session.lock() = None;
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("update_id", &self.inner.update.update_id)
            .field("kind", &self.kind())
            .field("seal", &self.inner.seal)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Chat, ChatKind, InlineQuery, Message};

    fn text_message_update(text: &str) -> Update {
        let mut msg = Message::new(1, Chat::new(1, ChatKind::Private));
        msg.from = Some(User::new(42));
        msg.text = Some(text.to_string());
        Update::from_message(msg)
    }

    #[test]
    fn classifies_text_message() {
        let ctx = Context::new(text_message_update("hello world"));

        assert_eq!(ctx.kind(), Some(UpdateKind::Message));
        assert_eq!(ctx.sub_kinds(), &[UpdateKind::Text]);
        assert!(ctx.has_kind(UpdateKind::Message));
        assert!(ctx.has_kind(UpdateKind::Text));
        assert!(!ctx.has_kind(UpdateKind::Voice));
    }

    #[test]
    fn channel_post_subtypes_require_channel_mode() {
        let mut msg = Message::new(1, Chat::new(1, ChatKind::Channel));
        msg.text = Some("announcement".to_string());
        let update = Update {
            channel_post: Some(msg),
            ..Update::default()
        };

        let plain = Context::new(update.clone());
        assert_eq!(plain.kind(), Some(UpdateKind::ChannelPost));
        assert!(plain.sub_kinds().is_empty());

        let compat = Context::from_parts(update, None, None, true);
        assert_eq!(compat.sub_kinds(), &[UpdateKind::Text]);
    }

    #[test]
    fn matchable_text_priority() {
        let ctx = Context::new(text_message_update("hi"));
        assert_eq!(ctx.text(), Some("hi"));

        let inline = Update {
            inline_query: Some(InlineQuery {
                id: "1".to_string(),
                from: User::new(7),
                query: "search me".to_string(),
                offset: String::new(),
            }),
            ..Update::default()
        };
        let ctx = Context::new(inline);
        assert_eq!(ctx.text(), Some("search me"));
        assert_eq!(ctx.from().map(|u| u.id), Some(7));
        assert!(ctx.chat().is_none());
    }

    #[test]
    fn capability_error_names_method_and_classification() {
        let ctx = Context::new(Update::default());

        let err = ctx.expect_chat("ban_member").unwrap_err();
        assert_eq!(
            err.to_string(),
            "\"ban_member\" is not available for \"unknown\""
        );
    }

    #[test]
    fn state_is_scoped_to_the_context() {
        let ctx = Context::new(text_message_update("hi"));
        ctx.state_set("k", Value::from(1));
        assert_eq!(ctx.state_get("k"), Some(Value::from(1)));

        let other = Context::new(text_message_update("hi"));
        assert_eq!(other.state_get("k"), None);
    }

    #[test]
    fn seals_are_unique_per_dispatch() {
        let a = Context::new(text_message_update("hi"));
        let b = Context::new(text_message_update("hi"));
        assert_ne!(a.seal(), b.seal());
        assert_eq!(a.seal(), a.clone().seal());
    }
}
