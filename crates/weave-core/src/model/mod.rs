//! Data model for inbound platform updates.
//!
//! An [`Update`] is a tagged union identified by exactly one of a fixed,
//! priority-ordered set of top-level keys. Classification never rejects an
//! update: an unrecognized payload simply has no [`UpdateKind`], and every
//! routing predicate evaluates false for it.
//!
//! Nested payloads the engine actually reads (chats, senders, text,
//! entity spans, membership records) are typed structs; payloads consulted
//! only for key presence during subtype classification are kept as raw
//! [`serde_json::Value`]s.

pub mod kind;
pub mod message;
pub mod queries;
pub mod types;
pub mod update;

pub use kind::UpdateKind;
pub use message::Message;
pub use queries::{
    CallbackQuery, ChatJoinRequest, ChatMemberUpdated, ChosenInlineResult, InlineQuery, Poll,
    PollAnswer, PreCheckoutQuery, ShippingQuery,
};
pub use types::{Chat, ChatKind, ChatMember, EntityKind, MemberStatus, MessageEntity, User};
pub use update::Update;
