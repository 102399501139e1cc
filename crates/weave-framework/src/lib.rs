//! # weave-framework
//!
//! The routing layer of the Weave framework: trigger compilation, the
//! domain routing combinators (type, text, command, entity, access
//! gates), the [`Composer`] registration builder, the named-route
//! [`Router`], the session layer, and the [`Dispatcher`] entry point.
//!
//! Everything here is assembled from `weave-core`'s pipeline engine and
//! predicate combinators; nothing in this crate touches the transport.

pub mod command;
pub mod composer;
pub mod dispatcher;
pub mod entity;
pub mod gate;
pub mod router;
pub mod routing;
pub mod session;
pub mod trigger;

pub use command::{IntoCommands, command, help, settings, start};
pub use composer::Composer;
pub use dispatcher::Dispatcher;
pub use entity::{
    EntityPredicate, cashtag, email, entity, entity_text, hashtag, mention, phone, text_link,
    text_mention, url,
};
pub use gate::{AclSpec, acl, admin, chat_type, creator, group_chat, member_status, private_chat};
pub use router::{Route, RouteFn, Router};
pub use routing::{IntoKinds, action, hears, inline_query, mount, on_match};
pub use session::{
    MemorySessionStore, SessionKeyFn, SessionOptions, SessionStore, session, session_with,
};
pub use trigger::{IntoTriggers, Trigger, TriggerFn};
