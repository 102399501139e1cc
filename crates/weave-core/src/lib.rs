//! # weave-core
//!
//! Core engine of the Weave update-routing framework: the inbound update
//! model, per-dispatch context and classification, the onion-model
//! middleware engine, and the generic control-flow combinators.
//!
//! ## Architecture
//!
//! ```text
//! raw Update ──▶ Context (classification, accessors, state)
//!                   │
//!                   ▼
//!             compose(middleware) ──▶ handler ─▶ handler ─▶ …
//!                   ▲
//!        branch / filter / dispatch / lazy / tap / fork
//! ```
//!
//! One context and one compiled-pipeline execution exist per inbound
//! update. Concurrent updates interleave freely; a single pipeline
//! execution is strictly sequential and never re-entrant for its own
//! context.

pub mod api;
pub mod combinators;
pub mod context;
pub mod error;
pub mod model;
pub mod pipeline;

pub use api::{ApiClient, ApiError, ApiResult, BoxedApiClient};
pub use combinators::{Predicate, Selector, branch, dispatch, drop_if, filter, fork, lazy, optional, tap};
pub use context::{Context, MatchCapture};
pub use error::{BoxError, WeaveError, WeaveResult};
pub use model::{
    CallbackQuery, Chat, ChatJoinRequest, ChatKind, ChatMember, ChatMemberUpdated,
    ChosenInlineResult, EntityKind, InlineQuery, MemberStatus, Message, MessageEntity, Poll,
    PollAnswer, PreCheckoutQuery, ShippingQuery, Update, UpdateKind, User,
};
pub use pipeline::{Middleware, MiddlewareFn, MiddlewareObj, Next, compose};
