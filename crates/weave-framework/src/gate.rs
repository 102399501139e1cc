//! Access gating combinators.
//!
//! All gates are built on `optional`: an update that fails the gate
//! passes through to the rest of the chain untouched.

use weave_core::combinators::{Predicate, optional};
use weave_core::{ChatKind, MemberStatus, Middleware};

/// Sender allow-list: explicit ids or an arbitrary predicate.
#[derive(Clone, Debug)]
pub enum AclSpec {
    /// Allowed sender ids.
    Ids(Vec<i64>),
    /// Arbitrary decision over the context.
    Custom(Predicate),
}

impl From<i64> for AclSpec {
    fn from(id: i64) -> Self {
        AclSpec::Ids(vec![id])
    }
}

impl From<Vec<i64>> for AclSpec {
    fn from(ids: Vec<i64>) -> Self {
        AclSpec::Ids(ids)
    }
}

impl<const N: usize> From<[i64; N]> for AclSpec {
    fn from(ids: [i64; N]) -> Self {
        AclSpec::Ids(ids.to_vec())
    }
}

impl From<Predicate> for AclSpec {
    fn from(predicate: Predicate) -> Self {
        AclSpec::Custom(predicate)
    }
}

/// Runs `middleware` only for allowed senders.
///
/// With an id list, an update without a resolvable sender never matches.
pub fn acl(spec: impl Into<AclSpec>, middleware: Vec<Middleware>) -> Middleware {
    let predicate = match spec.into() {
        AclSpec::Ids(ids) => Predicate::new(move |ctx| {
            ctx.from().is_some_and(|user| ids.contains(&user.id))
        }),
        AclSpec::Custom(predicate) => predicate,
    };
    optional(predicate, middleware)
}

/// Runs `middleware` only when the sender's membership status in the
/// current chat is one of `statuses`.
///
/// Performs a remote membership lookup through the context's capability
/// client. A lookup that yields no member is a non-match, never an error;
/// a transport failure of the lookup is an error and propagates.
pub fn member_status(statuses: Vec<MemberStatus>, middleware: Vec<Middleware>) -> Middleware {
    assert!(
        !statuses.is_empty(),
        "at least one membership status must be provided"
    );
    optional(
        Predicate::async_fn(move |ctx| {
            let statuses = statuses.clone();
            async move {
                let (chat_id, user_id) = match (ctx.chat(), ctx.from()) {
                    (Some(chat), Some(from)) => (chat.id, from.id),
                    _ => return Ok(false),
                };
                let api = ctx.expect_api("member_status")?.clone();
                match api.get_chat_member(chat_id, user_id).await? {
                    Some(member) => Ok(statuses.contains(&member.status)),
                    None => Ok(false),
                }
            }
        }),
        middleware,
    )
}

/// Runs `middleware` only for chat creators and administrators.
pub fn admin(middleware: Vec<Middleware>) -> Middleware {
    member_status(
        vec![MemberStatus::Creator, MemberStatus::Administrator],
        middleware,
    )
}

/// Runs `middleware` only for the chat creator.
pub fn creator(middleware: Vec<Middleware>) -> Middleware {
    member_status(vec![MemberStatus::Creator], middleware)
}

/// Runs `middleware` only when the chat kind is one of `kinds`.
pub fn chat_type(kinds: Vec<ChatKind>, middleware: Vec<Middleware>) -> Middleware {
    assert!(!kinds.is_empty(), "at least one chat kind must be provided");
    optional(
        Predicate::new(move |ctx| ctx.chat().is_some_and(|chat| kinds.contains(&chat.kind))),
        middleware,
    )
}

/// Runs `middleware` only in private chats.
pub fn private_chat(middleware: Vec<Middleware>) -> Middleware {
    chat_type(vec![ChatKind::Private], middleware)
}

/// Runs `middleware` only in group-like chats.
pub fn group_chat(middleware: Vec<Middleware>) -> Middleware {
    chat_type(vec![ChatKind::Group, ChatKind::Supergroup], middleware)
}
