//! Non-message update payloads: queries, polls, membership changes.

use serde::{Deserialize, Serialize};

use super::message::Message;
use super::types::{Chat, ChatMember, User};

/// A callback button press.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackQuery {
    /// Unique query identifier.
    pub id: String,
    /// The user who pressed the button.
    pub from: User,
    /// The message the button was attached to, when still available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Box<Message>>,
    /// Opaque payload set when the button was created.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// An incoming inline query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InlineQuery {
    /// Unique query identifier.
    pub id: String,
    /// The querying user.
    pub from: User,
    /// Query text, up to the platform limit.
    #[serde(default)]
    pub query: String,
    /// Pagination offset controlled by the bot.
    #[serde(default)]
    pub offset: String,
}

/// An inline result the user picked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChosenInlineResult {
    /// Identifier of the chosen result.
    pub result_id: String,
    /// The choosing user.
    pub from: User,
    /// The query that produced the result.
    #[serde(default)]
    pub query: String,
}

/// A shipping address query during checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingQuery {
    /// Unique query identifier.
    pub id: String,
    /// The paying user.
    pub from: User,
    /// Bot-specified invoice payload.
    #[serde(default)]
    pub invoice_payload: String,
}

/// A pre-checkout confirmation query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreCheckoutQuery {
    /// Unique query identifier.
    pub id: String,
    /// The paying user.
    pub from: User,
    /// Three-letter currency code.
    #[serde(default)]
    pub currency: String,
    /// Total price in the currency's smallest unit.
    #[serde(default)]
    pub total_amount: i64,
    /// Bot-specified invoice payload.
    #[serde(default)]
    pub invoice_payload: String,
}

/// Poll state, delivered when a poll the bot knows about changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Poll {
    /// Unique poll identifier.
    pub id: String,
    /// Poll question.
    #[serde(default)]
    pub question: String,
    /// Whether voting has closed.
    #[serde(default)]
    pub is_closed: bool,
}

/// A changed answer in a non-anonymous poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollAnswer {
    /// The poll the answer belongs to.
    pub poll_id: String,
    /// The answering user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    /// Chosen option indexes; empty when the vote was retracted.
    #[serde(default)]
    pub option_ids: Vec<i64>,
}

/// A change in somebody's chat membership.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMemberUpdated {
    /// The chat the change happened in.
    pub chat: Chat,
    /// The user who performed the change.
    pub from: User,
    /// Unix time of the change.
    #[serde(default)]
    pub date: i64,
    /// Membership before the change.
    pub old_chat_member: ChatMember,
    /// Membership after the change.
    pub new_chat_member: ChatMember,
}

/// A pending request to join a chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatJoinRequest {
    /// The chat the request targets.
    pub chat: Chat,
    /// The requesting user.
    pub from: User,
    /// Unix time of the request.
    #[serde(default)]
    pub date: i64,
}
