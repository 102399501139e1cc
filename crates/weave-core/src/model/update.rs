//! The inbound update union and its type classification.

use serde::{Deserialize, Serialize};

use super::kind::UpdateKind;
use super::message::Message;
use super::queries::{
    CallbackQuery, ChatJoinRequest, ChatMemberUpdated, ChosenInlineResult, InlineQuery, Poll,
    PollAnswer, PreCheckoutQuery, ShippingQuery,
};

/// One inbound event payload.
///
/// Exactly one of the optional fields is expected to be populated. When
/// more than one is present anyway, classification takes the first match
/// in field order, which is the fixed priority order; the rest are
/// ignored. When none is present the update has no kind and every routing
/// predicate evaluates false for it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Update {
    /// Monotonic update identifier assigned by the platform.
    #[serde(default)]
    pub update_id: i64,
    /// New incoming message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    /// Edit of a previously sent message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edited_message: Option<Message>,
    /// New channel post.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_post: Option<Message>,
    /// Edit of a previously sent channel post.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edited_channel_post: Option<Message>,
    /// Callback button press.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_query: Option<CallbackQuery>,
    /// Incoming inline query.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_query: Option<InlineQuery>,
    /// Inline result chosen by a user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chosen_inline_result: Option<ChosenInlineResult>,
    /// Shipping address query.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_query: Option<ShippingQuery>,
    /// Pre-checkout confirmation query.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_checkout_query: Option<PreCheckoutQuery>,
    /// Poll state change.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll: Option<Poll>,
    /// Changed poll answer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_answer: Option<PollAnswer>,
    /// Change to the bot's own membership.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub my_chat_member: Option<ChatMemberUpdated>,
    /// Change to another user's membership.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_member: Option<ChatMemberUpdated>,
    /// Request to join a chat.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_join_request: Option<ChatJoinRequest>,
}

impl Update {
    /// Classifies this update by its first populated key in priority order.
    pub fn kind(&self) -> Option<UpdateKind> {
        if self.message.is_some() {
            Some(UpdateKind::Message)
        } else if self.edited_message.is_some() {
            Some(UpdateKind::EditedMessage)
        } else if self.channel_post.is_some() {
            Some(UpdateKind::ChannelPost)
        } else if self.edited_channel_post.is_some() {
            Some(UpdateKind::EditedChannelPost)
        } else if self.callback_query.is_some() {
            Some(UpdateKind::CallbackQuery)
        } else if self.inline_query.is_some() {
            Some(UpdateKind::InlineQuery)
        } else if self.chosen_inline_result.is_some() {
            Some(UpdateKind::ChosenInlineResult)
        } else if self.shipping_query.is_some() {
            Some(UpdateKind::ShippingQuery)
        } else if self.pre_checkout_query.is_some() {
            Some(UpdateKind::PreCheckoutQuery)
        } else if self.poll.is_some() {
            Some(UpdateKind::Poll)
        } else if self.poll_answer.is_some() {
            Some(UpdateKind::PollAnswer)
        } else if self.my_chat_member.is_some() {
            Some(UpdateKind::MyChatMember)
        } else if self.chat_member.is_some() {
            Some(UpdateKind::ChatMember)
        } else if self.chat_join_request.is_some() {
            Some(UpdateKind::ChatJoinRequest)
        } else {
            None
        }
    }

    /// Convenience constructor for a message update.
    pub fn from_message(message: Message) -> Self {
        Self {
            message: Some(message),
            ..Self::default()
        }
    }
}
