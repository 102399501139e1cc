//! Canonical classification tags.
//!
//! One enum covers both the top-level update types and the message
//! subtypes. The overlap is deliberate: a registration for
//! [`UpdateKind::Poll`] fires both for a standalone poll-state update and
//! for a message that carries a poll, because type routing matches a kind
//! against the update type *or* any of its subtypes.

use std::fmt;

/// A canonical update type or message subtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateKind {
    // Top-level update types, in classification priority order.
    /// New incoming message.
    Message,
    /// Edit of a previously sent message.
    EditedMessage,
    /// New channel post.
    ChannelPost,
    /// Edit of a previously sent channel post.
    EditedChannelPost,
    /// Callback button press.
    CallbackQuery,
    /// Incoming inline query.
    InlineQuery,
    /// Inline result chosen by a user.
    ChosenInlineResult,
    /// Shipping address query.
    ShippingQuery,
    /// Pre-checkout confirmation query.
    PreCheckoutQuery,
    /// Poll state change; also the subtype of a message carrying a poll.
    Poll,
    /// A user changed their poll answer.
    PollAnswer,
    /// The bot's own membership changed.
    MyChatMember,
    /// Another user's membership changed.
    ChatMember,
    /// A user asked to join a chat.
    ChatJoinRequest,

    // Message subtypes, derived from the nested message payload.
    /// Plain text body.
    Text,
    /// Audio file.
    Audio,
    /// Generic document.
    Document,
    /// Animation (silent looping video).
    Animation,
    /// Photo.
    Photo,
    /// Sticker.
    Sticker,
    /// Video.
    Video,
    /// Round video note.
    VideoNote,
    /// Voice note.
    Voice,
    /// Shared contact.
    Contact,
    /// Shared location.
    Location,
    /// Venue with a location.
    Venue,
    /// Game.
    Game,
    /// Dice roll.
    Dice,
    /// Invoice.
    Invoice,
    /// Successful payment notice.
    SuccessfulPayment,
    /// Website connection notice.
    ConnectedWebsite,
    /// Passport data share.
    PassportData,
    /// Users added to the chat.
    NewChatMembers,
    /// User removed from the chat.
    LeftChatMember,
    /// Chat title changed.
    NewChatTitle,
    /// Chat photo changed.
    NewChatPhoto,
    /// Chat photo removed.
    DeleteChatPhoto,
    /// Group created.
    GroupChatCreated,
    /// Supergroup created.
    SupergroupChatCreated,
    /// Channel created.
    ChannelChatCreated,
    /// Group migrated to a supergroup.
    MigrateToChatId,
    /// Supergroup migrated from a group.
    MigrateFromChatId,
    /// Message pinned.
    PinnedMessage,
    /// Forwarded message (renamed from the raw `forward_date` key).
    Forward,
}

impl UpdateKind {
    /// Returns the canonical snake_case name of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            UpdateKind::Message => "message",
            UpdateKind::EditedMessage => "edited_message",
            UpdateKind::ChannelPost => "channel_post",
            UpdateKind::EditedChannelPost => "edited_channel_post",
            UpdateKind::CallbackQuery => "callback_query",
            UpdateKind::InlineQuery => "inline_query",
            UpdateKind::ChosenInlineResult => "chosen_inline_result",
            UpdateKind::ShippingQuery => "shipping_query",
            UpdateKind::PreCheckoutQuery => "pre_checkout_query",
            UpdateKind::Poll => "poll",
            UpdateKind::PollAnswer => "poll_answer",
            UpdateKind::MyChatMember => "my_chat_member",
            UpdateKind::ChatMember => "chat_member",
            UpdateKind::ChatJoinRequest => "chat_join_request",
            UpdateKind::Text => "text",
            UpdateKind::Audio => "audio",
            UpdateKind::Document => "document",
            UpdateKind::Animation => "animation",
            UpdateKind::Photo => "photo",
            UpdateKind::Sticker => "sticker",
            UpdateKind::Video => "video",
            UpdateKind::VideoNote => "video_note",
            UpdateKind::Voice => "voice",
            UpdateKind::Contact => "contact",
            UpdateKind::Location => "location",
            UpdateKind::Venue => "venue",
            UpdateKind::Game => "game",
            UpdateKind::Dice => "dice",
            UpdateKind::Invoice => "invoice",
            UpdateKind::SuccessfulPayment => "successful_payment",
            UpdateKind::ConnectedWebsite => "connected_website",
            UpdateKind::PassportData => "passport_data",
            UpdateKind::NewChatMembers => "new_chat_members",
            UpdateKind::LeftChatMember => "left_chat_member",
            UpdateKind::NewChatTitle => "new_chat_title",
            UpdateKind::NewChatPhoto => "new_chat_photo",
            UpdateKind::DeleteChatPhoto => "delete_chat_photo",
            UpdateKind::GroupChatCreated => "group_chat_created",
            UpdateKind::SupergroupChatCreated => "supergroup_chat_created",
            UpdateKind::ChannelChatCreated => "channel_chat_created",
            UpdateKind::MigrateToChatId => "migrate_to_chat_id",
            UpdateKind::MigrateFromChatId => "migrate_from_chat_id",
            UpdateKind::PinnedMessage => "pinned_message",
            UpdateKind::Forward => "forward",
        }
    }
}

impl fmt::Display for UpdateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
