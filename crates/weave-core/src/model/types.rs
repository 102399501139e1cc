//! Shared payload types: chats, users, entity spans, membership records.

use serde::{Deserialize, Serialize};

/// The kind of chat an update relates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatKind {
    /// One-on-one conversation with a single user.
    Private,
    /// Basic multi-user group.
    Group,
    /// Large group with usernames and admin tooling.
    Supergroup,
    /// Broadcast channel.
    Channel,
}

impl ChatKind {
    /// Returns `true` for the group-like kinds (group, supergroup).
    ///
    /// Command routing accepts the `@botname`-suffixed form only in
    /// group-like chats.
    pub fn is_group_like(self) -> bool {
        matches!(self, ChatKind::Group | ChatKind::Supergroup)
    }
}

/// A conversation the bot participates in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    /// Unique chat identifier.
    pub id: i64,
    /// The kind of chat.
    #[serde(rename = "type")]
    pub kind: ChatKind,
    /// Title, for groups, supergroups and channels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Username, for private chats, supergroups and channels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl Chat {
    /// Creates a minimal chat record.
    pub fn new(id: i64, kind: ChatKind) -> Self {
        Self {
            id,
            kind,
            title: None,
            username: None,
        }
    }
}

/// A platform user or bot account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier.
    pub id: i64,
    /// Whether the account is a bot.
    #[serde(default)]
    pub is_bot: bool,
    /// First name.
    #[serde(default)]
    pub first_name: String,
    /// Last name, if set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Username, if set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl User {
    /// Creates a minimal user record.
    pub fn new(id: i64) -> Self {
        Self {
            id,
            is_bot: false,
            first_name: String::new(),
            last_name: None,
            username: None,
        }
    }
}

/// The type tag of an annotated text span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// `@username` mention.
    Mention,
    /// `#hashtag`.
    Hashtag,
    /// `$CASHTAG`.
    Cashtag,
    /// `/command` at any offset.
    BotCommand,
    /// Bare URL.
    Url,
    /// Email address.
    Email,
    /// Phone number.
    PhoneNumber,
    /// Bold formatting span.
    Bold,
    /// Italic formatting span.
    Italic,
    /// Underline formatting span.
    Underline,
    /// Strikethrough formatting span.
    Strikethrough,
    /// Inline code span.
    Code,
    /// Preformatted block.
    Pre,
    /// Text with an attached URL.
    TextLink,
    /// Mention of a user without a username.
    TextMention,
    /// Spoiler span.
    Spoiler,
    /// Any tag this engine does not recognize.
    #[serde(other)]
    Unknown,
}

/// An annotated span of a text or caption payload.
///
/// Offsets and lengths count UTF-16 code units, the platform's wire
/// convention; use [`crate::model::message::utf16_slice`] to extract the
/// covered substring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEntity {
    /// The span's type tag.
    #[serde(rename = "type")]
    pub kind: EntityKind,
    /// Start of the span in UTF-16 code units.
    pub offset: usize,
    /// Length of the span in UTF-16 code units.
    pub length: usize,
    /// Target URL, for [`EntityKind::TextLink`] spans.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Mentioned user, for [`EntityKind::TextMention`] spans.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

impl MessageEntity {
    /// Creates an entity span with only a kind, offset and length.
    pub fn new(kind: EntityKind, offset: usize, length: usize) -> Self {
        Self {
            kind,
            offset,
            length,
            url: None,
            user: None,
        }
    }
}

/// Membership status of a user within a chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    /// Chat owner.
    Creator,
    /// Administrator.
    Administrator,
    /// Ordinary member.
    Member,
    /// Member under restrictions.
    Restricted,
    /// Not a member, but may rejoin.
    Left,
    /// Banned.
    Kicked,
}

/// A chat membership record, as returned by the capability client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMember {
    /// The member's account.
    pub user: User,
    /// Current membership status.
    pub status: MemberStatus,
}
