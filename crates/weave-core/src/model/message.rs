//! The nested message payload and its subtype classification.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::kind::UpdateKind;
use super::types::{Chat, MessageEntity, User};

/// A message or channel post.
///
/// Only the fields the engine reads are typed; payloads consulted purely
/// for key presence during subtype classification stay raw.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message identifier within its chat.
    pub message_id: i64,
    /// Unix send time.
    #[serde(default)]
    pub date: i64,
    /// The chat the message belongs to.
    pub chat: Chat,
    /// Sender; absent for channel posts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<User>,
    /// Text body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Caption of a media payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    /// Entity spans over [`text`](Self::text).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<MessageEntity>,
    /// Entity spans over [`caption`](Self::caption).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub caption_entities: Vec<MessageEntity>,
    /// Original send time of a forwarded message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forward_date: Option<i64>,
    /// Message this one pins.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pinned_message: Option<Box<Message>>,
    /// Users added to the chat.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_chat_members: Option<Vec<User>>,
    /// User removed from the chat.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left_chat_member: Option<User>,
    /// New chat title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_chat_title: Option<String>,
    /// Supergroup id this group migrated to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub migrate_to_chat_id: Option<i64>,
    /// Group id this supergroup migrated from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub migrate_from_chat_id: Option<i64>,

    // Presence-only payloads; the engine classifies on the key and never
    // looks inside.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animation: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sticker: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_note: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub venue: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dice: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub successful_payment: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected_website: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passport_data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_chat_photo: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_chat_photo: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_chat_created: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supergroup_chat_created: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_chat_created: Option<Value>,
}

impl Message {
    /// Creates an empty message in the given chat.
    pub fn new(message_id: i64, chat: Chat) -> Self {
        Self {
            message_id,
            date: 0,
            chat,
            from: None,
            text: None,
            caption: None,
            entities: Vec::new(),
            caption_entities: Vec::new(),
            forward_date: None,
            pinned_message: None,
            new_chat_members: None,
            left_chat_member: None,
            new_chat_title: None,
            migrate_to_chat_id: None,
            migrate_from_chat_id: None,
            audio: None,
            document: None,
            animation: None,
            photo: None,
            sticker: None,
            video: None,
            video_note: None,
            voice: None,
            contact: None,
            location: None,
            venue: None,
            game: None,
            dice: None,
            poll: None,
            invoice: None,
            successful_payment: None,
            connected_website: None,
            passport_data: None,
            new_chat_photo: None,
            delete_chat_photo: None,
            group_chat_created: None,
            supergroup_chat_created: None,
            channel_chat_created: None,
        }
    }

    /// The message's matchable text and the entity spans covering it.
    ///
    /// A text body pairs with `entities`, a caption with
    /// `caption_entities`. Returns `None` when the message has neither.
    pub fn text_and_entities(&self) -> Option<(&str, &[MessageEntity])> {
        if let Some(text) = &self.text {
            Some((text, &self.entities))
        } else {
            self.caption
                .as_deref()
                .map(|caption| (caption, self.caption_entities.as_slice()))
        }
    }

    /// Derives the subtypes of this message.
    ///
    /// Scans a fixed, ordered catalog of recognized payload keys; a
    /// subtype is present iff its key is populated. Multiple subtypes may
    /// be simultaneously true. The raw `forward_date` key is reported
    /// under the renamed [`UpdateKind::Forward`] label.
    pub fn sub_kinds(&self) -> Vec<UpdateKind> {
        let mut kinds = Vec::new();
        let mut push = |present: bool, kind: UpdateKind| {
            if present {
                kinds.push(kind);
            }
        };

        push(self.text.is_some(), UpdateKind::Text);
        push(self.audio.is_some(), UpdateKind::Audio);
        push(self.document.is_some(), UpdateKind::Document);
        push(self.animation.is_some(), UpdateKind::Animation);
        push(self.photo.is_some(), UpdateKind::Photo);
        push(self.sticker.is_some(), UpdateKind::Sticker);
        push(self.video.is_some(), UpdateKind::Video);
        push(self.video_note.is_some(), UpdateKind::VideoNote);
        push(self.voice.is_some(), UpdateKind::Voice);
        push(self.contact.is_some(), UpdateKind::Contact);
        push(self.location.is_some(), UpdateKind::Location);
        push(self.venue.is_some(), UpdateKind::Venue);
        push(self.game.is_some(), UpdateKind::Game);
        push(self.dice.is_some(), UpdateKind::Dice);
        push(self.poll.is_some(), UpdateKind::Poll);
        push(self.invoice.is_some(), UpdateKind::Invoice);
        push(
            self.successful_payment.is_some(),
            UpdateKind::SuccessfulPayment,
        );
        push(
            self.connected_website.is_some(),
            UpdateKind::ConnectedWebsite,
        );
        push(self.passport_data.is_some(), UpdateKind::PassportData);
        push(self.new_chat_members.is_some(), UpdateKind::NewChatMembers);
        push(self.left_chat_member.is_some(), UpdateKind::LeftChatMember);
        push(self.new_chat_title.is_some(), UpdateKind::NewChatTitle);
        push(self.new_chat_photo.is_some(), UpdateKind::NewChatPhoto);
        push(self.delete_chat_photo.is_some(), UpdateKind::DeleteChatPhoto);
        push(
            self.group_chat_created.is_some(),
            UpdateKind::GroupChatCreated,
        );
        push(
            self.supergroup_chat_created.is_some(),
            UpdateKind::SupergroupChatCreated,
        );
        push(
            self.channel_chat_created.is_some(),
            UpdateKind::ChannelChatCreated,
        );
        push(
            self.migrate_to_chat_id.is_some(),
            UpdateKind::MigrateToChatId,
        );
        push(
            self.migrate_from_chat_id.is_some(),
            UpdateKind::MigrateFromChatId,
        );
        push(self.pinned_message.is_some(), UpdateKind::PinnedMessage);
        push(self.forward_date.is_some(), UpdateKind::Forward);

        kinds
    }
}

/// Slices a string by UTF-16 code-unit offset and length.
///
/// Entity spans count UTF-16 code units on the wire; a span that straddles
/// a surrogate pair is truncated at the pair boundary.
pub fn utf16_slice(text: &str, offset: usize, length: usize) -> String {
    let units: Vec<u16> = text.encode_utf16().skip(offset).take(length).collect();
    String::from_utf16_lossy(&units)
}
