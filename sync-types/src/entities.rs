//! Conversations and messages as held by the client.
//!
//! The wire nests a conversation inside a record that also carries its
//! latest message and presence list; [`ConversationRecord`] mirrors that
//! shape and [`Conversation`] is the flattened form the engine keeps.

use serde::{Deserialize, Serialize};

use crate::{ConversationId, MessageId, ParticipantId, Timestamp};

/// A conversation summary or header.
///
/// `deleted_at` being set implies `closed_at` is set too; the server
/// guarantees this, the engine does not check it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Conversation identifier
    pub id: ConversationId,
    /// Identifier chosen by the creating client, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_conversation_id: Option<String>,
    /// Human-readable title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Participants, in server order
    #[serde(default)]
    pub participants: Vec<ParticipantId>,
    /// Creator of the conversation
    pub created_by: ParticipantId,
    /// Creation time
    pub created_at: Timestamp,
    /// Last header update
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
    /// Set once the conversation no longer accepts messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<Timestamp>,
    /// Set once the conversation is deleted (terminal)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<Timestamp>,
    /// Representative latest message, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_message: Option<Message>,
    /// Participants currently connected to the conversation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connected: Option<Vec<ParticipantId>>,
    /// When the current user left, if they did
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_at: Option<Timestamp>,
}

impl Conversation {
    /// Whether the conversation has been closed (deleted implies closed).
    pub fn is_closed(&self) -> bool {
        self.closed_at.is_some()
    }

    /// Whether the conversation has been deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Whether `participant` is in the connected set.
    pub fn is_connected(&self, participant: &ParticipantId) -> bool {
        self.connected
            .as_ref()
            .is_some_and(|connected| connected.contains(participant))
    }
}

/// Conversation header fields exactly as the server sends them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationData {
    /// Conversation identifier
    pub id: ConversationId,
    /// Identifier chosen by the creating client
    #[serde(default)]
    pub client_conversation_id: Option<String>,
    /// Title
    #[serde(default)]
    pub title: Option<String>,
    /// Participants
    #[serde(default)]
    pub participants: Vec<ParticipantId>,
    /// Creator
    pub created_by: ParticipantId,
    /// Creation time
    pub created_at: Timestamp,
    /// Last header update
    #[serde(default)]
    pub updated_at: Option<Timestamp>,
    /// Close time
    #[serde(default)]
    pub closed_at: Option<Timestamp>,
    /// Delete time
    #[serde(default)]
    pub deleted_at: Option<Timestamp>,
}

/// One entry of a conversation list on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRecord {
    /// The header
    pub conversation: ConversationData,
    /// Latest message in the conversation
    #[serde(default)]
    pub latest_message: Option<Message>,
    /// Connected participants
    #[serde(default)]
    pub connected: Option<Vec<ParticipantId>>,
    /// When the current user left
    #[serde(default)]
    pub left_at: Option<Timestamp>,
}

impl From<ConversationRecord> for Conversation {
    fn from(record: ConversationRecord) -> Self {
        let ConversationRecord {
            conversation,
            latest_message,
            connected,
            left_at,
        } = record;
        Self {
            id: conversation.id,
            client_conversation_id: conversation.client_conversation_id,
            title: conversation.title,
            participants: conversation.participants,
            created_by: conversation.created_by,
            created_at: conversation.created_at,
            updated_at: conversation.updated_at,
            closed_at: conversation.closed_at,
            deleted_at: conversation.deleted_at,
            latest_message,
            connected,
            left_at,
        }
    }
}

/// Kind of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// Plain text
    Text,
    /// Link to an uploaded file
    File,
}

/// Text message payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextBody {
    /// Message text
    pub text: String,
}

/// File message payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileBody {
    /// Download link
    pub link: String,
    /// Original file name
    pub name: String,
    /// MIME type
    #[serde(rename = "type")]
    pub mime_type: String,
    /// Size in bytes
    pub size: u64,
}

/// Message payload, keyed by [`MessageKind`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageBody {
    /// File payload (tried first: it is the stricter shape)
    File(FileBody),
    /// Text payload
    Text(TextBody),
}

impl From<TextBody> for MessageBody {
    fn from(body: TextBody) -> Self {
        Self::Text(body)
    }
}

impl From<FileBody> for MessageBody {
    fn from(body: FileBody) -> Self {
        Self::File(body)
    }
}

/// A chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Server id, absent until acknowledged
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<MessageId>,
    /// Id chosen by the sending client
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_message_id: Option<String>,
    /// Owning conversation
    pub conversation_id: ConversationId,
    /// Participants at send time
    #[serde(default)]
    pub participants: Vec<ParticipantId>,
    /// Connection the message was sent from
    #[serde(default)]
    pub connection_id: String,
    /// Sender
    pub from_id: ParticipantId,
    /// Message kind
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// Payload
    pub data: MessageBody,
    /// Send time
    pub created_at: Timestamp,
    /// Last edit time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
    /// Delete time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<Timestamp>,
}

impl Message {
    /// Latest of `created_at`, `updated_at` and `deleted_at`.
    ///
    /// This is the ordering key for last-writer-wins decisions.
    pub fn effective_timestamp(&self) -> Timestamp {
        [self.updated_at, self.deleted_at]
            .into_iter()
            .flatten()
            .fold(self.created_at, |latest, stamp| latest.max(stamp))
    }

    /// Whether two messages denote the same server row.
    ///
    /// Acknowledged messages compare by id; unacknowledged ones fall back to
    /// the client-chosen id. Two messages with neither never match.
    pub fn same_identity(&self, other: &Message) -> bool {
        match (&self.id, &other.id) {
            (Some(a), Some(b)) => a == b,
            (None, None) => matches!(
                (&self.client_message_id, &other.client_message_id),
                (Some(a), Some(b)) if a == b
            ),
            _ => false,
        }
    }
}

/// A snapshot page of conversations (used by `connection` and `watching`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationPage {
    /// Conversations in this page
    #[serde(default)]
    pub conversations: Vec<ConversationRecord>,
    /// Total number of conversations on the server
    #[serde(default)]
    pub total: usize,
}

/// A snapshot page of messages (used by `conversation`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePage {
    /// Messages, newest first
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Total number of messages in the conversation
    #[serde(default)]
    pub total: usize,
}
