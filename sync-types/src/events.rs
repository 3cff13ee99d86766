//! Inbound server events.
//!
//! Every frame the server pushes is a JSON object tagged by `type`. Snapshot
//! and page events carry their own shapes; everything else is a message
//! [`Envelope`] whose `data` depends on the event type.

use serde::{Deserialize, Serialize};

use crate::{
    ConversationData, ConversationId, ConversationPage, ConversationRecord, FileBody, Message,
    MessageBody, MessageId, MessageKind, MessagePage, ParticipantId, SyncError, TextBody,
    Timestamp,
};

/// Payload of events that carry no data (`joined`, `left`): `null` on the wire.
pub type NoPayload = Option<serde_json::Value>;

/// All possible server events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Connection accepted, login may proceed
    Hello(Hello),
    /// Initial conversation list after login
    Connection(ConnectionSnapshot),
    /// One conversation opened, with its newest messages
    Conversation(ConversationSnapshot),
    /// Initial watch list
    Watching(WatchingSnapshot),
    /// A page of conversations
    Loaded(LoadedConversations),
    /// A page of messages
    LoadedMessages(LoadedMessages),
    /// Conversation closed
    Closed(Envelope<ConversationClosed>),
    /// Conversation deleted
    Deleted(Envelope<ConversationDeleted>),
    /// Conversation header updated
    Updated(Envelope<ConversationUpdated>),
    /// Participant connected to a conversation
    Joined(Envelope<NoPayload>),
    /// Participant disconnected from a conversation
    Left(Envelope<NoPayload>),
    /// Message deleted
    MessageDeleted(Envelope<MessageDeleted>),
    /// Message edited
    MessageUpdated(Envelope<MessageUpdated>),
    /// New text message
    Text(Envelope<TextBody>),
    /// New file message
    File(Envelope<FileBody>),
}

impl ServerEvent {
    /// Decode a text frame.
    pub fn from_json(frame: &str) -> Result<Self, SyncError> {
        serde_json::from_str(frame).map_err(SyncError::Decode)
    }

    /// Encode as a text frame (used by tests and transcripts).
    pub fn to_json(&self) -> Result<String, SyncError> {
        serde_json::to_string(self).map_err(SyncError::Encode)
    }

    /// The wire `type` tag of this event.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Hello(_) => "hello",
            Self::Connection(_) => "connection",
            Self::Conversation(_) => "conversation",
            Self::Watching(_) => "watching",
            Self::Loaded(_) => "loaded",
            Self::LoadedMessages(_) => "loaded-messages",
            Self::Closed(_) => "closed",
            Self::Deleted(_) => "deleted",
            Self::Updated(_) => "updated",
            Self::Joined(_) => "joined",
            Self::Left(_) => "left",
            Self::MessageDeleted(_) => "message-deleted",
            Self::MessageUpdated(_) => "message-updated",
            Self::Text(_) => "text",
            Self::File(_) => "file",
        }
    }

    /// Conversation an envelope event refers to.
    ///
    /// `None` for snapshot and page events.
    pub fn conversation_id(&self) -> Option<&ConversationId> {
        self.route().map(|route| route.conversation_id)
    }

    /// Participants listed on an envelope event.
    ///
    /// `None` both for non-envelope events and for envelopes that omit the
    /// field; the two cases matter differently to the watch list, so use
    /// [`ServerEvent::route`] when the distinction is needed.
    pub fn participants(&self) -> Option<&[ParticipantId]> {
        self.route().and_then(|route| route.participants)
    }

    /// Routing metadata shared by every envelope event.
    pub fn route(&self) -> Option<Route<'_>> {
        match self {
            Self::Closed(e) => Some(e.route()),
            Self::Deleted(e) => Some(e.route()),
            Self::Updated(e) => Some(e.route()),
            Self::Joined(e) | Self::Left(e) => Some(e.route()),
            Self::MessageDeleted(e) => Some(e.route()),
            Self::MessageUpdated(e) => Some(e.route()),
            Self::Text(e) => Some(e.route()),
            Self::File(e) => Some(e.route()),
            Self::Hello(_)
            | Self::Connection(_)
            | Self::Conversation(_)
            | Self::Watching(_)
            | Self::Loaded(_)
            | Self::LoadedMessages(_) => None,
        }
    }

    /// Build the message carried by a `text` or `file` event.
    pub fn live_message(&self) -> Option<Message> {
        match self {
            Self::Text(e) => Some(e.to_message(MessageKind::Text, e.data.clone().into())),
            Self::File(e) => Some(e.to_message(MessageKind::File, e.data.clone().into())),
            _ => None,
        }
    }
}

/// Borrowed routing fields of an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route<'a> {
    /// Conversation the event belongs to
    pub conversation_id: &'a ConversationId,
    /// Participants, if the event lists them
    pub participants: Option<&'a [ParticipantId]>,
    /// Sender of the event
    pub from_id: &'a ParticipantId,
}

/// Common wrapper of every conversation-scoped event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    /// Message id (present for message events)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<MessageId>,
    /// Client-chosen message id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_message_id: Option<String>,
    /// Conversation the event belongs to
    pub conversation_id: ConversationId,
    /// Participants of the conversation, when the server includes them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participants: Option<Vec<ParticipantId>>,
    /// Originating connection
    #[serde(default)]
    pub connection_id: String,
    /// Originating participant
    #[serde(default)]
    pub from_id: ParticipantId,
    /// Event-specific payload
    pub data: T,
    /// Event time
    pub created_at: Timestamp,
    /// Edit time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
    /// Delete time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<Timestamp>,
}

impl<T> Envelope<T> {
    /// Routing fields of this envelope.
    pub fn route(&self) -> Route<'_> {
        Route {
            conversation_id: &self.conversation_id,
            participants: self.participants.as_deref(),
            from_id: &self.from_id,
        }
    }

    fn to_message(&self, kind: MessageKind, data: MessageBody) -> Message {
        Message {
            id: self.id.clone(),
            client_message_id: self.client_message_id.clone(),
            conversation_id: self.conversation_id.clone(),
            participants: self.participants.clone().unwrap_or_default(),
            connection_id: self.connection_id.clone(),
            from_id: self.from_id.clone(),
            kind,
            data,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        }
    }
}

/// Server greeting. Carries nothing the engine relies on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hello {
    /// Whatever else the server chose to send
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// `connection`: the user's conversations right after login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSnapshot {
    /// First page of conversations
    pub conversations: ConversationPage,
}

/// `watching`: the observed conversations after a `watch` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchingSnapshot {
    /// First page of watched conversations
    pub conversations: ConversationPage,
}

/// `conversation`: one conversation opened by `join`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSnapshot {
    /// Header
    pub conversation: ConversationData,
    /// Connected participants
    #[serde(default)]
    pub connected: Option<Vec<ParticipantId>>,
    /// When the current user last left
    #[serde(default)]
    pub left_at: Option<Timestamp>,
    /// Newest messages, newest first
    #[serde(default)]
    pub messages: Option<MessagePage>,
}

/// `loaded`: a page of conversations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadedConversations {
    /// Conversations in the page
    #[serde(default)]
    pub conversations: Vec<ConversationRecord>,
    /// Matching conversations remaining on the server, this page included
    #[serde(default)]
    pub count: usize,
}

/// `loaded-messages`: a page of older messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadedMessages {
    /// Messages in the page, oldest first
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Matching messages remaining on the server, this page included
    #[serde(default)]
    pub count: usize,
}

/// `closed` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationClosed {
    /// Closed conversation
    pub conversation_id: ConversationId,
    /// Close time
    pub closed_at: Timestamp,
}

/// `deleted` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationDeleted {
    /// Deleted conversation
    pub conversation_id: ConversationId,
    /// Close time
    pub closed_at: Timestamp,
    /// Delete time
    pub deleted_at: Timestamp,
}

/// `updated` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationUpdated {
    /// Updated conversation
    pub conversation_id: ConversationId,
    /// New title (absent clears it)
    #[serde(default)]
    pub title: Option<String>,
    /// New participant list
    #[serde(default)]
    pub participants: Vec<ParticipantId>,
    /// Update time
    pub updated_at: Timestamp,
}

/// `message-deleted` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDeleted {
    /// Deleted message
    pub message_id: MessageId,
    /// Delete time
    pub deleted_at: Timestamp,
}

/// `message-updated` payload.
///
/// Carries the fields of both message kinds; only those matching the
/// stored message's kind are applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageUpdated {
    /// Edited message
    pub message_id: MessageId,
    /// Edit time
    pub updated_at: Timestamp,
    /// New text
    #[serde(default)]
    pub text: Option<String>,
    /// New link
    #[serde(default)]
    pub link: Option<String>,
    /// New file name
    #[serde(default)]
    pub name: Option<String>,
    /// New MIME type
    #[serde(default, rename = "type")]
    pub mime_type: Option<String>,
    /// New size
    #[serde(default)]
    pub size: Option<u64>,
}
