//! Outbound commands.
//!
//! Commands are serialized as `{"type": ..., "data": ...}`. The login frame
//! is the one exception: it is sent untagged before anything else.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{ConversationId, FileBody, MessageBody, MessageId, ParticipantId, SyncError, TextBody, Timestamp};

/// All commands the client can send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum Command {
    /// Request a page of conversations
    Load(LoadRequest),
    /// Switch to the watch list
    Watch,
    /// Open (or create) a conversation
    Join(JoinRequest),
    /// Change a conversation's title or participants
    Update(UpdateRequest),
    /// Close a conversation
    Close(ConversationRef),
    /// Delete a conversation
    Delete(ConversationRef),
    /// Edit a message
    MessageUpdate(MessageUpdateRequest),
    /// Delete a message
    MessageDelete(MessageRef),
    /// Request a page of older messages
    LoadMessages(LoadMessagesRequest),
    /// Send a new text message to the open conversation
    Text(TextBody),
    /// Send a new file message to the open conversation
    File(FileBody),
}

impl Command {
    /// Encode as a text frame.
    pub fn to_json(&self) -> Result<String, SyncError> {
        serde_json::to_string(self).map_err(SyncError::Encode)
    }

    /// Decode a text frame (used by tests and transcripts).
    pub fn from_json(frame: &str) -> Result<Self, SyncError> {
        serde_json::from_str(frame).map_err(SyncError::Decode)
    }

    /// The wire `type` tag of this command.
    pub fn command_type(&self) -> &'static str {
        match self {
            Self::Load(_) => "load",
            Self::Watch => "watch",
            Self::Join(_) => "join",
            Self::Update(_) => "update",
            Self::Close(_) => "close",
            Self::Delete(_) => "delete",
            Self::MessageUpdate(_) => "message-update",
            Self::MessageDelete(_) => "message-delete",
            Self::LoadMessages(_) => "load-messages",
            Self::Text(_) => "text",
            Self::File(_) => "file",
        }
    }
}

/// `load` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadRequest {
    /// Page size
    pub size: usize,
    /// Conversations already held
    #[serde(default)]
    pub exclude_ids: Vec<ConversationId>,
    /// Restrict the page to these conversations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<ConversationId>>,
}

/// `join` payload. Without a conversation id a new conversation is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    /// Conversation to open
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<ConversationId>,
    /// Title of a new conversation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// How many of the newest messages to return
    pub messages_size: usize,
    /// Participants of a new conversation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participants: Option<Vec<ParticipantId>>,
}

/// `update` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    /// Conversation to update
    pub conversation_id: ConversationId,
    /// New title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New participants
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participants: Option<Vec<ParticipantId>>,
}

/// Payload naming a single conversation (`close`, `delete`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRef {
    /// Target conversation
    pub conversation_id: ConversationId,
}

/// Payload naming a single message (`message-delete`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRef {
    /// Target message
    pub message_id: MessageId,
}

/// `message-update` payload: the message id plus the new body fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageUpdateRequest {
    /// Target message
    pub message_id: MessageId,
    /// Replacement body, flattened next to the id
    #[serde(flatten)]
    pub body: MessageBody,
}

/// `load-messages` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadMessagesRequest {
    /// Page size
    pub size: usize,
    /// Only messages created at or before this time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<Timestamp>,
    /// Messages at `before` that are already held
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_ids: Option<Vec<MessageId>>,
}

/// First frame after `hello`: credentials plus the initial list size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Login {
    /// Credentials
    pub auth_info: AuthInfo,
    /// How many conversations the `connection` snapshot should carry
    pub conversations_size: usize,
}

impl Login {
    /// Encode as a text frame.
    pub fn to_json(&self) -> Result<String, SyncError> {
        serde_json::to_string(self).map_err(SyncError::Encode)
    }
}

/// User credentials.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthInfo {
    /// User name (also the participant id)
    pub name: String,
    /// Password
    pub password: String,
}

impl fmt::Debug for AuthInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthInfo")
            .field("name", &self.name)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn encoded(command: &Command) -> Value {
        serde_json::from_str(&command.to_json().unwrap()).unwrap()
    }

    #[test]
    fn watch_is_a_bare_tag() {
        assert_eq!(encoded(&Command::Watch), json!({ "type": "watch" }));
    }

    #[test]
    fn load_always_carries_exclude_ids() {
        let command = Command::Load(LoadRequest {
            size: 1,
            exclude_ids: vec![],
            ids: Some(vec!["c9".into()]),
        });
        assert_eq!(
            encoded(&command),
            json!({ "type": "load", "data": { "size": 1, "excludeIds": [], "ids": ["c9"] } })
        );
    }

    #[test]
    fn join_omits_absent_fields() {
        let command = Command::Join(JoinRequest {
            conversation_id: Some("c1".into()),
            title: None,
            messages_size: 5,
            participants: None,
        });
        assert_eq!(
            encoded(&command),
            json!({ "type": "join", "data": { "conversationId": "c1", "messagesSize": 5 } })
        );
    }

    #[test]
    fn message_update_flattens_body() {
        let command = Command::MessageUpdate(MessageUpdateRequest {
            message_id: "m1".into(),
            body: TextBody { text: "fixed".into() }.into(),
        });
        assert_eq!(
            encoded(&command),
            json!({ "type": "message-update", "data": { "messageId": "m1", "text": "fixed" } })
        );
        assert_eq!(command.command_type(), "message-update");
    }

    #[test]
    fn send_uses_message_kind_as_tag() {
        let command = Command::File(FileBody {
            link: "https://files/1".into(),
            name: "a.txt".into(),
            mime_type: "text/plain".into(),
            size: 10,
        });
        assert_eq!(
            encoded(&command),
            json!({
                "type": "file",
                "data": { "link": "https://files/1", "name": "a.txt", "type": "text/plain", "size": 10 }
            })
        );
    }

    #[test]
    fn load_messages_encodes_before_as_rfc3339() {
        let before: Timestamp = "2024-05-01T12:00:00Z".parse().unwrap();
        let command = Command::LoadMessages(LoadMessagesRequest {
            size: 1,
            before: Some(before),
            exclude_ids: Some(vec!["m1".into()]),
        });
        let value = encoded(&command);
        assert_eq!(value["type"], "load-messages");
        assert_eq!(value["data"]["excludeIds"], json!(["m1"]));
        let echoed: Timestamp = serde_json::from_value(value["data"]["before"].clone()).unwrap();
        assert_eq!(echoed, before);
    }

    #[test]
    fn command_decodes_back() {
        let frame = r#"{"type":"close","data":{"conversationId":"c3"}}"#;
        let command = Command::from_json(frame).unwrap();
        assert_eq!(
            command,
            Command::Close(ConversationRef {
                conversation_id: "c3".into()
            })
        );
    }

    #[test]
    fn login_shape_and_redaction() {
        let login = Login {
            auth_info: AuthInfo {
                name: "alice".into(),
                password: "hunter2".into(),
            },
            conversations_size: 0,
        };
        let value: Value = serde_json::from_str(&login.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({ "authInfo": { "name": "alice", "password": "hunter2" }, "conversationsSize": 0 })
        );

        let debug = format!("{:?}", login);
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("hunter2"), "password must not appear in Debug output");
    }
}
