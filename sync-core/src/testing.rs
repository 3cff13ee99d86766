//! Event builders shared by the store tests.

use convo_sync_types::{
    ConversationClosed, ConversationData, ConversationDeleted, ConversationRecord,
    ConversationSnapshot, ConversationUpdated, Envelope, LoadedConversations, LoadedMessages,
    Message, MessageBody, MessageDeleted, MessageId, MessageKind, MessagePage, MessageUpdated,
    ParticipantId, ServerEvent, TextBody, Timestamp,
};

pub fn ts(s: &str) -> Timestamp {
    s.parse().unwrap()
}

pub fn data(id: &str) -> ConversationData {
    ConversationData {
        id: id.into(),
        client_conversation_id: None,
        title: Some(format!("title {id}")),
        participants: vec!["alice".into(), "bob".into()],
        created_by: "alice".into(),
        created_at: ts("2024-01-01T00:00:00Z"),
        updated_at: None,
        closed_at: None,
        deleted_at: None,
    }
}

pub fn record(id: &str) -> ConversationRecord {
    ConversationRecord {
        conversation: data(id),
        latest_message: None,
        connected: None,
        left_at: None,
    }
}

pub fn message(conversation: &str, id: &str, at: &str) -> Message {
    Message {
        id: Some(MessageId::from(id)),
        client_message_id: None,
        conversation_id: conversation.into(),
        participants: vec!["alice".into(), "bob".into()],
        connection_id: "k1".into(),
        from_id: "alice".into(),
        kind: MessageKind::Text,
        data: MessageBody::Text(TextBody {
            text: format!("text {id}"),
        }),
        created_at: ts(at),
        updated_at: None,
        deleted_at: None,
    }
}

fn envelope<T>(conversation: &str, from: &str, at: &str, data: T) -> Envelope<T> {
    Envelope {
        id: None,
        client_message_id: None,
        conversation_id: conversation.into(),
        participants: None,
        connection_id: "k1".into(),
        from_id: from.into(),
        data,
        created_at: ts(at),
        updated_at: None,
        deleted_at: None,
    }
}

pub fn loaded(ids: &[&str], count: usize) -> ServerEvent {
    ServerEvent::Loaded(LoadedConversations {
        conversations: ids.iter().map(|id| record(id)).collect(),
        count,
    })
}

pub fn loaded_messages(conversation: &str, rows: &[(&str, &str)], count: usize) -> ServerEvent {
    ServerEvent::LoadedMessages(LoadedMessages {
        messages: rows
            .iter()
            .map(|(id, at)| message(conversation, id, at))
            .collect(),
        count,
    })
}

/// `rows` are `(id, createdAt)` pairs, newest first as the server sends them.
pub fn conversation_snapshot(id: &str, rows: &[(&str, &str)]) -> ServerEvent {
    ServerEvent::Conversation(conversation_snapshot_data(id, rows))
}

pub fn conversation_snapshot_data(id: &str, rows: &[(&str, &str)]) -> ConversationSnapshot {
    ConversationSnapshot {
        conversation: data(id),
        connected: None,
        left_at: None,
        messages: Some(MessagePage {
            messages: rows.iter().map(|(m, at)| message(id, m, at)).collect(),
            total: rows.len(),
        }),
    }
}

pub fn closed(conversation: &str, at: &str) -> ServerEvent {
    ServerEvent::Closed(envelope(
        conversation,
        "alice",
        at,
        ConversationClosed {
            conversation_id: conversation.into(),
            closed_at: ts(at),
        },
    ))
}

pub fn deleted(conversation: &str, closed_at: &str, deleted_at: &str) -> ServerEvent {
    ServerEvent::Deleted(envelope(
        conversation,
        "alice",
        deleted_at,
        ConversationDeleted {
            conversation_id: conversation.into(),
            closed_at: ts(closed_at),
            deleted_at: ts(deleted_at),
        },
    ))
}

pub fn updated(conversation: &str, title: Option<&str>, participants: &[&str], at: &str) -> ServerEvent {
    ServerEvent::Updated(envelope(
        conversation,
        "alice",
        at,
        ConversationUpdated {
            conversation_id: conversation.into(),
            title: title.map(str::to_string),
            participants: participants.iter().map(|p| ParticipantId::from(*p)).collect(),
            updated_at: ts(at),
        },
    ))
}

pub fn joined(conversation: &str, from: &str) -> ServerEvent {
    ServerEvent::Joined(envelope(conversation, from, "2024-01-01T00:00:00Z", None))
}

pub fn left(conversation: &str, from: &str) -> ServerEvent {
    ServerEvent::Left(envelope(conversation, from, "2024-01-01T00:00:00Z", None))
}

pub fn text(conversation: &str, id: &str, body: &str, at: &str) -> ServerEvent {
    let mut e = envelope(conversation, "alice", at, TextBody { text: body.into() });
    e.id = Some(id.into());
    ServerEvent::Text(e)
}

pub fn message_updated(conversation: &str, id: &str, body: &str, at: &str) -> ServerEvent {
    ServerEvent::MessageUpdated(envelope(
        conversation,
        "alice",
        at,
        MessageUpdated {
            message_id: id.into(),
            updated_at: ts(at),
            text: Some(body.into()),
            link: None,
            name: None,
            mime_type: None,
            size: None,
        },
    ))
}

pub fn message_deleted(conversation: &str, id: &str, at: &str) -> ServerEvent {
    ServerEvent::MessageDeleted(envelope(
        conversation,
        "alice",
        at,
        MessageDeleted {
            message_id: id.into(),
            deleted_at: ts(at),
        },
    ))
}

pub fn with_participants(mut event: ServerEvent, participants: &[&str]) -> ServerEvent {
    let list: Option<Vec<ParticipantId>> =
        Some(participants.iter().map(|p| ParticipantId::from(*p)).collect());
    match &mut event {
        ServerEvent::Text(e) => e.participants = list,
        ServerEvent::File(e) => e.participants = list,
        ServerEvent::Joined(e) | ServerEvent::Left(e) => e.participants = list,
        ServerEvent::Closed(e) => e.participants = list,
        _ => {}
    }
    event
}
