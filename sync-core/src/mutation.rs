//! In-place edits shared by every store.
//!
//! Each function edits one entity and returns whether anything changed, so
//! callers can hand them straight to [`Paged::modify`](crate::Paged::modify)
//! and keep the old `Arc` when an event turns out to be a no-op.

use convo_sync_types::{
    Conversation, Envelope, Message, MessageBody, MessageDeleted, MessageUpdated, NoPayload,
    ParticipantId, ServerEvent,
};

/// Apply a `closed`, `deleted` or `updated` event to a conversation header.
///
/// Other events leave the header untouched. A deleted conversation still
/// accepts updates; the server decides what is legal.
pub fn apply_header(conversation: &mut Conversation, event: &ServerEvent) -> bool {
    match event {
        ServerEvent::Closed(e) => {
            conversation.closed_at = Some(e.data.closed_at);
            true
        }
        ServerEvent::Deleted(e) => {
            conversation.closed_at = Some(e.data.closed_at);
            conversation.deleted_at = Some(e.data.deleted_at);
            true
        }
        ServerEvent::Updated(e) => {
            conversation.title = e.data.title.clone();
            conversation.participants = e.data.participants.clone();
            conversation.updated_at = Some(e.data.updated_at);
            true
        }
        _ => false,
    }
}

/// Where a newly joined participant goes in the connected set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOrder {
    /// Newest first (watch list).
    First,
    /// Arrival order (open conversation).
    Last,
}

/// Apply a `joined` or `left` event to a conversation's connected set.
pub fn apply_presence(
    conversation: &mut Conversation,
    event: &ServerEvent,
    order: JoinOrder,
) -> bool {
    match event {
        ServerEvent::Joined(e) => joined(conversation, e, order),
        ServerEvent::Left(e) => left(conversation, e),
        _ => false,
    }
}

fn joined(conversation: &mut Conversation, event: &Envelope<NoPayload>, order: JoinOrder) -> bool {
    if conversation.is_connected(&event.from_id) {
        return false;
    }
    let connected = conversation.connected.get_or_insert_with(Vec::new);
    match order {
        JoinOrder::First => connected.insert(0, event.from_id.clone()),
        JoinOrder::Last => connected.push(event.from_id.clone()),
    }
    true
}

fn left(conversation: &mut Conversation, event: &Envelope<NoPayload>) -> bool {
    let Some(connected) = conversation.connected.as_mut() else {
        return false;
    };
    let before = connected.len();
    connected.retain(|id: &ParticipantId| *id != event.from_id);
    connected.len() != before
}

/// Apply a `message-updated` payload.
///
/// Only the fields that belong to the message's kind are taken; a field the
/// payload omits keeps its current value.
pub fn apply_message_update(message: &mut Message, update: &MessageUpdated) -> bool {
    match &mut message.data {
        MessageBody::Text(body) => {
            if let Some(text) = &update.text {
                body.text.clone_from(text);
            }
        }
        MessageBody::File(body) => {
            if let Some(link) = &update.link {
                body.link.clone_from(link);
            }
            if let Some(name) = &update.name {
                body.name.clone_from(name);
            }
            if let Some(mime_type) = &update.mime_type {
                body.mime_type.clone_from(mime_type);
            }
            if let Some(size) = update.size {
                body.size = size;
            }
        }
    }
    message.updated_at = Some(update.updated_at);
    true
}

/// Apply a `message-deleted` payload. The body is kept.
pub fn apply_message_delete(message: &mut Message, delete: &MessageDeleted) -> bool {
    message.deleted_at = Some(delete.deleted_at);
    true
}
