//! Backward pagination cursor for a message timeline.
//!
//! Older messages are requested with `before = createdAt of the oldest held
//! message`. Several messages can share that timestamp, and the server
//! returns rows *at or before* the cursor, so the ids of every held message
//! carrying exactly that timestamp go out as `excludeIds`.

use std::sync::Arc;

use convo_sync_types::{LoadMessagesRequest, Message, MessageId, Timestamp};

/// Position to resume backward pagination from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageCursor {
    /// Oldest held `createdAt`, `None` for an empty timeline.
    pub before: Option<Timestamp>,
    /// Held messages created exactly at `before`.
    pub exclude_ids: Vec<MessageId>,
}

impl MessageCursor {
    /// Compute the cursor for a timeline kept in `createdAt` order.
    pub fn from_timeline(timeline: &[Arc<Message>]) -> Self {
        let Some(oldest) = timeline.first() else {
            return Self::default();
        };
        let before = oldest.created_at;
        let exclude_ids = timeline
            .iter()
            .take_while(|message| message.created_at == before)
            .filter_map(|message| message.id.clone())
            .collect();

        Self {
            before: Some(before),
            exclude_ids,
        }
    }

    /// Whether the timeline was empty.
    pub fn is_start(&self) -> bool {
        self.before.is_none()
    }

    /// Build the `load-messages` payload for a page of `size`.
    pub fn into_request(self, size: usize) -> LoadMessagesRequest {
        let exclude_ids = self.before.map(|_| self.exclude_ids);
        LoadMessagesRequest {
            size,
            before: self.before,
            exclude_ids,
        }
    }
}
