//! The watch list: observed conversations, pulled in lazily.
//!
//! Unlike the user's own list, the watch list does not ignore events for
//! conversations it does not hold. An event that names an unknown
//! conversation triggers a one-row backfill `load` for it, provided the event
//! either omits its participants or lists the current user. Only one
//! backfill per conversation is outstanding at a time.
//!
//! Each held conversation keeps a representative `latest_message`, updated
//! last-writer-wins on the message's effective timestamp.

use std::collections::HashSet;
use std::sync::Arc;

use convo_sync_types::{
    Command, Conversation, ConversationId, LoadRequest, LoadedConversations, Message, MessageId,
    ParticipantId, ServerEvent, Timestamp, WatchingSnapshot,
};
use tracing::debug;

use crate::mutation::{
    apply_header, apply_message_delete, apply_message_update, apply_presence, JoinOrder,
};
use crate::page::Paged;
use crate::store::{changed, Effect, StoreKind, Synchronizer};

/// Page size of a single-conversation backfill.
pub const BACKFILL_SIZE: usize = 1;

/// Paginated list of watched conversations.
#[derive(Debug, Clone)]
pub struct WatchList {
    user: ParticipantId,
    page: Paged<Conversation>,
    backfilling: HashSet<ConversationId>,
    page_size: usize,
}

impl WatchList {
    /// An unloaded watch list for `user`.
    pub fn new(user: ParticipantId, page_size: usize) -> Self {
        Self {
            user,
            page: Paged::new(),
            backfilling: HashSet::new(),
            page_size,
        }
    }

    /// A watch list seeded from the `watching` snapshot.
    pub fn from_snapshot(
        user: ParticipantId,
        snapshot: &WatchingSnapshot,
        page_size: usize,
    ) -> Self {
        let conversations = snapshot
            .conversations
            .conversations
            .iter()
            .cloned()
            .map(Conversation::from);
        Self {
            user,
            page: Paged::from_snapshot(conversations, snapshot.conversations.total),
            backfilling: HashSet::new(),
            page_size,
        }
    }

    /// Held conversations, in list order.
    pub fn conversations(&self) -> &[Arc<Conversation>] {
        self.page.items()
    }

    /// Conversation with `id`, if held.
    pub fn get(&self, id: &ConversationId) -> Option<&Arc<Conversation>> {
        self.page.get(id)
    }

    /// Server-reported total.
    pub fn total(&self) -> Option<usize> {
        self.page.total()
    }

    /// Whether more pages are available.
    pub fn has_more(&self) -> bool {
        self.page.has_more()
    }

    /// Whether a backfill for `id` is outstanding.
    pub fn is_backfilling(&self, id: &ConversationId) -> bool {
        self.backfilling.contains(id)
    }

    /// Request the next page, excluding every held conversation.
    pub fn request_page(&self) -> Command {
        Command::Load(LoadRequest {
            size: self.page_size,
            exclude_ids: self.page.keys(),
            ids: None,
        })
    }

    /// Merge a `loaded` page and clear the backfills it answers.
    ///
    /// A page made only of outstanding backfills answers a lookup by id, so
    /// its rows are adopted without touching the page arithmetic.
    pub fn on_loaded(&mut self, loaded: &LoadedConversations) -> bool {
        let answers_backfill = !loaded.conversations.is_empty()
            && loaded
                .conversations
                .iter()
                .all(|record| self.backfilling.contains(&record.conversation.id));
        for record in &loaded.conversations {
            self.backfilling.remove(&record.conversation.id);
        }

        let before = (self.page.len(), self.page.total());
        let rows = loaded.conversations.iter().cloned().map(Conversation::from);
        if answers_backfill {
            let added = self.page.adopt(rows);
            debug!(added, "adopted backfilled conversation");
        } else {
            let added = self.page.merge_page(rows, loaded.count);
            debug!(added, count = loaded.count, "merged watched conversation page");
        }
        before != (self.page.len(), self.page.total())
    }

    /// Backfill request for an event that names an unknown conversation.
    ///
    /// `None` if the conversation is held, already being backfilled, or the
    /// event lists participants that exclude the current user.
    pub fn backfill(&mut self, event: &ServerEvent) -> Option<Command> {
        let route = event.route()?;
        let id = route.conversation_id;
        if self.page.contains(id) || self.backfilling.contains(id) {
            return None;
        }
        let relevant = route
            .participants
            .map_or(true, |participants| participants.contains(&self.user));
        if !relevant {
            debug!(conversation_id = %id, "event for unwatched conversation without current user");
            return None;
        }

        debug!(conversation_id = %id, event = event.event_type(), "backfilling watched conversation");
        self.backfilling.insert(id.clone());
        Some(Command::Load(LoadRequest {
            size: BACKFILL_SIZE,
            exclude_ids: Vec::new(),
            ids: Some(vec![id.clone()]),
        }))
    }

    /// Apply an envelope event to a held conversation.
    pub fn on_event(&mut self, event: &ServerEvent) -> bool {
        let Some(id) = event.conversation_id() else {
            return false;
        };
        let id = id.clone();
        self.page.modify(&id, |conversation| match event {
            ServerEvent::Closed(_) | ServerEvent::Deleted(_) | ServerEvent::Updated(_) => {
                apply_header(conversation, event)
            }
            ServerEvent::Joined(_) | ServerEvent::Left(_) => {
                apply_presence(conversation, event, JoinOrder::First)
            }
            ServerEvent::Text(_) | ServerEvent::File(_) => event
                .live_message()
                .is_some_and(|message| replace_latest(conversation, message)),
            ServerEvent::MessageUpdated(e) => {
                edit_latest(conversation, &e.data.message_id, e.data.updated_at, |latest| {
                    apply_message_update(latest, &e.data)
                })
            }
            ServerEvent::MessageDeleted(e) => {
                edit_latest(conversation, &e.data.message_id, e.data.deleted_at, |latest| {
                    apply_message_delete(latest, &e.data)
                })
            }
            _ => false,
        })
    }
}

/// Replace `latest_message` if `message` is at least as recent.
fn replace_latest(conversation: &mut Conversation, message: Message) -> bool {
    let newer = conversation
        .latest_message
        .as_ref()
        .map_or(true, |latest| latest.effective_timestamp() <= message.effective_timestamp());
    if newer {
        conversation.latest_message = Some(message);
    }
    newer
}

/// Edit `latest_message` in place when it is the message `id` and `at` is at
/// least as recent as what it already records.
fn edit_latest(
    conversation: &mut Conversation,
    id: &MessageId,
    at: Timestamp,
    edit: impl FnOnce(&mut Message) -> bool,
) -> bool {
    match conversation.latest_message.as_mut() {
        Some(latest) if latest.id.as_ref() == Some(id) && latest.effective_timestamp() <= at => {
            edit(latest)
        }
        _ => false,
    }
}

impl Synchronizer for WatchList {
    fn kind(&self) -> StoreKind {
        StoreKind::Watching
    }

    fn apply(&mut self, event: &ServerEvent) -> Vec<Effect> {
        if let ServerEvent::Loaded(loaded) = event {
            return changed(self.kind(), self.on_loaded(loaded));
        }
        let Some(id) = event.conversation_id() else {
            return Vec::new();
        };
        if !self.page.contains(id) {
            return self.backfill(event).map(Effect::Send).into_iter().collect();
        }
        let changed_view = self.on_event(event);
        changed(self.kind(), changed_view)
    }

    fn reset(&mut self) {
        self.page.clear();
        self.backfilling.clear();
    }
}
