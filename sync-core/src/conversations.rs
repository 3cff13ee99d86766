//! The user's conversation list.
//!
//! Created from the `connection` snapshot, grown by `loaded` pages and kept
//! current by `closed`, `deleted` and `updated` events. Events naming a
//! conversation that is not held are ignored.

use std::sync::Arc;

use convo_sync_types::{
    Command, ConnectionSnapshot, Conversation, ConversationId, ConversationPage, ConversationRef,
    JoinRequest, LoadRequest, LoadedConversations, ParticipantId, ServerEvent, UpdateRequest,
};
use tracing::debug;

use crate::guard::MutationGuard;
use crate::mutation::apply_header;
use crate::page::Paged;
use crate::store::{changed, Effect, StoreKind, Synchronizer};

/// Paginated list of conversation summaries.
#[derive(Debug, Clone)]
pub struct ConversationList {
    page: Paged<Conversation>,
    guard: MutationGuard<ConversationId, Conversation>,
    page_size: usize,
}

impl ConversationList {
    /// An unloaded list requesting pages of `page_size`.
    pub fn new(page_size: usize) -> Self {
        Self {
            page: Paged::new(),
            guard: MutationGuard::new(),
            page_size,
        }
    }

    /// A list seeded from the `connection` snapshot.
    pub fn from_snapshot(snapshot: &ConnectionSnapshot, page_size: usize) -> Self {
        Self::from_page(&snapshot.conversations, page_size)
    }

    fn from_page(page: &ConversationPage, page_size: usize) -> Self {
        let conversations = page
            .conversations
            .iter()
            .cloned()
            .map(Conversation::from);
        Self {
            page: Paged::from_snapshot(conversations, page.total),
            guard: MutationGuard::new(),
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

    /// Whether a mutation is in flight for `id`.
    pub fn is_pending(&self, id: &ConversationId) -> bool {
        self.guard.is_pending(id)
    }

    /// Request the next page, excluding every held conversation.
    pub fn request_page(&self) -> Command {
        Command::Load(LoadRequest {
            size: self.page_size,
            exclude_ids: self.page.keys(),
            ids: None,
        })
    }

    /// Merge a `loaded` page. Returns whether the list changed.
    pub fn on_loaded(&mut self, loaded: &LoadedConversations) -> bool {
        let before = (self.page.len(), self.page.total());
        let added = self.page.merge_page(
            loaded.conversations.iter().cloned().map(Conversation::from),
            loaded.count,
        );
        debug!(
            added,
            count = loaded.count,
            total = ?self.page.total(),
            "merged conversation page"
        );
        before != (self.page.len(), self.page.total())
    }

    /// Apply `closed`, `deleted` or `updated` to the held conversation.
    pub fn on_mutation(&mut self, event: &ServerEvent) -> bool {
        let Some(id) = event.conversation_id() else {
            return false;
        };
        if !self.page.contains(id) {
            debug!(conversation_id = %id, event = event.event_type(), "ignoring event for unknown conversation");
            return false;
        }
        self.page
            .modify(id, |conversation| apply_header(conversation, event))
    }

    /// Command closing `id`, unless a mutation is already in flight.
    pub fn close(&mut self, id: &ConversationId) -> Option<Command> {
        self.begin(id).then(|| {
            Command::Close(ConversationRef {
                conversation_id: id.clone(),
            })
        })
    }

    /// Command deleting `id`, unless a mutation is already in flight.
    pub fn delete(&mut self, id: &ConversationId) -> Option<Command> {
        self.begin(id).then(|| {
            Command::Delete(ConversationRef {
                conversation_id: id.clone(),
            })
        })
    }

    /// Command updating `id`, unless a mutation is already in flight.
    pub fn update(
        &mut self,
        id: &ConversationId,
        title: Option<String>,
        participants: Option<Vec<ParticipantId>>,
    ) -> Option<Command> {
        self.begin(id).then(|| {
            Command::Update(UpdateRequest {
                conversation_id: id.clone(),
                title,
                participants,
            })
        })
    }

    /// Command opening `id` with its newest `messages_size` messages.
    ///
    /// The flag clears when the `conversation` snapshot for `id` arrives.
    pub fn join(&mut self, id: &ConversationId, messages_size: usize) -> Option<Command> {
        self.begin(id).then(|| {
            Command::Join(JoinRequest {
                conversation_id: Some(id.clone()),
                title: None,
                messages_size,
                participants: None,
            })
        })
    }

    fn begin(&mut self, id: &ConversationId) -> bool {
        let started = self.guard.begin(id, self.page.get(id));
        if !started {
            debug!(conversation_id = %id, "mutation already in flight");
        }
        started
    }
}

impl Synchronizer for ConversationList {
    fn kind(&self) -> StoreKind {
        StoreKind::Conversations
    }

    fn apply(&mut self, event: &ServerEvent) -> Vec<Effect> {
        let changed_view = match event {
            ServerEvent::Loaded(loaded) => self.on_loaded(loaded),
            ServerEvent::Closed(_) | ServerEvent::Deleted(_) | ServerEvent::Updated(_) => {
                self.on_mutation(event)
            }
            ServerEvent::Conversation(snapshot) => {
                self.guard.finish(&snapshot.conversation.id);
                false
            }
            _ => false,
        };

        let page = &self.page;
        let settled = self.guard.settle(|id| page.get(id));
        changed(self.kind(), changed_view || settled > 0)
    }

    fn reset(&mut self) {
        self.page.clear();
        self.guard.clear();
    }
}
