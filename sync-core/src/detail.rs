//! One open conversation: its header plus the message timeline.
//!
//! The timeline is kept in non-decreasing `createdAt` order with at most one
//! entry per message id. Older pages are prepended, live messages are
//! inserted at their chronological position, and a live message already
//! present near the tail is dropped as a duplicate delivery.

use std::sync::Arc;

use convo_sync_types::{
    Command, Conversation, ConversationId, ConversationSnapshot, FileBody, LoadedMessages,
    Message, MessageBody, MessageId, MessageRef, MessageUpdateRequest, ServerEvent, TextBody,
};
use tracing::debug;

use crate::cursor::MessageCursor;
use crate::guard::MutationGuard;
use crate::mutation::{
    apply_header, apply_message_delete, apply_message_update, apply_presence, JoinOrder,
};
use crate::page::Paged;
use crate::store::{changed, Effect, StoreKind, Synchronizer};

/// Header and timeline of the open conversation.
#[derive(Debug, Clone)]
pub struct ConversationDetail {
    conversation: Option<Arc<Conversation>>,
    messages: Paged<Message>,
    guard: MutationGuard<MessageId, Message>,
    page_size: usize,
}

impl ConversationDetail {
    /// Build from a `conversation` snapshot.
    ///
    /// The snapshot lists messages newest first; the timeline holds them
    /// oldest first.
    pub fn from_snapshot(snapshot: &ConversationSnapshot, page_size: usize) -> Self {
        let data = snapshot.conversation.clone();
        let conversation = Conversation {
            id: data.id,
            client_conversation_id: data.client_conversation_id,
            title: data.title,
            participants: data.participants,
            created_by: data.created_by,
            created_at: data.created_at,
            updated_at: data.updated_at,
            closed_at: data.closed_at,
            deleted_at: data.deleted_at,
            latest_message: None,
            connected: snapshot.connected.clone(),
            left_at: snapshot.left_at,
        };

        let messages = match &snapshot.messages {
            Some(page) => {
                let mut newest_first = page.messages.clone();
                newest_first.reverse();
                newest_first.sort_by_key(|message| message.created_at);
                Paged::from_snapshot(newest_first, page.total)
            }
            None => Paged::new(),
        };

        Self {
            conversation: Some(Arc::new(conversation)),
            messages,
            guard: MutationGuard::new(),
            page_size,
        }
    }

    /// The header, `None` after a reset.
    pub fn conversation(&self) -> Option<&Arc<Conversation>> {
        self.conversation.as_ref()
    }

    /// Id of the open conversation.
    pub fn id(&self) -> Option<&ConversationId> {
        self.conversation.as_ref().map(|conversation| &conversation.id)
    }

    /// Timeline, oldest first.
    pub fn messages(&self) -> &[Arc<Message>] {
        self.messages.items()
    }

    /// Message `id`, if held.
    pub fn message(&self, id: &MessageId) -> Option<&Arc<Message>> {
        self.messages.get(id)
    }

    /// Total messages reported by the server.
    pub fn total(&self) -> Option<usize> {
        self.messages.total()
    }

    /// Whether older messages remain.
    pub fn has_more(&self) -> bool {
        self.messages.has_more()
    }

    /// Whether a mutation is in flight for message `id`.
    pub fn is_pending(&self, id: &MessageId) -> bool {
        self.guard.is_pending(id)
    }

    /// Cursor the next page request starts from.
    pub fn cursor(&self) -> MessageCursor {
        MessageCursor::from_timeline(self.messages.items())
    }

    /// Request the next page of older messages.
    pub fn request_page(&self) -> Command {
        Command::LoadMessages(self.cursor().into_request(self.page_size))
    }

    /// Command sending a new text message.
    pub fn send_text(&self, text: impl Into<String>) -> Command {
        Command::Text(TextBody { text: text.into() })
    }

    /// Command sending a new file message.
    pub fn send_file(&self, file: FileBody) -> Command {
        Command::File(file)
    }

    /// Command editing message `id`, unless one is already in flight.
    pub fn message_update(&mut self, id: &MessageId, body: MessageBody) -> Option<Command> {
        self.begin(id).then(|| {
            Command::MessageUpdate(MessageUpdateRequest {
                message_id: id.clone(),
                body,
            })
        })
    }

    /// Command deleting message `id`, unless one is already in flight.
    pub fn message_delete(&mut self, id: &MessageId) -> Option<Command> {
        self.begin(id).then(|| {
            Command::MessageDelete(MessageRef {
                message_id: id.clone(),
            })
        })
    }

    /// Merge a `loaded-messages` page.
    ///
    /// Rows are normally older than everything held and simply prepended;
    /// a page that overlaps the timeline is merged and then re-sorted.
    pub fn on_loaded_messages(&mut self, loaded: &LoadedMessages) -> bool {
        let Some(id) = self.id().cloned() else {
            return false;
        };
        let before = (self.messages.len(), self.messages.total());

        let mut rows: Vec<Message> = loaded
            .messages
            .iter()
            .filter(|message| message.conversation_id == id)
            .cloned()
            .collect();
        if rows.is_empty() && !loaded.messages.is_empty() {
            debug!(conversation_id = %id, "message page for another conversation");
            return false;
        }
        rows.sort_by_key(|message| message.created_at);

        let added = self.messages.merge_page(rows, loaded.count);
        if !self.messages.is_sorted_by_key(|message| message.created_at) {
            debug!(conversation_id = %id, "message page overlaps timeline, re-sorting");
            self.messages.sort_by_key(|message| message.created_at);
        }
        debug!(conversation_id = %id, added, total = ?self.messages.total(), "merged message page");
        before != (self.messages.len(), self.messages.total())
    }

    /// Apply a live `text` or `file` message.
    pub fn on_live_message(&mut self, message: Message) -> bool {
        if self.id() != Some(&message.conversation_id) {
            return false;
        }

        let items = self.messages.items();
        let duplicate = items
            .iter()
            .rev()
            .take_while(|held| held.created_at >= message.created_at)
            .any(|held| held.same_identity(&message));
        if duplicate {
            debug!(message_id = ?message.id, "dropping duplicate live message");
            return false;
        }

        let index = items.partition_point(|held| held.created_at <= message.created_at);
        self.messages.insert(index, message);
        true
    }

    /// Apply `message-updated` or `message-deleted`.
    pub fn on_message_mutation(&mut self, event: &ServerEvent) -> bool {
        if !self.concerns(event) {
            return false;
        }
        match event {
            ServerEvent::MessageUpdated(e) => self
                .messages
                .modify(&e.data.message_id, |message| apply_message_update(message, &e.data)),
            ServerEvent::MessageDeleted(e) => self
                .messages
                .modify(&e.data.message_id, |message| apply_message_delete(message, &e.data)),
            _ => false,
        }
    }

    /// Apply `joined` or `left`.
    pub fn on_presence(&mut self, event: &ServerEvent) -> bool {
        self.concerns(event)
            && self.modify_header(|conversation| {
                apply_presence(conversation, event, JoinOrder::Last)
            })
    }

    /// Apply `closed`, `deleted` or `updated` to the header.
    pub fn on_conversation_mutation(&mut self, event: &ServerEvent) -> bool {
        self.concerns(event) && self.modify_header(|conversation| apply_header(conversation, event))
    }

    fn concerns(&self, event: &ServerEvent) -> bool {
        let concerns = event.conversation_id().is_some() && event.conversation_id() == self.id();
        if !concerns {
            debug!(event = event.event_type(), "ignoring event for another conversation");
        }
        concerns
    }

    fn modify_header(&mut self, edit: impl FnOnce(&mut Conversation) -> bool) -> bool {
        let Some(current) = self.conversation.as_ref() else {
            return false;
        };
        let mut next = Conversation::clone(current);
        if !edit(&mut next) {
            return false;
        }
        self.conversation = Some(Arc::new(next));
        true
    }

    fn begin(&mut self, id: &MessageId) -> bool {
        let started = self.guard.begin(id, self.messages.get(id));
        if !started {
            debug!(message_id = %id, "message mutation already in flight");
        }
        started
    }
}

impl Synchronizer for ConversationDetail {
    fn kind(&self) -> StoreKind {
        StoreKind::Conversation
    }

    fn apply(&mut self, event: &ServerEvent) -> Vec<Effect> {
        let changed_view = match event {
            ServerEvent::LoadedMessages(loaded) => self.on_loaded_messages(loaded),
            ServerEvent::Text(_) | ServerEvent::File(_) => event
                .live_message()
                .is_some_and(|message| self.on_live_message(message)),
            ServerEvent::MessageUpdated(_) | ServerEvent::MessageDeleted(_) => {
                self.on_message_mutation(event)
            }
            ServerEvent::Joined(_) | ServerEvent::Left(_) => self.on_presence(event),
            ServerEvent::Closed(_) | ServerEvent::Deleted(_) | ServerEvent::Updated(_) => {
                self.on_conversation_mutation(event)
            }
            _ => false,
        };

        let messages = &self.messages;
        let settled = self.guard.settle(|id| messages.get(id));
        changed(self.kind(), changed_view || settled > 0)
    }

    fn reset(&mut self) {
        self.conversation = None;
        self.messages.clear();
        self.guard.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use convo_sync_types::{LoadMessagesRequest, MessageKind};

    fn detail(messages_newest_first: &[(&str, &str)], total: usize) -> ConversationDetail {
        let mut snapshot = conversation_snapshot_data("c1", messages_newest_first);
        if let Some(page) = snapshot.messages.as_mut() {
            page.total = total;
        }
        ConversationDetail::from_snapshot(&snapshot, 1)
    }

    fn timeline(detail: &ConversationDetail) -> Vec<&str> {
        detail
            .messages()
            .iter()
            .map(|m| m.id.as_ref().map(MessageId::as_str).unwrap_or("?"))
            .collect()
    }

    // ===== Snapshot =====

    #[test]
    fn snapshot_is_reversed_into_timeline_order() {
        let detail = detail(
            &[("m3", "2024-01-01T00:00:03Z"), ("m2", "2024-01-01T00:00:02Z"), ("m1", "2024-01-01T00:00:01Z")],
            10,
        );
        assert_eq!(timeline(&detail), vec!["m1", "m2", "m3"]);
        assert_eq!(detail.total(), Some(10));
        assert!(detail.has_more());
        assert_eq!(detail.conversation().unwrap().id, "c1");
    }

    // ===== Pagination =====

    #[test]
    fn older_page_is_prepended() {
        let mut detail = detail(&[("m3", "2024-01-01T00:00:03Z")], 3);
        let effects = detail.apply(&loaded_messages(
            "c1",
            &[("m1", "2024-01-01T00:00:01Z"), ("m2", "2024-01-01T00:00:02Z")],
            2,
        ));

        assert_eq!(timeline(&detail), vec!["m1", "m2", "m3"]);
        assert_eq!(detail.total(), Some(3));
        assert_eq!(effects, vec![Effect::Changed(StoreKind::Conversation)]);
    }

    #[test]
    fn page_for_other_conversation_is_dropped() {
        let mut detail = detail(&[("m3", "2024-01-01T00:00:03Z")], 10);

        let effects = detail.apply(&loaded_messages("c2", &[("x1", "2024-01-01T00:00:01Z")], 7));

        assert!(effects.is_empty());
        assert_eq!(timeline(&detail), vec!["m3"]);
        assert_eq!(detail.total(), Some(10));
        assert!(detail.has_more());
    }

    #[test]
    fn empty_page_still_halts_pagination() {
        let mut detail = detail(&[("m3", "2024-01-01T00:00:03Z")], 10);
        detail.apply(&loaded_messages("c1", &[], 4));
        assert_eq!(detail.total(), Some(1));
        assert!(!detail.has_more());
    }

    #[test]
    fn request_page_uses_oldest_cursor() {
        let detail = detail(
            &[("m2", "2024-01-01T00:00:01Z"), ("m1", "2024-01-01T00:00:01Z")],
            5,
        );
        match detail.request_page() {
            Command::LoadMessages(LoadMessagesRequest {
                size,
                before,
                exclude_ids,
            }) => {
                assert_eq!(size, 1);
                assert_eq!(before, Some(ts("2024-01-01T00:00:01Z")));
                assert_eq!(exclude_ids.map(|ids| ids.len()), Some(2));
            }
            other => panic!("Expected LoadMessages, got {:?}", other),
        }
    }

    #[test]
    fn overlapping_page_keeps_order_and_uniqueness() {
        let mut detail = detail(&[("m3", "2024-01-01T00:00:03Z"), ("m1", "2024-01-01T00:00:01Z")], 3);
        detail.apply(&loaded_messages(
            "c1",
            &[("m1", "2024-01-01T00:00:01Z"), ("m2", "2024-01-01T00:00:02Z")],
            2,
        ));
        assert_eq!(timeline(&detail), vec!["m1", "m2", "m3"]);
    }

    // ===== Live messages =====

    #[test]
    fn live_message_appends_and_counts() {
        let mut detail = detail(&[("m1", "2024-01-01T00:00:01Z")], 1);
        detail.apply(&text("c1", "m2", "hello", "2024-01-01T00:00:02Z"));

        assert_eq!(timeline(&detail), vec!["m1", "m2"]);
        assert_eq!(detail.total(), Some(2));
        assert_eq!(detail.messages()[1].kind, MessageKind::Text);
    }

    #[test]
    fn duplicate_live_message_is_dropped() {
        let mut detail = detail(&[("m1", "2024-01-01T00:00:01Z")], 1);
        let effects = detail.apply(&text("c1", "m1", "again", "2024-01-01T00:00:01Z"));

        assert!(effects.is_empty());
        assert_eq!(detail.messages().len(), 1);
        assert_eq!(detail.total(), Some(1));
    }

    #[test]
    fn late_live_message_is_inserted_in_order() {
        let mut detail = detail(
            &[("m3", "2024-01-01T00:00:03Z"), ("m1", "2024-01-01T00:00:01Z")],
            2,
        );
        detail.apply(&text("c1", "m2", "late", "2024-01-01T00:00:02Z"));
        assert_eq!(timeline(&detail), vec!["m1", "m2", "m3"]);
    }

    #[test]
    fn equal_timestamp_goes_after_existing() {
        let mut detail = detail(&[("m1", "2024-01-01T00:00:01Z")], 1);
        detail.apply(&text("c1", "m2", "tie", "2024-01-01T00:00:01Z"));
        assert_eq!(timeline(&detail), vec!["m1", "m2"]);
    }

    #[test]
    fn live_message_for_other_conversation_is_ignored() {
        let mut detail = detail(&[], 0);
        assert!(detail.apply(&text("c2", "m1", "x", "2024-01-01T00:00:01Z")).is_empty());
        assert!(detail.messages().is_empty());
    }

    // ===== Message mutations =====

    #[test]
    fn message_update_replaces_body_and_stamps() {
        let mut detail = detail(&[("m1", "2024-01-01T00:00:01Z")], 1);
        detail.apply(&message_updated("c1", "m1", "edited", "2024-01-01T00:05:00Z"));

        let m = &detail.messages()[0];
        assert_eq!(m.data, MessageBody::Text(TextBody { text: "edited".into() }));
        assert_eq!(m.updated_at, Some(ts("2024-01-01T00:05:00Z")));
    }

    #[test]
    fn message_delete_only_stamps() {
        let mut detail = detail(&[("m1", "2024-01-01T00:00:01Z")], 1);
        let body = detail.messages()[0].data.clone();
        detail.apply(&message_deleted("c1", "m1", "2024-01-01T00:06:00Z"));

        let m = &detail.messages()[0];
        assert_eq!(m.deleted_at, Some(ts("2024-01-01T00:06:00Z")));
        assert_eq!(m.data, body);
    }

    #[test]
    fn mutation_for_unknown_message_is_ignored() {
        let mut detail = detail(&[("m1", "2024-01-01T00:00:01Z")], 1);
        let before = Arc::clone(&detail.messages()[0]);
        assert!(detail
            .apply(&message_deleted("c1", "m9", "2024-01-01T00:06:00Z"))
            .is_empty());
        assert!(Arc::ptr_eq(&before, &detail.messages()[0]));
    }

    #[test]
    fn message_guard_settles_on_update() {
        let mut detail = detail(&[("m1", "2024-01-01T00:00:01Z")], 1);
        let id = MessageId::from("m1");

        assert!(detail.message_delete(&id).is_some());
        assert!(detail
            .message_update(&id, TextBody { text: "x".into() }.into())
            .is_none());

        detail.apply(&message_deleted("c1", "m1", "2024-01-01T00:06:00Z"));
        assert!(!detail.is_pending(&id));
    }

    // ===== Header and presence =====

    #[test]
    fn presence_is_idempotent() {
        let mut detail = detail(&[], 0);
        assert!(!detail.apply(&joined("c1", "bob")).is_empty());
        assert!(detail.apply(&joined("c1", "bob")).is_empty());
        assert!(detail.apply(&left("c1", "carol")).is_empty());

        let connected = detail.conversation().unwrap().connected.clone();
        assert_eq!(connected, Some(vec!["bob".into()]));
    }

    #[test]
    fn joined_participant_is_appended() {
        let mut detail = detail(&[], 0);
        detail.apply(&joined("c1", "bob"));
        detail.apply(&joined("c1", "carol"));

        let connected = detail.conversation().unwrap().connected.clone();
        assert_eq!(connected, Some(vec!["bob".into(), "carol".into()]));
    }

    #[test]
    fn header_mutations_apply() {
        let mut detail = detail(&[], 0);
        detail.apply(&closed("c1", "2024-02-01T00:00:00Z"));
        assert!(detail.conversation().unwrap().is_closed());

        detail.apply(&closed("c2", "2024-02-01T00:00:00Z"));
        detail.apply(&updated("c1", Some("t"), &["alice"], "2024-02-02T00:00:00Z"));
        assert_eq!(detail.conversation().unwrap().title.as_deref(), Some("t"));
    }

    #[test]
    fn send_commands() {
        let detail = detail(&[], 0);
        assert_eq!(
            detail.send_text("hi"),
            Command::Text(TextBody { text: "hi".into() })
        );
    }

    #[test]
    fn reset_drops_everything() {
        let mut detail = detail(&[("m1", "2024-01-01T00:00:01Z")], 1);
        detail.reset();

        assert!(detail.conversation().is_none());
        assert!(detail.messages().is_empty());
        assert_eq!(detail.total(), None);
        assert!(detail.apply(&joined("c1", "bob")).is_empty());
    }
}
