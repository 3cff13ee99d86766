use proptest::prelude::*;

use convo_sync_core::{ConversationDetail, ConversationList, Synchronizer, WatchList};
use convo_sync_types::{
    ConnectionSnapshot, ConversationData, ConversationPage, ConversationRecord,
    ConversationSnapshot, Envelope, LoadedConversations, LoadedMessages, Message, MessageBody,
    MessageKind, MessagePage, ServerEvent, TextBody, Timestamp, WatchingSnapshot,
};

// --- Builders ---

fn at(secs: u32) -> Timestamp {
    let secs = secs % 86_400;
    format!(
        "2024-01-01T{:02}:{:02}:{:02}Z",
        secs / 3600,
        secs / 60 % 60,
        secs % 60
    )
    .parse()
    .unwrap()
}

fn record(id: usize) -> ConversationRecord {
    ConversationRecord {
        conversation: conversation_data(&format!("c{id}")),
        latest_message: None,
        connected: None,
        left_at: None,
    }
}

fn conversation_data(id: &str) -> ConversationData {
    ConversationData {
        id: id.into(),
        client_conversation_id: None,
        title: None,
        participants: vec!["alice".into()],
        created_by: "alice".into(),
        created_at: at(0),
        updated_at: None,
        closed_at: None,
        deleted_at: None,
    }
}

fn message(id: usize, secs: u32) -> Message {
    Message {
        id: Some(format!("m{id}").into()),
        client_message_id: None,
        conversation_id: "c1".into(),
        participants: vec!["alice".into()],
        connection_id: String::new(),
        from_id: "alice".into(),
        kind: MessageKind::Text,
        data: MessageBody::Text(TextBody {
            text: format!("{id}"),
        }),
        created_at: at(secs),
        updated_at: None,
        deleted_at: None,
    }
}

fn envelope<T>(conversation: &str, from: &str, secs: u32, data: T) -> Envelope<T> {
    Envelope {
        id: None,
        client_message_id: None,
        conversation_id: conversation.into(),
        participants: None,
        connection_id: String::new(),
        from_id: from.into(),
        data,
        created_at: at(secs),
        updated_at: None,
        deleted_at: None,
    }
}

fn live(id: usize, secs: u32) -> ServerEvent {
    let mut e = envelope("c1", "alice", secs, TextBody { text: format!("{id}") });
    e.id = Some(format!("m{id}").into());
    ServerEvent::Text(e)
}

fn empty_detail() -> ConversationDetail {
    ConversationDetail::from_snapshot(
        &ConversationSnapshot {
            conversation: conversation_data("c1"),
            connected: None,
            left_at: None,
            messages: Some(MessagePage {
                messages: vec![],
                total: 0,
            }),
        },
        1,
    )
}

fn empty_list() -> ConversationList {
    ConversationList::from_snapshot(
        &ConnectionSnapshot {
            conversations: ConversationPage {
                conversations: vec![],
                total: 0,
            },
        },
        1,
    )
}

// --- Page merging ---

proptest! {
    #[test]
    fn disjoint_pages_from_a_consistent_server(
        server_rows in 1usize..40,
        page_sizes in prop::collection::vec(1usize..6, 1..20),
    ) {
        let mut list = ConversationList::new(1);
        let mut next = 0;
        let mut sum = 0;

        for size in page_sizes {
            let remaining = server_rows - next;
            let page: Vec<_> = (next..(next + size).min(server_rows)).map(record).collect();
            next += page.len();
            sum += page.len();
            list.apply(&ServerEvent::Loaded(LoadedConversations {
                conversations: page,
                count: remaining,
            }));

            prop_assert_eq!(list.conversations().len(), sum);
            prop_assert!(list.total().unwrap() >= sum);
            if remaining > 0 {
                prop_assert_eq!(list.total(), Some(server_rows));
            }
        }
    }

    #[test]
    fn exhausted_page_pins_total_to_len(first in 1usize..10, rest in 0usize..10, extra in 0usize..10) {
        let mut list = ConversationList::new(1);
        list.apply(&ServerEvent::Loaded(LoadedConversations {
            conversations: (0..first).map(record).collect(),
            count: first + rest + extra,
        }));
        prop_assert_eq!(list.total(), Some(first + rest + extra));

        list.apply(&ServerEvent::Loaded(LoadedConversations {
            conversations: (first..first + rest).map(record).collect(),
            count: 0,
        }));
        prop_assert_eq!(list.total(), Some(first + rest));
        prop_assert!(!list.has_more());
    }

    #[test]
    fn replayed_pages_never_duplicate(ids in prop::collection::vec(0usize..15, 0..30)) {
        let mut list = empty_list();
        for chunk in ids.chunks(3) {
            list.apply(&ServerEvent::Loaded(LoadedConversations {
                conversations: chunk.iter().copied().map(record).collect(),
                count: chunk.len(),
            }));
        }
        let mut held: Vec<_> = list.conversations().iter().map(|c| c.id.clone()).collect();
        let len = held.len();
        held.sort();
        held.dedup();
        prop_assert_eq!(held.len(), len);
        prop_assert!(list.total().unwrap() >= len);
    }
}

// --- Timeline ---

proptest! {
    #[test]
    fn timeline_stays_ordered(stamps in prop::collection::vec(0u32..50, 0..40)) {
        let mut detail = empty_detail();
        for (id, secs) in stamps.iter().enumerate() {
            detail.apply(&live(id, *secs));
        }

        let timeline = detail.messages();
        prop_assert_eq!(timeline.len(), stamps.len());
        prop_assert!(timeline.windows(2).all(|w| w[0].created_at <= w[1].created_at));
    }

    #[test]
    fn duplicate_live_message_lands_once(
        secs in 0u32..100,
        others in prop::collection::vec(0u32..100, 0..10),
        page_first in any::<bool>(),
        twice in any::<bool>(),
    ) {
        let mut detail = empty_detail();
        for (i, s) in others.iter().enumerate() {
            detail.apply(&live(1000 + i, *s));
        }
        let page = ServerEvent::LoadedMessages(LoadedMessages {
            messages: vec![message(7, secs)],
            count: 1,
        });

        if page_first {
            detail.apply(&page);
        }
        detail.apply(&live(7, secs));
        if twice {
            detail.apply(&live(7, secs));
        }
        if !page_first {
            detail.apply(&page);
        }

        let copies = detail
            .messages()
            .iter()
            .filter(|m| m.id.as_ref().map(|id| id.as_str()) == Some("m7"))
            .count();
        prop_assert_eq!(copies, 1);
        prop_assert!(detail.messages().windows(2).all(|w| w[0].created_at <= w[1].created_at));
    }
}

// --- Presence ---

proptest! {
    #[test]
    fn presence_is_idempotent(
        connected in prop::collection::btree_set("[a-e]", 0..5),
        who in "[a-h]",
    ) {
        let mut detail = ConversationDetail::from_snapshot(
            &ConversationSnapshot {
                conversation: conversation_data("c1"),
                connected: Some(connected.iter().map(|p| p.as_str().into()).collect()),
                left_at: None,
                messages: None,
            },
            1,
        );
        let joined = ServerEvent::Joined(envelope("c1", &who, 0, None));
        let left = ServerEvent::Left(envelope("c1", &who, 0, None));

        if !connected.contains(&who) {
            let before = detail.conversation().cloned();
            prop_assert!(detail.apply(&left).is_empty());
            prop_assert_eq!(detail.conversation().cloned(), before);
        }

        detail.apply(&joined);
        let once = detail.conversation().cloned();
        prop_assert!(detail.apply(&joined).is_empty());
        prop_assert_eq!(detail.conversation().cloned(), once);
    }
}

// --- Latest message ---

proptest! {
    #[test]
    fn latest_message_is_last_writer_wins(t0 in 0u32..1000, t1 in 0u32..1000) {
        let mut watch = WatchList::from_snapshot(
            "alice".into(),
            &WatchingSnapshot {
                conversations: ConversationPage {
                    conversations: vec![record(1)],
                    total: 1,
                },
            },
            1,
        );
        let event = |id: usize, secs: u32| {
            let mut e = envelope("c1", "alice", secs, TextBody { text: format!("{id}") });
            e.id = Some(format!("m{id}").into());
            ServerEvent::Text(e)
        };

        watch.apply(&event(0, t0));
        watch.apply(&event(1, t1));

        let latest = watch.conversations()[0].latest_message.clone().unwrap();
        let expected = if t1 >= t0 { "m1" } else { "m0" };
        prop_assert_eq!(latest.id.as_ref().map(|id| id.as_str()), Some(expected));
    }
}
