//! Property-based tests for the conversation store
//!
//! Random command sequences are replayed against the store and a simple
//! counting model; the two must agree after every step.

use super::*;
use crate::delivery::RotatingReplies;
use proptest::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

const CONVERSATIONS: [(&str, &str, &str); 3] = [
    ("C1", "maria", "Maria"),
    ("C2", "jose", "Jose"),
    ("C3", "ana", "Ana"),
];

#[derive(Debug, Clone)]
enum Op {
    Send { conv: usize, content: String },
    Receive { conv: usize, content: String },
    MarkRead { conv: usize },
    Remove { conv: usize },
}

#[derive(Debug, Default, Clone)]
struct Model {
    removed: bool,
    messages: usize,
    unread: usize,
}

fn arb_op() -> impl Strategy<Value = Op> {
    let conv = 0..CONVERSATIONS.len();
    prop_oneof![
        4 => (conv.clone(), "[a-zA-Z ]{0,12}")
            .prop_map(|(conv, content)| Op::Send { conv, content }),
        4 => (conv.clone(), "[a-zA-Z ]{0,12}")
            .prop_map(|(conv, content)| Op::Receive { conv, content }),
        2 => conv.clone().prop_map(|conv| Op::MarkRead { conv }),
        1 => conv.prop_map(|conv| Op::Remove { conv }),
    ]
}

fn seeded_store() -> ConversationStore {
    let store = ConversationStore::new(
        Arc::new(RotatingReplies::default()),
        StoreOptions::default(),
    );
    for (id, participant, name) in CONVERSATIONS {
        store
            .load_conversation(ConversationSeed {
                id: id.to_string(),
                participant: Participant::new(participant, name),
                messages: Vec::new(),
            })
            .unwrap();
    }
    store
}

fn apply(store: &ConversationStore, models: &mut HashMap<&'static str, Model>, op: &Op) {
    match op {
        Op::Send { conv, content } => {
            let (id, _, _) = CONVERSATIONS[*conv];
            let model = models.entry(id).or_default();
            let result = store.send_message(id, "me", content);
            if model.removed || content.trim().is_empty() {
                assert!(matches!(result, Err(ChatError::Validation(_))));
            } else {
                assert!(result.is_ok());
                model.messages += 1;
            }
        }
        Op::Receive { conv, content } => {
            let (id, participant, _) = CONVERSATIONS[*conv];
            let model = models.entry(id).or_default();
            let result = store.receive_message(id, participant, content);
            if model.removed || content.trim().is_empty() {
                assert!(result.is_err());
            } else {
                assert!(result.is_ok());
                model.messages += 1;
                model.unread += 1;
            }
        }
        Op::MarkRead { conv } => {
            let (id, _, _) = CONVERSATIONS[*conv];
            let model = models.entry(id).or_default();
            let result = store.mark_conversation_read(id);
            if model.removed {
                assert_eq!(result, Err(ChatError::NotFound(id.to_string())));
            } else {
                assert_eq!(result, Ok(model.unread));
                model.unread = 0;
            }
        }
        Op::Remove { conv } => {
            let (id, _, _) = CONVERSATIONS[*conv];
            let model = models.entry(id).or_default();
            assert_eq!(store.remove_conversation(id), !model.removed);
            model.removed = true;
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_store_agrees_with_model(ops in proptest::collection::vec(arb_op(), 1..60)) {
        let store = seeded_store();
        let mut models: HashMap<&'static str, Model> = HashMap::new();
        let mut seen_read: HashSet<String> = HashSet::new();

        for op in &ops {
            apply(&store, &mut models, op);

            for (id, participant, _) in CONVERSATIONS {
                let model = models.get(id).cloned().unwrap_or_default();
                match store.select_conversation(id) {
                    Ok(conv) => {
                        prop_assert!(!model.removed);
                        prop_assert_eq!(conv.messages.len(), model.messages);
                        prop_assert_eq!(conv.unread_count(), model.unread);

                        let from_participant = conv
                            .messages
                            .iter()
                            .filter(|m| m.sender_id == participant)
                            .count();
                        prop_assert!(conv.unread_count() <= from_participant);

                        prop_assert!(conv
                            .messages
                            .windows(2)
                            .all(|pair| pair[0].timestamp <= pair[1].timestamp));

                        for message in &conv.messages {
                            if seen_read.contains(&message.id) {
                                prop_assert!(message.read, "read flag reverted");
                            }
                            if message.read {
                                seen_read.insert(message.id.clone());
                            }
                        }
                    }
                    Err(err) => {
                        prop_assert!(model.removed);
                        prop_assert_eq!(err, ChatError::NotFound(id.to_string()));
                    }
                }
            }
        }
    }

    #[test]
    fn prop_listing_is_stable_without_mutation(filter in "[a-zA-Z]{0,3}") {
        let store = seeded_store();
        let ids = |convs: Vec<Conversation>| convs.into_iter().map(|c| c.id).collect::<Vec<_>>();
        let first = ids(store.list_conversations(Some(&filter)));
        let second = ids(store.list_conversations(Some(&filter)));
        prop_assert_eq!(first, second);
    }
}
