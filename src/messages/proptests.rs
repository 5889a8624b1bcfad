//! Property-based tests for the message store

use super::*;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    AppendUser(String),
    AppendAssistant(String),
    RemoveLast,
    /// Optimistic append followed by a rollback
    OptimisticRollback(String),
    Load(Vec<Message>),
}

fn arb_message() -> impl Strategy<Value = Message> {
    prop_oneof![
        "[a-z ]{0,12}".prop_map(Message::user),
        "[a-z ]{0,12}".prop_map(Message::assistant),
    ]
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => "[a-z ]{0,12}".prop_map(Op::AppendUser),
        3 => "[a-z ]{0,12}".prop_map(Op::AppendAssistant),
        2 => Just(Op::RemoveLast),
        3 => "[a-z ]{0,12}".prop_map(Op::OptimisticRollback),
        1 => proptest::collection::vec(arb_message(), 0..5).prop_map(Op::Load),
    ]
}

proptest! {
    #[test]
    fn prop_removals_take_at_most_one_user_message(ops in proptest::collection::vec(arb_op(), 0..40)) {
        let mut store = MessageStore::new();
        for op in ops {
            let before: Vec<Message> = store.messages().to_vec();
            match op {
                Op::AppendUser(text) => store.append(Message::user(text)),
                Op::AppendAssistant(text) => store.append(Message::assistant(text)),
                Op::RemoveLast => {
                    let removed = store.remove_last();
                    match removed {
                        Some(msg) => {
                            prop_assert_eq!(msg.role, Role::User);
                            prop_assert_eq!(store.len() + 1, before.len());
                        }
                        None => prop_assert_eq!(store.messages(), &before[..]),
                    }
                }
                Op::OptimisticRollback(text) => {
                    let mark = store.mark();
                    store.append(Message::user(text.clone()));
                    let removed = store.rollback(mark);
                    prop_assert_eq!(removed, Some(Message::user(text)));
                    prop_assert_eq!(store.messages(), &before[..]);
                }
                Op::Load(messages) => {
                    store.load(messages.clone());
                    prop_assert_eq!(store.messages(), &messages[..]);
                }
            }
        }
    }
}
