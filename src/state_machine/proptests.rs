//! Property-based tests for the state machine
//!
//! These drive random event sequences through `transition` while applying the
//! effects to a real message store, and check the protocol invariants after
//! every step.

use super::*;
use crate::messages::{MessageStore, Role};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Step {
    Submit(String),
    Succeed(String),
    Fail,
    CompleteReveal,
    Leave,
    /// A reply from a send that is no longer in flight
    StrayReply,
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        4 => "[a-z ]{0,10}".prop_map(Step::Submit),
        2 => "[a-z]{0,10}".prop_map(Step::Succeed),
        2 => Just(Step::Fail),
        2 => Just(Step::CompleteReveal),
        1 => Just(Step::Leave),
        1 => Just(Step::StrayReply),
    ]
}

/// Minimal effect executor standing in for the session
struct Harness {
    state: SendState,
    messages: MessageStore,
    revealing: Option<String>,
    active: i64,
    next_send: u64,
}

impl Harness {
    fn new() -> Self {
        Self {
            state: SendState::Idle,
            messages: MessageStore::new(),
            revealing: None,
            active: 1,
            next_send: 1,
        }
    }

    fn context(&self) -> SendContext {
        SendContext {
            active_conversation_id: Some(self.active),
            mark: self.messages.mark(),
        }
    }

    fn apply(&mut self, event: Event) -> Result<Vec<Effect>, TransitionError> {
        let result = transition(&self.state, &self.context(), event)?;
        self.state = result.new_state;
        for effect in &result.effects {
            match effect {
                Effect::AppendMessage(msg) => self.messages.append(msg.clone()),
                Effect::StartReveal { text } => self.revealing = Some(text.clone()),
                Effect::CancelReveal => self.revealing = None,
                Effect::Rollback { mark } => {
                    self.messages.rollback(*mark);
                }
                Effect::ClearInput | Effect::RequestChat(_) | Effect::NotifyError { .. } => {}
            }
        }
        Ok(result.effects)
    }

    /// Id of the send in flight, or of the last one issued
    fn in_flight(&self) -> SendId {
        self.state
            .send_id()
            .unwrap_or(SendId(self.next_send.saturating_sub(1)))
    }
}

proptest! {
    #[test]
    fn prop_protocol_invariants(steps in proptest::collection::vec(arb_step(), 0..60)) {
        let mut h = Harness::new();

        for step in steps {
            let len_before = h.messages.len();
            let state_before = h.state.clone();
            let send_id = h.in_flight();

            let outcome = match step {
                Step::Submit(text) => {
                    let send_id = SendId(h.next_send);
                    h.next_send += 1;
                    h.apply(Event::Submit { text, send_id })
                }
                Step::Succeed(response) => h.apply(Event::ChatSucceeded { send_id, response }),
                Step::Fail => h.apply(Event::ChatFailed {
                    send_id,
                    error: "HTTP error! status: 500".to_string(),
                }),
                Step::CompleteReveal => {
                    let text = h.revealing.clone().unwrap_or_default();
                    h.apply(Event::RevealCompleted { send_id, text })
                }
                Step::Leave => {
                    let result = h.apply(Event::ConversationLeft);
                    // Switching replaces the view wholesale
                    h.messages.clear();
                    h.active += 1;
                    result
                }
                Step::StrayReply => h.apply(Event::ChatSucceeded {
                    // An earlier send, possibly abandoned in this same conversation
                    send_id: SendId(send_id.0.saturating_sub(1)),
                    response: "stray".to_string(),
                }),
            };

            match outcome {
                Err(_) => {
                    // Rejected events change nothing
                    prop_assert_eq!(&h.state, &state_before);
                    prop_assert_eq!(h.messages.len(), len_before);
                }
                Ok(effects) => {
                    let requests = effects.iter().filter(|e| matches!(e, Effect::RequestChat(_))).count();
                    prop_assert!(requests <= 1);
                    if requests == 1 {
                        // Only an idle session may issue a request
                        prop_assert_eq!(&state_before, &SendState::Idle);
                        prop_assert_eq!(h.messages.len(), len_before + 1);
                        prop_assert_eq!(h.messages.messages().last().map(|m| m.role), Some(Role::User));
                    }
                    if effects.iter().any(|e| matches!(e, Effect::Rollback { .. })) {
                        prop_assert_eq!(h.messages.len() + 1, len_before);
                    }
                }
            }

            match h.state {
                SendState::Idle => h.revealing = None,
                SendState::Sending { .. } => {
                    // The optimistic entry is the tail until resolution
                    prop_assert_eq!(h.messages.messages().last().map(|m| m.role), Some(Role::User));
                    prop_assert!(h.revealing.is_none());
                }
                SendState::Revealing { .. } => prop_assert!(h.revealing.is_some()),
            }
        }
    }

    #[test]
    fn prop_busy_states_reject_every_submit(text in "\\PC{0,20}", revealing in any::<bool>()) {
        let state = if revealing {
            SendState::Revealing { conversation_id: 3, send_id: SendId(1) }
        } else {
            SendState::Sending {
                conversation_id: 3,
                send_id: SendId(1),
                mark: MessageStore::new().mark(),
            }
        };
        let context = SendContext {
            active_conversation_id: Some(3),
            mark: MessageStore::new().mark(),
        };
        let result = transition(&state, &context, Event::Submit { text, send_id: SendId(2) });
        prop_assert_eq!(result.err(), Some(TransitionError::Busy));
    }
}
