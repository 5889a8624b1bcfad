//! Pure state transition function
//!
//! Given the same state, context and event, always produces the same outputs,
//! with no I/O side effects.

use super::{Effect, Event, SendContext, SendState};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: SendState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: SendState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Rejected events. The session treats all of these as silent no-ops.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("A message is already in flight")]
    Busy,
    #[error("Message is empty")]
    EmptyInput,
    #[error("No active conversation")]
    NoActiveConversation,
    #[error("Event belongs to an abandoned send")]
    Stale,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

pub fn transition(
    state: &SendState,
    context: &SendContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // Submitting
        // ============================================================

        // Idle + Submit -> Sending (optimistic append)
        (SendState::Idle, Event::Submit { text, send_id }) => {
            let text = text.trim();
            if text.is_empty() {
                return Err(TransitionError::EmptyInput);
            }
            let conversation_id = context
                .active_conversation_id
                .ok_or(TransitionError::NoActiveConversation)?;

            Ok(TransitionResult::new(SendState::Sending {
                conversation_id,
                send_id,
                mark: context.mark,
            })
            .with_effect(Effect::append_user(text))
            .with_effect(Effect::ClearInput)
            .with_effect(Effect::request_chat(conversation_id, text)))
        }

        // Anything in flight + Submit -> reject, at most one request per session
        (SendState::Sending { .. } | SendState::Revealing { .. }, Event::Submit { .. }) => {
            Err(TransitionError::Busy)
        }

        // ============================================================
        // Backend resolution
        // ============================================================

        // Sending + empty ChatSucceeded -> Idle, nothing to reveal
        (
            SendState::Sending { send_id, .. },
            Event::ChatSucceeded {
                send_id: replied_for,
                response,
            },
        ) if *send_id == replied_for && response.is_empty() => {
            Ok(TransitionResult::new(SendState::Idle).with_effect(Effect::append_assistant(response)))
        }

        // Sending + ChatSucceeded -> Revealing
        (
            SendState::Sending {
                conversation_id,
                send_id,
                ..
            },
            Event::ChatSucceeded {
                send_id: replied_for,
                response,
            },
        ) if *send_id == replied_for => Ok(TransitionResult::new(SendState::Revealing {
            conversation_id: *conversation_id,
            send_id: *send_id,
        })
        .with_effect(Effect::StartReveal { text: response })),

        // Sending + ChatFailed -> Idle, via rollback
        (
            SendState::Sending { send_id, mark, .. },
            Event::ChatFailed {
                send_id: failed_for,
                error,
            },
        ) if *send_id == failed_for => Ok(TransitionResult::new(SendState::Idle)
            .with_effect(Effect::Rollback { mark: *mark })
            .with_effect(Effect::NotifyError { message: error })),

        // A reply for a send that was abandoned by a conversation switch
        (_, Event::ChatSucceeded { .. } | Event::ChatFailed { .. }) => Err(TransitionError::Stale),

        // ============================================================
        // Reveal
        // ============================================================

        // Revealing + RevealCompleted -> Idle, committing the reply
        (
            SendState::Revealing { send_id, .. },
            Event::RevealCompleted {
                send_id: revealed_for,
                text,
            },
        ) if *send_id == revealed_for => {
            Ok(TransitionResult::new(SendState::Idle).with_effect(Effect::append_assistant(text)))
        }

        (_, Event::RevealCompleted { .. }) => Err(TransitionError::Stale),

        // Handle cancelled elsewhere: the reply is lost, nothing to undo
        (SendState::Revealing { .. }, Event::RevealCancelled) => {
            Ok(TransitionResult::new(SendState::Idle))
        }

        (state, Event::RevealCancelled) => Err(TransitionError::InvalidTransition(format!(
            "reveal cancelled while {}",
            state.name()
        ))),

        // ============================================================
        // Leaving the active conversation
        // ============================================================

        // The optimistic message goes with the old view; the reply, when it
        // lands, is discarded as stale.
        (SendState::Sending { .. }, Event::ConversationLeft) => {
            Ok(TransitionResult::new(SendState::Idle))
        }

        (SendState::Revealing { .. }, Event::ConversationLeft) => {
            Ok(TransitionResult::new(SendState::Idle).with_effect(Effect::CancelReveal))
        }

        (SendState::Idle, Event::ConversationLeft) => Ok(TransitionResult::new(SendState::Idle)),
    }
}
