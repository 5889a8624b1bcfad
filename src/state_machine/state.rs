//! Send protocol state types

use crate::conversations::ConversationId;
use crate::messages::OptimisticMark;

/// Identity of one send, unique within a session.
///
/// Replies are matched on this rather than on the conversation, so a reply
/// from an abandoned send never resolves a later send in the same conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SendId(pub u64);

impl std::fmt::Display for SendId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where the session is in the send/receive protocol
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SendState {
    /// Ready for input, nothing in flight
    #[default]
    Idle,

    /// Optimistic user message appended, chat request in flight
    Sending {
        conversation_id: ConversationId,
        send_id: SendId,
        /// Sequence length before the optimistic append, for rollback
        mark: OptimisticMark,
    },

    /// Reply received, typewriter reveal running as an overlay
    Revealing {
        conversation_id: ConversationId,
        send_id: SendId,
    },
}

impl SendState {
    /// True from the optimistic append until commit or rollback
    pub fn is_pending(&self) -> bool {
        !matches!(self, SendState::Idle)
    }

    pub fn conversation_id(&self) -> Option<ConversationId> {
        match self {
            SendState::Idle => None,
            SendState::Sending {
                conversation_id, ..
            }
            | SendState::Revealing {
                conversation_id, ..
            } => Some(*conversation_id),
        }
    }

    pub fn send_id(&self) -> Option<SendId> {
        match self {
            SendState::Idle => None,
            SendState::Sending { send_id, .. } | SendState::Revealing { send_id, .. } => {
                Some(*send_id)
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SendState::Idle => "idle",
            SendState::Sending { .. } => "sending",
            SendState::Revealing { .. } => "revealing",
        }
    }
}

/// Read-only facts about the session a transition may consult
#[derive(Debug, Clone, Copy)]
pub struct SendContext {
    pub active_conversation_id: Option<ConversationId>,
    /// Mark taken from the message store right before the event is applied
    pub mark: OptimisticMark,
}
