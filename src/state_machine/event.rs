//! Events that drive the send protocol

use super::SendId;

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // User events
    /// `send_id` is freshly allocated by the session for this attempt
    Submit {
        text: String,
        send_id: SendId,
    },

    // Backend events
    ChatSucceeded {
        send_id: SendId,
        response: String,
    },
    ChatFailed {
        send_id: SendId,
        error: String,
    },

    // Reveal events
    RevealCompleted {
        send_id: SendId,
        text: String,
    },
    /// The reveal handle was cancelled from outside the session
    RevealCancelled,

    // Lifecycle events
    /// The active conversation is being switched away from or deleted
    ConversationLeft,
}
