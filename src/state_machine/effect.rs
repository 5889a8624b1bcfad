//! Effects produced by state transitions

use crate::backend::ChatRequest;
use crate::conversations::ConversationId;
use crate::messages::{Message, OptimisticMark};

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Append to the active conversation's message sequence
    AppendMessage(Message),

    /// Clear the input buffer
    ClearInput,

    /// Issue the chat request (the one suspension point of a send)
    RequestChat(ChatRequest),

    /// Hand the reply to the reveal scheduler
    StartReveal { text: String },

    /// Tear down the running reveal, discarding partial output
    CancelReveal,

    /// Remove the optimistic user message appended after `mark`
    Rollback { mark: OptimisticMark },

    /// Surface an error notice
    NotifyError { message: String },
}

impl Effect {
    pub fn append_user(text: impl Into<String>) -> Self {
        Effect::AppendMessage(Message::user(text))
    }

    pub fn append_assistant(text: impl Into<String>) -> Self {
        Effect::AppendMessage(Message::assistant(text))
    }

    pub fn request_chat(conversation_id: ConversationId, message: impl Into<String>) -> Self {
        Effect::RequestChat(ChatRequest {
            conversation_id,
            message: message.into(),
        })
    }
}
