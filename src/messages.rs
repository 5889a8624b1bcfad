//! Message sequence for the active conversation
//!
//! Append and remove-last only. No index-based mutation, so what is confirmed
//! and what is optimistic can always be read off the tail.

#[cfg(test)]
mod proptests;

use serde::{Deserialize, Serialize};

/// Who authored a message. Fixed at creation, never inferred from content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn label(self) -> &'static str {
        match self {
            Role::User => "you",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Length of the sequence just before an optimistic append
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptimisticMark {
    len: usize,
}

impl OptimisticMark {
    #[allow(dead_code)]
    pub fn position(self) -> usize {
        self.len
    }
}

#[derive(Debug, Default)]
pub struct MessageStore {
    messages: Vec<Message>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Replace the whole sequence. Never merges with what was held before.
    pub fn load(&mut self, messages: Vec<Message>) {
        self.messages = messages;
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn mark(&self) -> OptimisticMark {
        OptimisticMark {
            len: self.messages.len(),
        }
    }

    /// Remove the trailing optimistic user message.
    ///
    /// Refuses (returns `None`) when the tail is an assistant message or the
    /// sequence is empty.
    pub fn remove_last(&mut self) -> Option<Message> {
        match self.messages.last() {
            Some(last) if last.role == Role::User => self.messages.pop(),
            Some(_) => {
                tracing::warn!("Refusing to remove a committed assistant message");
                None
            }
            None => None,
        }
    }

    /// Undo exactly the one append made after `mark`.
    ///
    /// Anything other than a single user entry above the mark means the
    /// sequence was replaced in the meantime, so nothing is removed.
    pub fn rollback(&mut self, mark: OptimisticMark) -> Option<Message> {
        if self.messages.len() != mark.len + 1 {
            tracing::warn!(
                expected = mark.len + 1,
                actual = self.messages.len(),
                "Rollback mark does not match, leaving messages untouched"
            );
            return None;
        }
        self.remove_last()
    }
}
