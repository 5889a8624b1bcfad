//! Sidebar refresh signal
//!
//! A monotonic version token. Every conversation create/delete bumps it once;
//! the conversation cache re-lists whenever the token it last saw is stale.

/// Snapshot of the refresh counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RefreshToken(u64);

impl RefreshToken {
    #[allow(dead_code)] // Used by tests and diagnostics
    pub fn version(self) -> u64 {
        self.0
    }
}

/// Lifecycle event that invalidated the conversation list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshReason {
    Created,
    Deleted,
}

impl RefreshReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Deleted => "deleted",
        }
    }
}

#[derive(Debug, Default)]
pub struct RefreshSignal {
    version: u64,
}

impl RefreshSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> RefreshToken {
        RefreshToken(self.version)
    }

    /// Increment exactly once. Rapid bumps are not coalesced.
    pub fn bump(&mut self, reason: RefreshReason) -> RefreshToken {
        self.version += 1;
        tracing::debug!(
            version = self.version,
            reason = reason.as_str(),
            "Conversation list invalidated"
        );
        self.current()
    }
}
