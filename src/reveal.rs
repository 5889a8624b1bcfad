//! Typewriter reveal of assistant replies
//!
//! A finished reply is exposed as a growing prefix, one character per tick.
//! The task is driven from outside (a tokio interval in the client, manual
//! stepping in tests) and never touches the message store itself: completion
//! hands the full text back to the caller exactly once.

#[cfg(test)]
mod proptests;

use std::time::Duration;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub const DEFAULT_TICK: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RevealId(u64);

/// Cancellation handle for a running reveal
#[derive(Debug, Clone)]
pub struct RevealHandle {
    id: RevealId,
    cancel: CancellationToken,
}

impl RevealHandle {
    #[allow(dead_code)] // API completeness
    pub fn id(&self) -> RevealId {
        self.id
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Result of one tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevealStep {
    /// One more character is visible
    Frame,
    /// The whole text is visible. Yielded exactly once.
    Complete(String),
    /// Cancelled before completion; partial output is discarded
    Cancelled,
    /// Already completed on an earlier tick
    Finished,
}

#[derive(Debug)]
pub struct RevealTask {
    handle: RevealHandle,
    text: String,
    /// Byte offset of the visible prefix, always on a char boundary
    shown: usize,
    completed: bool,
}

impl RevealTask {
    pub fn handle(&self) -> &RevealHandle {
        &self.handle
    }

    #[allow(dead_code)] // API completeness
    pub fn id(&self) -> RevealId {
        self.handle.id
    }

    #[allow(dead_code)] // API completeness
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn visible(&self) -> &str {
        self.text.get(..self.shown).unwrap_or_default()
    }

    #[allow(dead_code)]
    pub fn is_cancelled(&self) -> bool {
        self.handle.is_cancelled()
    }

    #[allow(dead_code)]
    pub fn cancel(&self) {
        self.handle.cancel();
    }

    pub fn advance(&mut self) -> RevealStep {
        if self.completed {
            return RevealStep::Finished;
        }
        if self.handle.is_cancelled() {
            return RevealStep::Cancelled;
        }

        if let Some(next) = self.text.get(self.shown..).and_then(|rest| rest.chars().next()) {
            self.shown += next.len_utf8();
        }

        if self.shown >= self.text.len() {
            self.completed = true;
            RevealStep::Complete(self.text.clone())
        } else {
            RevealStep::Frame
        }
    }
}

/// Hands out reveal tasks and the tick cadence that drives them
#[derive(Debug)]
pub struct RevealScheduler {
    tick: Duration,
    next_id: u64,
}

impl Default for RevealScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_TICK)
    }
}

impl RevealScheduler {
    pub fn new(tick: Duration) -> Self {
        Self { tick, next_id: 1 }
    }

    #[allow(dead_code)]
    pub fn tick(&self) -> Duration {
        self.tick
    }

    pub fn start(&mut self, text: impl Into<String>) -> RevealTask {
        let id = RevealId(self.next_id);
        self.next_id += 1;
        let text = text.into();
        tracing::debug!(reveal_id = id.0, chars = text.chars().count(), "Reveal started");
        RevealTask {
            handle: RevealHandle {
                id,
                cancel: CancellationToken::new(),
            },
            text,
            shown: 0,
            completed: false,
        }
    }

    pub fn cancel(handle: &RevealHandle) {
        tracing::debug!(reveal_id = handle.id.0, "Reveal cancelled");
        handle.cancel();
    }

    /// Tick source for live use. Late ticks are delayed rather than bunched,
    /// so a stalled loop never dumps several characters at once.
    pub fn interval(&self) -> Interval {
        let mut ticks = interval(self.tick);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticks
    }
}
