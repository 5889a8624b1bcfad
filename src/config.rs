//! Client configuration from the environment

use crate::reveal::DEFAULT_TICK;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "http://localhost:8000";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Service root, without the `/api` prefix
    pub api_base: String,
    /// Delay between revealed characters
    pub reveal_tick: Duration,
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            reveal_tick: DEFAULT_TICK,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unset or unparseable values fall back to the defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let api_base = lookup("CHATLINE_API_BASE")
            .map(|base| base.trim().trim_end_matches('/').to_string())
            .filter(|base| !base.is_empty())
            .unwrap_or(defaults.api_base);

        let reveal_tick = lookup("CHATLINE_REVEAL_TICK_MS")
            .and_then(|ms| ms.trim().parse().ok())
            .filter(|ms: &u64| *ms > 0)
            .map_or(defaults.reveal_tick, Duration::from_millis);

        let request_timeout = lookup("CHATLINE_REQUEST_TIMEOUT_SECS")
            .and_then(|secs| secs.trim().parse().ok())
            .filter(|secs: &u64| *secs > 0)
            .map_or(defaults.request_timeout, Duration::from_secs);

        Self {
            api_base,
            reveal_tick,
            request_timeout,
        }
    }
}
