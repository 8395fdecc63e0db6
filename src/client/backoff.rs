use crate::config::ReconnectConfig;
use std::time::Duration;

/// Bounded exponential backoff for reconnect attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub base_interval: Duration,
    pub max_attempts: u32,
}

impl ReconnectPolicy {
    pub fn new(base_interval: Duration, max_attempts: u32) -> Self {
        Self {
            base_interval,
            max_attempts,
        }
    }

    /// Delay before reconnect attempt `attempt` (0-based), or `None` once
    /// `max_attempts` automatic attempts have been scheduled.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        Some(self.base_interval.saturating_mul(factor))
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from(&ReconnectConfig::default())
    }
}

impl From<&ReconnectConfig> for ReconnectPolicy {
    fn from(config: &ReconnectConfig) -> Self {
        Self::new(Duration::from_millis(config.interval_ms), config.max_attempts)
    }
}
