//! Sync controller configuration.

use std::time::Duration;

/// Fixed delay between a failed sync session and the next attempt.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(10);

/// Configuration for a [`SyncController`](crate::SyncController).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Wait after a session ends without cancellation. Retries are unbounded.
    pub retry_interval: Duration,
    /// Capacity of the rescan progress channel.
    pub rescan_channel_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            retry_interval: DEFAULT_RETRY_INTERVAL,
            rescan_channel_capacity: 16,
        }
    }
}

impl SyncConfig {
    /// Same as the default but with a custom retry interval.
    pub fn with_retry_interval(retry_interval: Duration) -> Self {
        Self { retry_interval, ..Self::default() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_retry_is_ten_seconds() {
        assert_eq!(SyncConfig::default().retry_interval, Duration::from_secs(10));
    }

    #[test]
    fn custom_retry_keeps_other_defaults() {
        let cfg = SyncConfig::with_retry_interval(Duration::from_millis(20));
        assert_eq!(cfg.retry_interval, Duration::from_millis(20));
        assert_eq!(cfg.rescan_channel_capacity, SyncConfig::default().rescan_channel_capacity);
    }
}
