use std::time::Duration;

/// Bounded reconnection policy. Once `attempts` consecutive reconnects fail
/// the feed stops retrying for good.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub attempts: u32,

    /// Upper bound on a single connect attempt.
    pub timeout: Duration,

    /// Pause before each reconnect attempt.
    pub delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { attempts: 5, timeout: Duration::from_secs(15), delay: Duration::from_secs(1) }
    }
}
