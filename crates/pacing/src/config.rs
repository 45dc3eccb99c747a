use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;

/// Sleep interval of the reference rate lock.
pub const DEFAULT_INTERVAL_MS: i64 = 10;

/// Longest delay the rate lock may add after a tick. Bounds how long a
/// shutdown request can wait behind a throttle sleep.
pub const MAX_INTERVAL_MS: i64 = 1000;

#[derive(Debug)]
struct ThrottleState {
    enabled: AtomicBool,
    interval_ms: AtomicI64,
}

/// Process-wide rate lock, settable from any thread at runtime.
///
/// Clones share the same state. The scheduler reads it once per tick.
#[derive(Debug, Clone)]
pub struct ThrottleConfig {
    state: Arc<ThrottleState>,
}

impl ThrottleConfig {
    pub fn new(enabled: bool, interval_ms: i64) -> Self {
        Self {
            state: Arc::new(ThrottleState {
                enabled: AtomicBool::new(enabled),
                interval_ms: AtomicI64::new(interval_ms),
            }),
        }
    }

    pub fn enabled(&self) -> bool {
        self.state.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.state.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Flip the rate lock. Returns the new value.
    pub fn toggle(&self) -> bool {
        !self.state.enabled.fetch_xor(true, Ordering::Relaxed)
    }

    /// Raw configured interval; may be invalid.
    pub fn interval_ms(&self) -> i64 {
        self.state.interval_ms.load(Ordering::Relaxed)
    }

    pub fn set_interval_ms(&self, interval_ms: i64) {
        self.state.interval_ms.store(interval_ms, Ordering::Relaxed);
    }

    /// The interval as a duration, capped at `MAX_INTERVAL_MS`, or `None`
    /// when it is not positive.
    pub fn effective_interval(&self) -> Option<Duration> {
        match self.interval_ms() {
            ms if ms > 0 => Some(Duration::from_millis(ms.min(MAX_INTERVAL_MS) as u64)),
            _ => None,
        }
    }
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self::new(false, DEFAULT_INTERVAL_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_unlocked_ten_ms() {
        let config = ThrottleConfig::default();
        assert!(!config.enabled());
        assert_eq!(config.effective_interval(), Some(Duration::from_millis(10)));
    }

    #[test]
    fn clones_share_state() {
        let config = ThrottleConfig::default();
        let admin = config.clone();
        admin.set_enabled(true);
        admin.set_interval_ms(25);
        assert!(config.enabled());
        assert_eq!(config.interval_ms(), 25);
    }

    #[test]
    fn toggle_returns_new_value() {
        let config = ThrottleConfig::default();
        assert!(config.toggle());
        assert!(config.enabled());
        assert!(!config.toggle());
    }

    #[test]
    fn non_positive_interval_has_no_effect() {
        let config = ThrottleConfig::new(true, -5);
        assert_eq!(config.effective_interval(), None);
        config.set_interval_ms(0);
        assert_eq!(config.effective_interval(), None);
    }

    #[test]
    fn oversized_interval_is_capped() {
        let config = ThrottleConfig::new(true, 600_000);
        assert_eq!(config.interval_ms(), 600_000);
        assert_eq!(
            config.effective_interval(),
            Some(Duration::from_millis(MAX_INTERVAL_MS as u64))
        );
    }
}
