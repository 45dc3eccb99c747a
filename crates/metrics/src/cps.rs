use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Length of one CPS measurement window.
pub const CPS_WINDOW: Duration = Duration::from_millis(1000);

/// Read side of the published ticks-per-second value.
#[derive(Debug, Clone, Default)]
pub struct CpsHandle(Arc<AtomicU64>);

impl CpsHandle {
    /// Ticks counted in the last completed window.
    pub fn current_cps(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    fn publish(&self, cps: u64) {
        self.0.store(cps, Ordering::Relaxed);
    }
}

/// Resetting 1-second tick counter.
///
/// When a window closes its count is published as-is and the counter starts
/// again from zero. No smoothing or decay. The next window is measured from
/// the moment the roll was observed, not from the previous deadline.
#[derive(Debug)]
pub struct TickMetrics {
    window_deadline: Duration,
    ticks_this_window: u64,
    published: CpsHandle,
}

impl TickMetrics {
    /// Start the first window at `now`.
    pub fn new(now: Duration) -> Self {
        Self {
            window_deadline: now + CPS_WINDOW,
            ticks_this_window: 0,
            published: CpsHandle::default(),
        }
    }

    /// Begin a fresh window at `now`, discarding the open one. The published
    /// value and any handles are kept.
    pub fn restart(&mut self, now: Duration) {
        self.window_deadline = now + CPS_WINDOW;
        self.ticks_this_window = 0;
    }

    pub fn record_tick(&mut self) {
        self.ticks_this_window += 1;
    }

    /// Close the window if `now` reached its deadline. Returns the published
    /// CPS when a roll happened.
    pub fn maybe_roll_window(&mut self, now: Duration) -> Option<u64> {
        if now < self.window_deadline {
            return None;
        }
        let cps = self.ticks_this_window;
        self.published.publish(cps);
        self.ticks_this_window = 0;
        self.window_deadline = now + CPS_WINDOW;
        tracing::debug!(cps, "cps window closed");
        Some(cps)
    }

    pub fn current_cps(&self) -> u64 {
        self.published.current_cps()
    }

    pub fn ticks_this_window(&self) -> u64 {
        self.ticks_this_window
    }

    pub fn window_deadline(&self) -> Duration {
        self.window_deadline
    }

    /// A reader that monitoring threads can hold on to.
    pub fn handle(&self) -> CpsHandle {
        self.published.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn nothing_published_before_first_window() {
        let mut m = TickMetrics::new(ms(0));
        for _ in 0..10 {
            m.record_tick();
        }
        assert_eq!(m.maybe_roll_window(ms(999)), None);
        assert_eq!(m.current_cps(), 0);
        assert_eq!(m.ticks_this_window(), 10);
    }

    #[test]
    fn window_publishes_exact_tick_count() {
        let mut m = TickMetrics::new(ms(0));
        for _ in 0..137 {
            m.record_tick();
        }
        assert_eq!(m.maybe_roll_window(ms(1000)), Some(137));
        assert_eq!(m.current_cps(), 137);
        assert_eq!(m.ticks_this_window(), 0);

        m.record_tick();
        assert_eq!(m.ticks_this_window(), 1);
        assert_eq!(m.current_cps(), 137);
    }

    #[test]
    fn next_window_starts_at_observed_roll_time() {
        let mut m = TickMetrics::new(ms(0));
        m.record_tick();
        // roll observed late
        assert_eq!(m.maybe_roll_window(ms(1400)), Some(1));
        assert_eq!(m.window_deadline(), ms(2400));
        assert_eq!(m.maybe_roll_window(ms(2000)), None);
        assert_eq!(m.maybe_roll_window(ms(2400)), Some(0));
    }

    #[test]
    fn empty_window_publishes_zero() {
        let mut m = TickMetrics::new(ms(0));
        for _ in 0..5 {
            m.record_tick();
        }
        m.maybe_roll_window(ms(1000));
        assert_eq!(m.maybe_roll_window(ms(2000)), Some(0));
        assert_eq!(m.current_cps(), 0);
    }

    #[test]
    fn handle_observes_published_value() {
        let mut m = TickMetrics::new(ms(500));
        let handle = m.handle();
        m.record_tick();
        m.record_tick();
        m.maybe_roll_window(ms(1500));
        assert_eq!(handle.current_cps(), 2);
    }

    #[test]
    fn restart_moves_the_open_window() {
        let mut m = TickMetrics::new(ms(0));
        let handle = m.handle();
        m.record_tick();
        m.restart(ms(5000));
        assert_eq!(m.ticks_this_window(), 0);
        assert_eq!(m.maybe_roll_window(ms(5999)), None);
        m.record_tick();
        assert_eq!(m.maybe_roll_window(ms(6000)), Some(1));
        assert_eq!(handle.current_cps(), 1);
    }
}
