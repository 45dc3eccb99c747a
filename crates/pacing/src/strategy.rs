use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Chooses the delay after a tick while throttling is on.
pub trait PacingStrategy: Send {
    /// `tick_elapsed` is how long the tick just finished took; `interval` is
    /// the configured throttle interval. Must return at most `interval`.
    fn delay(&self, tick_elapsed: Duration, interval: Duration) -> Duration;

    fn name(&self) -> &'static str;
}

/// Sleep the full interval after every tick regardless of tick cost.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedSleep;

impl PacingStrategy for FixedSleep {
    fn delay(&self, _tick_elapsed: Duration, interval: Duration) -> Duration {
        interval
    }

    fn name(&self) -> &'static str {
        "fixed_sleep"
    }
}

/// Sleep only what is left of the interval, so each tick takes about
/// `interval` in total.
#[derive(Debug, Clone, Copy, Default)]
pub struct TargetTickDuration;

impl PacingStrategy for TargetTickDuration {
    fn delay(&self, tick_elapsed: Duration, interval: Duration) -> Duration {
        interval.saturating_sub(tick_elapsed)
    }

    fn name(&self) -> &'static str {
        "target_tick_duration"
    }
}

/// Strategy selector used by configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PacingMode {
    #[default]
    FixedSleep,
    TargetTickDuration,
}

impl PacingMode {
    pub fn strategy(self) -> Box<dyn PacingStrategy> {
        match self {
            Self::FixedSleep => Box::new(FixedSleep),
            Self::TargetTickDuration => Box::new(TargetTickDuration),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEN: Duration = Duration::from_millis(10);

    #[test]
    fn fixed_sleep_ignores_tick_cost() {
        assert_eq!(FixedSleep.delay(Duration::from_millis(3), TEN), TEN);
        assert_eq!(FixedSleep.delay(Duration::from_millis(30), TEN), TEN);
    }

    #[test]
    fn target_duration_compensates() {
        let s = TargetTickDuration;
        assert_eq!(s.delay(Duration::from_millis(3), TEN), Duration::from_millis(7));
        assert_eq!(s.delay(Duration::from_millis(15), TEN), Duration::ZERO);
    }

    #[test]
    fn mode_builds_matching_strategy() {
        assert_eq!(PacingMode::FixedSleep.strategy().name(), "fixed_sleep");
        assert_eq!(
            PacingMode::TargetTickDuration.strategy().name(),
            "target_tick_duration"
        );
    }
}
