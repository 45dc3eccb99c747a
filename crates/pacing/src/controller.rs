use std::time::Duration;

use crate::config::ThrottleConfig;
use crate::sleeper::{Sleeper, ThreadSleeper};
use crate::strategy::{FixedSleep, PacingStrategy};

/// Applies the rate lock after each tick.
pub struct ThrottleController {
    config: ThrottleConfig,
    strategy: Box<dyn PacingStrategy>,
    sleeper: Box<dyn Sleeper>,
    reported_bad_interval: Option<i64>,
}

impl ThrottleController {
    /// Fixed-sleep pacing on the real thread sleeper.
    pub fn new(config: ThrottleConfig) -> Self {
        Self {
            config,
            strategy: Box::new(FixedSleep),
            sleeper: Box::new(ThreadSleeper),
            reported_bad_interval: None,
        }
    }

    pub fn with_strategy(mut self, strategy: Box<dyn PacingStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Box<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn config(&self) -> &ThrottleConfig {
        &self.config
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// The rate lock is on and its interval is usable.
    pub fn should_throttle(&self) -> bool {
        self.config.enabled() && self.config.effective_interval().is_some()
    }

    /// Idle after a tick that took `tick_elapsed`. Returns the time slept,
    /// zero when throttling is off.
    pub fn throttle(&mut self, tick_elapsed: Duration) -> Duration {
        if !self.config.enabled() {
            return Duration::ZERO;
        }
        let Some(interval) = self.config.effective_interval() else {
            let bad = self.config.interval_ms();
            if self.reported_bad_interval != Some(bad) {
                tracing::warn!(
                    interval_ms = bad,
                    "throttle interval must be positive; running unthrottled"
                );
                self.reported_bad_interval = Some(bad);
            }
            return Duration::ZERO;
        };
        self.reported_bad_interval = None;

        let delay = self.strategy.delay(tick_elapsed, interval).min(interval);
        if !delay.is_zero() {
            self.sleeper.sleep(delay);
        }
        delay
    }
}
