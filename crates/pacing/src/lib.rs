//! Throttle Controller: decides whether and how long the tick loop idles.
//!
//! Disabled means busy-spin: the next tick starts as soon as the previous one
//! ends. Enabled means a pacing strategy picks a bounded sleep after each tick.
//!
//! # Invariants
//! - The added delay never exceeds the configured interval, nor
//!   `MAX_INTERVAL_MS`.
//! - An invalid interval disables throttling instead of failing the loop.

mod config;
mod controller;
mod sleeper;
mod strategy;

pub use config::{DEFAULT_INTERVAL_MS, MAX_INTERVAL_MS, ThrottleConfig};
pub use controller::ThrottleController;
pub use sleeper::{RecordingSleeper, Sleeper, ThreadSleeper};
pub use strategy::{FixedSleep, PacingMode, PacingStrategy, TargetTickDuration};
