//! Clock/Metrics: monotonic time sources and loop throughput measurement.
//!
//! # Invariants
//! - CPS is a step function: published once per 1-second window, then reset.
//! - Only the scheduler thread records ticks; readers go through `CpsHandle`.

mod clock;
mod cps;
pub mod interp;
mod timer;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use cps::{CPS_WINDOW, CpsHandle, TickMetrics};
pub use interp::ScatterAnimation;
pub use timer::TickTimer;
