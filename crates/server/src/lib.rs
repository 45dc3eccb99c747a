//! Tick Scheduler: the main loop of the authoritative server.
//!
//! One tick is: poll the network collaborator, run the world update
//! pipeline, record the tick in the CPS window, then let the throttle decide
//! whether to idle. The loop runs until a shutdown is requested.
//!
//! # Invariants
//! - Tick N fully completes before tick N+1 starts.
//! - The shutdown flag is checked once per iteration, before a tick begins.
//! - A network failure stops the loop; world state is never ticked while
//!   the network layer is gone.

pub mod config;
pub mod error;
pub mod network;
pub mod scheduler;
mod shutdown;

pub use config::{ServerConfig, ThrottleSettings};
pub use error::{ConfigError, NetworkError, SchedulerError};
pub use network::{NetworkPoller, NetworkSender, QueuedNetwork, SessionCommand};
pub use scheduler::{LoopState, RunSummary, SchedulerMonitor, TickReport, TickScheduler};
pub use shutdown::ShutdownHandle;
