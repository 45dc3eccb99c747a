//! Operator tooling: loop inspection and the admin console.
//!
//! # Invariants
//! - Tools only read loop state or flip the runtime knobs the scheduler
//!   exposes; they never call into map or entity updates.

pub mod console;
pub mod inspector;

pub use console::{ConsoleCommand, ConsoleError, apply_console_command, parse_console_command};
pub use inspector::{LoopInspector, LoopSummary};
