//! Operator console commands for a running server.
//!
//! ```text
//! cps                 print ticks per second of the last window
//! cpslock [on|off]    set the rate lock; no argument toggles it
//! interval <ms>       set the throttle interval
//! status              one-line loop summary
//! shutdown | exit     stop the tick loop
//! ```

use shardloop_kernel::{MapRegistry, SessionRegistry};
use shardloop_pacing::MAX_INTERVAL_MS;
use shardloop_server::SchedulerMonitor;

use crate::inspector::LoopInspector;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Cps,
    CpsLock(Option<bool>),
    Interval(i64),
    Status,
    Shutdown,
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConsoleError {
    #[error("{command}: missing argument")]
    MissingArgument { command: &'static str },
    #[error("{command}: invalid argument '{value}'")]
    InvalidArgument { command: &'static str, value: String },
}

/// Parse one console line. Blank lines yield `None`.
pub fn parse_console_command(line: &str) -> Result<Option<ConsoleCommand>, ConsoleError> {
    let mut parts = line.split_whitespace();
    let Some(name) = parts.next() else {
        return Ok(None);
    };
    let parsed = match name.to_ascii_lowercase().as_str() {
        "cps" => ConsoleCommand::Cps,
        "cpslock" => ConsoleCommand::CpsLock(match parts.next() {
            None => None,
            Some(v) => Some(parse_switch("cpslock", v)?),
        }),
        "interval" => {
            let value = parts
                .next()
                .ok_or(ConsoleError::MissingArgument { command: "interval" })?;
            let ms = value.parse::<i64>().map_err(|_| ConsoleError::InvalidArgument {
                command: "interval",
                value: value.to_string(),
            })?;
            ConsoleCommand::Interval(ms)
        }
        "status" => ConsoleCommand::Status,
        "shutdown" | "exit" => ConsoleCommand::Shutdown,
        other => ConsoleCommand::Unknown(other.to_string()),
    };
    Ok(Some(parsed))
}

fn parse_switch(command: &'static str, value: &str) -> Result<bool, ConsoleError> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        _ => Err(ConsoleError::InvalidArgument {
            command,
            value: value.to_string(),
        }),
    }
}

/// Execute a command against the live loop. Returns the line to print.
pub fn apply_console_command(
    command: &ConsoleCommand,
    monitor: &SchedulerMonitor,
    maps: &MapRegistry,
    sessions: &SessionRegistry,
) -> String {
    match command {
        ConsoleCommand::Cps => format!("cps: {}", monitor.current_cps()),
        ConsoleCommand::CpsLock(setting) => {
            let throttle = monitor.throttle();
            let enabled = match setting {
                Some(on) => {
                    throttle.set_enabled(*on);
                    *on
                }
                None => throttle.toggle(),
            };
            tracing::info!(enabled, "rate lock changed from console");
            format!("cps lock {}", if enabled { "enabled" } else { "disabled" })
        }
        ConsoleCommand::Interval(ms) => {
            monitor.throttle().set_interval_ms(*ms);
            if *ms > MAX_INTERVAL_MS {
                format!(
                    "throttle interval set to {ms}ms; sleeps are capped at {MAX_INTERVAL_MS}ms"
                )
            } else if *ms > 0 {
                format!("throttle interval set to {ms}ms")
            } else {
                format!("throttle interval {ms}ms is not positive; throttling is off")
            }
        }
        ConsoleCommand::Status => LoopInspector::summary(monitor, maps, sessions).to_string(),
        ConsoleCommand::Shutdown => {
            monitor.request_shutdown();
            String::from("shutting down after the current tick")
        }
        ConsoleCommand::Unknown(name) => format!("unknown command '{name}'"),
    }
}
