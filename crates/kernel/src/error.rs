use std::fmt;
use std::time::Duration;

use shardloop_common::{EntityId, MapIndex, SessionId};

/// Error returned by a map or entity update.
#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    #[error("simulation error: {0}")]
    Simulation(String),
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl UpdateError {
    pub fn simulation(msg: impl Into<String>) -> Self {
        Self::Simulation(msg.into())
    }
}

/// The object whose update faulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateTarget {
    Map(MapIndex),
    Entity { session: SessionId, entity: EntityId },
    /// The session faulted before its entity could be identified.
    Session(SessionId),
}

impl fmt::Display for UpdateTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Map(index) => write!(f, "{index}"),
            Self::Entity { session, entity } => write!(f, "{session} entity {entity}"),
            Self::Session(session) => write!(f, "{session}"),
        }
    }
}

/// An isolated per-update fault recorded by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateFault {
    /// The update returned an error.
    Failed { target: UpdateTarget, message: String },
    /// The update panicked; the panic was caught.
    Panicked { target: UpdateTarget, message: String },
    /// The update returned but took longer than the configured budget.
    DeadlineExceeded {
        target: UpdateTarget,
        elapsed: Duration,
        budget: Duration,
    },
}

impl UpdateFault {
    pub fn target(&self) -> UpdateTarget {
        match self {
            Self::Failed { target, .. }
            | Self::Panicked { target, .. }
            | Self::DeadlineExceeded { target, .. } => *target,
        }
    }
}

impl fmt::Display for UpdateFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { target, message } => write!(f, "{target} failed: {message}"),
            Self::Panicked { target, message } => write!(f, "{target} panicked: {message}"),
            Self::DeadlineExceeded {
                target,
                elapsed,
                budget,
            } => write!(
                f,
                "{target} overran its budget: {}us > {}us",
                elapsed.as_micros(),
                budget.as_micros()
            ),
        }
    }
}
