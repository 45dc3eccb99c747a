//! World Kernel: the registries the server ticks over and the pipeline that
//! dispatches one update per active map and per attached entity each tick.
//!
//! # Invariants
//! - Maps are updated before entities, each in a fixed order.
//! - An inactive map or a session without an entity is never dispatched to.
//! - A failing or panicking collaborator call is isolated: the rest of the
//!   tick still runs.
//! - Only the scheduler thread calls `update()`; registries lock only for
//!   structural mutation and snapshotting.

pub mod contract;
pub mod error;
pub mod pipeline;
pub mod registry;

pub use contract::{Entity, GameMap, Session, SharedMap, SharedSession};
pub use error::{UpdateError, UpdateFault, UpdateTarget};
pub use pipeline::{PipelineReport, WorldPipeline, panic_message};
pub use registry::{MapRegistry, SessionRegistry};
