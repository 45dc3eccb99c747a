//! Shared identifiers and small value types used across the shardloop crates.

mod types;

pub use types::{EntityId, MapIndex, SessionId, TilePos};
