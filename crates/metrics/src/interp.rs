//! Elapsed-time interpolation for dropped items scattering from their source
//! tile to the tile they land on.

use glam::Vec2;
use shardloop_common::TilePos;

/// A linear move from `origin` to `target` over `duration_ms`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScatterAnimation {
    pub origin: TilePos,
    pub target: TilePos,
    pub spawned_at_ms: u64,
    pub duration_ms: i64,
}

impl ScatterAnimation {
    /// Build an animation from row-major tile indices. Returns `None` when the
    /// item lands on the tile it came from.
    pub fn from_tiles(
        origin_index: i32,
        target_index: i32,
        map_width: i32,
        spawned_at_ms: u64,
        duration_ms: i64,
    ) -> Option<Self> {
        if origin_index == target_index {
            return None;
        }
        Some(Self {
            origin: TilePos::from_index(origin_index, map_width),
            target: TilePos::from_index(target_index, map_width),
            spawned_at_ms,
            duration_ms,
        })
    }

    /// Completion in `[0, 1]`. A non-positive duration is already complete.
    pub fn progress(&self, now_ms: u64) -> f32 {
        if self.duration_ms <= 0 || self.spawned_at_ms == 0 {
            return 1.0;
        }
        let elapsed = now_ms as i64 - self.spawned_at_ms as i64;
        (elapsed as f32 / self.duration_ms as f32).clamp(0.0, 1.0)
    }

    pub fn is_animating(&self, now_ms: u64) -> bool {
        self.progress(now_ms) < 1.0
    }

    /// Interpolated position in tile units.
    pub fn position(&self, now_ms: u64) -> Vec2 {
        self.origin
            .as_vec2()
            .lerp(self.target.as_vec2(), self.progress(now_ms))
    }
}
