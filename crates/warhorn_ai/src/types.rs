//! # Shared Spatial Types

/// A 2-D position in world units.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WorldPos {
    /// East-west coordinate.
    pub x: f32,
    /// North-south coordinate.
    pub y: f32,
}

impl WorldPos {
    /// Creates a position.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Squared distance to `other`. No square root is taken; callers
    /// compare against squared thresholds.
    #[must_use]
    pub fn distance_sq(&self, other: &Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}
