//! Actor versus grid collision.
//!
//! Tile maps are not colliders: they never enter the broadphase. Instead every body is probed
//! against each map after the solver has run, and pushed out of solid cells directly.

pub mod cell_map_collision;
pub mod tile_map;

pub use cell_map_collision::CellMapCollision;
pub use tile_map::TileMap;

use crate::collision::AABB;
use crate::math::Vec2;

/// A grid that can answer "is there a solid cell here".
pub trait CellMap {
    /// Area covered by the grid.
    fn bounds(&self) -> AABB;

    /// Width and height of one cell.
    fn cell_size(&self) -> Vec2;

    /// Bounds of the solid cell containing `point`, if any.
    fn solid_cell_at(&self, point: Vec2) -> Option<AABB>;
}
