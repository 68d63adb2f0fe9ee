//! Error types for the physics pipeline.
//!
//! Only construction and queries can fail. Stepping the world never returns an error.

use thiserror::Error;

/// Errors raised while building bodies, colliders and shapes, or when querying them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PhysicsError {
    /// Circle radius was negative or not a number.
    #[error("invalid circle radius: {0}")]
    InvalidRadius(f64),

    /// Polygon has fewer than three vertices or no area.
    #[error("degenerate polygon: {0}")]
    DegeneratePolygon(String),

    /// Edge end points coincide.
    #[error("degenerate edge: begin and end are the same point")]
    DegenerateEdge,

    /// A collider referenced a body handle that is not in the world.
    #[error("unknown body handle: {0}")]
    UnknownBody(usize),

    /// A collider id is not (or no longer) registered.
    #[error("unknown collider: {0}")]
    UnknownCollider(u32),

    /// A composite was built without any children.
    #[error("composite collider must contain at least one child")]
    EmptyComposite,

    /// Tile map dimensions were zero, negative, or did not match the solid flags.
    #[error("invalid tile map: {0}")]
    InvalidTileMap(String),

    /// The operation needs positioned leaf geometry the collider does not have.
    #[error("collider {collider} has no positioned geometry: {reason}")]
    MissingGeometry {
        /// Collider that was queried.
        collider: u32,
        /// Why no geometry is available.
        reason: &'static str,
    },
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, PhysicsError>;
