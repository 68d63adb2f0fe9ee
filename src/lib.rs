//! 2D collision pipeline: broadphase culling, narrowphase contact generation and two
//! interchangeable contact solvers, plus tile map collision and typed collision events.
//!
//! The y axis points down. Times passed to [`PhysicsWorld::step`] are in milliseconds.

pub mod collision;
pub mod common;
pub mod config;
pub mod error;
pub mod integration;
pub mod math;
pub mod objects;
pub mod shapes;
pub mod solver;
pub mod tile;
pub mod world;

// Re-export key types for easier use
pub use collision::{
    ColliderDesc, ColliderId, CollisionEvent, CollisionEventKind, CollisionProcessor, Contact, ContactId,
    EventResponse, PairId, RayCastHit, RayCastOptions, AABB,
};
pub use common::{CollisionGroup, CollisionType, Material, Side};
pub use config::{CompositeStrategy, ContactSolveBias, PhysicsConfig, SolverStrategy};
pub use error::{PhysicsError, Result};
pub use math::{Ray, Vec2};
pub use objects::{BodyHandle, RigidBody};
pub use shapes::{Circle, Edge, Polygon, Shape};
pub use solver::{BoxSolver, CollisionSolver, RigidBodySolver};
pub use tile::{CellMap, TileMap};
pub use world::PhysicsWorld;
