//! Tuning constants for the collision pipeline.
//!
//! Every magic number the solvers and broadphases rely on lives here so it can be
//! overridden. Defaults reproduce the feel games are tuned against; change them with care.

use serde::{Deserialize, Serialize};

use crate::collision::aabb::AABB;
use crate::math::vec2::Vec2;

/// How contacts between composite children are identified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CompositeStrategy {
    /// Child contacts share the composite pair as scope; start/end fire once per composite pair.
    #[default]
    Together,
    /// Every child contact is tracked on its own.
    Separate,
}

/// Which solver resolves the contact list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SolverStrategy {
    /// MTV splitting with velocity cancellation.
    #[default]
    Box,
    /// Iterative impulses with warm starting.
    RigidBody,
}

/// Spatial partitioning used for the broadphase and ray casts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum BroadphaseStrategy {
    #[default]
    DynamicTree,
    SparseHashGrid,
}

/// Order in which the box solver processes contacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ContactSolveBias {
    /// Distance only.
    #[default]
    None,
    /// Vertical contacts (top/bottom) before horizontal ones.
    VerticalFirst,
    /// Horizontal contacts (left/right) before vertical ones.
    HorizontalFirst,
}

impl ContactSolveBias {
    /// Sort rank of a contact given whether its MTV is horizontal.
    pub fn rank(self, horizontal: bool) -> u8 {
        match (self, horizontal) {
            (ContactSolveBias::None, _) => 0,
            (ContactSolveBias::VerticalFirst, true) => 1,
            (ContactSolveBias::VerticalFirst, false) => 0,
            (ContactSolveBias::HorizontalFirst, true) => 0,
            (ContactSolveBias::HorizontalFirst, false) => 1,
        }
    }
}

/// Impulse solver constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RigidBodyConfig {
    /// Fraction of the remaining penetration removed per position iteration.
    pub steering_factor: f64,
    /// Penetration allowed before position correction kicks in.
    pub slop: f64,
    /// Largest correction applied to a single point per iteration.
    pub max_correction: f64,
    /// Scale applied to the cached tangent impulse when warm starting.
    pub warm_start_tangent_damping: f64,
    /// Squared distance under which a contact point is treated as the same point as last frame.
    pub warm_start_distance_squared: f64,
    pub position_iterations: usize,
    pub velocity_iterations: usize,
    pub warm_start: bool,
}

impl Default for RigidBodyConfig {
    fn default() -> Self {
        Self {
            steering_factor: 0.2,
            slop: 1.0,
            max_correction: 5.0,
            warm_start_tangent_damping: 0.2,
            warm_start_distance_squared: 4.0,
            position_iterations: 3,
            velocity_iterations: 8,
            warm_start: true,
        }
    }
}

/// Box solver constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArcadeConfig {
    /// Contacts whose MTV is smaller than this on both axes are cancelled.
    pub mtv_epsilon: f64,
    pub contact_solve_bias: ContactSolveBias,
}

impl Default for ArcadeConfig {
    fn default() -> Self {
        Self {
            mtv_epsilon: 0.0001,
            contact_solve_bias: ContactSolveBias::None,
        }
    }
}

/// Dynamic AABB tree constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicTreeConfig {
    /// Padding added around a leaf when it is re-inserted after moving.
    pub bounds_padding: f64,
    /// Padding added around a leaf on first insertion.
    pub initial_padding: f64,
    /// Scales the velocity-based leaf expansion.
    pub velocity_multiplier: f64,
    /// Colliders leaving these bounds stop being tracked.
    pub world_bounds: AABB,
}

impl Default for DynamicTreeConfig {
    fn default() -> Self {
        let half = f64::MAX / 4.0;
        Self {
            bounds_padding: 5.0,
            initial_padding: 2.0,
            velocity_multiplier: 2.0,
            world_bounds: AABB::new(Vec2::new(-half, -half), Vec2::new(half, half)),
        }
    }
}

/// Sparse hash grid constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SparseHashGridConfig {
    pub cell_size: f64,
}

impl Default for SparseHashGridConfig {
    fn default() -> Self {
        Self { cell_size: 100.0 }
    }
}

/// Fast-body (tunnelling) checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContinuousConfig {
    pub check_for_fast_bodies: bool,
    /// Treat every active body as fast, regardless of its speed.
    pub disable_minimum_speed_for_fast_body: bool,
    /// Distance the fast-body ray is backed up and pushed past surfaces.
    pub surface_epsilon: f64,
}

impl Default for ContinuousConfig {
    fn default() -> Self {
        Self {
            check_for_fast_bodies: true,
            disable_minimum_speed_for_fast_body: false,
            surface_epsilon: 0.1,
        }
    }
}

/// Sleep bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SleepConfig {
    /// Bodies may fall asleep at all.
    pub enabled: bool,
    pub sleep_epsilon: f64,
    /// Weight of the previous motion in the running average.
    pub sleep_bias: f64,
    /// Motion a body needs to wake a sleeping body it touches, as a multiple of `sleep_epsilon`.
    pub wake_threshold_factor: f64,
}

impl Default for SleepConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            sleep_epsilon: 0.07,
            sleep_bias: 0.9,
            wake_threshold_factor: 3.0,
        }
    }
}

/// Tile map collision constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileConfig {
    /// Correction passes per map per step; overlap left after the last pass waits for the next step.
    pub max_iterations: usize,
}

impl Default for TileConfig {
    fn default() -> Self {
        Self { max_iterations: 2 }
    }
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Acceleration applied to every active body, in units per second squared (y down).
    pub gravity: Vec2,
    /// Number of sub-steps each `step` call is split into.
    pub substeps: usize,
    pub solver: SolverStrategy,
    pub broadphase: BroadphaseStrategy,
    pub composite_strategy: CompositeStrategy,
    pub rigid_body: RigidBodyConfig,
    pub arcade: ArcadeConfig,
    pub dynamic_tree: DynamicTreeConfig,
    pub sparse_hash_grid: SparseHashGridConfig,
    pub continuous: ContinuousConfig,
    pub sleep: SleepConfig,
    pub tile: TileConfig,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec2::ZERO,
            substeps: 1,
            solver: SolverStrategy::default(),
            broadphase: BroadphaseStrategy::default(),
            composite_strategy: CompositeStrategy::default(),
            rigid_body: RigidBodyConfig::default(),
            arcade: ArcadeConfig::default(),
            dynamic_tree: DynamicTreeConfig::default(),
            sparse_hash_grid: SparseHashGridConfig::default(),
            continuous: ContinuousConfig::default(),
            sleep: SleepConfig::default(),
            tile: TileConfig::default(),
        }
    }
}
