pub mod aabb;
pub mod broadphase;
pub mod closest_line;
pub mod collider;
pub mod contact;
pub mod detection;
pub mod events;
pub mod manifold;
pub mod narrowphase;
pub mod pair;

// Re-export key types
pub use aabb::AABB;
pub use broadphase::{
    CollisionProcessor, DynamicTreeProcessor, RayCastHit, RayCastOptions, SparseHashGridProcessor,
};
pub use collider::{Collider, ColliderDesc, ColliderId, ColliderKind, ColliderSet};
pub use contact::{Contact, ContactId, PairId};
pub use events::{CollisionEvent, CollisionEventKind, EventChannel, EventResponse};
pub use manifold::CollisionManifold;
pub use pair::Pair;
