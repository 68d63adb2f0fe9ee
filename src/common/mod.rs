pub mod collision_type;
pub mod material;
pub mod side;

pub use collision_type::{CollisionGroup, CollisionType};
pub use material::Material;
pub use side::Side;
