//! Surface properties used by the impulse solver.

/// How a body's surface responds to contact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    /// Coulomb friction coefficient in [0, 1]. A contact uses the smaller of the two.
    pub friction: f64,
    /// Restitution in [0, 1]. A contact uses the product of the two.
    /// 0 = perfectly inelastic (no bounce), 1 = perfectly elastic.
    pub bounciness: f64,
}

impl Material {
    /// Creates a material, clamping both coefficients to [0, 1].
    pub fn new(friction: f64, bounciness: f64) -> Self {
        Material {
            friction: friction.clamp(0.0, 1.0),
            bounciness: bounciness.clamp(0.0, 1.0),
        }
    }

    /// Combined friction of a contact between two materials.
    pub fn mix_friction(a: &Material, b: &Material) -> f64 {
        a.friction.min(b.friction)
    }

    /// Combined restitution of a contact between two materials.
    pub fn mix_bounciness(a: &Material, b: &Material) -> f64 {
        a.bounciness * b.bounciness
    }
}

impl Default for Material {
    fn default() -> Self {
        Material {
            friction: 0.99,
            bounciness: 0.2,
        }
    }
}
