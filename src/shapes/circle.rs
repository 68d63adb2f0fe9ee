use crate::error::{PhysicsError, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub radius: f64,
}

impl Circle {
    /// Creates a circle. A zero radius is allowed (a point); negative or NaN is not.
    pub fn new(radius: f64) -> Result<Self> {
        if radius.is_nan() || radius < 0.0 {
            return Err(PhysicsError::InvalidRadius(radius));
        }
        Ok(Self { radius })
    }

    pub fn area(&self) -> f64 {
        std::f64::consts::PI * self.radius * self.radius
    }

    /// Moment of inertia of a solid disc of `mass` about its center.
    pub fn inertia(&self, mass: f64) -> f64 {
        0.5 * mass * self.radius * self.radius
    }
}
