use crate::common::{CollisionGroup, CollisionType, Material};
use crate::config::SleepConfig;
use crate::math::transform::Transform;
use crate::math::vec2::Vec2;
use crate::shapes::Shape;

/// Index of a body inside the world. Handles are never reused; killed bodies stay in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub struct RigidBody {
    // Primary state
    pub position: Vec2, // World position of the center of mass
    pub rotation: f64,  // Radians
    pub linear_velocity: Vec2,
    pub angular_velocity: f64, // Radians per second
    /// Position before the last integration, used to trace fast bodies.
    pub old_position: Vec2,

    // Accumulators for forces/torques applied during a time step
    pub force: Vec2,
    pub torque: f64,

    // Physical properties
    pub mass: f64,
    pub inv_mass: f64, // 0.0 for infinite mass
    pub inertia: f64,
    pub inv_inertia: f64, // 0.0 for infinite inertia
    pub material: Material,

    // Collision behavior
    pub collision_type: CollisionType,
    pub group: CollisionGroup,
    pub fixed_rotation: bool,

    // Lifecycle and sleep
    active: bool,
    sleeping: bool,
    pub can_sleep: bool,
    sleep_motion: f64,
}

impl RigidBody {
    /// Creates an `Active` body whose inertia is derived from `shape`.
    /// A mass <= 0 produces an immovable `Fixed` body.
    pub fn new(mass: f64, shape: &Shape) -> Self {
        if mass <= 0.0 {
            return Self::new_fixed(Vec2::ZERO);
        }
        Self::new_with_inertia(mass, shape.inertia(mass))
    }

    /// Creates an `Active` body with explicit mass and inertia. Non-positive values mean infinite.
    pub fn new_with_inertia(mass: f64, inertia: f64) -> Self {
        let (mass, inv_mass) = if mass > 0.0 { (mass, 1.0 / mass) } else { (f64::INFINITY, 0.0) };
        let (inertia, inv_inertia) = if inertia > 0.0 {
            (inertia, 1.0 / inertia)
        } else {
            (f64::INFINITY, 0.0)
        };

        Self {
            position: Vec2::ZERO,
            rotation: 0.0,
            linear_velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            old_position: Vec2::ZERO,
            force: Vec2::ZERO,
            torque: 0.0,
            mass,
            inv_mass,
            inertia,
            inv_inertia,
            material: Material::default(),
            collision_type: CollisionType::Active,
            group: CollisionGroup::ALL,
            fixed_rotation: false,
            active: true,
            sleeping: false,
            can_sleep: false,
            sleep_motion: 0.0,
        }
    }

    /// Creates an immovable `Fixed` body at `position`.
    pub fn new_fixed(position: Vec2) -> Self {
        Self::new_with_inertia(0.0, 0.0)
            .with_collision_type(CollisionType::Fixed)
            .with_position(position)
    }

    pub fn with_position(mut self, position: Vec2) -> Self {
        self.position = position;
        self.old_position = position;
        self
    }

    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.linear_velocity = velocity;
        self
    }

    pub fn with_collision_type(mut self, collision_type: CollisionType) -> Self {
        self.collision_type = collision_type;
        self
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    pub fn with_group(mut self, group: CollisionGroup) -> Self {
        self.group = group;
        self
    }

    pub fn transform(&self) -> Transform {
        Transform::new(self.position, self.rotation)
    }

    /// Inverse mass seen by the solver: always 0 for `Fixed` bodies.
    pub fn inverse_mass(&self) -> f64 {
        if self.collision_type == CollisionType::Fixed {
            0.0
        } else {
            self.inv_mass
        }
    }

    /// Inverse inertia seen by the solver: 0 for `Fixed` bodies or when rotation is locked.
    pub fn inverse_inertia(&self) -> f64 {
        if self.collision_type == CollisionType::Fixed || self.fixed_rotation {
            0.0
        } else {
            self.inv_inertia
        }
    }

    /// Velocity of the material point at `point` (world space), including spin.
    pub fn velocity_at(&self, point: Vec2) -> Vec2 {
        self.linear_velocity + Vec2::cross_scalar(self.angular_velocity, point - self.position)
    }

    /// Applies an impulse at a world point. Only `Active` bodies respond.
    pub fn apply_impulse(&mut self, point: Vec2, impulse: Vec2) {
        if self.collision_type != CollisionType::Active {
            return;
        }
        self.linear_velocity += impulse * self.inverse_mass();
        if !self.fixed_rotation {
            let lever = point - self.position;
            self.angular_velocity += self.inverse_inertia() * lever.cross(impulse);
        }
    }

    /// Applies an impulse through the center of mass. Only `Active` bodies respond.
    pub fn apply_linear_impulse(&mut self, impulse: Vec2) {
        if self.collision_type != CollisionType::Active {
            return;
        }
        self.linear_velocity += impulse * self.inverse_mass();
    }

    /// Applies only the rotational part of an impulse at a world point. Only `Active` bodies respond.
    pub fn apply_angular_impulse(&mut self, point: Vec2, impulse: Vec2) {
        if self.collision_type != CollisionType::Active || self.fixed_rotation {
            return;
        }
        let lever = point - self.position;
        self.angular_velocity += self.inverse_inertia() * lever.cross(impulse);
    }

    /// Applies a force at the center of mass.
    pub fn apply_force(&mut self, force: Vec2) {
        self.force += force;
    }

    /// Applies a force at a world point, producing torque as well.
    pub fn apply_force_at_point(&mut self, force: Vec2, point_world: Vec2) {
        self.force += force;
        self.torque += (point_world - self.position).cross(force);
    }

    /// Should typically be called after integration in each simulation step.
    pub fn clear_accumulators(&mut self) {
        self.force = Vec2::ZERO;
        self.torque = 0.0;
    }

    /// Removes the body from the simulation. Pending contacts involving it are skipped.
    pub fn kill(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_sleeping(&self) -> bool {
        self.sleeping
    }

    pub fn sleep_motion(&self) -> f64 {
        self.sleep_motion
    }

    /// Puts the body to sleep (zeroing its motion) or wakes it with enough motion to stay awake briefly.
    pub fn set_sleeping(&mut self, sleeping: bool, config: &SleepConfig) {
        self.sleeping = sleeping;
        if sleeping {
            self.sleep_motion = 0.0;
            self.linear_velocity = Vec2::ZERO;
            self.angular_velocity = 0.0;
            self.clear_accumulators();
        } else {
            self.sleep_motion = config.sleep_epsilon * 10.0;
        }
    }

    /// Updates the running motion average and falls asleep when it stays below the threshold.
    pub fn update_motion(&mut self, config: &SleepConfig) {
        let current = self.linear_velocity.magnitude_squared() + self.angular_velocity * self.angular_velocity;
        let bias = config.sleep_bias;
        self.sleep_motion = (bias * self.sleep_motion + (1.0 - bias) * current).clamp(0.0, 10.0 * config.sleep_epsilon);
        if config.enabled && self.can_sleep && !self.sleeping && self.sleep_motion < config.sleep_epsilon {
            self.set_sleeping(true, config);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{Circle, Polygon};
    const EPSILON: f64 = 1e-10;

    fn circle_shape(radius: f64) -> Shape {
        Shape::Circle(Circle::new(radius).unwrap())
    }

    #[test]
    fn test_rigidbody_new_circle() {
        let rb = RigidBody::new(10.0, &circle_shape(2.0));
        assert_eq!(rb.mass, 10.0);
        assert!((rb.inv_mass - 0.1).abs() < EPSILON);
        assert!((rb.inertia - 20.0).abs() < EPSILON);
        assert!((rb.inv_inertia - 0.05).abs() < EPSILON);
        assert_eq!(rb.collision_type, CollisionType::Active);
        assert!(rb.is_active());
    }

    #[test]
    fn test_rigidbody_new_polygon() {
        let rect = Shape::Polygon(Polygon::rectangle(2.0, 4.0).unwrap());
        let rb = RigidBody::new(3.0, &rect);
        assert!((rb.inertia - 5.0).abs() < EPSILON);
    }

    #[test]
    fn test_rigidbody_zero_mass_is_fixed() {
        let rb = RigidBody::new(0.0, &circle_shape(1.0));
        assert_eq!(rb.collision_type, CollisionType::Fixed);
        assert_eq!(rb.inv_mass, 0.0);
        assert_eq!(rb.inv_inertia, 0.0);
        assert!(rb.mass.is_infinite());
    }

    #[test]
    fn test_fixed_body_has_zero_effective_inverse_mass() {
        let rb = RigidBody::new(2.0, &circle_shape(1.0)).with_collision_type(CollisionType::Fixed);
        assert!(rb.inv_mass > 0.0);
        assert_eq!(rb.inverse_mass(), 0.0);
        assert_eq!(rb.inverse_inertia(), 0.0);
    }

    #[test]
    fn test_apply_impulse_linear_and_angular() {
        let mut rb = RigidBody::new_with_inertia(2.0, 4.0);
        rb.apply_impulse(Vec2::new(1.0, 0.0), Vec2::new(0.0, 8.0));
        assert!((rb.linear_velocity.y - 4.0).abs() < EPSILON);
        // lever (1,0) x impulse (0,8) = 8, times inv inertia 0.25
        assert!((rb.angular_velocity - 2.0).abs() < EPSILON);
    }

    #[test]
    fn test_split_impulses() {
        let mut rb = RigidBody::new_with_inertia(2.0, 4.0);
        rb.apply_linear_impulse(Vec2::new(2.0, 0.0));
        assert!((rb.linear_velocity.x - 1.0).abs() < EPSILON);
        assert_eq!(rb.angular_velocity, 0.0);

        rb.apply_angular_impulse(Vec2::new(0.0, 1.0), Vec2::new(4.0, 0.0));
        // (0,1) x (4,0) = -4
        assert!((rb.angular_velocity - -1.0).abs() < EPSILON);
        assert!((rb.linear_velocity.x - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_impulses_ignored_unless_active() {
        for ty in [CollisionType::Fixed, CollisionType::Passive, CollisionType::PreventCollision] {
            let mut rb = RigidBody::new_with_inertia(1.0, 1.0).with_collision_type(ty);
            rb.apply_impulse(Vec2::new(1.0, 1.0), Vec2::new(5.0, 5.0));
            rb.apply_linear_impulse(Vec2::new(5.0, 5.0));
            rb.apply_angular_impulse(Vec2::new(1.0, 1.0), Vec2::new(5.0, 0.0));
            assert_eq!(rb.linear_velocity, Vec2::ZERO);
            assert_eq!(rb.angular_velocity, 0.0);
        }
    }

    #[test]
    fn test_fixed_rotation_blocks_spin() {
        let mut rb = RigidBody::new_with_inertia(1.0, 1.0);
        rb.fixed_rotation = true;
        rb.apply_impulse(Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0));
        assert_eq!(rb.angular_velocity, 0.0);
        assert!((rb.linear_velocity.y - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_velocity_at_point() {
        let mut rb = RigidBody::new_with_inertia(1.0, 1.0).with_position(Vec2::new(5.0, 5.0));
        rb.linear_velocity = Vec2::new(1.0, 0.0);
        rb.angular_velocity = 2.0;
        let v = rb.velocity_at(Vec2::new(6.0, 5.0));
        assert!((v.x - 1.0).abs() < EPSILON);
        assert!((v.y - 2.0).abs() < EPSILON);
    }

    #[test]
    fn test_apply_force_at_point() {
        let mut rb = RigidBody::new_with_inertia(1.0, 1.0);
        rb.apply_force_at_point(Vec2::new(0.0, 10.0), Vec2::new(2.0, 0.0));
        assert_eq!(rb.force, Vec2::new(0.0, 10.0));
        assert!((rb.torque - 20.0).abs() < EPSILON);
        rb.clear_accumulators();
        assert_eq!(rb.force, Vec2::ZERO);
        assert_eq!(rb.torque, 0.0);
    }

    #[test]
    fn test_update_motion_puts_still_body_to_sleep() {
        let config = SleepConfig { enabled: true, ..SleepConfig::default() };
        let mut rb = RigidBody::new_with_inertia(1.0, 1.0);
        rb.can_sleep = true;
        rb.update_motion(&config);
        assert!(rb.is_sleeping());

        rb.set_sleeping(false, &config);
        assert!(!rb.is_sleeping());
        assert!((rb.sleep_motion() - 0.7).abs() < EPSILON);
    }

    #[test]
    fn test_update_motion_stays_awake_when_disabled_or_moving() {
        let config = SleepConfig::default();
        let mut rb = RigidBody::new_with_inertia(1.0, 1.0);
        rb.can_sleep = true;
        rb.update_motion(&config);
        assert!(!rb.is_sleeping());

        let enabled = SleepConfig { enabled: true, ..SleepConfig::default() };
        let mut moving = RigidBody::new_with_inertia(1.0, 1.0).with_velocity(Vec2::new(10.0, 0.0));
        moving.can_sleep = true;
        moving.update_motion(&enabled);
        assert!(!moving.is_sleeping());
        // 0.1 * 100 clamped to 10 * epsilon
        assert!((moving.sleep_motion() - 0.7).abs() < EPSILON);
    }

    #[test]
    fn test_kill() {
        let mut rb = RigidBody::new_with_inertia(1.0, 1.0);
        rb.kill();
        assert!(!rb.is_active());
    }
}
