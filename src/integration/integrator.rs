use crate::common::CollisionType;
use crate::math::vec2::Vec2;
use crate::objects::rigid_body::RigidBody;

/// Advances one body by `dt` seconds using semi-implicit Euler.
///
/// Killed and sleeping bodies are left alone. Gravity and accumulated forces only act on
/// `Active` bodies; every other body still moves with its own velocity, which is how moving
/// platforms are expressed. `old_position` is set to the position before the step.
pub fn integrate(body: &mut RigidBody, gravity: Vec2, dt: f64) {
    if !body.is_active() || body.is_sleeping() {
        return;
    }
    body.old_position = body.position;

    if body.collision_type == CollisionType::Active {
        // v = v + (g + F/m) * dt
        let linear_acceleration = gravity + body.force * body.inverse_mass();
        body.linear_velocity += linear_acceleration * dt;
        if !body.fixed_rotation {
            body.angular_velocity += body.torque * body.inverse_inertia() * dt;
        }
    }

    // p = p + v * dt, using the updated velocity
    body.position += body.linear_velocity * dt;
    if !body.fixed_rotation {
        body.rotation = wrap_angle(body.rotation + body.angular_velocity * dt);
    }

    body.clear_accumulators();
}

/// Wraps an angle in radians to the range [-PI, PI].
fn wrap_angle(angle: f64) -> f64 {
    angle.sin().atan2(angle.cos())
}
