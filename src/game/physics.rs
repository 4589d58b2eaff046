//! Ship physics integration

use glam::{IVec2, Vec2};

use super::constants::{AIR_RESISTANCE, AUX_TIMER, MAX_CIRCULAR_SPEED};
use crate::util::geometry::{normalize_radians, rotate_screen};

/// Temporary acceleration applied on top of engine thrust (collision impulses)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AuxAcceleration {
    pub acc: Vec2,
    /// Ticks left before the impulse expires
    pub timer: u32,
}

impl AuxAcceleration {
    pub fn set(&mut self, acc: Vec2) {
        self.acc = acc;
        self.timer = AUX_TIMER;
    }

    /// Current contribution, counting down the timer
    fn take(&mut self) -> Vec2 {
        if self.timer == 0 {
            return Vec2::ZERO;
        }
        let acc = self.acc;
        self.timer -= 1;
        if self.timer == 0 {
            self.acc = Vec2::ZERO;
        }
        acc
    }
}

/// Kinematic state of a ship
#[derive(Debug, Clone, Default)]
pub struct Body {
    /// Center in world pixels
    pub position: IVec2,
    pub speed: Vec2,
    /// Total acceleration applied on the last tick
    pub acc: Vec2,
    /// Engine-driven share of `acc` on the last tick
    pub engine_acc: Vec2,
    /// Radians, counter-clockwise on screen
    pub orientation: f32,
    pub circular_speed: f32,
    pub circular_acc: f32,
    pub aux: AuxAcceleration,
}

impl Body {
    pub fn new(position: IVec2, orientation: f32) -> Self {
        Self {
            position,
            orientation,
            ..Default::default()
        }
    }

    pub fn center(&self) -> Vec2 {
        self.position.as_vec2()
    }
}

/// Engine output summed over a ship, in the ship's own frame
#[derive(Debug, Clone, Copy, Default)]
pub struct Thrust {
    /// Force along the ship's nose
    pub force: Vec2,
    /// Circular acceleration from off-axis engines, already mass-scaled
    pub torque: f32,
}

/// Physics system for integrating ship bodies
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Damping exponent grows with log10 of the speed, never below 1
    pub fn damping_factor(speed: f32) -> f32 {
        let exponent = if speed > 0.0 { speed.log10().max(1.0) } else { 1.0 };
        AIR_RESISTANCE.powf(exponent)
    }

    /// Advance a body by one tick
    pub fn integrate(body: &mut Body, thrust: Thrust, mass: f32) {
        if mass <= 0.0 {
            return;
        }

        body.engine_acc = rotate_screen(thrust.force, body.orientation) / mass;
        body.acc = body.engine_acc + body.aux.take();
        body.circular_acc = thrust.torque;

        body.speed += body.acc;
        body.speed *= Self::damping_factor(body.speed.length());

        body.circular_speed = (body.circular_speed * AIR_RESISTANCE + body.circular_acc)
            .clamp(-MAX_CIRCULAR_SPEED, MAX_CIRCULAR_SPEED);
        body.orientation = normalize_radians(body.orientation + body.circular_speed);

        body.position += body.speed.round().as_ivec2();
    }

    /// Check overlap of two bounding circles
    pub fn check_bounds_collision(a: Vec2, radius_a: f32, b: Vec2, radius_b: f32) -> bool {
        let combined = radius_a + radius_b;
        a.distance_squared(b) <= combined * combined
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thrust_along_nose() {
        let mut body = Body::new(IVec2::ZERO, 0.0);
        let thrust = Thrust {
            force: Vec2::new(40.0, 0.0),
            torque: 0.0,
        };
        PhysicsSystem::integrate(&mut body, thrust, 4.0);

        assert!(body.speed.x > 9.0 && body.speed.x < 10.0);
        assert!(body.speed.y.abs() < 1e-4);
        assert_eq!(body.position, IVec2::new(body.speed.x.round() as i32, 0));
    }

    #[test]
    fn test_thrust_rotated_by_orientation() {
        // Facing straight up on screen, thrust pushes toward negative y
        let mut body = Body::new(IVec2::ZERO, std::f32::consts::FRAC_PI_2);
        let thrust = Thrust {
            force: Vec2::new(10.0, 0.0),
            torque: 0.0,
        };
        PhysicsSystem::integrate(&mut body, thrust, 1.0);
        assert!(body.speed.y < -9.0);
        assert!(body.speed.x.abs() < 1e-3);
    }

    #[test]
    fn test_damping_grows_with_speed() {
        assert_eq!(PhysicsSystem::damping_factor(0.0), AIR_RESISTANCE);
        assert_eq!(PhysicsSystem::damping_factor(5.0), AIR_RESISTANCE);
        assert!(PhysicsSystem::damping_factor(1000.0) < PhysicsSystem::damping_factor(50.0));
    }

    #[test]
    fn test_circular_speed_clamped() {
        let mut body = Body::new(IVec2::ZERO, 0.0);
        let thrust = Thrust {
            force: Vec2::ZERO,
            torque: 1.0,
        };
        PhysicsSystem::integrate(&mut body, thrust, 1.0);
        assert_eq!(body.circular_speed, MAX_CIRCULAR_SPEED);
        assert!((body.orientation - MAX_CIRCULAR_SPEED).abs() < 1e-6);
    }

    #[test]
    fn test_aux_expires() {
        let mut body = Body::new(IVec2::ZERO, 0.0);
        body.aux.set(Vec2::new(1.0, 0.0));

        for _ in 0..AUX_TIMER {
            PhysicsSystem::integrate(&mut body, Thrust::default(), 1.0);
            assert_eq!(body.acc, Vec2::new(1.0, 0.0));
        }
        PhysicsSystem::integrate(&mut body, Thrust::default(), 1.0);
        assert_eq!(body.acc, Vec2::ZERO);
        assert_eq!(body.aux.timer, 0);
    }

    #[test]
    fn test_zero_mass_is_noop() {
        let mut body = Body::new(IVec2::new(5, 5), 0.0);
        body.speed = Vec2::new(3.0, 0.0);
        PhysicsSystem::integrate(&mut body, Thrust::default(), 0.0);
        assert_eq!(body.position, IVec2::new(5, 5));
    }

    #[test]
    fn test_bounds_collision() {
        assert!(PhysicsSystem::check_bounds_collision(Vec2::ZERO, 5.0, Vec2::new(9.0, 0.0), 5.0));
        assert!(!PhysicsSystem::check_bounds_collision(Vec2::ZERO, 5.0, Vec2::new(11.0, 0.0), 5.0));
    }
}
