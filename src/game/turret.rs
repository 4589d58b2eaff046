//! Turret rotation state machine and muzzle placement

use glam::Vec2;

use super::block::Cell;
use super::constants::{ship_extent, TURRET_ANGULAR_SPEED, TURRET_BARREL, TURRET_FIRE_DELAY};
use crate::util::geometry::{normalize_degrees, polar_to_cartesian, rotate_screen, shortest_arc_degrees};

/// Rotation phase of a turret
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Idle,
    Rotating,
}

/// Turret-specific block state. Angles are in degrees, relative to the ship's nose.
#[derive(Debug, Clone)]
pub struct TurretState {
    pub orientation: f32,
    pub rotation: Rotation,
    pub target: f32,
    /// Signed degrees per tick while rotating
    pub angular_speed: f32,
    /// Ticks since the last shot
    pub fire_delay: u32,
}

impl Default for TurretState {
    fn default() -> Self {
        Self {
            orientation: 0.0,
            rotation: Rotation::Idle,
            target: 0.0,
            angular_speed: 0.0,
            fire_delay: 0,
        }
    }
}

impl TurretState {
    /// Start rotating toward `target` along the shorter path
    pub fn rotate(&mut self, target: f32) {
        let target = normalize_degrees(target);
        let arc = shortest_arc_degrees(self.orientation, target);
        self.target = target;

        if arc == 0.0 {
            self.orientation = target;
            self.rotation = Rotation::Idle;
            self.angular_speed = 0.0;
            return;
        }

        self.angular_speed = TURRET_ANGULAR_SPEED.copysign(arc);
        self.rotation = Rotation::Rotating;
    }

    pub fn is_rotating(&self) -> bool {
        self.rotation == Rotation::Rotating
    }

    /// Advance rotation and the fire cooldown by one tick
    pub fn tick(&mut self) {
        self.fire_delay = self.fire_delay.saturating_add(1);

        if self.rotation != Rotation::Rotating {
            return;
        }

        let remaining = shortest_arc_degrees(self.orientation, self.target).abs();
        if remaining <= 2.0 * self.angular_speed.abs() {
            self.orientation = self.target;
            self.rotation = Rotation::Idle;
            self.angular_speed = 0.0;
        } else {
            self.orientation = normalize_degrees(self.orientation + self.angular_speed);
        }
    }

    pub fn can_fire(&self) -> bool {
        self.fire_delay >= TURRET_FIRE_DELAY
    }

    /// Consume the cooldown if ready; returns true when a shot should be spawned
    pub fn try_fire(&mut self, active: bool) -> bool {
        if !active || !self.can_fire() {
            return false;
        }
        self.fire_delay = 0;
        true
    }
}

/// World position and heading (radians) of a shot leaving the turret at `cell`
pub fn muzzle(ship_center: Vec2, ship_orientation: f32, cell: Cell, turret_orientation: f32) -> (Vec2, f32) {
    let half = ship_extent() as f32 / 2.0;
    let (cx, cy) = cell.center_px();
    let mount = rotate_screen(Vec2::new(cx - half, cy - half), ship_orientation);

    let heading = ship_orientation + turret_orientation.to_radians();
    let position = ship_center + mount + polar_to_cartesian(TURRET_BARREL, heading);
    (position, heading)
}
