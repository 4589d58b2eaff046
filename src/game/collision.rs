//! Ship-vs-ship collision detection and bounce response

use glam::Vec2;
use rand::Rng;
use std::collections::VecDeque;
use tracing::debug;

use super::constants::{COLLISION_COOLDOWN, COLLISION_SPIN, MIN_BOUNCE_SPEED, SPEED_HISTORY_LEN};
use super::physics::PhysicsSystem;
use super::ship::Ship;

/// Response applied to the local ship after a collision
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounce {
    /// World position of the overlap centroid
    pub centroid: Vec2,
    pub velocity: Vec2,
    pub spin: f32,
}

/// Rolling speed history of both ships plus the exact-test cooldown
pub struct CollisionSystem {
    local_history: VecDeque<f32>,
    remote_history: VecDeque<f32>,
    cooldown: u32,
}

impl CollisionSystem {
    pub fn new() -> Self {
        Self {
            local_history: VecDeque::with_capacity(SPEED_HISTORY_LEN),
            remote_history: VecDeque::with_capacity(SPEED_HISTORY_LEN),
            cooldown: 0,
        }
    }

    fn push_speed(history: &mut VecDeque<f32>, speed: f32) {
        if history.len() == SPEED_HISTORY_LEN {
            history.pop_front();
        }
        history.push_back(speed);
    }

    /// Oldest remembered speed, i.e. the speed before the ships started touching
    fn head(history: &VecDeque<f32>) -> f32 {
        history.front().copied().unwrap_or(0.0)
    }

    /// Check for overlap and bounce the local ship. The remote ship is never mutated.
    pub fn update(&mut self, local: &mut Ship, remote: &Ship, rng: &mut impl Rng) -> Option<Bounce> {
        Self::push_speed(&mut self.local_history, local.body.speed.length());
        Self::push_speed(&mut self.remote_history, remote.body.speed.length());

        if self.cooldown > 0 {
            self.cooldown -= 1;
            return None;
        }
        if local.is_destroyed() || remote.is_destroyed() {
            return None;
        }
        if !PhysicsSystem::check_bounds_collision(
            local.center(),
            local.bounding_radius(),
            remote.center(),
            remote.bounding_radius(),
        ) {
            return None;
        }

        let offset = remote.mask_origin() - local.mask_origin();
        let (_, centroid) = local.mask().overlap_centroid(remote.mask(), offset)?;
        let centroid = local.mask_origin().as_vec2() + centroid;

        let magnitude = ((Self::head(&self.local_history) + Self::head(&self.remote_history)) / 2.0)
            .max(MIN_BOUNCE_SPEED);
        let away = (local.center() - centroid)
            .try_normalize()
            .or_else(|| (local.center() - remote.center()).try_normalize())
            .unwrap_or(Vec2::X);
        let velocity = away * magnitude;
        let spin = if rng.gen_bool(0.5) {
            COLLISION_SPIN
        } else {
            -COLLISION_SPIN
        };

        let engine_acc = local.body.engine_acc;
        local.body.aux.set(-engine_acc);
        local.body.speed = velocity;
        local.body.circular_speed += spin;

        self.cooldown = COLLISION_COOLDOWN;
        debug!(team = local.team(), ?centroid, ?velocity, "Ship collision");
        Some(Bounce {
            centroid,
            velocity,
            spin,
        })
    }

    /// Forget history and cooldown; used when a match ends
    pub fn clear(&mut self) {
        self.local_history.clear();
        self.remote_history.clear();
        self.cooldown = 0;
    }
}

impl Default for CollisionSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::constants::GRID_SIZE;
    use crate::game::physics::Body;
    use glam::IVec2;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const FULL: [[u8; GRID_SIZE]; GRID_SIZE] = [[1; GRID_SIZE]; GRID_SIZE];

    /// Two full boards whose corners share exactly one pixel
    fn touching() -> (Ship, Ship) {
        let local = Ship::from_grid(0, &FULL, Body::new(IVec2::new(300, 400), 0.0), false).unwrap();
        let remote = Ship::from_grid(1, &FULL, Body::new(IVec2::new(419, 519), 0.0), true).unwrap();
        (local, remote)
    }

    #[test]
    fn test_one_pixel_overlap_detected() {
        let (local, remote) = touching();
        let offset = remote.mask_origin() - local.mask_origin();
        let (count, _) = local.mask().overlap_centroid(remote.mask(), offset).unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_one_bounce_per_cooldown_window() {
        let (mut local, remote) = touching();
        let mut collisions = CollisionSystem::new();
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let bounces = (0..=COLLISION_COOLDOWN)
            .filter_map(|_| collisions.update(&mut local, &remote, &mut rng))
            .count();
        assert_eq!(bounces, 1);

        // Ships were not moved, so the next window bounces again
        assert!(collisions.update(&mut local, &remote, &mut rng).is_some());
    }

    #[test]
    fn test_bounce_points_away_from_contact() {
        let (mut local, mut remote) = touching();
        local.body.speed = Vec2::new(3.0, 0.0);
        local.body.engine_acc = Vec2::new(0.5, 0.0);
        remote.body.speed = Vec2::new(1.0, 0.0);
        let mut collisions = CollisionSystem::new();
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let bounce = collisions.update(&mut local, &remote, &mut rng).unwrap();

        assert!(bounce.velocity.x < 0.0 && bounce.velocity.y < 0.0);
        assert!((bounce.velocity.length() - 2.0).abs() < 1e-4);
        assert_eq!(local.body.speed, bounce.velocity);
        assert_eq!(local.body.aux.acc, Vec2::new(-0.5, 0.0));
        assert_eq!(local.body.circular_speed.abs(), COLLISION_SPIN);
        // The mirrored ship keeps its own velocity
        assert_eq!(remote.body.speed, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn test_far_ships_ignored() {
        let (mut local, mut remote) = touching();
        remote.body.position = IVec2::new(1000, 400);
        remote.refresh_mask();
        let mut collisions = CollisionSystem::new();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert!(collisions.update(&mut local, &remote, &mut rng).is_none());
    }
}
