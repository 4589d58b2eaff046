//! Peer protocol message definitions
//! These are the wire types exchanged between the two peers of a match

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::game::block::Team;
use crate::game::combat::{Bullet, BulletKey};
use crate::game::constants::{BULLET_SPEED, GRID_SIZE};

/// Fixed-point scale for bullet orientations on the wire
pub const ORIENTATION_SCALE: f32 = 10_000.0;

/// Per-cell matrix matching the ship board
pub type CellGrid<T> = [[T; GRID_SIZE]; GRID_SIZE];

/// Messages sent between peers, one datagram each
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PeerMsg {
    /// State of the sender's own ship for one tick
    Snapshot {
        /// Sender tick number, informational only
        tick: u64,
        state: ShipState,
    },

    /// Sender is leaving the match
    Leave {
        reason: String,
    },
}

/// Compact record of a bullet owned by the sending peer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulletRecord {
    pub id: u32,
    pub x: i32,
    pub y: i32,
    /// Radians times ORIENTATION_SCALE
    pub orientation: i32,
    pub damage: i32,
}

impl BulletRecord {
    pub fn from_bullet(bullet: &Bullet) -> Self {
        Self {
            id: bullet.key.id,
            x: bullet.position.x.round() as i32,
            y: bullet.position.y.round() as i32,
            orientation: (bullet.orientation * ORIENTATION_SCALE).round() as i32,
            damage: bullet.damage,
        }
    }

    /// Rebuild a live bullet fired by `team`
    pub fn into_bullet(self, team: Team) -> Bullet {
        Bullet {
            key: BulletKey { team, id: self.id },
            position: Vec2::new(self.x as f32, self.y as f32),
            orientation: self.orientation as f32 / ORIENTATION_SCALE,
            speed: BULLET_SPEED,
            damage: self.damage,
        }
    }
}

/// Full per-tick state of one ship
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipState {
    pub position: [i32; 2],
    pub orientation: f32,
    pub velocity: [f32; 2],
    pub acceleration: [f32; 2],
    /// Hull hp per cell, 0 where no block lives
    pub hp: CellGrid<i32>,
    pub shield_hp: CellGrid<f32>,
    pub active: CellGrid<bool>,
    /// One entry per live turret in creation order, degrees
    pub turrets: Vec<f32>,
    pub bullets: Vec<BulletRecord>,
    /// Human-readable command log since the previous snapshot
    pub actions: Vec<String>,
    /// Script failures caught so far
    pub script_errors: u32,
}
