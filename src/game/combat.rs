//! Combat system - bullets, explosions, bullet-vs-ship hit resolution

use glam::{IVec2, Vec2};
use std::collections::HashMap;
use tracing::debug;

use super::block::{Cell, Team};
use super::constants::{
    ship_diagonal, ARENA_HEIGHT, ARENA_WIDTH, BULLET_SIZE, BULLET_SPEED, EXPLOSION_LIFETIME,
    RECENT_HIT_TICKS,
};
use super::mask::Mask;
use super::ship::Ship;
use crate::net::protocol::BulletRecord;
use crate::util::geometry::heading;

/// Bullet ids are only unique per firing team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BulletKey {
    pub team: Team,
    pub id: u32,
}

/// Live projectile
#[derive(Debug, Clone, PartialEq)]
pub struct Bullet {
    pub key: BulletKey,
    pub position: Vec2,
    /// Heading in radians
    pub orientation: f32,
    pub speed: f32,
    pub damage: i32,
}

impl Bullet {
    /// Advance along the heading
    pub fn update(&mut self) {
        self.position += heading(self.orientation) * self.speed;
    }

    /// Top-left pixel of the bullet's mask
    fn mask_origin(&self) -> IVec2 {
        (self.position - Vec2::splat(BULLET_SIZE as f32 / 2.0)).round().as_ivec2()
    }

    /// Inside the arena extended by `margin` on every side
    pub fn in_bounds(&self, margin: f32) -> bool {
        self.position.x >= -margin
            && self.position.y >= -margin
            && self.position.x <= ARENA_WIDTH as f32 + margin
            && self.position.y <= ARENA_HEIGHT as f32 + margin
    }
}

/// Visual-only hit effect
#[derive(Debug, Clone, PartialEq)]
pub struct Explosion {
    pub position: Vec2,
    pub lifetime: u32,
}

/// Hit result from bullet resolution
#[derive(Debug, Clone, PartialEq)]
pub struct HitResult {
    pub bullet: BulletKey,
    pub target_team: Team,
    pub cell: Option<Cell>,
    pub damage: i32,
    pub point: Vec2,
    /// Whether damage was applied to the target's blocks
    pub applied: bool,
    pub destroyed: bool,
}

/// Registry of live bullets and explosions for one match
pub struct BulletSystem {
    bullets: Vec<Bullet>,
    explosions: Vec<Explosion>,
    /// Bullet -> ticks left during which it cannot hit again
    recently_hit: HashMap<BulletKey, u32>,
    next_id: u32,
    bullet_mask: Mask,
    /// Apply cosmetic damage to the mirrored ship as well
    predict_mirror_damage: bool,
}

impl BulletSystem {
    pub fn new() -> Self {
        Self {
            bullets: Vec::new(),
            explosions: Vec::new(),
            recently_hit: HashMap::new(),
            next_id: 0,
            bullet_mask: Mask::filled(BULLET_SIZE, BULLET_SIZE),
            predict_mirror_damage: false,
        }
    }

    pub fn with_mirror_prediction(mut self, enabled: bool) -> Self {
        self.predict_mirror_damage = enabled;
        self
    }

    pub fn bullets(&self) -> &[Bullet] {
        &self.bullets
    }

    pub fn explosions(&self) -> &[Explosion] {
        &self.explosions
    }

    pub fn owned_by(&self, team: Team) -> impl Iterator<Item = &Bullet> + '_ {
        self.bullets.iter().filter(move |b| b.key.team == team)
    }

    pub fn is_recently_hit(&self, key: BulletKey) -> bool {
        self.recently_hit.contains_key(&key)
    }

    /// Spawn a locally fired bullet and return its id
    pub fn spawn(&mut self, team: Team, position: Vec2, orientation: f32, damage: i32) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        self.bullets.push(Bullet {
            key: BulletKey { team, id },
            position,
            orientation,
            speed: BULLET_SPEED,
            damage,
        });
        id
    }

    /// Replace a remote team's bullets with the latest records from its peer
    ///
    /// Records already resolved as hits locally are dropped so one bullet never
    /// lands twice while its owner has not yet seen the hit.
    pub fn sync_remote(&mut self, team: Team, records: Vec<BulletRecord>) {
        self.bullets.retain(|b| b.key.team != team);
        for record in records {
            let key = BulletKey {
                team,
                id: record.id,
            };
            if self.recently_hit.contains_key(&key) {
                continue;
            }
            self.bullets.push(record.into_bullet(team));
        }
    }

    /// Per-tick update; returns the hits resolved this tick
    pub fn update(&mut self, local: &mut Ship, remote: &mut Ship) -> Vec<HitResult> {
        self.recently_hit.retain(|_, ticks| {
            *ticks = ticks.saturating_sub(1);
            *ticks > 0
        });

        self.explosions.retain_mut(|explosion| {
            explosion.lifetime = explosion.lifetime.saturating_sub(1);
            explosion.lifetime > 0
        });

        for bullet in &mut self.bullets {
            bullet.update();
        }

        let margin = ship_diagonal();
        self.bullets.retain(|bullet| bullet.in_bounds(margin));

        let mut hits = self.resolve_hits(local, true);
        let predict = self.predict_mirror_damage;
        hits.extend(self.resolve_hits(remote, predict));
        hits
    }

    /// Test every foreign bullet against `ship`; hits are removed and recorded
    fn resolve_hits(&mut self, ship: &mut Ship, apply_damage: bool) -> Vec<HitResult> {
        let team = ship.team();
        let center = ship.center();
        let reach = ship.bounding_radius() + BULLET_SIZE as f32;
        let origin = ship.mask_origin();
        let mut hits = Vec::new();

        let bullet_mask = &self.bullet_mask;
        let explosions = &mut self.explosions;
        let recently_hit = &mut self.recently_hit;

        self.bullets.retain(|bullet| {
            if bullet.key.team == team || recently_hit.contains_key(&bullet.key) {
                return true;
            }
            if bullet.position.distance_squared(center) > reach * reach {
                return true;
            }

            let offset = bullet.mask_origin() - origin;
            let Some(pixel) = ship.mask().overlap(bullet_mask, offset) else {
                return true;
            };

            let point = (origin + pixel).as_vec2() + Vec2::splat(0.5);
            let cell = ship.cell_at_world(point);
            let destroyed = match cell {
                Some(cell) if apply_damage => {
                    ship.apply_damage(cell, bullet.damage as f32).unwrap_or(false)
                }
                _ => false,
            };

            explosions.push(Explosion {
                position: point,
                lifetime: EXPLOSION_LIFETIME,
            });
            recently_hit.insert(bullet.key, RECENT_HIT_TICKS);

            debug!(
                target_team = team,
                shooter_team = bullet.key.team,
                bullet_id = bullet.key.id,
                damage = bullet.damage,
                applied = apply_damage,
                destroyed,
                "Bullet hit"
            );
            hits.push(HitResult {
                bullet: bullet.key,
                target_team: team,
                cell,
                damage: bullet.damage,
                point,
                applied: apply_damage,
                destroyed,
            });
            false
        });

        hits
    }

    /// Drop everything; used when a match ends
    pub fn clear(&mut self) {
        self.bullets.clear();
        self.explosions.clear();
        self.recently_hit.clear();
    }
}

impl Default for BulletSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::block::BlockType;
    use crate::game::constants::BLOCK_HP;
    use crate::game::physics::Body;
    use crate::game::ship::tests::grid;

    fn ship_at(team: Team, x: i32, mirrored: bool) -> Ship {
        Ship::from_grid(
            team,
            &grid(&[&[1, 1], &[1, 1]]),
            Body::new(IVec2::new(x, 400), 0.0),
            mirrored,
        )
        .unwrap()
    }

    /// A bullet placed just left of the target's top-left block, flying right
    fn incoming(bullets: &mut BulletSystem, shooter: Team, target: &Ship) -> u32 {
        let top_left = target.center() - Vec2::splat(60.0);
        bullets.spawn(shooter, top_left + Vec2::new(-4.0, 10.0), 0.0, 30)
    }

    #[test]
    fn test_bullet_moves_along_heading() {
        let mut bullet = Bullet {
            key: BulletKey { team: 0, id: 0 },
            position: Vec2::new(10.0, 10.0),
            orientation: std::f32::consts::FRAC_PI_2,
            speed: 2.0,
            damage: 1,
        };
        bullet.update();
        assert!((bullet.position - Vec2::new(10.0, 8.0)).length() < 1e-4);
    }

    #[test]
    fn test_hit_damages_local_ship_once() {
        let mut local = ship_at(0, 300, false);
        let mut remote = ship_at(1, 900, true);
        let mut bullets = BulletSystem::new();
        let id = incoming(&mut bullets, 1, &local);

        let hits = bullets.update(&mut local, &mut remote);

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].cell, Some(crate::game::block::Cell::new(0, 0)));
        assert!(bullets.bullets().is_empty());
        assert_eq!(bullets.explosions().len(), 1);
        assert!(bullets.is_recently_hit(BulletKey { team: 1, id }));
        assert_eq!(local.block(hits[0].cell.unwrap()).unwrap().hp, BLOCK_HP - 30);
    }

    #[test]
    fn test_mirror_not_damaged_by_default() {
        let mut local = ship_at(0, 300, false);
        let mut remote = ship_at(1, 900, true);
        let mut bullets = BulletSystem::new();
        incoming(&mut bullets, 0, &remote);

        let hits = bullets.update(&mut local, &mut remote);

        assert_eq!(hits.len(), 1);
        assert!(!hits[0].applied);
        assert!(remote.blocks().values().all(|b| b.hp == BLOCK_HP));
        assert_eq!(bullets.explosions().len(), 1);
    }

    #[test]
    fn test_mirror_prediction_applies_damage() {
        let mut local = ship_at(0, 300, false);
        let mut remote = ship_at(1, 900, true);
        let mut bullets = BulletSystem::new().with_mirror_prediction(true);
        incoming(&mut bullets, 0, &remote);

        bullets.update(&mut local, &mut remote);
        assert!(remote.blocks().values().any(|b| b.hp < BLOCK_HP));
    }

    #[test]
    fn test_own_bullets_pass_through() {
        let mut local = ship_at(0, 300, false);
        let mut remote = ship_at(1, 900, true);
        let mut bullets = BulletSystem::new();
        incoming(&mut bullets, 0, &local);

        let hits = bullets.update(&mut local, &mut remote);
        assert!(hits.is_empty());
        assert_eq!(bullets.bullets().len(), 1);
    }

    #[test]
    fn test_recently_hit_blocks_resync() {
        let mut local = ship_at(0, 300, false);
        let mut remote = ship_at(1, 900, true);
        let mut bullets = BulletSystem::new();
        let id = incoming(&mut bullets, 1, &local);
        bullets.update(&mut local, &mut remote);

        // The owner has not seen the hit yet and still reports the bullet
        let record = BulletRecord {
            id,
            x: 240,
            y: 350,
            orientation: 0,
            damage: 30,
        };
        bullets.sync_remote(1, vec![record]);
        assert!(bullets.bullets().is_empty());
    }

    #[test]
    fn test_sync_replaces_remote_bullets() {
        let mut bullets = BulletSystem::new();
        bullets.spawn(0, Vec2::new(50.0, 50.0), 0.0, 10);
        let records = vec![
            BulletRecord { id: 4, x: 10, y: 10, orientation: 31416, damage: 20 },
            BulletRecord { id: 5, x: 20, y: 20, orientation: 0, damage: 20 },
        ];
        bullets.sync_remote(1, records);
        bullets.sync_remote(1, vec![BulletRecord { id: 5, x: 30, y: 20, orientation: 0, damage: 20 }]);

        assert_eq!(bullets.owned_by(0).count(), 1);
        let remote: Vec<_> = bullets.owned_by(1).collect();
        assert_eq!(remote.len(), 1);
        assert_eq!(remote[0].position, Vec2::new(30.0, 20.0));
    }

    #[test]
    fn test_out_of_bounds_culled_and_explosions_expire() {
        let mut local = ship_at(0, 300, false);
        let mut remote = ship_at(1, 900, true);
        let mut bullets = BulletSystem::new();
        bullets.spawn(0, Vec2::new(-500.0, -500.0), 0.0, 10);
        bullets.explosions.push(Explosion {
            position: Vec2::ZERO,
            lifetime: 1,
        });

        bullets.update(&mut local, &mut remote);
        assert!(bullets.bullets().is_empty());
        assert!(bullets.explosions().is_empty());
    }

    #[test]
    fn test_destroying_block_reports_it() {
        let mut local = ship_at(0, 300, false);
        let mut remote = ship_at(1, 900, true);
        let mut bullets = BulletSystem::new();
        let top_left = local.center() - Vec2::splat(60.0);
        bullets.spawn(1, top_left + Vec2::new(-4.0, 10.0), 0.0, BLOCK_HP * 2);

        let hits = bullets.update(&mut local, &mut remote);
        assert!(hits[0].destroyed);
        assert_eq!(local.blocks().len(), 3);
        assert_eq!(local.cells_of(BlockType::Plain).len(), 3);
    }
}
