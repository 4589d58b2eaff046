//! Snapshot building and mirror application

use glam::{IVec2, Vec2};

use crate::net::protocol::{BulletRecord, CellGrid, PeerMsg, ShipState};

use super::block::{BlockType, Cell};
use super::combat::BulletSystem;
use super::constants::GRID_SIZE;
use super::ship::Ship;

/// Builds per-tick snapshots of the local ship
pub struct SnapshotBuilder {
    stats: SnapshotStats,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self {
            stats: SnapshotStats::default(),
        }
    }

    pub fn stats(&self) -> &SnapshotStats {
        &self.stats
    }

    /// Capture the full state of `ship` plus every live bullet it owns
    pub fn build(
        &mut self,
        ship: &Ship,
        bullets: &BulletSystem,
        actions: Vec<String>,
        script_errors: u32,
    ) -> ShipState {
        let mut hp: CellGrid<i32> = [[0; GRID_SIZE]; GRID_SIZE];
        let mut shield_hp: CellGrid<f32> = [[0.0; GRID_SIZE]; GRID_SIZE];
        let mut active: CellGrid<bool> = [[false; GRID_SIZE]; GRID_SIZE];
        for (cell, block) in ship.blocks() {
            hp[cell.row][cell.col] = block.hp;
            shield_hp[cell.row][cell.col] = block.shield_hp;
            active[cell.row][cell.col] = block.active;
        }

        let turrets = ship
            .cells_of(BlockType::Turret)
            .iter()
            .filter_map(|cell| ship.block(*cell).and_then(|b| b.as_turret()))
            .map(|turret| turret.orientation)
            .collect();

        let bullets: Vec<BulletRecord> = bullets
            .owned_by(ship.team())
            .map(BulletRecord::from_bullet)
            .collect();

        self.stats.record(bullets.len());

        ShipState {
            position: ship.body.position.to_array(),
            orientation: ship.body.orientation,
            velocity: ship.body.speed.to_array(),
            acceleration: ship.body.acc.to_array(),
            hp,
            shield_hp,
            active,
            turrets,
            bullets,
            actions,
            script_errors,
        }
    }

    /// Wrap a state into the wire message for `tick`
    pub fn message(tick: u64, state: ShipState) -> PeerMsg {
        PeerMsg::Snapshot { tick, state }
    }
}

impl Default for SnapshotBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Overwrite a mirrored ship with the peer's reported state
///
/// Blocks reported with hp <= 0 are removed first so mass, type lists and the
/// mask stay consistent. Blocks reported alive that the mirror lost to predicted
/// damage are rebuilt. Turret orientations are matched by list position.
pub fn apply_snapshot(ship: &mut Ship, state: &ShipState) {
    let reported_alive = |cell: Cell| state.hp[cell.row][cell.col] > 0;
    if ship.is_missing_any(reported_alive) {
        ship.rebuild(reported_alive);
    }

    let dead: Vec<Cell> = ship
        .blocks()
        .keys()
        .copied()
        .filter(|cell| state.hp[cell.row][cell.col] <= 0)
        .collect();
    for cell in dead {
        ship.remove_block(cell);
    }

    let cells: Vec<Cell> = ship.blocks().keys().copied().collect();
    for cell in cells {
        if let Some(block) = ship.block_mut(cell) {
            block.hp = state.hp[cell.row][cell.col];
            block.shield_hp = state.shield_hp[cell.row][cell.col];
            block.active = state.active[cell.row][cell.col];
        }
    }

    let turret_cells = ship.cells_of(BlockType::Turret).to_vec();
    for (cell, orientation) in turret_cells.into_iter().zip(&state.turrets) {
        if let Some(turret) = ship.block_mut(cell).and_then(|b| b.as_turret_mut()) {
            turret.orientation = *orientation;
        }
    }

    ship.body.position = IVec2::from_array(state.position);
    ship.body.orientation = state.orientation;
    ship.body.speed = Vec2::from_array(state.velocity);
    ship.body.acc = Vec2::from_array(state.acceleration);
    ship.refresh_mask();
}

/// Running snapshot counters for debugging
#[derive(Debug, Default)]
pub struct SnapshotStats {
    pub total_snapshots: u64,
    pub avg_bullets_per_snapshot: f32,
}

impl SnapshotStats {
    pub fn record(&mut self, bullet_count: usize) {
        self.total_snapshots += 1;

        // Running average
        let n = self.total_snapshots as f32;
        self.avg_bullets_per_snapshot =
            self.avg_bullets_per_snapshot * ((n - 1.0) / n) + (bullet_count as f32 / n);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::physics::Body;
    use crate::game::ship::tests::{grid, local_ship};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const ROWS: &[&[u8]] = &[&[2, 4, 5, 1], &[3, 4, 1, 3]];

    fn mirror() -> Ship {
        Ship::from_grid(1, &grid(ROWS), Body::default(), true).unwrap()
    }

    #[test]
    fn test_fresh_mirror_reproduces_state() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut local = local_ship(ROWS);
        local.rotate_turret(Cell::new(0, 1), 90.0).unwrap();
        for _ in 0..4 {
            local.update(&mut rng);
        }
        local.apply_damage(Cell::new(1, 2), 45.0);
        local.apply_damage(Cell::new(0, 3), 55.0);
        local.remove_block(Cell::new(1, 0));
        local.set_block_active(Cell::new(1, 3), false).unwrap();

        let mut builder = SnapshotBuilder::new();
        let bullets = BulletSystem::new();
        let state = builder.build(&local, &bullets, Vec::new(), 0);

        let mut mirror = mirror();
        apply_snapshot(&mut mirror, &state);
        let echoed = builder.build(&mirror, &bullets, Vec::new(), 0);

        assert_eq!(echoed.hp, state.hp);
        assert_eq!(
            echoed.shield_hp.map(|row| row.map(f32::to_bits)),
            state.shield_hp.map(|row| row.map(f32::to_bits))
        );
        assert_eq!(echoed.active, state.active);
        assert_eq!(
            echoed.turrets.iter().map(|t| t.to_bits()).collect::<Vec<_>>(),
            state.turrets.iter().map(|t| t.to_bits()).collect::<Vec<_>>()
        );
        assert_eq!(mirror.mass(), local.mass());
        assert_eq!(mirror.body.position, local.body.position);
    }

    #[test]
    fn test_dead_blocks_removed_from_mirror() {
        let mut builder = SnapshotBuilder::new();
        let mut local = local_ship(ROWS);
        local.remove_block(Cell::new(0, 1));
        let state = builder.build(&local, &BulletSystem::new(), Vec::new(), 0);

        let mut mirror = mirror();
        apply_snapshot(&mut mirror, &state);

        assert!(mirror.block(Cell::new(0, 1)).is_none());
        assert_eq!(mirror.cells_of(BlockType::Turret), &[Cell::new(1, 1)]);
    }

    #[test]
    fn test_mirror_rebuilds_blocks_reported_alive() {
        let mut builder = SnapshotBuilder::new();
        let local = local_ship(ROWS);
        let state = builder.build(&local, &BulletSystem::new(), Vec::new(), 0);

        let mut mirror = mirror();
        mirror.apply_damage(Cell::new(0, 1), 1000.0);
        mirror.apply_damage(Cell::new(1, 3), 1000.0);
        assert!(mirror.block(Cell::new(0, 1)).is_none());

        apply_snapshot(&mut mirror, &state);

        assert_eq!(mirror.blocks().len(), local.blocks().len());
        assert_eq!(mirror.mass(), local.mass());
        assert_eq!(mirror.cells_of(BlockType::Turret), local.cells_of(BlockType::Turret));
        assert_eq!(mirror.block(Cell::new(0, 1)).unwrap().hp, state.hp[0][1]);
        let echoed = builder.build(&mirror, &BulletSystem::new(), Vec::new(), 0);
        assert_eq!(echoed.hp, state.hp);
        assert_eq!(echoed.active, state.active);
    }

    #[test]
    fn test_only_own_bullets_reported() {
        let mut builder = SnapshotBuilder::new();
        let local = local_ship(ROWS);
        let mut bullets = BulletSystem::new();
        bullets.spawn(0, Vec2::new(10.0, 20.0), 0.5, 20);
        bullets.spawn(1, Vec2::new(30.0, 40.0), 0.0, 20);

        let state = builder.build(&local, &bullets, vec!["fire (0, 1)".into()], 2);

        assert_eq!(state.bullets.len(), 1);
        assert_eq!(state.bullets[0].orientation, 5000);
        assert_eq!(state.actions, vec!["fire (0, 1)".to_string()]);
        assert_eq!(state.script_errors, 2);
        assert_eq!(builder.stats().total_snapshots, 1);
    }
}
