//! Ship: block storage, per-tick update, damage and the command surface

use glam::{IVec2, Vec2};
use rand::Rng;
use tracing::debug;

use super::block::{Block, BlockKind, BlockMap, BlockType, Cell, Team};
use super::combat::BulletSystem;
use super::constants::{
    ship_diagonal, ship_extent, BLOCK_SIZE, BULLET_DAMAGE, ENGINE_TORQUE, GRID_SIZE,
    MASS_PER_BLOCK, SHIELD_MAX_INTENSITY, SHIELD_MIN_INTENSITY,
};
use super::mask::Mask;
use super::physics::{Body, PhysicsSystem, Thrust};
use super::setup::{Grid, SetupError};
use super::shield::ShieldState;
use super::turret::muzzle;
use crate::util::geometry::rotate_screen;

/// Errors returned by ship commands
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    #[error("permission denied: ship of team {team} is not controlled by this peer")]
    PermissionDenied { team: Team },

    #[error("no block at {0}")]
    NoSuchBlock(Cell),

    #[error("block at {cell} is not a {expected:?}")]
    WrongKind { cell: Cell, expected: BlockType },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Cells grouped by block type, in creation order
#[derive(Debug, Clone, Default)]
pub struct TypeLists {
    pub plain: Vec<Cell>,
    pub generators: Vec<Cell>,
    pub engines: Vec<Cell>,
    pub shields: Vec<Cell>,
    pub turrets: Vec<Cell>,
}

impl TypeLists {
    pub fn list(&self, block_type: BlockType) -> &[Cell] {
        match block_type {
            BlockType::Plain => &self.plain,
            BlockType::Generator => &self.generators,
            BlockType::Engine => &self.engines,
            BlockType::Shield => &self.shields,
            BlockType::Turret => &self.turrets,
        }
    }

    fn list_mut(&mut self, block_type: BlockType) -> &mut Vec<Cell> {
        match block_type {
            BlockType::Plain => &mut self.plain,
            BlockType::Generator => &mut self.generators,
            BlockType::Engine => &mut self.engines,
            BlockType::Shield => &mut self.shields,
            BlockType::Turret => &mut self.turrets,
        }
    }
}

#[derive(Debug, Clone)]
struct MaskCache {
    orientation: u32,
    revision: u64,
    mask: Mask,
}

/// One player's ship, either locally simulated or mirrored from the peer
#[derive(Debug, Clone)]
pub struct Ship {
    team: Team,
    mirrored: bool,
    pub body: Body,
    mass: f32,
    blocks: BlockMap,
    types: TypeLists,
    /// Cells and types the ship was built with, in creation order
    layout: Vec<(Cell, BlockType)>,
    /// Bumped whenever the block set changes
    revision: u64,
    mask: MaskCache,
}

impl Ship {
    /// Build a ship from a setup grid, wire up shield protection and distribute shield hp
    pub fn from_grid(team: Team, grid: &Grid, body: Body, mirrored: bool) -> Result<Self, SetupError> {
        let mut layout = Vec::new();
        for (row, cells) in grid.iter().enumerate() {
            for (col, &code) in cells.iter().enumerate() {
                let block_type = BlockType::from_code(code)
                    .map_err(|code| SetupError::UnknownBlockCode { row, col, code })?;
                if let Some(block_type) = block_type {
                    layout.push((Cell::new(row, col), block_type));
                }
            }
        }
        Ok(Self::assemble(team, layout, body, mirrored))
    }

    fn assemble(team: Team, layout: Vec<(Cell, BlockType)>, body: Body, mirrored: bool) -> Self {
        let mut blocks = BlockMap::new();
        let mut types = TypeLists::default();
        for &(cell, block_type) in &layout {
            blocks.insert(cell, Block::new(cell, team, block_type));
            types.list_mut(block_type).push(cell);
        }

        let mut ship = Self {
            team,
            mirrored,
            body,
            mass: MASS_PER_BLOCK * blocks.len() as f32,
            blocks,
            types,
            layout,
            revision: 0,
            mask: MaskCache {
                orientation: 0,
                revision: 0,
                mask: Mask::new(0, 0),
            },
        };
        ship.setup_shields();
        ship.compile_mask();
        ship
    }

    /// Whether some cell of the original layout passes `alive` but has no block
    pub(crate) fn is_missing_any(&self, alive: impl Fn(Cell) -> bool) -> bool {
        self.layout
            .iter()
            .any(|(cell, _)| alive(*cell) && !self.blocks.contains_key(cell))
    }

    /// Rebuild the board from the original layout, keeping the cells that pass `alive`
    ///
    /// Shield links, type lists and mass are rebuilt along with the blocks; the body
    /// is kept. Callers overwrite hp and shield hp afterwards.
    pub(crate) fn rebuild(&mut self, alive: impl Fn(Cell) -> bool) {
        let kept = self
            .layout
            .iter()
            .copied()
            .filter(|(cell, _)| alive(*cell))
            .collect();
        let mut rebuilt = Self::assemble(self.team, kept, self.body.clone(), self.mirrored);
        rebuilt.layout = std::mem::take(&mut self.layout);
        rebuilt.revision = self.revision + 1;
        rebuilt.compile_mask();
        debug!(
            team = self.team,
            before = self.blocks.len(),
            after = rebuilt.blocks.len(),
            "Ship rebuilt from layout"
        );
        *self = rebuilt;
    }

    fn setup_shields(&mut self) {
        for shield_cell in self.types.shields.clone() {
            self.with_shield(shield_cell, |shield, _, blocks| {
                for target in shield_cell.neighbours(GRID_SIZE) {
                    shield.add_prtc_block(shield_cell, target, blocks);
                }
                shield.setup(blocks);
            });
        }
    }

    /// Run `f` on a shield's state with mutable access to the rest of the board
    fn with_shield<R>(
        &mut self,
        cell: Cell,
        f: impl FnOnce(&mut ShieldState, bool, &mut BlockMap) -> R,
    ) -> Option<R> {
        let block = self.blocks.get_mut(&cell)?;
        let active = block.active;
        let mut state = match &mut block.kind {
            BlockKind::Shield(shield) => std::mem::take(shield),
            _ => return None,
        };

        let out = f(&mut state, active, &mut self.blocks);

        if let Some(Block {
            kind: BlockKind::Shield(shield),
            ..
        }) = self.blocks.get_mut(&cell)
        {
            *shield = state;
        }
        Some(out)
    }

    pub fn team(&self) -> Team {
        self.team
    }

    pub fn is_mirrored(&self) -> bool {
        self.mirrored
    }

    pub fn mass(&self) -> f32 {
        self.mass
    }

    pub fn blocks(&self) -> &BlockMap {
        &self.blocks
    }

    pub fn block(&self, cell: Cell) -> Option<&Block> {
        self.blocks.get(&cell)
    }

    pub(crate) fn block_mut(&mut self, cell: Cell) -> Option<&mut Block> {
        self.blocks.get_mut(&cell)
    }

    pub fn cells_of(&self, block_type: BlockType) -> &[Cell] {
        self.types.list(block_type)
    }

    pub fn is_destroyed(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn center(&self) -> Vec2 {
        self.body.center()
    }

    /// Radius of the circle containing the ship at any rotation
    pub fn bounding_radius(&self) -> f32 {
        ship_diagonal() / 2.0
    }

    /// Per-tick update: blocks first, then power and physics for the local ship
    pub fn update(&mut self, rng: &mut impl Rng) {
        for block in self.blocks.values_mut() {
            block.update();
        }
        for shield_cell in self.types.shields.clone() {
            self.with_shield(shield_cell, |shield, active, blocks| {
                if active {
                    shield.update_state(blocks);
                }
            });
        }

        if !self.mirrored {
            self.control_power_level(rng);
            let thrust = self.thrust();
            PhysicsSystem::integrate(&mut self.body, thrust, self.mass);
        }

        self.refresh_mask();
    }

    /// Engine output in the ship frame; the nose points along +x
    pub fn thrust(&self) -> Thrust {
        let center_row = GRID_SIZE as f32 / 2.0;
        let mut thrust = Thrust::default();
        for cell in &self.types.engines {
            let Some(block) = self.blocks.get(cell) else {
                continue;
            };
            let force = block.engine_force();
            thrust.force.x += force;
            // Engines above the axis (screen up) swing the nose clockwise
            let lateral = center_row - (cell.row as f32 + 0.5);
            thrust.torque -= force * lateral * ENGINE_TORQUE;
        }
        if self.mass > 0.0 {
            thrust.torque /= self.mass;
        }
        thrust
    }

    /// Apply damage to one block; returns Some(true) if it was destroyed
    pub fn apply_damage(&mut self, cell: Cell, damage: f32) -> Option<bool> {
        let destroyed = self.blocks.get_mut(&cell)?.take_damage(damage);
        if destroyed {
            self.remove_block(cell);
        }
        Some(destroyed)
    }

    /// Remove a block, keeping mass, type lists, shields and the mask in step
    pub fn remove_block(&mut self, cell: Cell) -> Option<Block> {
        let mut block = self.blocks.remove(&cell)?;
        self.types.list_mut(block.block_type()).retain(|c| *c != cell);
        self.mass = MASS_PER_BLOCK * self.blocks.len() as f32;

        if let Some(shield_cell) = block.shielded_by {
            self.with_shield(shield_cell, |shield, active, blocks| {
                shield.detach(cell, active, blocks)
            });
        }
        if let BlockKind::Shield(shield) = &mut block.kind {
            shield.release(&mut self.blocks);
        }

        self.revision += 1;
        self.refresh_mask();
        debug!(team = self.team, cell = %cell, kind = ?block.block_type(), "Block destroyed");
        Some(block)
    }

    /// Switch a block on or off without permission checks; shields freeze and thaw
    pub(crate) fn apply_active(&mut self, cell: Cell, active: bool) {
        let Some(block) = self.blocks.get_mut(&cell) else {
            return;
        };
        if block.active == active {
            return;
        }
        block.active = active;
        self.with_shield(cell, |shield, _, blocks| {
            if active {
                shield.thaw(blocks);
            } else {
                shield.freeze(blocks);
            }
        });
    }

    // Collision mask

    /// Side of the square rotated mask canvas (even, covers the full diagonal)
    pub fn mask_side() -> i32 {
        let side = ship_diagonal().ceil() as i32;
        side + side % 2
    }

    pub fn mask(&self) -> &Mask {
        &self.mask.mask
    }

    /// World position of the mask's top-left pixel
    pub fn mask_origin(&self) -> IVec2 {
        self.body.position - IVec2::splat(Self::mask_side() / 2)
    }

    /// Unrotated silhouette of the live blocks
    fn compile_surface(&self) -> Mask {
        let extent = ship_extent();
        let mut surface = Mask::new(extent, extent);
        for cell in self.blocks.keys() {
            surface.fill_rect(
                cell.col as i32 * BLOCK_SIZE,
                cell.row as i32 * BLOCK_SIZE,
                BLOCK_SIZE,
                BLOCK_SIZE,
            );
        }
        surface
    }

    fn compile_mask(&mut self) {
        let mask = self
            .compile_surface()
            .rotated(self.body.orientation, Self::mask_side());
        self.mask = MaskCache {
            orientation: self.body.orientation.to_bits(),
            revision: self.revision,
            mask,
        };
    }

    /// Recompile the mask if the block set or the rotation changed
    pub fn refresh_mask(&mut self) {
        if self.mask.revision != self.revision
            || self.mask.orientation != self.body.orientation.to_bits()
        {
            self.compile_mask();
        }
    }

    /// Board cell under a world point, falling back to the nearest live block
    pub fn cell_at_world(&self, point: Vec2) -> Option<Cell> {
        let half = ship_extent() as f32 / 2.0;
        let local = rotate_screen(point - self.center(), -self.body.orientation) + Vec2::splat(half);
        let size = BLOCK_SIZE as f32;
        let (col, row) = ((local.x / size).floor(), (local.y / size).floor());

        if col >= 0.0 && row >= 0.0 {
            let cell = Cell::new(row as usize, col as usize);
            if self.blocks.contains_key(&cell) {
                return Some(cell);
            }
        }

        self.blocks
            .keys()
            .map(|cell| {
                let (cx, cy) = cell.center_px();
                (*cell, Vec2::new(cx, cy).distance_squared(local))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(cell, _)| cell)
    }

    // Command surface. Every command fails on a mirrored ship.

    fn ensure_owned(&self) -> Result<(), CommandError> {
        if self.mirrored {
            return Err(CommandError::PermissionDenied { team: self.team });
        }
        Ok(())
    }

    fn ensure_kind(&self, cell: Cell, expected: BlockType) -> Result<(), CommandError> {
        let block = self.blocks.get(&cell).ok_or(CommandError::NoSuchBlock(cell))?;
        if block.block_type() != expected {
            return Err(CommandError::WrongKind { cell, expected });
        }
        Ok(())
    }

    pub fn set_block_active(&mut self, cell: Cell, active: bool) -> Result<(), CommandError> {
        self.ensure_owned()?;
        if !self.blocks.contains_key(&cell) {
            return Err(CommandError::NoSuchBlock(cell));
        }
        self.apply_active(cell, active);
        Ok(())
    }

    pub fn rotate_turret(&mut self, cell: Cell, degrees: f32) -> Result<(), CommandError> {
        self.ensure_owned()?;
        self.ensure_kind(cell, BlockType::Turret)?;
        if !degrees.is_finite() {
            return Err(CommandError::InvalidArgument(format!("angle {degrees}")));
        }
        if let Some(turret) = self.blocks.get_mut(&cell).and_then(Block::as_turret_mut) {
            turret.rotate(degrees);
        }
        Ok(())
    }

    /// Fire a turret; `Ok(None)` when it is inactive or still cooling down
    pub fn fire_turret(
        &mut self,
        cell: Cell,
        bullets: &mut BulletSystem,
    ) -> Result<Option<u32>, CommandError> {
        self.ensure_owned()?;
        self.ensure_kind(cell, BlockType::Turret)?;

        let center = self.center();
        let ship_orientation = self.body.orientation;
        let Some(block) = self.blocks.get_mut(&cell) else {
            return Err(CommandError::NoSuchBlock(cell));
        };
        let active = block.active;
        let Some(turret) = block.as_turret_mut() else {
            return Err(CommandError::WrongKind {
                cell,
                expected: BlockType::Turret,
            });
        };
        if !turret.try_fire(active) {
            return Ok(None);
        }

        let (position, heading) = muzzle(center, ship_orientation, cell, turret.orientation);
        Ok(Some(bullets.spawn(self.team, position, heading, BULLET_DAMAGE)))
    }

    pub fn set_engine_power(&mut self, cell: Cell, fraction: f32) -> Result<(), CommandError> {
        self.ensure_owned()?;
        self.ensure_kind(cell, BlockType::Engine)?;
        if !fraction.is_finite() {
            return Err(CommandError::InvalidArgument(format!("power level {fraction}")));
        }
        if let Some(engine) = self.blocks.get_mut(&cell).and_then(Block::as_engine_mut) {
            engine.set_power_level(fraction);
        }
        Ok(())
    }

    pub fn set_shield_intensity(&mut self, cell: Cell, level: u8) -> Result<(), CommandError> {
        self.ensure_owned()?;
        self.ensure_kind(cell, BlockType::Shield)?;
        if !(SHIELD_MIN_INTENSITY..=SHIELD_MAX_INTENSITY).contains(&level) {
            return Err(CommandError::InvalidArgument(format!("shield intensity {level}")));
        }
        self.with_shield(cell, |shield, active, blocks| {
            shield.set_intensity(level, active, blocks)
        });
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::game::constants::{BLOCK_HP, SHIELD_HP};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    /// Build a 6x6 grid with `rows` copied into the top-left corner
    pub(crate) fn grid(rows: &[&[u8]]) -> Grid {
        let mut grid = [[0u8; GRID_SIZE]; GRID_SIZE];
        for (r, row) in rows.iter().enumerate() {
            for (c, code) in row.iter().enumerate() {
                grid[r][c] = *code;
            }
        }
        grid
    }

    pub(crate) fn local_ship(rows: &[&[u8]]) -> Ship {
        Ship::from_grid(0, &grid(rows), Body::new(IVec2::new(300, 400), 0.0), false).unwrap()
    }

    #[test]
    fn test_mass_follows_block_count() {
        let mut ship = local_ship(&[&[1, 2, 4], &[3, 5, 1]]);
        assert_eq!(ship.mass(), 4.0 * 6.0);

        ship.remove_block(Cell::new(0, 0));
        assert_eq!(ship.mass(), 4.0 * 5.0);

        ship.apply_damage(Cell::new(1, 2), BLOCK_HP as f32 * 10.0);
        assert_eq!(ship.mass(), 4.0 * ship.blocks().len() as f32);
        assert!(ship.cells_of(BlockType::Plain).is_empty());
    }

    #[test]
    fn test_unknown_code_rejected() {
        let result = Ship::from_grid(0, &grid(&[&[7]]), Body::default(), false);
        assert!(matches!(
            result,
            Err(SetupError::UnknownBlockCode { code: 7, .. })
        ));
    }

    #[test]
    fn test_shield_protects_neighbours() {
        let ship = local_ship(&[&[1, 5, 1], &[0, 1, 0]]);
        let shield = ship.block(Cell::new(0, 1)).unwrap().as_shield().unwrap();

        assert_eq!(shield.links.len(), 3);
        let total: f32 = shield.links.iter().map(|l| ship.block(l.cell).unwrap().shield_hp).sum();
        assert!((total - SHIELD_HP).abs() < 1e-4);
    }

    #[test]
    fn test_losing_shield_strips_protection() {
        let mut ship = local_ship(&[&[1, 5, 1]]);
        ship.remove_block(Cell::new(0, 1));
        assert_eq!(ship.block(Cell::new(0, 0)).unwrap().shield_hp, 0.0);
        assert!(ship.block(Cell::new(0, 0)).unwrap().shielded_by.is_none());
    }

    #[test]
    fn test_losing_protected_block_rebalances() {
        let mut ship = local_ship(&[&[1, 5, 1]]);
        ship.remove_block(Cell::new(0, 0));
        let shield = ship.block(Cell::new(0, 1)).unwrap().as_shield().unwrap();
        assert_eq!(shield.links.len(), 1);
        assert_eq!(shield.links[0].max, SHIELD_HP);
    }

    #[test]
    fn test_deactivated_shield_freezes() {
        let mut ship = local_ship(&[&[1, 5]]);
        ship.set_block_active(Cell::new(0, 1), false).unwrap();
        assert_eq!(ship.block(Cell::new(0, 0)).unwrap().shield_hp, 0.0);

        ship.set_block_active(Cell::new(0, 1), true).unwrap();
        assert_eq!(ship.block(Cell::new(0, 0)).unwrap().shield_hp, SHIELD_HP);
    }

    #[test]
    fn test_rebuild_restores_removed_blocks() {
        let mut ship = local_ship(&[&[1, 5, 1], &[4, 0, 4]]);
        let full_mask = ship.mask().count();
        ship.remove_block(Cell::new(0, 1));
        ship.remove_block(Cell::new(1, 0));
        assert!(ship.is_missing_any(|_| true));

        ship.rebuild(|cell| cell != Cell::new(1, 0));

        assert!(!ship.is_missing_any(|cell| cell != Cell::new(1, 0)));
        assert!(ship.block(Cell::new(1, 0)).is_none());
        assert_eq!(ship.mass(), 4.0 * MASS_PER_BLOCK);
        assert_eq!(ship.cells_of(BlockType::Turret), &[Cell::new(1, 2)]);
        assert_eq!(
            ship.block(Cell::new(0, 0)).unwrap().shielded_by,
            Some(Cell::new(0, 1))
        );
        assert!(ship.mask().count() < full_mask);
        assert_eq!(ship.body.position, IVec2::new(300, 400));
    }

    #[test]
    fn test_mask_recompiled_on_removal() {
        let mut ship = local_ship(&[&[1, 1]]);
        let before = ship.mask().count();
        ship.remove_block(Cell::new(0, 1));
        let after = ship.mask().count();
        assert!(after < before);
        assert!(after > 0);
    }

    #[test]
    fn test_cell_at_world_maps_back() {
        let ship = local_ship(&[&[1, 1], &[1, 1]]);
        let half = ship_extent() as f32 / 2.0;
        let (cx, cy) = Cell::new(1, 0).center_px();
        let world = ship.center() + Vec2::new(cx - half, cy - half);
        assert_eq!(ship.cell_at_world(world), Some(Cell::new(1, 0)));

        // Far away points resolve to the nearest block
        let far = ship.center() + Vec2::new(500.0, 500.0);
        assert_eq!(ship.cell_at_world(far), Some(Cell::new(1, 1)));
    }

    #[test]
    fn test_commands_denied_on_mirror() {
        let mut mirror =
            Ship::from_grid(1, &grid(&[&[4, 3]]), Body::default(), true).unwrap();
        let mut bullets = BulletSystem::new();

        assert_eq!(
            mirror.rotate_turret(Cell::new(0, 0), 90.0),
            Err(CommandError::PermissionDenied { team: 1 })
        );
        assert!(matches!(
            mirror.fire_turret(Cell::new(0, 0), &mut bullets),
            Err(CommandError::PermissionDenied { .. })
        ));
        assert!(mirror.set_engine_power(Cell::new(0, 1), 0.5).is_err());
        assert!(mirror.set_block_active(Cell::new(0, 1), false).is_err());
    }

    #[test]
    fn test_command_kind_checks() {
        let mut ship = local_ship(&[&[4, 3]]);
        assert_eq!(
            ship.set_engine_power(Cell::new(0, 0), 0.5),
            Err(CommandError::WrongKind {
                cell: Cell::new(0, 0),
                expected: BlockType::Engine
            })
        );
        assert_eq!(
            ship.rotate_turret(Cell::new(5, 5), 0.0),
            Err(CommandError::NoSuchBlock(Cell::new(5, 5)))
        );
        assert!(ship.set_shield_intensity(Cell::new(0, 0), 2).is_err());
    }

    #[test]
    fn test_engines_push_local_ship_only() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut ship = local_ship(&[&[2, 2], &[3, 3]]);
        let mut mirror = Ship::from_grid(1, &grid(&[&[2, 2], &[3, 3]]), Body::default(), true).unwrap();

        for _ in 0..5 {
            ship.update(&mut rng);
            mirror.update(&mut rng);
        }

        assert!(ship.body.speed.x > 0.0);
        assert!(ship.body.position.x > 300);
        assert_eq!(mirror.body.speed, Vec2::ZERO);
    }

    #[test]
    fn test_off_axis_engine_turns_ship() {
        // Single engine in the top row swings the nose clockwise (negative angle)
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut ship = local_ship(&[&[3, 2, 2]]);
        ship.update(&mut rng);
        assert!(ship.body.circular_speed < 0.0);
    }
}
