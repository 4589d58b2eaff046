//! Capability surface handed to the control script each tick
//!
//! Blocks are addressed by [`BlockHandle`] (team + cell). Both ships can be read;
//! only the local ship accepts commands.

use glam::Vec2;

use crate::game::block::{Block, BlockKind, BlockType, Cell, Team};
use crate::game::combat::BulletSystem;
use crate::game::constants::ship_extent;
use crate::game::ship::{CommandError, Ship};
use crate::util::geometry::{cartesian_to_polar, normalize_degrees, rotate_screen};

use super::actions::{Action, ActionLog};

/// Non-owning reference to a block of either ship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockHandle {
    pub team: Team,
    pub cell: Cell,
}

/// Read-only view of one block
#[derive(Debug, Clone, PartialEq)]
pub struct BlockInfo {
    pub handle: BlockHandle,
    pub block_type: BlockType,
    pub hp: i32,
    pub shield_hp: f32,
    pub active: bool,
    pub power_output: f32,
    pub detail: BlockDetail,
}

/// Type-specific readings
#[derive(Debug, Clone, PartialEq)]
pub enum BlockDetail {
    Plain,
    Generator,
    Engine {
        activation: f32,
    },
    Shield {
        intensity: u8,
        protected: Vec<Cell>,
    },
    Turret {
        /// Degrees relative to the ship's nose
        orientation: f32,
        rotating: bool,
        fire_ready: bool,
    },
}

impl BlockInfo {
    fn from_block(block: &Block) -> Self {
        let detail = match &block.kind {
            BlockKind::Plain => BlockDetail::Plain,
            BlockKind::Generator => BlockDetail::Generator,
            BlockKind::Engine(engine) => BlockDetail::Engine {
                activation: engine.activation,
            },
            BlockKind::Shield(shield) => BlockDetail::Shield {
                intensity: shield.intensity,
                protected: shield.links.iter().map(|l| l.cell).collect(),
            },
            BlockKind::Turret(turret) => BlockDetail::Turret {
                orientation: turret.orientation,
                rotating: turret.is_rotating(),
                fire_ready: turret.can_fire(),
            },
        };
        Self {
            handle: BlockHandle {
                team: block.owner,
                cell: block.cell,
            },
            block_type: block.block_type(),
            hp: block.hp,
            shield_hp: block.shield_hp,
            active: block.active,
            power_output: block.power_output(),
            detail,
        }
    }
}

/// Everything a script may touch during one call
pub struct ShipControl<'a> {
    own: &'a mut Ship,
    opponent: &'a Ship,
    bullets: &'a mut BulletSystem,
    actions: &'a mut ActionLog,
    tick: u64,
}

impl<'a> ShipControl<'a> {
    pub fn new(
        own: &'a mut Ship,
        opponent: &'a Ship,
        bullets: &'a mut BulletSystem,
        actions: &'a mut ActionLog,
        tick: u64,
    ) -> Self {
        Self {
            own,
            opponent,
            bullets,
            actions,
            tick,
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn own_team(&self) -> Team {
        self.own.team()
    }

    pub fn opponent_team(&self) -> Team {
        self.opponent.team()
    }

    fn ship(&self, team: Team) -> Option<&Ship> {
        if team == self.own.team() {
            Some(&*self.own)
        } else if team == self.opponent.team() {
            Some(self.opponent)
        } else {
            None
        }
    }

    // Read accessors, available for both ships

    /// Live blocks of `team` of one type, in creation order
    pub fn blocks_of(&self, team: Team, block_type: BlockType) -> Vec<BlockHandle> {
        self.ship(team)
            .map(|ship| {
                ship.cells_of(block_type)
                    .iter()
                    .map(|&cell| BlockHandle { team, cell })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn own_blocks(&self, block_type: BlockType) -> Vec<BlockHandle> {
        self.blocks_of(self.own.team(), block_type)
    }

    pub fn opponent_blocks(&self, block_type: BlockType) -> Vec<BlockHandle> {
        self.blocks_of(self.opponent.team(), block_type)
    }

    pub fn info(&self, handle: BlockHandle) -> Option<BlockInfo> {
        self.ship(handle.team)?
            .block(handle.cell)
            .map(BlockInfo::from_block)
    }

    pub fn position(&self, team: Team) -> Option<Vec2> {
        self.ship(team).map(Ship::center)
    }

    /// Heading of a ship in radians
    pub fn orientation(&self, team: Team) -> Option<f32> {
        self.ship(team).map(|s| s.body.orientation)
    }

    pub fn velocity(&self, team: Team) -> Option<Vec2> {
        self.ship(team).map(|s| s.body.speed)
    }

    pub fn power_level(&self) -> f32 {
        self.own.power_level()
    }

    /// World position of a block's center
    pub fn block_position(&self, handle: BlockHandle) -> Option<Vec2> {
        let ship = self.ship(handle.team)?;
        ship.block(handle.cell)?;
        let half = ship_extent() as f32 / 2.0;
        let (cx, cy) = handle.cell.center_px();
        Some(ship.center() + rotate_screen(Vec2::new(cx - half, cy - half), ship.body.orientation))
    }

    /// Turret angle (degrees, relative to the nose) that points a block at `target`
    pub fn aim_angle(&self, handle: BlockHandle, target: Vec2) -> Option<f32> {
        let from = self.block_position(handle)?;
        let ship = self.ship(handle.team)?;
        let (_, world) = cartesian_to_polar(target - from);
        Some(normalize_degrees((world - ship.body.orientation).to_degrees()))
    }

    // Commands, local ship only

    fn owned(&self, handle: BlockHandle) -> Result<Cell, CommandError> {
        if handle.team != self.own.team() {
            return Err(CommandError::PermissionDenied { team: handle.team });
        }
        Ok(handle.cell)
    }

    pub fn activate(&mut self, handle: BlockHandle) -> Result<(), CommandError> {
        let cell = self.owned(handle)?;
        self.own.set_block_active(cell, true)?;
        self.actions.push(Action::Activate(cell));
        Ok(())
    }

    pub fn deactivate(&mut self, handle: BlockHandle) -> Result<(), CommandError> {
        let cell = self.owned(handle)?;
        self.own.set_block_active(cell, false)?;
        self.actions.push(Action::Deactivate(cell));
        Ok(())
    }

    pub fn rotate_turret(&mut self, handle: BlockHandle, degrees: f32) -> Result<(), CommandError> {
        let cell = self.owned(handle)?;
        self.own.rotate_turret(cell, degrees)?;
        self.actions.push(Action::Rotate { cell, degrees });
        Ok(())
    }

    /// Returns the new bullet's id, or `None` while cooling down or inactive
    pub fn fire(&mut self, handle: BlockHandle) -> Result<Option<u32>, CommandError> {
        let cell = self.owned(handle)?;
        let fired = self.own.fire_turret(cell, self.bullets)?;
        if let Some(bullet) = fired {
            self.actions.push(Action::Fire { cell, bullet });
        }
        Ok(fired)
    }

    pub fn set_engine_power(&mut self, handle: BlockHandle, fraction: f32) -> Result<(), CommandError> {
        let cell = self.owned(handle)?;
        self.own.set_engine_power(cell, fraction)?;
        self.actions.push(Action::EnginePower { cell, fraction });
        Ok(())
    }

    pub fn set_shield_intensity(&mut self, handle: BlockHandle, level: u8) -> Result<(), CommandError> {
        let cell = self.owned(handle)?;
        self.own.set_shield_intensity(cell, level)?;
        self.actions.push(Action::ShieldIntensity { cell, level });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::physics::Body;
    use crate::game::ship::tests::{grid, local_ship};
    use glam::IVec2;

    fn opponent() -> Ship {
        Ship::from_grid(1, &grid(&[&[2, 4], &[3, 5]]), Body::new(IVec2::new(900, 400), 0.0), true)
            .unwrap()
    }

    #[test]
    fn test_opponent_commands_denied() {
        let mut own = local_ship(&[&[2, 4], &[3, 5]]);
        let opponent = opponent();
        let mut bullets = BulletSystem::new();
        let mut actions = ActionLog::new();
        let mut ctl = ShipControl::new(&mut own, &opponent, &mut bullets, &mut actions, 0);

        let enemy_turret = ctl.opponent_blocks(BlockType::Turret)[0];
        assert_eq!(
            ctl.rotate_turret(enemy_turret, 10.0),
            Err(CommandError::PermissionDenied { team: 1 })
        );
        assert!(ctl.fire(enemy_turret).is_err());
        let enemy_engine = ctl.opponent_blocks(BlockType::Engine)[0];
        assert!(ctl.set_engine_power(enemy_engine, 1.0).is_err());
        assert!(ctl.deactivate(enemy_engine).is_err());
        let enemy_shield = ctl.opponent_blocks(BlockType::Shield)[0];
        assert!(ctl.set_shield_intensity(enemy_shield, 2).is_err());

        // Reads still work
        assert_eq!(ctl.info(enemy_turret).unwrap().hp, 100);
        assert!(actions.is_empty());
    }

    #[test]
    fn test_commands_are_logged() {
        let mut own = local_ship(&[&[2, 4], &[3, 5]]);
        let opponent = opponent();
        let mut bullets = BulletSystem::new();
        let mut actions = ActionLog::new();
        let mut ctl = ShipControl::new(&mut own, &opponent, &mut bullets, &mut actions, 3);

        let engine = ctl.own_blocks(BlockType::Engine)[0];
        ctl.set_engine_power(engine, 0.25).unwrap();
        let turret = ctl.own_blocks(BlockType::Turret)[0];
        ctl.rotate_turret(turret, 30.0).unwrap();
        // Fresh turret is still cooling down
        assert_eq!(ctl.fire(turret), Ok(None));
        ctl.deactivate(turret).unwrap();
        assert!(!ctl.info(turret).unwrap().active);
        ctl.activate(turret).unwrap();

        match ctl.info(engine).unwrap().detail {
            BlockDetail::Engine { activation } => assert_eq!(activation, 0.25),
            other => panic!("unexpected detail {other:?}"),
        }
        assert_eq!(
            actions.drain(),
            vec![
                Action::EnginePower {
                    cell: Cell::new(1, 0),
                    fraction: 0.25
                },
                Action::Rotate {
                    cell: Cell::new(0, 1),
                    degrees: 30.0
                },
                Action::Deactivate(Cell::new(0, 1)),
                Action::Activate(Cell::new(0, 1)),
            ]
        );
    }

    #[test]
    fn test_aim_angle_points_at_target() {
        let mut own = local_ship(&[&[4]]);
        let opponent = opponent();
        let mut bullets = BulletSystem::new();
        let mut actions = ActionLog::new();
        let ctl = ShipControl::new(&mut own, &opponent, &mut bullets, &mut actions, 0);

        let turret = ctl.own_blocks(BlockType::Turret)[0];
        let from = ctl.block_position(turret).unwrap();
        let right = ctl.aim_angle(turret, from + Vec2::new(100.0, 0.0)).unwrap();
        let up = ctl.aim_angle(turret, from + Vec2::new(0.0, -100.0)).unwrap();
        assert!(right.abs() < 1e-3 || (right - 360.0).abs() < 1e-3);
        assert!((up - 90.0).abs() < 1e-3);
    }
}
