//! Block variants occupying one cell of a ship's board

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::constants::{
    BLOCK_HP, BLOCK_SIZE, ENGINE_POWER, GENERATOR_POWER, MOTOR_FORCE, SHIELD_POWER, TURRET_POWER,
};
use super::shield::ShieldState;
use super::turret::TurretState;

/// Team id of the ship that owns a block
pub type Team = u8;

/// Ticks a block flashes after taking a hit
pub const HIT_FLASH_TICKS: u32 = 6;

/// Grid coordinate on a ship's board
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
}

impl Cell {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Center of the cell relative to the board's top-left corner, in pixels
    pub fn center_px(&self) -> (f32, f32) {
        let size = BLOCK_SIZE as f32;
        (
            (self.col as f32 + 0.5) * size,
            (self.row as f32 + 0.5) * size,
        )
    }

    /// Orthogonal neighbours inside a board of `size` x `size`
    pub fn neighbours(&self, size: usize) -> impl Iterator<Item = Cell> + '_ {
        let (row, col) = (self.row as isize, self.col as isize);
        [(-1, 0), (0, 1), (1, 0), (0, -1)]
            .into_iter()
            .filter_map(move |(dr, dc)| {
                let (r, c) = (row + dr, col + dc);
                (r >= 0 && c >= 0 && (r as usize) < size && (c as usize) < size)
                    .then(|| Cell::new(r as usize, c as usize))
            })
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Block type codes as they appear in match-setup grids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    Plain,
    Generator,
    Engine,
    Turret,
    Shield,
}

impl BlockType {
    /// Decode a grid cell; `Ok(None)` is an empty cell
    pub fn from_code(code: u8) -> Result<Option<Self>, u8> {
        match code {
            0 => Ok(None),
            1 => Ok(Some(Self::Plain)),
            2 => Ok(Some(Self::Generator)),
            3 => Ok(Some(Self::Engine)),
            4 => Ok(Some(Self::Turret)),
            5 => Ok(Some(Self::Shield)),
            other => Err(other),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::Plain => 1,
            Self::Generator => 2,
            Self::Engine => 3,
            Self::Turret => 4,
            Self::Shield => 5,
        }
    }
}

/// Engine-specific state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineState {
    /// Throttle fraction in [0, 1]
    pub activation: f32,
}

impl EngineState {
    pub fn set_power_level(&mut self, fraction: f32) {
        self.activation = fraction.clamp(0.0, 1.0);
    }

    pub fn engine_force(&self) -> f32 {
        MOTOR_FORCE * self.activation
    }
}

impl Default for EngineState {
    fn default() -> Self {
        Self { activation: 1.0 }
    }
}

/// Variant payload of a block
#[derive(Debug, Clone)]
pub enum BlockKind {
    Plain,
    Generator,
    Engine(EngineState),
    Shield(ShieldState),
    Turret(TurretState),
}

impl BlockKind {
    pub fn new(block_type: BlockType) -> Self {
        match block_type {
            BlockType::Plain => Self::Plain,
            BlockType::Generator => Self::Generator,
            BlockType::Engine => Self::Engine(EngineState::default()),
            BlockType::Shield => Self::Shield(ShieldState::default()),
            BlockType::Turret => Self::Turret(TurretState::default()),
        }
    }

    pub fn block_type(&self) -> BlockType {
        match self {
            Self::Plain => BlockType::Plain,
            Self::Generator => BlockType::Generator,
            Self::Engine(_) => BlockType::Engine,
            Self::Shield(_) => BlockType::Shield,
            Self::Turret(_) => BlockType::Turret,
        }
    }
}

/// One functional unit on a ship's board
#[derive(Debug, Clone)]
pub struct Block {
    pub cell: Cell,
    /// Team of the owning ship
    pub owner: Team,
    pub hp: i32,
    pub shield_hp: f32,
    pub active: bool,
    /// Remaining hit-flash ticks, cosmetic
    pub hit_timer: u32,
    /// Cell of the shield protecting this block, if any
    pub shielded_by: Option<Cell>,
    pub kind: BlockKind,
}

impl Block {
    pub fn new(cell: Cell, owner: Team, block_type: BlockType) -> Self {
        Self {
            cell,
            owner,
            hp: BLOCK_HP,
            shield_hp: 0.0,
            active: true,
            hit_timer: 0,
            shielded_by: None,
            kind: BlockKind::new(block_type),
        }
    }

    pub fn block_type(&self) -> BlockType {
        self.kind.block_type()
    }

    /// Signed power contribution; inactive blocks contribute nothing
    pub fn power_output(&self) -> f32 {
        if !self.active {
            return 0.0;
        }
        match &self.kind {
            BlockKind::Plain => 0.0,
            BlockKind::Generator => GENERATOR_POWER,
            BlockKind::Engine(engine) => -ENGINE_POWER * engine.activation,
            BlockKind::Shield(shield) => -SHIELD_POWER * shield.intensity as f32,
            BlockKind::Turret(_) => -TURRET_POWER,
        }
    }

    /// Thrust produced this tick, zero unless an active engine
    pub fn engine_force(&self) -> f32 {
        match &self.kind {
            BlockKind::Engine(engine) if self.active => engine.engine_force(),
            _ => 0.0,
        }
    }

    /// Apply damage, shield first. Returns true if the hull is destroyed.
    pub fn take_damage(&mut self, damage: f32) -> bool {
        self.shield_hp -= damage;
        if self.shield_hp < 0.0 {
            self.hp -= (-self.shield_hp).round() as i32;
            self.shield_hp = 0.0;
        }
        self.hit_timer = HIT_FLASH_TICKS;
        self.hp <= 0
    }

    /// Block-local per-tick update (timers, turret rotation)
    pub fn update(&mut self) {
        self.hit_timer = self.hit_timer.saturating_sub(1);
        if let BlockKind::Turret(turret) = &mut self.kind {
            if self.active {
                turret.tick();
            }
        }
    }

    pub fn as_turret(&self) -> Option<&TurretState> {
        match &self.kind {
            BlockKind::Turret(turret) => Some(turret),
            _ => None,
        }
    }

    pub fn as_turret_mut(&mut self) -> Option<&mut TurretState> {
        match &mut self.kind {
            BlockKind::Turret(turret) => Some(turret),
            _ => None,
        }
    }

    pub fn as_engine_mut(&mut self) -> Option<&mut EngineState> {
        match &mut self.kind {
            BlockKind::Engine(engine) => Some(engine),
            _ => None,
        }
    }

    pub fn as_shield(&self) -> Option<&ShieldState> {
        match &self.kind {
            BlockKind::Shield(shield) => Some(shield),
            _ => None,
        }
    }
}

/// Block storage owned by a ship, keyed by board cell
pub type BlockMap = BTreeMap<Cell, Block>;
