//! Match setup handed over by the lobby: both ship grids and this peer's side

use glam::IVec2;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::block::{BlockType, Team};
use super::constants::{ARENA_HEIGHT, ARENA_WIDTH, GRID_SIZE};
use super::physics::Body;

/// Ship layout: cell value is a block-type code, 0 = empty
pub type Grid = [[u8; GRID_SIZE]; GRID_SIZE];

/// Starting position assigned to a peer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn team(self) -> Team {
        match self {
            Self::Left => 0,
            Self::Right => 1,
        }
    }

    pub fn opponent(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Spawn body: left starts a quarter in facing right, right mirrors it
    pub fn spawn(self) -> Body {
        let y = ARENA_HEIGHT / 2;
        match self {
            Self::Left => Body::new(IVec2::new(ARENA_WIDTH / 4, y), 0.0),
            Self::Right => Body::new(IVec2::new(ARENA_WIDTH * 3 / 4, y), std::f32::consts::PI),
        }
    }
}

/// Match setup errors
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("failed to read match setup: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed match setup: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unknown block code {code} at row {row}, col {col}")]
    UnknownBlockCode { row: usize, col: usize, code: u8 },

    #[error("{0:?} ship has no blocks")]
    EmptyShip(Side),
}

/// Both ship layouts and the side this peer plays
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchSetup {
    pub left: Grid,
    pub right: Grid,
    pub side: Side,
}

impl MatchSetup {
    /// Load and validate a setup file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SetupError> {
        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self, SetupError> {
        let setup: Self = serde_json::from_str(raw)?;
        setup.validate()?;
        Ok(setup)
    }

    pub fn validate(&self) -> Result<(), SetupError> {
        for (side, grid) in [(Side::Left, &self.left), (Side::Right, &self.right)] {
            let mut blocks = 0;
            for (row, cells) in grid.iter().enumerate() {
                for (col, &code) in cells.iter().enumerate() {
                    match BlockType::from_code(code) {
                        Ok(Some(_)) => blocks += 1,
                        Ok(None) => {}
                        Err(code) => return Err(SetupError::UnknownBlockCode { row, col, code }),
                    }
                }
            }
            if blocks == 0 {
                return Err(SetupError::EmptyShip(side));
            }
        }
        Ok(())
    }

    pub fn grid(&self, side: Side) -> &Grid {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    pub fn local_grid(&self) -> &Grid {
        self.grid(self.side)
    }

    pub fn remote_grid(&self) -> &Grid {
        self.grid(self.side.opponent())
    }
}
