//! Game simulation modules

pub mod block;
pub mod collision;
pub mod combat;
pub mod constants;
pub mod mask;
pub mod r#match;
pub mod physics;
pub mod power;
pub mod setup;
pub mod shield;
pub mod ship;
pub mod snapshot;
pub mod turret;

pub use block::{Block, BlockKind, BlockType, Cell, Team};
pub use r#match::{EndReason, Match, MatchOutcome, MatchPhase, MatchResult, MatchSettings, TickReport};
pub use setup::{MatchSetup, SetupError, Side};
pub use ship::{CommandError, Ship};
