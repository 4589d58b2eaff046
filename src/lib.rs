//! Block-ship peer - one side of a two-player block-ship duel
//!
//! Core modules:
//! - `game`: ship model, bullets, collisions and the fixed-tick match
//! - `net`: UDP snapshot exchange with the opponent peer
//! - `script`: control script boundary (`ShipScript`, `ShipControl`)
//! - `app`/`config`: process wiring for the binary
//!
//! A control script plugs in from outside the crate:
//!
//! ```
//! use blockship_peer::game::BlockType;
//! use blockship_peer::script::{validate_script, ScriptError};
//! use blockship_peer::{MatchSetup, ShipControl, ShipScript, Side};
//! use std::time::Duration;
//!
//! struct Gunner;
//!
//! impl ShipScript for Gunner {
//!     fn main(&mut self, ctl: &mut ShipControl<'_>) -> Result<(), ScriptError> {
//!         for turret in ctl.own_blocks(BlockType::Turret) {
//!             ctl.fire(turret)?;
//!         }
//!         Ok(())
//!     }
//! }
//!
//! let mut grid = [[0u8; 6]; 6];
//! grid[0][0] = 2;
//! grid[0][1] = 4;
//! let setup = MatchSetup { left: grid, right: grid, side: Side::Left };
//! let report = validate_script(&mut Gunner, &setup, Duration::from_millis(50));
//! assert!(report.is_passed());
//! ```

pub mod app;
pub mod config;
pub mod game;
pub mod net;
pub mod script;
pub mod util;

pub use game::{Match, MatchOutcome, MatchResult, MatchSettings, MatchSetup, Side};
pub use net::GameClient;
pub use script::{ShipControl, ShipScript};
