//! Offline pre-match script check against a throwaway ship pair

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::Duration;
use tracing::info;

use crate::game::combat::BulletSystem;
use crate::game::setup::{MatchSetup, SetupError};
use crate::game::ship::Ship;
use crate::util::time::Timer;

use super::actions::ActionLog;
use super::api::ShipControl;
use super::{guarded, ShipScript};

/// Ticks of `main` run during validation (one second of play)
pub const VALIDATION_TICKS: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// `main` exceeded its time budget
    Timeout,
    /// `init` or `main` returned an error or panicked
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationReport {
    Passed {
        ticks: u32,
        slowest: Duration,
    },
    Failed {
        kind: FailureKind,
        trace: String,
    },
}

impl ValidationReport {
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed { .. })
    }

    fn error(phase: &str, tick: u32, error: impl std::fmt::Display) -> Self {
        Self::Failed {
            kind: FailureKind::Error,
            trace: format!("{phase} failed at tick {tick}: {error}"),
        }
    }
}

/// Run `init` and `VALIDATION_TICKS` calls of `main`, each `main` held to `budget`
pub fn validate_script(
    script: &mut dyn ShipScript,
    setup: &MatchSetup,
    budget: Duration,
) -> ValidationReport {
    let (mut own, opponent) = match practice_ships(setup) {
        Ok(ships) => ships,
        Err(e) => return ValidationReport::error("setup", 0, e),
    };
    let mut bullets = BulletSystem::new();
    let mut actions = ActionLog::new();
    let mut rng = ChaCha8Rng::seed_from_u64(0);

    {
        let mut ctl = ShipControl::new(&mut own, &opponent, &mut bullets, &mut actions, 0);
        if let Err(e) = guarded(|| script.init(&mut ctl)) {
            return ValidationReport::error("init", 0, e);
        }
    }

    let mut slowest = Duration::ZERO;
    for tick in 1..=VALIDATION_TICKS {
        own.update(&mut rng);

        let timer = Timer::new();
        let result = {
            let mut ctl =
                ShipControl::new(&mut own, &opponent, &mut bullets, &mut actions, tick as u64);
            guarded(|| script.main(&mut ctl))
        };
        let elapsed = timer.elapsed();

        if let Err(e) = result {
            return ValidationReport::error("main", tick, e);
        }
        if elapsed > budget {
            return ValidationReport::Failed {
                kind: FailureKind::Timeout,
                trace: format!(
                    "main took {} ms at tick {tick}, budget is {} ms",
                    elapsed.as_millis(),
                    budget.as_millis()
                ),
            };
        }
        slowest = slowest.max(elapsed);
        actions.drain();
    }

    info!(ticks = VALIDATION_TICKS, slowest_us = slowest.as_micros() as u64, "Script validated");
    ValidationReport::Passed {
        ticks: VALIDATION_TICKS,
        slowest,
    }
}

fn practice_ships(setup: &MatchSetup) -> Result<(Ship, Ship), SetupError> {
    let side = setup.side;
    let own = Ship::from_grid(side.team(), setup.local_grid(), side.spawn(), false)?;
    let opponent_side = side.opponent();
    let opponent = Ship::from_grid(
        opponent_side.team(),
        setup.remote_grid(),
        opponent_side.spawn(),
        true,
    )?;
    Ok((own, opponent))
}
