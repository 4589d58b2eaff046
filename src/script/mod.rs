//! Control script boundary
//!
//! A script is anything implementing [`ShipScript`]. It is always invoked through
//! [`ScriptRunner`] (or [`validate_script`]), which turns errors and panics into a
//! counted [`ScriptError`] instead of tearing down the match.

pub mod actions;
pub mod api;
pub mod sentry;
pub mod validate;

use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::warn;

use crate::game::ship::CommandError;

pub use actions::{Action, ActionLog};
pub use api::{BlockDetail, BlockHandle, BlockInfo, ShipControl};
pub use sentry::SentryScript;
pub use validate::{validate_script, FailureKind, ValidationReport};

/// Failure raised from inside a script call
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScriptError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("script panicked: {0}")]
    Panic(String),

    #[error("script error: {0}")]
    Failed(String),
}

/// Ship controller plugin: `init` once at match start, `main` once per tick
pub trait ShipScript: Send {
    fn init(&mut self, _ctl: &mut ShipControl<'_>) -> Result<(), ScriptError> {
        Ok(())
    }

    fn main(&mut self, ctl: &mut ShipControl<'_>) -> Result<(), ScriptError>;
}

/// Run one script call, converting a panic into `ScriptError::Panic`
pub(crate) fn guarded(call: impl FnOnce() -> Result<(), ScriptError>) -> Result<(), ScriptError> {
    catch_unwind(AssertUnwindSafe(call)).unwrap_or_else(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Err(ScriptError::Panic(message))
    })
}

/// Owns the match's script and counts its failures
pub struct ScriptRunner {
    script: Box<dyn ShipScript>,
    errors: u32,
}

impl ScriptRunner {
    pub fn new(script: Box<dyn ShipScript>) -> Self {
        Self { script, errors: 0 }
    }

    /// Failures caught so far, reported to the peer with every snapshot
    pub fn errors(&self) -> u32 {
        self.errors
    }

    pub fn run_init(&mut self, ctl: &mut ShipControl<'_>) -> Result<(), ScriptError> {
        let script = &mut self.script;
        let result = guarded(|| script.init(ctl));
        self.record("init", ctl.tick(), result)
    }

    pub fn run_main(&mut self, ctl: &mut ShipControl<'_>) -> Result<(), ScriptError> {
        let script = &mut self.script;
        let result = guarded(|| script.main(ctl));
        self.record("main", ctl.tick(), result)
    }

    fn record(
        &mut self,
        phase: &'static str,
        tick: u64,
        result: Result<(), ScriptError>,
    ) -> Result<(), ScriptError> {
        if let Err(e) = &result {
            self.errors = self.errors.saturating_add(1);
            warn!(phase, tick, errors = self.errors, error = %e, "Script failed");
        }
        result
    }
}
