//! Match context and fixed-rate tick loop

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::fmt;
use std::future::Future;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};
use uuid::Uuid;

use crate::net::client::{GameClient, Inbound};
use crate::net::protocol::{PeerMsg, ShipState};
use crate::script::{ActionLog, ScriptRunner, ShipControl, ShipScript};
use crate::util::time::tick_duration;

use super::collision::{Bounce, CollisionSystem};
use super::combat::{BulletSystem, HitResult};
use super::setup::{MatchSetup, SetupError, Side};
use super::ship::Ship;
use super::snapshot::{apply_snapshot, SnapshotBuilder};

/// Match phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    /// Built, script not yet initialised
    Waiting,
    InProgress,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    Victory(Side),
    Draw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    ShipDestroyed,
    PeerLeft,
    TickLimit,
    Shutdown,
}

impl EndReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ShipDestroyed => "ship destroyed",
            Self::PeerLeft => "peer left",
            Self::TickLimit => "tick limit reached",
            Self::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How and when a match finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchResult {
    pub outcome: MatchOutcome,
    pub reason: EndReason,
    pub ticks: u64,
}

/// Per-match knobs taken from configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchSettings {
    pub seed: u64,
    /// 0 = unbounded
    pub max_ticks: u64,
    pub predict_mirror_damage: bool,
}

/// What happened during one tick
#[derive(Debug, Clone)]
pub struct TickReport {
    /// Local ship state to send to the peer
    pub state: ShipState,
    pub hits: Vec<HitResult>,
    pub bounce: Option<Bounce>,
}

/// One peer's view of a match: its own ship, the mirrored opponent and the shared world
pub struct Match {
    id: Uuid,
    side: Side,
    seed: u64,
    phase: MatchPhase,
    tick: u64,
    max_ticks: u64,
    local: Ship,
    remote: Ship,
    bullets: BulletSystem,
    collisions: CollisionSystem,
    rng: ChaCha8Rng,
    script: ScriptRunner,
    actions: ActionLog,
    snapshots: SnapshotBuilder,
    opponent_script_errors: u32,
    /// Whether the peer's last snapshot still had a live block
    remote_reported_alive: bool,
    result: Option<MatchResult>,
}

impl Match {
    pub fn new(
        id: Uuid,
        setup: &MatchSetup,
        script: Box<dyn ShipScript>,
        settings: MatchSettings,
    ) -> Result<Self, SetupError> {
        let side = setup.side;
        let opponent = side.opponent();
        let local = Ship::from_grid(side.team(), setup.local_grid(), side.spawn(), false)?;
        let remote = Ship::from_grid(opponent.team(), setup.remote_grid(), opponent.spawn(), true)?;

        Ok(Self {
            id,
            side,
            seed: settings.seed,
            phase: MatchPhase::Waiting,
            tick: 0,
            max_ticks: settings.max_ticks,
            local,
            remote,
            bullets: BulletSystem::new().with_mirror_prediction(settings.predict_mirror_damage),
            collisions: CollisionSystem::new(),
            rng: ChaCha8Rng::seed_from_u64(settings.seed),
            script: ScriptRunner::new(script),
            actions: ActionLog::new(),
            snapshots: SnapshotBuilder::new(),
            opponent_script_errors: 0,
            remote_reported_alive: true,
            result: None,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn local(&self) -> &Ship {
        &self.local
    }

    pub fn remote(&self) -> &Ship {
        &self.remote
    }

    pub fn bullets(&self) -> &BulletSystem {
        &self.bullets
    }

    pub fn script_errors(&self) -> u32 {
        self.script.errors()
    }

    pub fn opponent_script_errors(&self) -> u32 {
        self.opponent_script_errors
    }

    pub fn result(&self) -> Option<MatchResult> {
        self.result
    }

    /// Run the script's `init` and enter the playing phase
    pub fn start(&mut self) {
        if self.phase != MatchPhase::Waiting {
            return;
        }
        let mut ctl = ShipControl::new(
            &mut self.local,
            &self.remote,
            &mut self.bullets,
            &mut self.actions,
            self.tick,
        );
        let _ = self.script.run_init(&mut ctl);
        self.phase = MatchPhase::InProgress;
        info!(match_id = %self.id, side = ?self.side, seed = self.seed, "Match started");
    }

    /// Run a single simulation tick; `None` once the match has ended
    pub fn advance_tick(&mut self, inbound: Inbound) -> Option<TickReport> {
        match self.phase {
            MatchPhase::Ended => return None,
            MatchPhase::Waiting => self.start(),
            MatchPhase::InProgress => {}
        }
        self.tick += 1;

        let peer_left = inbound.peer_left;
        self.apply_inbound(inbound);

        self.local.update(&mut self.rng);
        self.remote.update(&mut self.rng);

        {
            let mut ctl = ShipControl::new(
                &mut self.local,
                &self.remote,
                &mut self.bullets,
                &mut self.actions,
                self.tick,
            );
            let _ = self.script.run_main(&mut ctl);
        }

        let hits = self.bullets.update(&mut self.local, &mut self.remote);
        let bounce = self
            .collisions
            .update(&mut self.local, &self.remote, &mut self.rng);

        let state = self.snapshots.build(
            &self.local,
            &self.bullets,
            self.actions.drain_lines(),
            self.script.errors(),
        );

        self.check_end(peer_left);

        Some(TickReport {
            state,
            hits,
            bounce,
        })
    }

    /// Newest opponent state onto the mirror, staged opponent bullets into the world
    fn apply_inbound(&mut self, inbound: Inbound) {
        if let Some((peer_tick, state)) = inbound.snapshot {
            apply_snapshot(&mut self.remote, &state);
            self.remote_reported_alive = state.hp.iter().flatten().any(|&hp| hp > 0);
            for line in &state.actions {
                debug!(match_id = %self.id, peer_tick, action = %line, "Opponent action");
            }
            if state.script_errors > self.opponent_script_errors {
                info!(
                    match_id = %self.id,
                    errors = state.script_errors,
                    "Opponent script reported errors"
                );
            }
            self.opponent_script_errors = state.script_errors;
        }
        if let Some(records) = inbound.bullets {
            self.bullets.sync_remote(self.remote.team(), records);
        }
    }

    /// The opponent only counts as destroyed once its own peer says so
    fn check_end(&mut self, peer_left: bool) {
        let ended = match (self.local.is_destroyed(), !self.remote_reported_alive) {
            (true, true) => Some((MatchOutcome::Draw, EndReason::ShipDestroyed)),
            (true, false) => Some((MatchOutcome::Victory(self.side.opponent()), EndReason::ShipDestroyed)),
            (false, true) => Some((MatchOutcome::Victory(self.side), EndReason::ShipDestroyed)),
            _ if peer_left => Some((MatchOutcome::Victory(self.side), EndReason::PeerLeft)),
            _ if self.max_ticks > 0 && self.tick >= self.max_ticks => {
                Some((MatchOutcome::Draw, EndReason::TickLimit))
            }
            _ => None,
        };
        if let Some((outcome, reason)) = ended {
            self.end(outcome, reason);
        }
    }

    /// Stop the match and drop every transient object
    pub fn end(&mut self, outcome: MatchOutcome, reason: EndReason) -> MatchResult {
        if let Some(result) = self.result {
            return result;
        }
        self.phase = MatchPhase::Ended;
        self.bullets.clear();
        self.collisions.clear();

        let result = MatchResult {
            outcome,
            reason,
            ticks: self.tick,
        };
        self.result = Some(result);
        info!(
            match_id = %self.id,
            outcome = ?outcome,
            reason = %reason,
            ticks = self.tick,
            script_errors = self.script.errors(),
            "Match ended"
        );
        result
    }

    /// Drive the match at the fixed tick rate until it ends or `shutdown` resolves
    pub async fn run(mut self, mut client: GameClient, shutdown: impl Future<Output = ()>) -> MatchResult {
        client.start();
        let inbox = client.inbox();
        self.start();

        let mut tick_interval = interval(tick_duration());
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        let result = loop {
            tokio::select! {
                _ = tick_interval.tick() => {}
                _ = &mut shutdown => break self.end(MatchOutcome::Draw, EndReason::Shutdown),
            }

            let Some(report) = self.advance_tick(inbox.drain()) else {
                break self.end(MatchOutcome::Draw, EndReason::Shutdown);
            };

            for hit in report.hits.iter().filter(|hit| hit.destroyed) {
                info!(
                    match_id = %self.id,
                    tick = self.tick,
                    target_team = hit.target_team,
                    cell = ?hit.cell,
                    predicted = hit.target_team != self.local.team(),
                    "Block destroyed by bullet"
                );
            }
            if let Some(bounce) = report.bounce {
                info!(match_id = %self.id, tick = self.tick, spin = bounce.spin, "Ships collided");
            }

            let msg = SnapshotBuilder::message(self.tick, report.state);
            if let Err(e) = client.send(&msg) {
                debug!(match_id = %self.id, error = %e, "Snapshot send failed");
            }

            if let Some(result) = self.result {
                break result;
            }
        };

        if result.reason != EndReason::PeerLeft {
            let leave = PeerMsg::Leave {
                reason: result.reason.to_string(),
            };
            if let Err(e) = client.send(&leave) {
                debug!(match_id = %self.id, error = %e, "Leave send failed");
            }
        }
        client.stop().await;
        result
    }
}
