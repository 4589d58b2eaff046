//! Block-ship peer - one side of a two-player block-ship duel
//!
//! This is the entry point for a peer. It handles:
//! - Loading the match setup (both ship grids and our side)
//! - Validating the control script against its time budget
//! - Running the fixed-tick simulation and syncing state with the opponent over UDP

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use blockship_peer::app::AppState;
use blockship_peer::config::Config;
use blockship_peer::script::{validate_script, ValidationReport};
use blockship_peer::MatchOutcome;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);

    info!("Starting block-ship peer");
    info!("Local address: {}", config.local_addr);
    info!("Peer address: {}", config.peer_addr);

    let state = AppState::new(config)?;
    info!(side = ?state.setup.side, "Match setup loaded");

    // Offline check before committing to a match
    let mut candidate = state.script();
    match validate_script(candidate.as_mut(), &state.setup, state.config.script_budget) {
        ValidationReport::Passed { slowest, .. } => {
            info!(slowest_us = slowest.as_micros() as u64, "Script passed validation");
        }
        ValidationReport::Failed { kind, trace } => {
            anyhow::bail!("script rejected ({kind:?}): {trace}");
        }
    }

    let game = state.build_match()?;
    let client = state.connect().await?;
    let result = game.run(client, shutdown_signal()).await;

    match result.outcome {
        MatchOutcome::Victory(side) if side == state.setup.side => {
            info!(reason = %result.reason, ticks = result.ticks, "Victory");
        }
        MatchOutcome::Victory(_) => {
            warn!(reason = %result.reason, ticks = result.ticks, "Defeat");
        }
        MatchOutcome::Draw => {
            info!(reason = %result.reason, ticks = result.ticks, "Draw");
        }
    }

    info!("Peer shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, leaving the match");
        }
        _ = terminate => {
            info!("Received terminate signal, leaving the match");
        }
    }
}
