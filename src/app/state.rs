//! Application state assembled from configuration

use rand::Rng;
use std::sync::Arc;

use crate::config::Config;
use crate::game::{Match, MatchSettings, MatchSetup, SetupError};
use crate::net::{GameClient, TransportError};
use crate::script::{SentryScript, ShipScript};

/// Everything the binary needs to host one match
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub setup: Arc<MatchSetup>,
}

impl AppState {
    /// Load and validate the match setup named by the config
    pub fn new(config: Config) -> Result<Self, SetupError> {
        let setup = MatchSetup::load(&config.match_setup)?;
        Ok(Self {
            config: Arc::new(config),
            setup: Arc::new(setup),
        })
    }

    /// Match settings, drawing a seed when none is configured
    pub fn settings(&self) -> MatchSettings {
        MatchSettings {
            seed: self
                .config
                .match_seed
                .unwrap_or_else(|| rand::thread_rng().gen()),
            max_ticks: self.config.max_ticks,
            predict_mirror_damage: self.config.predict_mirror_damage,
        }
    }

    /// Script driving the local ship
    pub fn script(&self) -> Box<dyn ShipScript> {
        Box::new(SentryScript::default())
    }

    pub fn build_match(&self) -> Result<Match, SetupError> {
        Match::new(uuid::Uuid::new_v4(), &self.setup, self.script(), self.settings())
    }

    pub async fn connect(&self) -> Result<GameClient, TransportError> {
        GameClient::bind(self.config.local_addr, self.config.peer_addr).await
    }
}
