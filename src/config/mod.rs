//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Peer configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// UDP binding address for this peer
    pub local_addr: SocketAddr,
    /// Opponent peer's UDP address
    pub peer_addr: SocketAddr,
    /// Match setup file (both grids and our side)
    pub match_setup: PathBuf,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Seed for the match RNG; random when unset
    pub match_seed: Option<u64>,
    /// Stop after this many ticks, 0 = unbounded
    pub max_ticks: u64,
    /// Time budget for one script `main` call during validation
    pub script_budget: Duration,
    /// Apply cosmetic bullet damage to the mirrored ship
    pub predict_mirror_damage: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            local_addr: env::var("LOCAL_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:7400".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidAddress("LOCAL_ADDR"))?,
            peer_addr: env::var("PEER_ADDR")
                .map_err(|_| ConfigError::Missing("PEER_ADDR"))?
                .parse()
                .map_err(|_| ConfigError::InvalidAddress("PEER_ADDR"))?,
            match_setup: env::var("MATCH_SETUP")
                .map_err(|_| ConfigError::Missing("MATCH_SETUP"))?
                .into(),

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            match_seed: optional("MATCH_SEED")?,
            max_ticks: optional("MAX_TICKS")?.unwrap_or(0),
            script_budget: Duration::from_millis(optional("SCRIPT_BUDGET_MS")?.unwrap_or(5)),
            predict_mirror_damage: optional("PREDICT_MIRROR_DAMAGE")?.unwrap_or(false),
        })
    }
}

/// Parse an optional variable; present but unparsable is an error
fn optional<T: FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        Err(_) => Ok(None),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid socket address in {0}")]
    InvalidAddress(&'static str),

    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    // Environment is process-wide, so every case runs inside one test
    #[test]
    fn test_from_env() {
        env::remove_var("PEER_ADDR");
        env::set_var("MATCH_SETUP", "setup.json");
        assert!(matches!(Config::from_env(), Err(ConfigError::Missing("PEER_ADDR"))));

        env::set_var("PEER_ADDR", "127.0.0.1:7401");
        env::set_var("MAX_TICKS", "600");
        env::set_var("PREDICT_MIRROR_DAMAGE", "true");
        env::remove_var("MATCH_SEED");
        let config = Config::from_env().unwrap();
        assert_eq!(config.peer_addr.port(), 7401);
        assert_eq!(config.max_ticks, 600);
        assert!(config.predict_mirror_damage);
        assert_eq!(config.match_seed, None);
        assert_eq!(config.script_budget, Duration::from_millis(5));

        env::set_var("MAX_TICKS", "soon");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Invalid { key: "MAX_TICKS", .. })
        ));

        env::set_var("MAX_TICKS", "0");
        env::set_var("PEER_ADDR", "nowhere");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::InvalidAddress("PEER_ADDR"))
        ));
    }
}
