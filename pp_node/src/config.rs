//! Node configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.
//! CLI flags win over environment variables, which win over defaults.

use p2p_poker::{
    Address, GameVariant, NodeConfig, PROTOCOL_VERSION, TableConfig,
    net::node::{DEFAULT_DIAL_TIMEOUT, DEFAULT_STATUS_INTERVAL},
    table::{DEFAULT_DEAL_DELAY, DEFAULT_MAX_SEATS, DEFAULT_MIN_PLAYERS},
};
use std::{net::SocketAddr, time::Duration};

pub const DEFAULT_LISTEN: &str = ":3000";
pub const DEFAULT_API_BIND: &str = "127.0.0.1:8080";

/// Overrides taken from the command line.
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub listen: Option<String>,
    pub api: Option<String>,
    pub peers: Vec<String>,
}

/// Complete node configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct NodeSettings {
    /// Declared listen address of the overlay node
    pub listen: Address,
    /// Bind address of the local HTTP control surface
    pub api_bind: SocketAddr,
    /// Peers dialed on startup
    pub peers: Vec<Address>,
    pub version: String,
    pub variant: GameVariant,
    pub table: TableConfig,
    pub dial_timeout: Duration,
    pub status_interval: Duration,
}

impl NodeSettings {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns error if an address or the game variant can't be parsed
    pub fn from_env(overrides: CliOverrides) -> Result<Self, ConfigError> {
        let listen = overrides
            .listen
            .or_else(|| std::env::var("NODE_LISTEN").ok())
            .unwrap_or_else(|| DEFAULT_LISTEN.to_string());
        let listen = parse_address("NODE_LISTEN", &listen)?;

        let api_bind = overrides
            .api
            .or_else(|| std::env::var("NODE_API_BIND").ok())
            .unwrap_or_else(|| DEFAULT_API_BIND.to_string());
        let api_bind = api_bind.parse::<SocketAddr>().map_err(|_| ConfigError::Invalid {
            var: "NODE_API_BIND".to_string(),
            reason: format!("'{api_bind}' is not a socket address"),
        })?;

        let peers = if overrides.peers.is_empty() {
            std::env::var("NODE_PEERS")
                .map(|v| v.split(',').map(str::to_string).collect())
                .unwrap_or_default()
        } else {
            overrides.peers
        };
        let peers = peers
            .iter()
            .filter(|p| !p.trim().is_empty())
            .map(|p| parse_address("NODE_PEERS", p))
            .collect::<Result<Vec<_>, _>>()?;

        let variant = match std::env::var("GAME_VARIANT") {
            Ok(v) => v.parse().map_err(|reason| ConfigError::Invalid {
                var: "GAME_VARIANT".to_string(),
                reason,
            })?,
            Err(_) => GameVariant::default(),
        };

        let table = TableConfig {
            max_seats: parse_env_or("TABLE_MAX_SEATS", DEFAULT_MAX_SEATS),
            min_players: parse_env_or("TABLE_MIN_PLAYERS", DEFAULT_MIN_PLAYERS),
            deal_delay: secs_env_or("DEAL_DELAY_SECS", DEFAULT_DEAL_DELAY),
        };

        Ok(NodeSettings {
            listen,
            api_bind,
            peers,
            version: std::env::var("GAME_VERSION").unwrap_or_else(|_| PROTOCOL_VERSION.to_string()),
            variant,
            table,
            dial_timeout: secs_env_or("DIAL_TIMEOUT_SECS", DEFAULT_DIAL_TIMEOUT),
            status_interval: secs_env_or("STATUS_INTERVAL_SECS", DEFAULT_STATUS_INTERVAL),
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                var: "GAME_VERSION".to_string(),
                hint: format!("Leave unset to use {PROTOCOL_VERSION}"),
            });
        }

        self.table.validate().map_err(|reason| ConfigError::Invalid {
            var: if self.table.max_seats < 2 {
                "TABLE_MAX_SEATS"
            } else {
                "TABLE_MIN_PLAYERS"
            }
            .to_string(),
            reason,
        })?;

        if self.status_interval.is_zero() {
            return Err(ConfigError::Invalid {
                var: "STATUS_INTERVAL_SECS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.peers.contains(&self.listen) {
            return Err(ConfigError::Invalid {
                var: "NODE_PEERS".to_string(),
                reason: format!("Contains our own listen address {}", self.listen),
            });
        }

        Ok(())
    }

    #[must_use]
    pub fn node_config(&self) -> NodeConfig {
        let mut config = NodeConfig::new(self.listen.clone());
        config.version = self.version.clone();
        config.variant = self.variant;
        config.dial_timeout = self.dial_timeout;
        config.status_interval = self.status_interval;
        config.table = self.table.clone();
        config
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Accepts `host:port` and the short `:port` form.
fn parse_address(var: &str, value: &str) -> Result<Address, ConfigError> {
    let addr = Address::new(value);
    let valid = match addr.as_str().rsplit_once(':') {
        Some((_, port)) => port.parse::<u16>().is_ok(),
        None => false,
    };
    if valid {
        Ok(addr)
    } else {
        Err(ConfigError::Invalid {
            var: var.to_string(),
            reason: format!("'{value}' is not a host:port or :port address"),
        })
    }
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn secs_env_or(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .map_or(default, Duration::from_secs)
}
