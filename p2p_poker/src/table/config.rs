//! Table configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of seats at a table.
pub const DEFAULT_MAX_SEATS: usize = 6;

/// Default number of ready players needed before a hand can be dealt.
pub const DEFAULT_MIN_PLAYERS: usize = 2;

/// Default stabilization delay between the deal-start condition holding and
/// the dealer actually dealing.
pub const DEFAULT_DEAL_DELAY: Duration = Duration::from_secs(8);

/// Table configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    /// Number of seats (default: 6)
    pub max_seats: usize,

    /// Ready players required before dealing (default: 2)
    pub min_players: usize,

    /// Time the dealer waits for near-simultaneous joiners before dealing
    pub deal_delay: Duration,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            max_seats: DEFAULT_MAX_SEATS,
            min_players: DEFAULT_MIN_PLAYERS,
            deal_delay: DEFAULT_DEAL_DELAY,
        }
    }
}

impl TableConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_seats < 2 {
            return Err("Max seats must be at least 2".to_string());
        }

        if self.min_players < 2 {
            return Err("Min players must be at least 2".to_string());
        }

        if self.min_players > self.max_seats {
            return Err(format!(
                "Min players ({}) cannot exceed max seats ({})",
                self.min_players, self.max_seats
            ));
        }

        Ok(())
    }
}
