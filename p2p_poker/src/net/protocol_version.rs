//! Handshake and admission check.
//!
//! Every connection starts with both sides sending a [`Handshake`]. A peer
//! speaking a different protocol version or game variant is rejected and
//! the connection is closed without retry.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::game::entities::{Address, GamePhase};

/// Protocol version string announced in every handshake.
pub const PROTOCOL_VERSION: &str = "P2P-POKER v0.1-alpha";

/// The card game a node plays. Only nodes playing the same variant can
/// share a table.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum GameVariant {
    #[default]
    TexasHoldem,
    Other,
}

impl fmt::Display for GameVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::TexasHoldem => "TEXAS HOLDEM",
            Self::Other => "OTHER",
        };
        write!(f, "{repr}")
    }
}

impl FromStr for GameVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', '_', ' '], "").as_str() {
            "texasholdem" | "holdem" => Ok(Self::TexasHoldem),
            "other" => Ok(Self::Other),
            other => Err(format!("unknown game variant '{other}'")),
        }
    }
}

/// First frame on every connection, in both directions.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Handshake {
    pub version: String,
    pub variant: GameVariant,
    pub phase: GamePhase,
    pub listen_addr: Address,
}

impl Handshake {
    /// Check a remote handshake against ours. Returns the reason for
    /// rejection, if any.
    pub fn verify(&self, remote: &Handshake) -> Result<(), String> {
        if remote.version != self.version {
            return Err(format!(
                "invalid version: ours {}, theirs {}",
                self.version, remote.version
            ));
        }
        if remote.variant != self.variant {
            return Err(format!(
                "invalid game variant: ours {}, theirs {}",
                self.variant, remote.variant
            ));
        }
        if remote.listen_addr == self.listen_addr {
            return Err(format!("connection to self ({})", remote.listen_addr));
        }
        Ok(())
    }
}
