//! Core game entities shared by the table, the engine, and the wire protocol.

use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt};

/// A node's externally reachable listen endpoint.
///
/// This is the only identity a player has in the network: peers, seats,
/// the dealer, and the turn cursor are all addressed by it. Addresses may
/// be written in the short `":3000"` form, in which case the host part is
/// filled in when binding or dialing.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Address(String);

impl Address {
    #[must_use]
    pub fn new(addr: &str) -> Self {
        Self(addr.trim().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Port part of the address, if it has one.
    #[must_use]
    pub fn port(&self) -> Option<u16> {
        self.0.rsplit_once(':').and_then(|(_, port)| port.parse().ok())
    }

    /// The same host with a different port.
    #[must_use]
    pub fn with_port(&self, port: u16) -> Self {
        let host = self.0.rsplit_once(':').map_or(self.0.as_str(), |(host, _)| host);
        Self(format!("{host}:{port}"))
    }

    /// Deterministic ordering key used for the roster. Addresses sort by
    /// port first and fall back to the full string, so every node derives
    /// the same order from the same set of addresses.
    #[must_use]
    pub fn sort_key(&self) -> (u16, &str) {
        (self.port().unwrap_or(u16::MAX), self.as_str())
    }

    /// Socket address string suitable for `TcpListener::bind`.
    #[must_use]
    pub fn bind_target(&self) -> String {
        if self.0.starts_with(':') {
            format!("0.0.0.0{}", self.0)
        } else {
            self.0.clone()
        }
    }

    /// Socket address string suitable for `TcpStream::connect`.
    #[must_use]
    pub fn dial_target(&self) -> String {
        if self.0.starts_with(':') {
            format!("127.0.0.1{}", self.0)
        } else {
            self.0.clone()
        }
    }
}

impl Ord for Address {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for Address {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Address {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Phase of the current hand as seen by one node.
///
/// The cycle is `Connected → PlayerReady → Dealing → PreFlop → Flop →
/// Turn → River → PlayerReady`.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum GamePhase {
    #[default]
    Connected,
    PlayerReady,
    Dealing,
    PreFlop,
    Flop,
    Turn,
    River,
}

impl GamePhase {
    /// The phase that follows a completed betting round, or `None` when
    /// this phase isn't a betting round.
    #[must_use]
    pub fn next_round(self) -> Option<Self> {
        match self {
            Self::PreFlop => Some(Self::Flop),
            Self::Flop => Some(Self::Turn),
            Self::Turn => Some(Self::River),
            Self::River => Some(Self::PlayerReady),
            Self::Connected | Self::PlayerReady | Self::Dealing => None,
        }
    }

    #[must_use]
    pub fn is_betting_round(self) -> bool {
        matches!(self, Self::PreFlop | Self::Flop | Self::Turn | Self::River)
    }

    /// Whether a hand is running (the deck left the dealer and the hand
    /// hasn't ended yet).
    #[must_use]
    pub fn is_in_hand(self) -> bool {
        self == Self::Dealing || self.is_betting_round()
    }
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Connected => "CONNECTED",
            Self::PlayerReady => "PLAYER READY",
            Self::Dealing => "DEALING",
            Self::PreFlop => "PRE FLOP",
            Self::Flop => "FLOP",
            Self::Turn => "TURN",
            Self::River => "RIVER",
        };
        write!(f, "{repr}")
    }
}

/// The action a seated player took in the current betting round.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum PlayerAction {
    #[default]
    None,
    Fold,
    Check,
    Bet(u32),
}

impl fmt::Display for PlayerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "NONE"),
            Self::Fold => write!(f, "FOLD"),
            Self::Check => write!(f, "CHECK"),
            Self::Bet(value) => write!(f, "BET ${value}"),
        }
    }
}

/// Read-only view of a single seat.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SeatView {
    pub position: usize,
    pub address: Address,
    pub phase: GamePhase,
    pub action: PlayerAction,
}

/// Read-only view of a node's replica, published for threads other than
/// the control loop (e.g., the HTTP control surface).
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct GameSnapshot {
    /// The node's own declared listen address.
    pub address: Option<Address>,
    pub phase: GamePhase,
    pub dealer: Option<Address>,
    pub turn: Option<Address>,
    /// Number of hands completed since the node started.
    pub hand: u64,
    /// Known players (including ourselves) in roster order.
    pub players: Vec<Address>,
    /// Players that signaled readiness for the next hand.
    pub ready: Vec<Address>,
    pub seats: Vec<SeatView>,
}
