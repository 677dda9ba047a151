use serde::{Deserialize, Serialize};
use std::fmt;

use crate::game::{
    entities::{Address, GamePhase, PlayerAction},
    shuffle::EncryptedDeck,
};

/// A betting action as announced to the other players.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ActionMessage {
    /// The sender's phase after it applied the action.
    pub phase: GamePhase,
    pub action: PlayerAction,
}

/// Payload of a protocol message. The variant tag is part of the encoding
/// so receivers always decode into a known shape.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Payload {
    /// Directory addresses the sender knows about, pushed to a new peer.
    PeerList { peers: Vec<Address> },
    /// The deck on its way around the table.
    EncryptedDeck { deck: EncryptedDeck },
    /// The deck made it back to the dealer.
    PreFlopComplete,
    /// The sender is ready for the next hand.
    Ready,
    PlayerAction(ActionMessage),
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PeerList { peers } => write!(f, "peer list ({} peers)", peers.len()),
            Self::EncryptedDeck { deck } => write!(f, "encrypted deck ({} cards)", deck.len()),
            Self::PreFlopComplete => write!(f, "pre flop complete"),
            Self::Ready => write!(f, "ready"),
            Self::PlayerAction(msg) => write!(f, "{} during {}", msg.action, msg.phase),
        }
    }
}

/// Envelope for every frame after the handshake.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Message {
    /// Sender's declared listen address.
    pub from: Address,
    pub payload: Payload,
}

impl Message {
    #[must_use]
    pub fn new(from: Address, payload: Payload) -> Self {
        Self { from, payload }
    }
}
