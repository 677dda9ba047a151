//! Per-node replica of the shared game.
//!
//! This module provides:
//! - Entities shared with the wire protocol (addresses, phases, actions)
//! - The game engine driving readiness, the shuffle chain, and turns
//! - The deck, the card cipher, and the pluggable deck transform

pub mod cipher;
pub mod deck;
pub mod engine;
pub mod entities;
pub mod shuffle;

pub use deck::{Card, Deck, DeckError, Suit};
pub use engine::{Effect, GameEngine};
pub use entities::{Address, GamePhase, GameSnapshot, PlayerAction, SeatView};
pub use shuffle::{DeckTransform, EncryptedDeck, ShuffleEncrypt};

use thiserror::Error;

/// Errors from game logic. These are returned to whoever triggered the
/// operation (the control surface or the protocol dispatcher) and are never
/// fatal to the node.
#[derive(Debug, Error)]
pub enum GameError {
    #[error("not your turn")]
    OutOfTurn,
    #[error("phase mismatch: we are in {expected}, message says {got}")]
    PhaseMismatch { expected: GamePhase, got: GamePhase },
    #[error("unexpected sender {got}, expected {expected}")]
    UnexpectedSender { expected: Address, got: Address },
    #[error("{0} is the only player on the table")]
    SoleOccupant(Address),
    #[error("table is full")]
    TableFull,
    #[error("player {0} is not on the table")]
    PlayerNotFound(Address),
    #[error("seat {0} is not available")]
    InvalidSeat(usize),
    #[error("deck transform failed: {0}")]
    Transform(#[from] DeckError),
}
