//! Cards and the 52-card deck.

use bincode::{
    config,
    serde::{decode_from_slice, encode_to_vec},
};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::shuffle::EncryptedDeck;

/// Number of cards in a deck.
pub const DECK_SIZE: usize = 52;

/// Errors from card encoding, the card cipher, and deck transforms.
#[derive(Debug, Error)]
pub enum DeckError {
    #[error("invalid card value {0}")]
    InvalidCard(u8),
    #[error("failed to encode card: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    #[error("failed to decode card: {0}")]
    Decode(#[from] bincode::error::DecodeError),
    #[error("invalid key length")]
    InvalidKey,
    #[error("ciphertext too short")]
    CiphertextTooShort,
    #[error("encryption failed")]
    Encrypt,
    #[error("decryption failed")]
    Decrypt,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Suit {
    Spades,
    Hearts,
    Diamonds,
    Clubs,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Spades, Suit::Hearts, Suit::Diamonds, Suit::Clubs];

    fn symbol(self) -> char {
        match self {
            Self::Spades => '♠',
            Self::Hearts => '♥',
            Self::Diamonds => '♦',
            Self::Clubs => '♣',
        }
    }
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Spades => "SPADES",
            Self::Hearts => "HEARTS",
            Self::Diamonds => "DIAMONDS",
            Self::Clubs => "CLUBS",
        };
        write!(f, "{repr}")
    }
}

/// A playing card. Values run from 1 (ace) to 13 (king).
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Card {
    pub suit: Suit,
    pub value: u8,
}

impl Card {
    pub fn new(suit: Suit, value: u8) -> Result<Self, DeckError> {
        if !(1..=13).contains(&value) {
            return Err(DeckError::InvalidCard(value));
        }
        Ok(Self { suit, value })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, DeckError> {
        Ok(encode_to_vec(self, config::standard())?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DeckError> {
        let (card, _): (Card, usize) = decode_from_slice(bytes, config::standard())?;
        Self::new(card.suit, card.value)
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self.value {
            1 => "ACE".to_string(),
            11 => "JACK".to_string(),
            12 => "QUEEN".to_string(),
            13 => "KING".to_string(),
            v => v.to_string(),
        };
        write!(f, "{value} of {} {}", self.suit, self.suit.symbol())
    }
}

/// A full deck of cards.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Default for Deck {
    fn default() -> Self {
        Self::new()
    }
}

impl Deck {
    /// A freshly shuffled deck.
    #[must_use]
    pub fn new() -> Self {
        let mut deck = Self::ordered();
        deck.cards.shuffle(&mut rand::rng());
        deck
    }

    /// A deck in suit-then-value order.
    #[must_use]
    pub fn ordered() -> Self {
        let cards = Suit::ALL
            .iter()
            .flat_map(|&suit| (1..=13).map(move |value| Card { suit, value }))
            .collect();
        Self { cards }
    }

    #[must_use]
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Encode every card into its own opaque blob, forming the deck that
    /// enters the shuffle chain.
    pub fn to_blobs(&self) -> Result<EncryptedDeck, DeckError> {
        self.cards.iter().map(Card::to_bytes).collect()
    }
}
