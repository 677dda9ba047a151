//! The per-player step of the shuffle chain.
//!
//! Each node applies a [`DeckTransform`] to the deck exactly once per hand
//! before handing it to its clockwise neighbor. Intermediate nodes never
//! look inside the blobs; they only transform and forward them.

use rand::seq::SliceRandom;

use super::{
    cipher::{self, CardKey},
    deck::DeckError,
};

/// An ordered sequence of opaque card blobs.
pub type EncryptedDeck = Vec<Vec<u8>>;

/// A node's local transform step in the shuffle chain.
pub trait DeckTransform: Send + Sync {
    fn transform(&mut self, deck: EncryptedDeck) -> Result<EncryptedDeck, DeckError>;

    /// Called when a new hand starts, before the deck comes around again.
    fn new_hand(&mut self) {}
}

/// Reshuffles the blobs and wraps each one in another encryption layer
/// under a key only this node knows.
///
/// The key is kept so a later reveal step can peel this node's layer;
/// revealing cards isn't part of the protocol yet.
pub struct ShuffleEncrypt {
    key: CardKey,
}

impl Default for ShuffleEncrypt {
    fn default() -> Self {
        Self::new()
    }
}

impl ShuffleEncrypt {
    #[must_use]
    pub fn new() -> Self {
        Self {
            key: cipher::generate_key(),
        }
    }

    #[must_use]
    pub fn key(&self) -> &CardKey {
        &self.key
    }
}

impl DeckTransform for ShuffleEncrypt {
    fn transform(&mut self, mut deck: EncryptedDeck) -> Result<EncryptedDeck, DeckError> {
        deck.shuffle(&mut rand::rng());
        deck.iter()
            .map(|blob| cipher::encrypt(&self.key, blob))
            .collect()
    }

    fn new_hand(&mut self) {
        self.key = cipher::generate_key();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::deck::{Card, Deck};
    use std::collections::HashSet;

    #[test]
    fn shuffle_encrypt_keeps_every_card() {
        let deck = Deck::ordered();
        let blobs = deck.to_blobs().unwrap();

        let mut transform = ShuffleEncrypt::new();
        let transformed = transform.transform(blobs.clone()).unwrap();
        assert_eq!(transformed.len(), blobs.len());

        let original: HashSet<_> = blobs.iter().collect();
        assert!(transformed.iter().all(|blob| !original.contains(blob)));

        let cards: HashSet<Card> = transformed
            .iter()
            .map(|blob| Card::from_bytes(&cipher::decrypt(transform.key(), blob).unwrap()).unwrap())
            .collect();
        let expected: HashSet<Card> = deck.cards().iter().copied().collect();
        assert_eq!(cards, expected);
    }

    #[test]
    fn layers_peel_in_reverse_order() {
        let blobs = Deck::ordered().to_blobs().unwrap();
        let mut first = ShuffleEncrypt::new();
        let mut second = ShuffleEncrypt::new();

        let once = first.transform(blobs.clone()).unwrap();
        let twice = second.transform(once).unwrap();

        let peeled: HashSet<Vec<u8>> = twice
            .iter()
            .map(|blob| {
                let outer = cipher::decrypt(second.key(), blob).unwrap();
                cipher::decrypt(first.key(), &outer).unwrap()
            })
            .collect();
        let expected: HashSet<Vec<u8>> = blobs.into_iter().collect();
        assert_eq!(peeled, expected);
    }

    #[test]
    fn new_hand_rotates_key() {
        let mut transform = ShuffleEncrypt::new();
        let before = *transform.key();
        transform.new_hand();
        assert_ne!(&before, transform.key());
    }
}
