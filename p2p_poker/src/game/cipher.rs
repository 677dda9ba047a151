//! Symmetric cipher for the opaque card blobs in a deck.
//!
//! ChaCha20-Poly1305 with a random nonce prepended to each ciphertext.

use chacha20poly1305::{
    ChaCha20Poly1305, Nonce,
    aead::{Aead, KeyInit},
};
use rand::RngCore;

use super::deck::DeckError;

pub const KEY_SIZE: usize = 32;
pub const NONCE_SIZE: usize = 12;

pub type CardKey = [u8; KEY_SIZE];

#[must_use]
pub fn generate_key() -> CardKey {
    let mut key = [0u8; KEY_SIZE];
    rand::rng().fill_bytes(&mut key);
    key
}

pub fn encrypt(key: &CardKey, payload: &[u8]) -> Result<Vec<u8>, DeckError> {
    let cipher = ChaCha20Poly1305::new_from_slice(key).map_err(|_| DeckError::InvalidKey)?;

    let mut nonce = [0u8; NONCE_SIZE];
    rand::rng().fill_bytes(&mut nonce);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), payload)
        .map_err(|_| DeckError::Encrypt)?;

    let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    out.extend_from_slice(&nonce);
    out.extend(ciphertext);
    Ok(out)
}

pub fn decrypt(key: &CardKey, ciphertext: &[u8]) -> Result<Vec<u8>, DeckError> {
    if ciphertext.len() < NONCE_SIZE {
        return Err(DeckError::CiphertextTooShort);
    }
    let (nonce, body) = ciphertext.split_at(NONCE_SIZE);

    let cipher = ChaCha20Poly1305::new_from_slice(key).map_err(|_| DeckError::InvalidKey)?;
    cipher
        .decrypt(Nonce::from_slice(nonce), body)
        .map_err(|_| DeckError::Decrypt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::deck::{Card, Suit};

    #[test]
    fn card_blob_survives_encryption() {
        let key = generate_key();
        let card = Card::new(Suit::Spades, 1).unwrap();
        let blob = card.to_bytes().unwrap();

        let encrypted = encrypt(&key, &blob).unwrap();
        assert_ne!(encrypted, blob);
        let decrypted = decrypt(&key, &encrypted).unwrap();
        assert_eq!(Card::from_bytes(&decrypted).unwrap(), card);
    }

    #[test]
    fn wrong_key_fails() {
        let encrypted = encrypt(&generate_key(), b"payload").unwrap();
        assert!(matches!(
            decrypt(&generate_key(), &encrypted),
            Err(DeckError::Decrypt)
        ));
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let key = generate_key();
        let mut encrypted = encrypt(&key, b"payload").unwrap();
        let last = encrypted.len() - 1;
        encrypted[last] ^= 0xff;
        assert!(matches!(decrypt(&key, &encrypted), Err(DeckError::Decrypt)));
    }

    #[test]
    fn short_ciphertext_fails() {
        let key = generate_key();
        assert!(matches!(
            decrypt(&key, &[0u8; 4]),
            Err(DeckError::CiphertextTooShort)
        ));
    }

    #[test]
    fn same_payload_encrypts_differently() {
        let key = generate_key();
        let a = encrypt(&key, b"same").unwrap();
        let b = encrypt(&key, b"same").unwrap();
        assert_ne!(a, b);
    }
}
