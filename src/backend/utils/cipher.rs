//! Authenticated encryption of secret payloads with ChaCha20-Poly1305.
//!
//! Payloads are stored as three separate fields (ciphertext, nonce, tag) so
//! the record mirrors the wire layout of the AEAD. The nonce is always drawn
//! inside [`encrypt`]; no API accepts a caller supplied nonce, which makes
//! nonce reuse under one key impossible to express.
//!
//! The payload key is never persisted. It only exists long enough to be
//! split by the share engine (and later, to be reconstructed for disclosure).

use crate::error::SwitchError;
use candid::CandidType;
use chacha20poly1305::aead::{AeadInPlace, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce, Tag};
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// 256-bit key.
pub const KEY_LEN: usize = 32;
/// 96-bit nonce (IV).
pub const NONCE_LEN: usize = 12;
/// 128-bit Poly1305 tag.
pub const TAG_LEN: usize = 16;

/// Symmetric key protecting a single secret payload.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PayloadKey {
    bytes: [u8; KEY_LEN],
}

impl PayloadKey {
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut bytes = [0u8; KEY_LEN];
        rng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Avoid logging or persisting the returned bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl std::fmt::Debug for PayloadKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PayloadKey([REDACTED])")
    }
}

/// Ciphertext plus the nonce and detached authentication tag.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct EncryptedPayload {
    #[serde(with = "serde_bytes")]
    pub ciphertext: Vec<u8>,
    #[serde(with = "serde_bytes")]
    pub nonce: Vec<u8>,
    #[serde(with = "serde_bytes")]
    pub tag: Vec<u8>,
}

/// Encrypts `plaintext` under `key`, binding `aad` (the secret id) into the tag.
pub fn encrypt<R: RngCore + CryptoRng>(
    key: &PayloadKey,
    plaintext: &[u8],
    aad: &[u8],
    rng: &mut R,
) -> Result<EncryptedPayload, SwitchError> {
    let mut nonce = [0u8; NONCE_LEN];
    rng.fill_bytes(&mut nonce);

    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));
    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(Nonce::from_slice(&nonce), aad, &mut buffer)
        .map_err(|e| {
            buffer.zeroize();
            SwitchError::EncryptionFailed(format!("{e}"))
        })?;

    Ok(EncryptedPayload {
        ciphertext: buffer,
        nonce: nonce.to_vec(),
        tag: tag.to_vec(),
    })
}

/// Decrypts a payload. The tag is verified before any keystream is applied,
/// so a mismatch returns `AuthenticationFailed` and no plaintext bytes at all.
pub fn decrypt(
    key: &PayloadKey,
    payload: &EncryptedPayload,
    aad: &[u8],
) -> Result<Zeroizing<Vec<u8>>, SwitchError> {
    if payload.nonce.len() != NONCE_LEN || payload.tag.len() != TAG_LEN {
        return Err(SwitchError::AuthenticationFailed);
    }

    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));
    let mut buffer = Zeroizing::new(payload.ciphertext.clone());
    cipher
        .decrypt_in_place_detached(
            Nonce::from_slice(&payload.nonce),
            aad,
            buffer.as_mut_slice(),
            Tag::from_slice(&payload.tag),
        )
        .map_err(|_| SwitchError::AuthenticationFailed)?;

    Ok(buffer)
}
