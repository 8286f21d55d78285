// src/backend/utils/crypto.rs
// Identifier and digest helpers shared by the services.

use rand_core::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};

/// Length in bytes of a secret id before hex encoding.
pub const SECRET_ID_BYTES: usize = 16;
/// Length in bytes of a recipient id before hex encoding.
pub const RECIPIENT_ID_BYTES: usize = 8;
/// Length in bytes of an opaque check-in token before hex encoding.
pub const TOKEN_BYTES: usize = 32;

/// Generates a secure random hex string of a specific byte length.
pub fn generate_random_hex<R: RngCore + CryptoRng>(rng: &mut R, num_bytes: usize) -> String {
    let mut bytes = vec![0u8; num_bytes];
    rng.fill_bytes(&mut bytes);
    hex::encode(&bytes)
}

/// Calculates the SHA256 hash of byte data and returns it as a hex string.
pub fn calculate_sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Storage key for an opaque check-in token. Raw tokens are never stored.
pub fn token_hash(token: &str) -> String {
    calculate_sha256_hex(token.trim().as_bytes())
}
