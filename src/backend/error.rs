// src/backend/error.rs
use candid::CandidType;
use serde::Deserialize;
use thiserror::Error;

#[derive(CandidType, Deserialize, Error, Debug, Clone, PartialEq, Eq)]
pub enum SwitchError {
    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    #[error("Secret not found: {0}")]
    SecretNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // --- Share engine --- //
    #[error("Invalid threshold parameters: total={total}, threshold={threshold} (need 2 <= threshold <= total <= 7)")]
    InvalidThresholdParameters { total: u8, threshold: u8 },

    #[error("Insufficient shares: {provided} provided, {required} required")]
    InsufficientShares { required: u8, provided: u8 },

    #[error("Duplicate share index: {0}")]
    DuplicateShareIndex(u8),

    #[error("Reconstructed key failed share integrity verification")]
    ReconstructionMismatch,

    #[error("Malformed share: {0}")]
    MalformedShare(String),

    // --- Cipher --- //
    #[error("Authentication failed: ciphertext or tag has been tampered with")]
    AuthenticationFailed,

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    // --- Check-in --- //
    #[error("Check-in token is unknown or does not belong to this secret")]
    TokenInvalid,

    #[error("Check-in token has expired")]
    TokenExpired,

    #[error("Check-in token has already been used")]
    TokenAlreadyUsed,

    #[error("Secret is not active: {0}")]
    SecretNotActive(String),

    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    // --- Disclosure --- //
    #[error("Disclosure pending: {0}")]
    DisclosurePending(String),

    #[error("Disclosure failed: {0}")]
    DisclosureFailed(String),

    // --- Infrastructure --- //
    #[error("Concurrent modification: {0}")]
    ConcurrentModification(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Internal canister error: {0}")]
    InternalError(String),
}
