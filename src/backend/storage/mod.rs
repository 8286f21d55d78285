// src/backend/storage/mod.rs
// Persistence for secrets, check-in tokens and recipient share submissions.
//
// Services only see the `SecretStore` trait. The canister wires in
// `StableSecretStore` (stable memory); tests and the concurrency suite use
// `MemorySecretStore`.

pub mod config;
pub mod in_memory;
pub mod memory;
pub mod outbox;
pub mod stable;
pub mod storable;

pub use in_memory::MemorySecretStore;
pub use memory::Memory;
pub use stable::StableSecretStore;
pub use storable::Cbor;

use crate::error::SwitchError;
use crate::models::{
    CheckInToken, PrincipalId, Secret, SecretStatus, ShareSubmission, TimestampNs,
};

/// Durable storage for secret records and their satellites.
///
/// Every mutation of a `Secret` is conditional on the version the caller
/// loaded; a stale write fails with `ConcurrentModification` and leaves the
/// stored record untouched.
pub trait SecretStore: Send + Sync {
    /// Stores a brand new record. Fails if the id already exists.
    fn insert_secret(&self, secret: &Secret) -> Result<(), SwitchError>;

    fn load_secret(&self, secret_id: &str) -> Result<Option<Secret>, SwitchError>;

    /// Conditional write. On success `secret.version` is bumped to the stored value.
    fn save_secret(&self, secret: &mut Secret) -> Result<(), SwitchError>;

    /// Active secrets whose deadline is at or before `horizon`, plus triggered
    /// secrets whose disclosure has not completed. Ordered by deadline.
    fn load_due_secrets(&self, horizon: TimestampNs) -> Result<Vec<Secret>, SwitchError>;

    fn secrets_by_owner(&self, owner: &PrincipalId) -> Result<Vec<Secret>, SwitchError>;

    fn insert_token(&self, token: &CheckInToken) -> Result<(), SwitchError>;

    fn load_token(&self, token_hash: &str) -> Result<Option<CheckInToken>, SwitchError>;

    /// Atomically marks a token consumed. Exactly one caller wins.
    ///
    /// # Errors
    ///
    /// `TokenInvalid` when unknown, `TokenAlreadyUsed` when consumed before,
    /// `TokenExpired` when `now` is at or past its expiry.
    fn consume_token(&self, token_hash: &str, now: TimestampNs) -> Result<CheckInToken, SwitchError>;

    /// Drops tokens that expired before `expired_before`. Returns how many were removed.
    fn purge_tokens(&self, expired_before: TimestampNs) -> Result<usize, SwitchError>;

    /// Records a recipient share; a later submission for the same index replaces the earlier one.
    fn put_share_submission(&self, submission: ShareSubmission) -> Result<(), SwitchError>;

    fn share_submissions(&self, secret_id: &str) -> Result<Vec<ShareSubmission>, SwitchError>;

    fn clear_share_submissions(&self, secret_id: &str) -> Result<(), SwitchError>;
}

/// Whether the sweep has work to do for this record at `horizon`.
pub(crate) fn is_due(secret: &Secret, horizon: TimestampNs) -> bool {
    match secret.status {
        SecretStatus::Active => secret.next_deadline() <= horizon,
        SecretStatus::Paused => false,
        SecretStatus::Triggered => !secret.disclosure.state.is_completed(),
    }
}

pub(crate) fn sort_by_deadline(secrets: &mut [Secret]) {
    secrets.sort_by(|a, b| {
        a.next_deadline()
            .cmp(&b.next_deadline())
            .then_with(|| a.secret_id.cmp(&b.secret_id))
    });
}

/// Shared version check for `save_secret` implementations.
pub(crate) fn check_version(stored: &Secret, incoming: &Secret) -> Result<(), SwitchError> {
    if stored.version != incoming.version {
        return Err(SwitchError::ConcurrentModification(format!(
            "Secret {} changed (stored version {}, write based on {})",
            incoming.secret_id, stored.version, incoming.version
        )));
    }
    Ok(())
}

/// Shared consume rule; mutates `token` only when the caller wins.
pub(crate) fn apply_consume(token: &mut CheckInToken, now: TimestampNs) -> Result<(), SwitchError> {
    if token.is_consumed() {
        return Err(SwitchError::TokenAlreadyUsed);
    }
    if token.is_expired(now) {
        return Err(SwitchError::TokenExpired);
    }
    token.consumed_at = Some(now);
    Ok(())
}

pub(crate) fn upsert_submission(list: &mut Vec<ShareSubmission>, submission: ShareSubmission) {
    match list.iter_mut().find(|s| s.share.index == submission.share.index) {
        Some(existing) => *existing = submission,
        None => list.push(submission),
    }
    list.sort_by_key(|s| s.share.index);
}

#[cfg(test)]
pub(crate) mod conformance;
