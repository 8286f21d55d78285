// src/backend/models/checkin_token.rs
use crate::models::common::{SecretId, TimestampNs, TokenHash};
use candid::CandidType;
use serde::{Deserialize, Serialize};

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq, Copy)]
pub enum TokenPurpose {
    Reminder, // Attached to a reminder by the scheduler
    OnDemand, // Requested by the owner
}

/// Single-use check-in token. Only the hash of the opaque token is stored.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct CheckInToken {
    pub token_hash: TokenHash,
    pub secret_id: SecretId,
    pub purpose: TokenPurpose,
    pub created_at: TimestampNs,
    pub expires_at: TimestampNs,
    pub consumed_at: Option<TimestampNs>,
}

impl CheckInToken {
    pub fn is_consumed(&self) -> bool {
        self.consumed_at.is_some()
    }

    pub fn is_expired(&self, now: TimestampNs) -> bool {
        now >= self.expires_at
    }
}

/// Token handed back to the owner (or embedded in a reminder). Shown once.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug)]
pub struct IssuedToken {
    pub secret_id: SecretId,
    pub token: String,
    pub expires_at: TimestampNs,
}
