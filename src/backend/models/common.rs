use candid::{CandidType, Principal};
use serde::{Deserialize, Serialize};

pub type SecretId = String;      // Hex encoded, 16 random bytes
pub type RecipientId = String;   // Hex encoded, 8 random bytes
pub type TokenHash = String;     // SHA-256 hex of the opaque check-in token
pub type PrincipalId = Principal;

pub type TimestampNs = u64; // Nanoseconds since epoch
pub type ShareIndex = u8;   // 1-based; 0 is reserved

pub const NANOS_PER_SECOND: u64 = 1_000_000_000;
pub const NANOS_PER_MINUTE: u64 = 60 * NANOS_PER_SECOND;
pub const NANOS_PER_HOUR: u64 = 60 * NANOS_PER_MINUTE;
pub const NANOS_PER_DAY: u64 = 24 * NANOS_PER_HOUR;

/// Caller identity supplied by the identity collaborator.
///
/// Every core operation takes one explicitly; nothing reads the caller from
/// ambient state below the canister API layer.
#[derive(CandidType, Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct AuthContext {
    pub principal: PrincipalId,
}

impl AuthContext {
    pub fn new(principal: PrincipalId) -> Self {
        Self { principal }
    }

    pub fn is_anonymous(&self) -> bool {
        self.principal == Principal::anonymous()
    }
}

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq, Copy)]
pub enum SecretStatus {
    Active,    // Deadline is being evaluated
    Paused,    // Owner suspended evaluation; deadline is left untouched
    Triggered, // Deadline missed past grace; terminal
}

/// Coarse classification of how close a secret is to its deadline.
///
/// Ordered from least to most urgent so that escalation can be checked with `>`.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Copy, Hash)]
pub enum UrgencyTier {
    Upcoming,
    Approaching,
    Today,
    Overdue,
}

impl UrgencyTier {
    pub fn label(&self) -> &'static str {
        match self {
            UrgencyTier::Upcoming => "upcoming",
            UrgencyTier::Approaching => "approaching",
            UrgencyTier::Today => "today",
            UrgencyTier::Overdue => "overdue",
        }
    }
}

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq, Copy)]
pub enum ContactChannel {
    Email,
    Sms,
}
