// src/backend/models/outbound.rs
use crate::models::common::{PrincipalId, SecretId, TimestampNs, UrgencyTier};
use crate::models::secret::Recipient;
use candid::CandidType;
use serde::{Deserialize, Serialize};

/// Reminder handed to the notification collaborator for the secret owner.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Reminder {
    pub secret_id: SecretId,
    pub owner: PrincipalId,
    pub title: String,
    pub tier: UrgencyTier,
    /// Human readable, e.g. "2 days", "5 hours", "due now", "overdue by 3 hours".
    pub time_remaining: String,
    pub deadline: TimestampNs,
    /// Fresh single-use check-in token.
    pub check_in_token: String,
    pub token_expires_at: TimestampNs,
}

#[derive(CandidType, Deserialize, Serialize, Clone, Debug)]
pub enum OutboundBody {
    Reminder(Reminder),
    ShareRequest {
        recipient: Recipient,
        owner: PrincipalId,
        threshold: u8,
    },
    Disclosure {
        recipient: Recipient,
        #[serde(with = "serde_bytes")]
        plaintext: Vec<u8>,
    },
}

/// Message queued for the off-chain relay that performs email/SMS delivery.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug)]
pub struct OutboundMessage {
    pub message_id: u64,
    pub secret_id: SecretId,
    pub title: String,
    pub created_at: TimestampNs,
    pub body: OutboundBody,
}
