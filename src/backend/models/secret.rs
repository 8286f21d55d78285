// src/backend/models/secret.rs
use crate::error::SwitchError;
use crate::models::common::{
    AuthContext, ContactChannel, PrincipalId, RecipientId, SecretId, SecretStatus, TimestampNs,
    UrgencyTier, NANOS_PER_DAY,
};
use crate::utils::cipher::EncryptedPayload;
use crate::utils::shamir::{KeyShare, ShareTagKey};
use candid::CandidType;
use serde::{Deserialize, Serialize};

/// A person who receives the secret if the owner stops checking in.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Recipient {
    pub recipient_id: RecipientId,
    pub name: String,
    pub channel: ContactChannel,
    pub address: String, // Email address or E.164 phone number
    pub primary: bool,
}

/// Check-in cadence of a secret.
///
/// The deadline is derived, never stored, so it cannot drift from
/// `last_check_in + interval`.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Schedule {
    pub check_in_interval_days: u32,
    pub last_check_in: TimestampNs,
}

impl Schedule {
    pub fn interval_ns(&self) -> u64 {
        u64::from(self.check_in_interval_days).saturating_mul(NANOS_PER_DAY)
    }

    pub fn next_deadline(&self) -> TimestampNs {
        self.last_check_in.saturating_add(self.interval_ns())
    }
}

/// The most urgent reminder already sent for a given deadline.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ReminderState {
    pub deadline: TimestampNs,
    pub tier: UrgencyTier,
    pub sent_at: TimestampNs,
}

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub enum DisclosureState {
    NotStarted,
    /// Waiting for enough recipient shares to arrive.
    Pending { attempts: u32, last_error: String },
    /// Reconstruction, decryption or delivery failed; retried on the next sweep.
    Failed { attempts: u32, reason: String },
    /// A sweep holds the delivery lease.
    Delivering { since: TimestampNs, attempts: u32 },
    Completed { at: TimestampNs },
}

impl DisclosureState {
    pub fn attempts(&self) -> u32 {
        match self {
            DisclosureState::Pending { attempts, .. }
            | DisclosureState::Failed { attempts, .. }
            | DisclosureState::Delivering { attempts, .. } => *attempts,
            DisclosureState::NotStarted | DisclosureState::Completed { .. } => 0,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, DisclosureState::Completed { .. })
    }
}

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Disclosure {
    pub state: DisclosureState,
    /// Recipients that already received the plaintext; never re-sent.
    pub delivered_to: Vec<RecipientId>,
}

impl Default for Disclosure {
    fn default() -> Self {
        Self {
            state: DisclosureState::NotStarted,
            delivered_to: Vec::new(),
        }
    }
}

/// Persisted dead man's switch record.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug)]
pub struct Secret {
    pub secret_id: SecretId,
    pub owner: PrincipalId,
    pub title: String,
    pub payload: EncryptedPayload,
    pub shares_total: u8,
    pub threshold: u8,
    /// The only share the server ever retains.
    pub server_share: KeyShare,
    /// Verifies recipient shares on submission. Drawn independently of the payload key.
    pub share_tag_key: ShareTagKey,
    pub schedule: Schedule,
    pub status: SecretStatus,
    pub paused_at: Option<TimestampNs>,
    pub recipients: Vec<Recipient>,
    pub reminder: Option<ReminderState>,
    pub disclosure: Disclosure,
    pub triggered_at: Option<TimestampNs>,
    pub created_at: TimestampNs,
    pub updated_at: TimestampNs,
    /// Bumped by the store on every successful conditional write.
    pub version: u64,
}

impl Secret {
    pub fn next_deadline(&self) -> TimestampNs {
        self.schedule.next_deadline()
    }

    pub fn ensure_owner(&self, auth: &AuthContext) -> Result<(), SwitchError> {
        if self.owner == auth.principal {
            Ok(())
        } else {
            Err(SwitchError::NotAuthorized(format!(
                "Caller {} does not own secret {}",
                auth.principal, self.secret_id
            )))
        }
    }

    /// Tier of the last reminder sent for the *current* deadline, if any.
    pub fn reminded_tier(&self) -> Option<UrgencyTier> {
        self.reminder
            .as_ref()
            .filter(|r| r.deadline == self.next_deadline())
            .map(|r| r.tier)
    }

    pub fn pending_recipients(&self) -> impl Iterator<Item = &Recipient> {
        self.recipients
            .iter()
            .filter(|r| !self.disclosure.delivered_to.contains(&r.recipient_id))
    }
}

/// Owner-facing view of a secret. Never carries the payload or the server share.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct SecretSummary {
    pub secret_id: SecretId,
    pub title: String,
    pub status: SecretStatus,
    pub shares_total: u8,
    pub threshold: u8,
    pub check_in_interval_days: u32,
    pub last_check_in: TimestampNs,
    pub next_deadline: TimestampNs,
    pub paused_at: Option<TimestampNs>,
    pub recipients: Vec<Recipient>,
    pub disclosure: DisclosureState,
    pub triggered_at: Option<TimestampNs>,
    pub created_at: TimestampNs,
}

impl From<&Secret> for SecretSummary {
    fn from(secret: &Secret) -> Self {
        Self {
            secret_id: secret.secret_id.clone(),
            title: secret.title.clone(),
            status: secret.status,
            shares_total: secret.shares_total,
            threshold: secret.threshold,
            check_in_interval_days: secret.schedule.check_in_interval_days,
            last_check_in: secret.schedule.last_check_in,
            next_deadline: secret.next_deadline(),
            paused_at: secret.paused_at,
            recipients: secret.recipients.clone(),
            disclosure: secret.disclosure.state.clone(),
            triggered_at: secret.triggered_at,
            created_at: secret.created_at,
        }
    }
}
