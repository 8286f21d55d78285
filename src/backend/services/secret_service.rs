// src/backend/services/secret_service.rs
// Owner-facing operations on secret records.

use crate::error::SwitchError;
use crate::models::{
    AuthContext, CheckInToken, ContactChannel, Disclosure, IssuedToken, Recipient, Schedule,
    Secret, SecretId, SecretStatus, SecretSummary, ShareSubmission, TimestampNs, TokenPurpose,
};
use crate::services::notifier::Notifier;
use crate::services::{lifecycle, SwitchService};
use crate::storage::SecretStore;
use crate::utils::cipher::{self, PayloadKey};
use crate::utils::crypto::{
    generate_random_hex, token_hash, RECIPIENT_ID_BYTES, SECRET_ID_BYTES, TOKEN_BYTES,
};
use crate::utils::shamir::{self, KeyShare, ShareTagKey, SECRET_LEN};
use crate::utils::time::Clock;
use candid::CandidType;
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Shares issued for the smallest configuration; `shares_total` must reach it.
pub const MIN_SHARES_TOTAL: u8 = 3;
/// Conditional writes a check-in retries after its token was consumed.
const CHECK_IN_WRITE_ATTEMPTS: usize = 3;
const MAX_TITLE_CHARS: usize = 120;

#[derive(Clone, Debug)]
pub struct RecipientInput {
    pub name: String,
    pub channel: ContactChannel,
    pub address: String,
    pub primary: bool,
}

/// Input of `create_secret`. The plaintext is wiped when this is dropped.
pub struct NewSecret {
    pub title: String,
    pub plaintext: Zeroizing<Vec<u8>>,
    pub recipients: Vec<RecipientInput>,
    pub shares_total: u8,
    pub threshold: u8,
    pub interval_days: u32,
}

/// A non-server share, handed out exactly once at creation.
#[derive(CandidType, Serialize, Deserialize, Clone, Zeroize, ZeroizeOnDrop)]
pub struct DistributedShare {
    pub index: u8,
    /// Suggested holder, in recipient order. Owners may redistribute.
    #[zeroize(skip)]
    pub recipient_id: Option<String>,
    pub encoded: String,
}

impl std::fmt::Debug for DistributedShare {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistributedShare")
            .field("index", &self.index)
            .field("recipient_id", &self.recipient_id)
            .field("encoded", &"[REDACTED]")
            .finish()
    }
}

#[derive(CandidType, Serialize, Deserialize, Clone, Debug)]
pub struct CreatedSecret {
    pub secret: SecretSummary,
    pub shares: Vec<DistributedShare>,
}

/// Progress of share collection for a triggered secret.
#[derive(CandidType, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SubmissionStatus {
    pub secret_id: SecretId,
    /// Distinct shares available, the server share included.
    pub available: u8,
    pub threshold: u8,
}

impl<S, C, N, R> SwitchService<S, C, N, R>
where
    S: SecretStore,
    C: Clock,
    N: Notifier,
    R: RngCore + CryptoRng,
{
    /// Encrypts the plaintext, splits the key and stores the record.
    ///
    /// The server keeps share 1; shares `2..=shares_total` are returned once
    /// and never stored.
    pub fn create_secret(
        &self,
        auth: &AuthContext,
        input: NewSecret,
    ) -> Result<CreatedSecret, SwitchError> {
        self.validate_new_secret(&input)?;
        let now = self.clock.now();

        let (secret_id, recipients, payload, share_tag_key, mut shares) = self.with_rng(|rng| {
            let secret_id = generate_random_hex(rng, SECRET_ID_BYTES);
            let recipients = build_recipients(&input.recipients, rng);
            let key = PayloadKey::generate(rng);
            let payload = cipher::encrypt(&key, &input.plaintext, secret_id.as_bytes(), rng)?;
            let share_tag_key = ShareTagKey::generate(rng);
            let shares = shamir::split(
                key.as_bytes(),
                input.shares_total,
                input.threshold,
                &share_tag_key,
                rng,
            )?;
            Ok::<_, SwitchError>((secret_id, recipients, payload, share_tag_key, shares))
        })??;

        let server_share = shares.remove(0);
        let secret = Secret {
            secret_id: secret_id.clone(),
            owner: auth.principal,
            title: input.title.trim().to_string(),
            payload,
            shares_total: input.shares_total,
            threshold: input.threshold,
            server_share,
            share_tag_key,
            schedule: Schedule {
                check_in_interval_days: input.interval_days,
                last_check_in: now,
            },
            status: SecretStatus::Active,
            paused_at: None,
            recipients,
            reminder: None,
            disclosure: Disclosure::default(),
            triggered_at: None,
            created_at: now,
            updated_at: now,
            version: 0,
        };
        self.store.insert_secret(&secret)?;

        let distributed = shares
            .iter()
            .enumerate()
            .map(|(position, share)| DistributedShare {
                index: share.index,
                recipient_id: secret
                    .recipients
                    .get(position)
                    .map(|r| r.recipient_id.clone()),
                encoded: share.encode().to_string(),
            })
            .collect();

        tracing::info!(
            secret_id = %secret_id,
            owner = %auth.principal,
            shares_total = secret.shares_total,
            threshold = secret.threshold,
            recipients = secret.recipients.len(),
            "secret created"
        );
        Ok(CreatedSecret {
            secret: SecretSummary::from(&secret),
            shares: distributed,
        })
    }

    /// Consumes a single-use token and re-anchors the deadline at `now`.
    ///
    /// # Errors
    ///
    /// * `SecretNotFound` / `NotAuthorized` for an unknown or foreign secret
    /// * `SecretNotActive` once the secret has been triggered
    /// * `TokenInvalid`, `TokenAlreadyUsed`, `TokenExpired` from the token check
    pub fn record_check_in(
        &self,
        auth: &AuthContext,
        secret_id: &str,
        token: &str,
    ) -> Result<Secret, SwitchError> {
        let now = self.clock.now();
        let mut secret = self.load_owned(auth, secret_id)?;
        if secret.status == SecretStatus::Triggered {
            return Err(SwitchError::SecretNotActive(format!(
                "Secret {} has been triggered",
                secret_id
            )));
        }

        let hash = token_hash(token);
        self.store
            .load_token(&hash)?
            .filter(|t| t.secret_id == secret.secret_id)
            .ok_or(SwitchError::TokenInvalid)?;
        self.store.consume_token(&hash, now)?;

        for attempt in 0..CHECK_IN_WRITE_ATTEMPTS {
            if attempt > 0 {
                secret = self.load_owned(auth, secret_id)?;
            }
            lifecycle::apply_check_in(&mut secret, now)?;
            match self.store.save_secret(&mut secret) {
                Ok(()) => {
                    tracing::info!(secret_id = %secret_id, next_deadline = secret.next_deadline(), "check-in recorded");
                    return Ok(secret);
                }
                Err(SwitchError::ConcurrentModification(reason)) => {
                    tracing::debug!(secret_id = %secret_id, attempt, %reason, "check-in write lost a race, retrying");
                }
                Err(e) => return Err(e),
            }
        }
        Err(SwitchError::ConcurrentModification(format!(
            "Secret {} kept changing during check-in",
            secret_id
        )))
    }

    /// `Active -> Paused`, or `Paused -> Active` (which also counts as a check-in).
    pub fn toggle_pause(&self, auth: &AuthContext, secret_id: &str) -> Result<Secret, SwitchError> {
        let now = self.clock.now();
        let mut secret = self.load_owned(auth, secret_id)?;
        lifecycle::apply_pause_toggle(&mut secret, now)?;
        self.store.save_secret(&mut secret)?;
        tracing::info!(secret_id = %secret_id, status = ?secret.status, "pause toggled");
        Ok(secret)
    }

    /// Mints an on-demand check-in token for the owner.
    pub fn issue_check_in_token(
        &self,
        auth: &AuthContext,
        secret_id: &str,
    ) -> Result<IssuedToken, SwitchError> {
        let secret = self.load_owned(auth, secret_id)?;
        if secret.status == SecretStatus::Triggered {
            return Err(SwitchError::SecretNotActive(format!(
                "Secret {} has been triggered",
                secret_id
            )));
        }
        self.mint_token(&secret.secret_id, TokenPurpose::OnDemand, self.clock.now())
    }

    /// Accepts a recipient's share for a triggered secret.
    ///
    /// Recipients are not principals, so any caller may submit. A share is
    /// stored only if its tag verifies under the secret's tag key, so a
    /// submission can replace a genuine share only with the same share.
    pub fn submit_share(
        &self,
        auth: &AuthContext,
        secret_id: &str,
        encoded_share: &str,
    ) -> Result<SubmissionStatus, SwitchError> {
        let share = KeyShare::decode(encoded_share)?;
        let secret = self
            .store
            .load_secret(secret_id)?
            .ok_or_else(|| SwitchError::SecretNotFound(secret_id.to_string()))?;

        if secret.status != SecretStatus::Triggered {
            return Err(SwitchError::InvalidStateTransition(format!(
                "Secret {} is not triggered; shares are accepted only after a missed deadline",
                secret_id
            )));
        }
        if secret.disclosure.state.is_completed() {
            return Err(SwitchError::InvalidStateTransition(format!(
                "Secret {} has already been disclosed",
                secret_id
            )));
        }
        if share.index == secret.server_share.index {
            return Err(SwitchError::InvalidInput(format!(
                "Share {} is held by the server",
                share.index
            )));
        }
        if share.index > secret.shares_total {
            return Err(SwitchError::MalformedShare(format!(
                "Share index {} exceeds the {} shares issued",
                share.index, secret.shares_total
            )));
        }
        if !secret.share_tag_key.verify(&share) {
            tracing::warn!(secret_id = %secret_id, share_index = share.index, caller = %auth.principal, "rejected share with a bad integrity tag");
            return Err(SwitchError::MalformedShare(format!(
                "Share {} does not belong to secret {}",
                share.index, secret_id
            )));
        }

        let index = share.index;
        self.store.put_share_submission(ShareSubmission {
            secret_id: secret.secret_id.clone(),
            share,
            submitted_by: auth.principal,
            submitted_at: self.clock.now(),
        })?;
        let available = 1 + self.store.share_submissions(secret_id)?.len() as u8;
        tracing::info!(secret_id = %secret_id, share_index = index, available, threshold = secret.threshold, "share submitted");

        Ok(SubmissionStatus {
            secret_id: secret.secret_id,
            available,
            threshold: secret.threshold,
        })
    }

    pub fn get_secret(&self, auth: &AuthContext, secret_id: &str) -> Result<SecretSummary, SwitchError> {
        self.load_owned(auth, secret_id).map(|s| SecretSummary::from(&s))
    }

    pub fn list_secrets(&self, auth: &AuthContext) -> Result<Vec<SecretSummary>, SwitchError> {
        Ok(self
            .store
            .secrets_by_owner(&auth.principal)?
            .iter()
            .map(SecretSummary::from)
            .collect())
    }

    /// Stores the hash of a fresh token and returns the raw token once.
    pub(crate) fn mint_token(
        &self,
        secret_id: &SecretId,
        purpose: TokenPurpose,
        now: TimestampNs,
    ) -> Result<IssuedToken, SwitchError> {
        let token = self.with_rng(|rng| generate_random_hex(rng, TOKEN_BYTES))?;
        let expires_at = now.saturating_add(self.config.token_ttl_ns());
        self.store.insert_token(&CheckInToken {
            token_hash: token_hash(&token),
            secret_id: secret_id.clone(),
            purpose,
            created_at: now,
            expires_at,
            consumed_at: None,
        })?;
        tracing::debug!(secret_id = %secret_id, ?purpose, expires_at, "check-in token issued");
        Ok(IssuedToken {
            secret_id: secret_id.clone(),
            token,
            expires_at,
        })
    }

    fn load_owned(&self, auth: &AuthContext, secret_id: &str) -> Result<Secret, SwitchError> {
        let secret = self
            .store
            .load_secret(secret_id)?
            .ok_or_else(|| SwitchError::SecretNotFound(secret_id.to_string()))?;
        secret.ensure_owner(auth)?;
        Ok(secret)
    }

    fn validate_new_secret(&self, input: &NewSecret) -> Result<(), SwitchError> {
        let title = input.title.trim();
        if title.is_empty() || title.chars().count() > MAX_TITLE_CHARS {
            return Err(SwitchError::InvalidInput(format!(
                "Title must be 1 to {MAX_TITLE_CHARS} characters"
            )));
        }
        if input.plaintext.is_empty() {
            return Err(SwitchError::InvalidInput("Secret message is empty".to_string()));
        }
        if input.plaintext.len() > self.config.max_payload_bytes as usize {
            return Err(SwitchError::InvalidInput(format!(
                "Secret message exceeds {} bytes",
                self.config.max_payload_bytes
            )));
        }

        shamir::validate_parameters(input.shares_total, input.threshold)?;
        if input.shares_total < MIN_SHARES_TOTAL {
            return Err(SwitchError::InvalidThresholdParameters {
                total: input.shares_total,
                threshold: input.threshold,
            });
        }

        if input.interval_days == 0 || input.interval_days > self.config.max_interval_days {
            return Err(SwitchError::InvalidInput(format!(
                "Check-in interval must be 1 to {} days",
                self.config.max_interval_days
            )));
        }

        if input.recipients.is_empty() || input.recipients.len() > self.config.max_recipients as usize {
            return Err(SwitchError::InvalidInput(format!(
                "A secret needs 1 to {} recipients",
                self.config.max_recipients
            )));
        }
        if input.recipients.iter().filter(|r| r.primary).count() > 1 {
            return Err(SwitchError::InvalidInput(
                "Exactly one recipient can be primary".to_string(),
            ));
        }
        input.recipients.iter().try_for_each(validate_recipient)
    }
}

fn validate_recipient(recipient: &RecipientInput) -> Result<(), SwitchError> {
    if recipient.name.trim().is_empty() {
        return Err(SwitchError::InvalidInput("Recipient name is empty".to_string()));
    }
    let address = recipient.address.trim();
    let valid = match recipient.channel {
        ContactChannel::Email => {
            matches!(address.split_once('@'), Some((local, domain)) if !local.is_empty() && domain.contains('.'))
        }
        ContactChannel::Sms => {
            address.len() > 1
                && address.len() <= 16
                && address.starts_with('+')
                && address[1..].chars().all(|c| c.is_ascii_digit())
        }
    };
    if !valid {
        return Err(SwitchError::InvalidInput(format!(
            "Invalid {:?} address for recipient '{}'",
            recipient.channel,
            recipient.name.trim()
        )));
    }
    Ok(())
}

/// Assigns ids and makes the first recipient primary when none was marked.
fn build_recipients<R: RngCore + CryptoRng>(inputs: &[RecipientInput], rng: &mut R) -> Vec<Recipient> {
    let has_primary = inputs.iter().any(|r| r.primary);
    inputs
        .iter()
        .enumerate()
        .map(|(position, input)| Recipient {
            recipient_id: generate_random_hex(rng, RECIPIENT_ID_BYTES),
            name: input.name.trim().to_string(),
            channel: input.channel,
            address: input.address.trim().to_string(),
            primary: input.primary || (!has_primary && position == 0),
        })
        .collect()
}

// The key handed to `split` is exactly one cipher key.
const _: () = assert!(SECRET_LEN == cipher::KEY_LEN);
