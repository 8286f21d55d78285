// src/backend/services/scheduler.rs
// Periodic sweep: reminders, triggers and disclosure.

use crate::error::SwitchError;
use crate::models::{
    DisclosureState, Recipient, Reminder, ReminderState, Secret, SecretId, TimestampNs,
    TokenPurpose, UrgencyTier,
};
use crate::services::lifecycle::{self, Assessment};
use crate::services::notifier::Notifier;
use crate::services::{urgency, SwitchService};
use crate::storage::SecretStore;
use crate::utils::cipher::{self, PayloadKey};
use crate::utils::shamir::{self, KeyShare};
use crate::utils::time::Clock;
use candid::CandidType;
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisclosureOutcome {
    /// Delivered to every recipient.
    Completed,
    /// Not enough shares yet.
    Pending,
    /// Reconstruction, decryption or delivery failed; retried next sweep.
    Failed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SecretOutcome {
    Idle,
    Reminded(UrgencyTier),
    /// `None` when a concurrent sweep took over the first disclosure attempt.
    Triggered(Option<DisclosureOutcome>),
    Disclosure(DisclosureOutcome),
}

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct SweepError {
    pub secret_id: Option<SecretId>,
    pub error: String,
}

/// What one sweep did. Errors are collected here instead of aborting the run.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub started_at: TimestampNs,
    pub evaluated: u32,
    pub reminders_sent: u32,
    pub triggered: u32,
    pub disclosures_completed: u32,
    pub disclosures_pending: u32,
    pub disclosure_failures: u32,
    /// Secrets another sweep changed first.
    pub contended: u32,
    pub tokens_purged: u64,
    pub errors: Vec<SweepError>,
}

impl SweepReport {
    fn record(&mut self, outcome: SecretOutcome) {
        let disclosure = match outcome {
            SecretOutcome::Idle => None,
            SecretOutcome::Reminded(_) => {
                self.reminders_sent += 1;
                None
            }
            SecretOutcome::Triggered(d) => {
                self.triggered += 1;
                d
            }
            SecretOutcome::Disclosure(d) => Some(d),
        };
        match disclosure {
            Some(DisclosureOutcome::Completed) => self.disclosures_completed += 1,
            Some(DisclosureOutcome::Pending) => self.disclosures_pending += 1,
            Some(DisclosureOutcome::Failed) => self.disclosure_failures += 1,
            None => {}
        }
    }

    fn record_error(&mut self, secret_id: Option<SecretId>, error: &SwitchError) {
        self.errors.push(SweepError {
            secret_id,
            error: error.to_string(),
        });
    }
}

impl<S, C, N, R> SwitchService<S, C, N, R>
where
    S: SecretStore,
    C: Clock,
    N: Notifier,
    R: RngCore + CryptoRng,
{
    /// Evaluates every due secret once.
    ///
    /// Safe to run concurrently with itself: every state change is a
    /// conditional write, and a lost race is counted as `contended`.
    pub fn sweep(&self) -> SweepReport {
        let now = self.clock.now();
        let mut report = SweepReport {
            started_at: now,
            ..SweepReport::default()
        };
        let horizon = now.saturating_add(self.config.reminder_window_ns());

        match self.store.load_due_secrets(horizon) {
            Ok(secrets) => {
                for secret in secrets {
                    report.evaluated += 1;
                    let secret_id = secret.secret_id.clone();
                    match self.process_secret(secret, now) {
                        Ok(outcome) => report.record(outcome),
                        Err(SwitchError::ConcurrentModification(reason)) => {
                            tracing::debug!(secret_id = %secret_id, %reason, "secret handled by another sweep");
                            report.contended += 1;
                        }
                        Err(e) => {
                            tracing::warn!(secret_id = %secret_id, error = %e, "sweep step failed");
                            report.record_error(Some(secret_id), &e);
                        }
                    }
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to load due secrets");
                report.record_error(None, &e);
            }
        }

        let cutoff = now.saturating_sub(self.config.token_retention_ns());
        match self.store.purge_tokens(cutoff) {
            Ok(purged) => report.tokens_purged = purged as u64,
            Err(e) => {
                tracing::warn!(error = %e, "token purge failed");
                report.record_error(None, &e);
            }
        }

        tracing::info!(
            evaluated = report.evaluated,
            reminders = report.reminders_sent,
            triggered = report.triggered,
            completed = report.disclosures_completed,
            pending = report.disclosures_pending,
            failed = report.disclosure_failures,
            contended = report.contended,
            errors = report.errors.len(),
            "sweep finished"
        );
        report
    }

    fn process_secret(&self, secret: Secret, now: TimestampNs) -> Result<SecretOutcome, SwitchError> {
        match lifecycle::assess(&secret, now, &self.config) {
            Assessment::Idle => Ok(SecretOutcome::Idle),
            Assessment::Remind(tier) => self.remind(secret, tier, now),
            Assessment::Trigger => self.trigger(secret, now),
            Assessment::AwaitingDisclosure => self
                .attempt_disclosure(secret, now)
                .map(SecretOutcome::Disclosure),
        }
    }

    /// Claims the tier first so that concurrent sweeps send one reminder;
    /// the claim is rolled back if the reminder cannot be sent.
    fn remind(&self, mut secret: Secret, tier: UrgencyTier, now: TimestampNs) -> Result<SecretOutcome, SwitchError> {
        let deadline = secret.next_deadline();
        let previous = secret.reminder.replace(ReminderState {
            deadline,
            tier,
            sent_at: now,
        });
        secret.updated_at = now;
        self.store.save_secret(&mut secret)?;

        let sent = self
            .mint_token(&secret.secret_id, TokenPurpose::Reminder, now)
            .and_then(|token| {
                self.notifier.send_reminder(&Reminder {
                    secret_id: secret.secret_id.clone(),
                    owner: secret.owner,
                    title: secret.title.clone(),
                    tier,
                    time_remaining: urgency::format_time_remaining(deadline, now),
                    deadline,
                    check_in_token: token.token,
                    token_expires_at: token.expires_at,
                })
            });

        if let Err(e) = sent {
            secret.reminder = previous;
            if let Err(revert) = self.store.save_secret(&mut secret) {
                tracing::warn!(secret_id = %secret.secret_id, error = %revert, "could not release reminder claim");
            }
            return Err(e);
        }
        tracing::info!(secret_id = %secret.secret_id, tier = tier.label(), "reminder sent");
        Ok(SecretOutcome::Reminded(tier))
    }

    fn trigger(&self, mut secret: Secret, now: TimestampNs) -> Result<SecretOutcome, SwitchError> {
        lifecycle::apply_trigger(&mut secret, now)?;
        self.store.save_secret(&mut secret)?;
        tracing::warn!(
            secret_id = %secret.secret_id,
            deadline = secret.next_deadline(),
            "check-in deadline missed, secret triggered"
        );

        for recipient in &secret.recipients {
            if let Err(e) = self.notifier.request_share(&secret, recipient) {
                tracing::warn!(secret_id = %secret.secret_id, recipient_id = %recipient.recipient_id, error = %e, "share request failed");
            }
        }

        // The trigger itself is committed; losing the follow-up write only
        // means another sweep is already attempting disclosure.
        match self.attempt_disclosure(secret, now) {
            Ok(outcome) => Ok(SecretOutcome::Triggered(Some(outcome))),
            Err(SwitchError::ConcurrentModification(_)) => Ok(SecretOutcome::Triggered(None)),
            Err(e) => Err(e),
        }
    }

    /// Reconstructs, decrypts and delivers under a `Delivering` lease.
    ///
    /// Failures are persisted on the disclosure marker and reported as an
    /// outcome; only storage errors and lost races surface as `Err`.
    fn attempt_disclosure(&self, mut secret: Secret, now: TimestampNs) -> Result<DisclosureOutcome, SwitchError> {
        let attempts = secret.disclosure.state.attempts().saturating_add(1);
        let shares = self.collect_shares(&secret)?;

        if shares.len() < usize::from(secret.threshold) {
            let reason = SwitchError::DisclosurePending(format!(
                "{} of {} shares available",
                shares.len(),
                secret.threshold
            ));
            tracing::info!(secret_id = %secret.secret_id, available = shares.len(), threshold = secret.threshold, "disclosure waiting for shares");
            self.set_disclosure_state(
                &mut secret,
                DisclosureState::Pending {
                    attempts,
                    last_error: reason.to_string(),
                },
                now,
            )?;
            return Ok(DisclosureOutcome::Pending);
        }

        let plaintext = match shamir::reconstruct(&shares, secret.threshold, &secret.share_tag_key).and_then(|key| {
            cipher::decrypt(
                &PayloadKey::from_bytes(*key),
                &secret.payload,
                secret.secret_id.as_bytes(),
            )
        }) {
            Ok(plaintext) => plaintext,
            Err(e) => {
                tracing::warn!(secret_id = %secret.secret_id, attempts, error = %e, "disclosure failed to recover the key");
                self.set_disclosure_state(
                    &mut secret,
                    DisclosureState::Failed {
                        attempts,
                        reason: e.to_string(),
                    },
                    now,
                )?;
                return Ok(DisclosureOutcome::Failed);
            }
        };

        // Only the sweep that wins this write delivers.
        self.set_disclosure_state(&mut secret, DisclosureState::Delivering { since: now, attempts }, now)?;

        let pending: Vec<Recipient> = secret.pending_recipients().cloned().collect();
        let mut failures = Vec::new();
        for recipient in &pending {
            match self.notifier.send_disclosure(&secret, recipient, &plaintext) {
                Ok(()) => secret
                    .disclosure
                    .delivered_to
                    .push(recipient.recipient_id.clone()),
                Err(e) => {
                    tracing::warn!(secret_id = %secret.secret_id, recipient_id = %recipient.recipient_id, error = %e, "disclosure delivery failed");
                    failures.push(format!("{}: {}", recipient.recipient_id, e));
                }
            }
        }

        if failures.is_empty() {
            self.set_disclosure_state(&mut secret, DisclosureState::Completed { at: now }, now)?;
            self.store.clear_share_submissions(&secret.secret_id)?;
            tracing::info!(secret_id = %secret.secret_id, recipients = secret.recipients.len(), "secret disclosed");
            Ok(DisclosureOutcome::Completed)
        } else {
            self.set_disclosure_state(
                &mut secret,
                DisclosureState::Failed {
                    attempts,
                    reason: SwitchError::DisclosureFailed(failures.join("; ")).to_string(),
                },
                now,
            )?;
            Ok(DisclosureOutcome::Failed)
        }
    }

    /// The server share plus recipient submissions, one per index.
    fn collect_shares(&self, secret: &Secret) -> Result<Vec<KeyShare>, SwitchError> {
        let mut shares = vec![secret.server_share.clone()];
        for submission in self.store.share_submissions(&secret.secret_id)? {
            if shares.iter().all(|s| s.index != submission.share.index) {
                shares.push(submission.share.clone());
            }
        }
        Ok(shares)
    }

    fn set_disclosure_state(
        &self,
        secret: &mut Secret,
        state: DisclosureState,
        now: TimestampNs,
    ) -> Result<(), SwitchError> {
        secret.disclosure.state = state;
        secret.updated_at = now;
        self.store.save_secret(secret)
    }
}
