// src/backend/services/lifecycle.rs
// Check-in state machine: status transitions and what a sweep should do.

use crate::error::SwitchError;
use crate::models::common::{SecretStatus, TimestampNs, UrgencyTier};
use crate::models::config::SwitchConfig;
use crate::models::secret::{DisclosureState, Secret};
use crate::services::urgency;

/// What the scheduler should do with a secret right now.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Assessment {
    Idle,
    /// Inside the reminder window (or past due but within grace) and the
    /// tier escalated past the last reminder for this deadline.
    Remind(UrgencyTier),
    /// `now >= deadline + grace`.
    Trigger,
    /// Triggered, not disclosed and nobody holds a live delivery lease.
    AwaitingDisclosure,
}

/// Validates a status change.
pub fn check_transition(secret: &Secret, new_status: SecretStatus) -> Result<(), SwitchError> {
    let old_status = secret.status;
    let is_valid_transition = match (old_status, new_status) {
        (SecretStatus::Active, SecretStatus::Paused) => true, // Owner pause
        (SecretStatus::Paused, SecretStatus::Active) => true, // Owner resume
        (SecretStatus::Active, SecretStatus::Triggered) => true, // Deadline + grace missed
        // Triggered is terminal; a paused secret never triggers.
        _ => false,
    };

    if is_valid_transition {
        return Ok(());
    }
    if old_status == SecretStatus::Triggered {
        return Err(SwitchError::SecretNotActive(format!(
            "Secret {} has been triggered",
            secret.secret_id
        )));
    }
    Err(SwitchError::InvalidStateTransition(format!(
        "Cannot transition secret {} from {:?} to {:?}",
        secret.secret_id, old_status, new_status
    )))
}

/// Liveness signal: re-anchors the deadline and restarts the reminder ladder.
/// The status is left alone, so a paused secret stays paused.
pub fn apply_check_in(secret: &mut Secret, now: TimestampNs) -> Result<(), SwitchError> {
    if secret.status == SecretStatus::Triggered {
        return Err(SwitchError::SecretNotActive(format!(
            "Secret {} has been triggered",
            secret.secret_id
        )));
    }
    secret.schedule.last_check_in = now;
    secret.reminder = None;
    secret.updated_at = now;
    Ok(())
}

/// `Active -> Paused` or `Paused -> Active`.
///
/// Resuming is an authenticated owner action, so it counts as a check-in;
/// otherwise a secret paused past its deadline would trigger on the next sweep.
pub fn apply_pause_toggle(secret: &mut Secret, now: TimestampNs) -> Result<(), SwitchError> {
    let new_status = match secret.status {
        SecretStatus::Active => SecretStatus::Paused,
        _ => SecretStatus::Active,
    };
    check_transition(secret, new_status)?;

    match new_status {
        SecretStatus::Paused => secret.paused_at = Some(now),
        _ => {
            secret.paused_at = None;
            secret.schedule.last_check_in = now;
            secret.reminder = None;
        }
    }
    secret.status = new_status;
    secret.updated_at = now;
    Ok(())
}

pub fn apply_trigger(secret: &mut Secret, now: TimestampNs) -> Result<(), SwitchError> {
    check_transition(secret, SecretStatus::Triggered)?;
    secret.status = SecretStatus::Triggered;
    secret.triggered_at = Some(now);
    secret.disclosure.state = DisclosureState::Pending {
        attempts: 0,
        last_error: SwitchError::DisclosurePending("awaiting recipient shares".to_string()).to_string(),
    };
    secret.updated_at = now;
    Ok(())
}

pub fn assess(secret: &Secret, now: TimestampNs, config: &SwitchConfig) -> Assessment {
    match secret.status {
        SecretStatus::Paused => Assessment::Idle,
        SecretStatus::Triggered => match secret.disclosure.state {
            DisclosureState::Completed { .. } => Assessment::Idle,
            DisclosureState::Delivering { since, .. }
                if now < since.saturating_add(config.delivery_lease_ns()) =>
            {
                Assessment::Idle
            }
            _ => Assessment::AwaitingDisclosure,
        },
        SecretStatus::Active => {
            let deadline = secret.next_deadline();
            if now >= deadline.saturating_add(config.grace_period_ns()) {
                return Assessment::Trigger;
            }
            if now.saturating_add(config.reminder_window_ns()) < deadline {
                return Assessment::Idle;
            }
            let tier = urgency::tier_for(deadline, now);
            if Some(tier) > secret.reminded_tier() {
                Assessment::Remind(tier)
            } else {
                Assessment::Idle
            }
        }
    }
}
