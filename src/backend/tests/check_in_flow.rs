mod common;

use common::*;
use deadswitch_backend::error::SwitchError;
use deadswitch_backend::models::{SecretStatus, UrgencyTier, NANOS_PER_DAY, NANOS_PER_HOUR};
use deadswitch_backend::storage::SecretStore;
use deadswitch_backend::utils::crypto::token_hash;
use deadswitch_backend::utils::time::Clock;

#[test]
fn check_in_after_trigger_is_rejected() {
    let harness = harness();
    let id = create_default(&harness).secret.secret_id;
    let token = harness.issue_check_in_token(&owner(), &id).unwrap();

    harness.clock().advance(31 * NANOS_PER_DAY);
    harness.sweep();

    assert!(matches!(
        harness.record_check_in(&owner(), &id, &token.token),
        Err(SwitchError::SecretNotActive(_))
    ));
    assert!(matches!(
        harness.issue_check_in_token(&owner(), &id),
        Err(SwitchError::SecretNotActive(_))
    ));
    assert!(matches!(
        harness.toggle_pause(&owner(), &id),
        Err(SwitchError::SecretNotActive(_))
    ));
    // The token was not burned by the refused check-in.
    let hash = token_hash(&token.token);
    assert_eq!(harness.store().load_token(&hash).unwrap().unwrap().consumed_at, None);
}

#[test]
fn token_reuse_and_expiry() {
    let harness = harness();
    let id = create_default(&harness).secret.secret_id;

    let token = harness.issue_check_in_token(&owner(), &id).unwrap();
    harness.record_check_in(&owner(), &id, &token.token).unwrap();
    assert_eq!(
        harness.record_check_in(&owner(), &id, &token.token).unwrap_err(),
        SwitchError::TokenAlreadyUsed
    );

    let stale = harness.issue_check_in_token(&owner(), &id).unwrap();
    harness.clock().set(stale.expires_at);
    assert_eq!(
        harness.record_check_in(&owner(), &id, &stale.token).unwrap_err(),
        SwitchError::TokenExpired
    );
}

#[test]
fn pause_blocks_trigger_and_resume_reanchors_deadline() {
    let harness = harness();
    let id = create_default(&harness).secret.secret_id;

    harness.clock().advance(NANOS_PER_DAY);
    let paused = harness.toggle_pause(&owner(), &id).unwrap();
    assert_eq!(paused.status, SecretStatus::Paused);
    assert_eq!(paused.next_deadline(), START + 30 * NANOS_PER_DAY);

    harness.clock().advance(59 * NANOS_PER_DAY);
    let report = harness.sweep();
    assert_eq!(report.evaluated, 0);
    assert_eq!(report.triggered, 0);

    // Check-ins while paused keep the secret paused.
    let token = harness.issue_check_in_token(&owner(), &id).unwrap();
    let checked = harness.record_check_in(&owner(), &id, &token.token).unwrap();
    assert_eq!(checked.status, SecretStatus::Paused);

    let resumed = harness.toggle_pause(&owner(), &id).unwrap();
    assert_eq!(resumed.status, SecretStatus::Active);
    assert_eq!(resumed.paused_at, None);
    assert_eq!(resumed.next_deadline(), START + 90 * NANOS_PER_DAY);

    let report = harness.sweep();
    assert_eq!(report.triggered, 0);
    assert_eq!(report.reminders_sent, 0);
}

#[test]
fn reminders_escalate_and_carry_a_working_token() {
    let harness = harness();
    let id = create_default(&harness).secret.secret_id;

    harness.clock().advance(24 * NANOS_PER_DAY);
    harness.sweep();
    harness.sweep();
    let reminders = harness.notifier().reminders();
    assert_eq!(reminders.len(), 1);
    assert_eq!(reminders[0].tier, UrgencyTier::Upcoming);
    assert_eq!(reminders[0].time_remaining, "6 days");

    harness.clock().advance(4 * NANOS_PER_DAY);
    harness.sweep();
    harness.clock().advance(36 * NANOS_PER_HOUR);
    harness.sweep();
    harness.clock().advance(13 * NANOS_PER_HOUR);
    harness.sweep();

    let tiers: Vec<UrgencyTier> = harness.notifier().reminders().iter().map(|r| r.tier).collect();
    assert_eq!(
        tiers,
        vec![
            UrgencyTier::Upcoming,
            UrgencyTier::Approaching,
            UrgencyTier::Today,
            UrgencyTier::Overdue
        ]
    );
    let last = harness.notifier().reminders().pop().unwrap();
    assert_eq!(last.time_remaining, "overdue by 1 hour");

    // Still inside the 12 hour grace period: the reminder token checks in.
    let secret = harness.record_check_in(&owner(), &id, &last.check_in_token).unwrap();
    assert_eq!(secret.reminder, None);
    assert_eq!(secret.next_deadline(), harness.clock().now() + 30 * NANOS_PER_DAY);

    let report = harness.sweep();
    assert_eq!(report.triggered, 0);
    assert_eq!(harness.notifier().reminders().len(), 4);
}

#[test]
fn fraction_of_a_day_reminder_reads_in_minutes() {
    let harness = harness();
    create_default(&harness);

    // 0.0395 days before the deadline.
    harness.clock().set(START + 30 * NANOS_PER_DAY - 3_412_800_000_000);
    harness.sweep();

    let reminders = harness.notifier().reminders();
    assert_eq!(reminders.len(), 1);
    assert_eq!(reminders[0].tier, UrgencyTier::Today);
    assert_eq!(reminders[0].tier.label(), "today");
    assert_eq!(reminders[0].time_remaining, "56 minutes");
}

#[test]
fn failed_reminder_is_retried_on_next_sweep() {
    let harness = harness();
    let id = create_default(&harness).secret.secret_id;
    harness.clock().advance(28 * NANOS_PER_DAY);

    harness.notifier().fail_reminders(true);
    let report = harness.sweep();
    assert_eq!(report.reminders_sent, 0);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].secret_id.as_deref(), Some(id.as_str()));
    assert_eq!(load(&harness, &id).reminder, None);

    harness.notifier().stop_failing();
    let report = harness.sweep();
    assert_eq!(report.reminders_sent, 1);
    assert_eq!(harness.notifier().reminders()[0].tier, UrgencyTier::Approaching);
}

#[test]
fn expired_tokens_are_purged_after_retention() {
    let harness = harness();
    let id = create_default(&harness).secret.secret_id;
    let token = harness.issue_check_in_token(&owner(), &id).unwrap();
    let hash = token_hash(&token.token);

    // Retention is 30 days past expiry; the token expires on day 7.
    harness.clock().set(START + 36 * NANOS_PER_DAY);
    assert_eq!(harness.sweep().tokens_purged, 0);
    assert!(harness.store().load_token(&hash).unwrap().is_some());

    harness.clock().set(START + 38 * NANOS_PER_DAY);
    assert_eq!(harness.sweep().tokens_purged, 1);
    assert!(harness.store().load_token(&hash).unwrap().is_none());
}
