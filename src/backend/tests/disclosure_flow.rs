mod common;

use candid::Principal;
use common::*;
use deadswitch_backend::error::SwitchError;
use deadswitch_backend::models::{
    AuthContext, DisclosureState, SecretStatus, ShareSubmission, NANOS_PER_DAY,
};
use deadswitch_backend::storage::SecretStore;
use deadswitch_backend::utils::shamir::KeyShare;
use deadswitch_backend::utils::time::Clock;

#[test]
fn overdue_secret_triggers_then_discloses_once_shares_arrive() {
    let harness = harness();
    let created = create_default(&harness);
    let id = created.secret.secret_id.clone();

    // Last check-in 31 days ago with a 30 day interval.
    harness.clock().advance(31 * NANOS_PER_DAY);
    let report = harness.sweep();
    assert_eq!(report.triggered, 1);
    assert_eq!(report.disclosures_pending, 1);
    assert!(report.errors.is_empty());

    let secret = load(&harness, &id);
    assert_eq!(secret.status, SecretStatus::Triggered);
    assert_eq!(secret.triggered_at, Some(START + 31 * NANOS_PER_DAY));
    match &secret.disclosure.state {
        DisclosureState::Pending { attempts, last_error } => {
            assert_eq!(*attempts, 1);
            assert_eq!(
                *last_error,
                SwitchError::DisclosurePending("1 of 3 shares available".to_string()).to_string()
            );
        }
        other => panic!("expected Pending, got {other:?}"),
    }
    assert_eq!(harness.notifier().share_requests().len(), 3);
    assert!(harness.notifier().disclosures().is_empty());

    let status = harness.submit_share(&owner(), &id, &created.shares[0].encoded).unwrap();
    assert_eq!((status.available, status.threshold), (2, 3));
    harness.clock().advance(NANOS_PER_DAY);
    let report = harness.sweep();
    assert_eq!(report.disclosures_pending, 1);
    assert!(matches!(
        load(&harness, &id).disclosure.state,
        DisclosureState::Pending { attempts: 2, .. }
    ));

    harness.submit_share(&owner(), &id, &created.shares[3].encoded).unwrap();
    let report = harness.sweep();
    assert_eq!(report.disclosures_completed, 1);

    let deliveries = harness.notifier().disclosures();
    assert_eq!(deliveries.len(), 3);
    assert!(deliveries.iter().all(|d| d.plaintext == PLAINTEXT && d.secret_id == id));

    let secret = load(&harness, &id);
    assert!(secret.disclosure.state.is_completed());
    assert_eq!(secret.disclosure.delivered_to.len(), 3);
    assert!(harness.store().share_submissions(&id).unwrap().is_empty());

    // Completed secrets are no longer swept.
    let report = harness.sweep();
    assert_eq!(report.evaluated, 0);
    assert_eq!(harness.notifier().disclosures().len(), 3);
    assert!(matches!(
        harness.submit_share(&owner(), &id, &created.shares[1].encoded),
        Err(SwitchError::InvalidStateTransition(_))
    ));
}

#[test]
fn tampered_share_is_rejected_on_submission() {
    let harness = harness();
    let created = create_default(&harness);
    let id = created.secret.secret_id.clone();
    harness.clock().advance(31 * NANOS_PER_DAY);
    harness.sweep();

    let mut tampered = KeyShare::decode(&created.shares[0].encoded).unwrap();
    tampered.value[0] ^= 0x01;
    assert!(matches!(
        harness.submit_share(&owner(), &id, &tampered.encode()),
        Err(SwitchError::MalformedShare(_))
    ));
    assert!(harness.store().share_submissions(&id).unwrap().is_empty());

    // A genuine share from another secret carries a tag under another key.
    let other = create_default(&harness);
    assert!(matches!(
        harness.submit_share(&owner(), &id, &other.shares[0].encoded),
        Err(SwitchError::MalformedShare(_))
    ));

    harness.submit_share(&owner(), &id, &created.shares[0].encoded).unwrap();
    harness.submit_share(&owner(), &id, &created.shares[1].encoded).unwrap();
    let report = harness.sweep();
    assert_eq!(report.disclosures_completed, 1);
    assert_eq!(harness.notifier().disclosures().len(), 3);
}

#[test]
fn anonymous_overwrites_cannot_block_disclosure() {
    let harness = harness();
    let created = create_default(&harness);
    let id = created.secret.secret_id.clone();
    harness.clock().advance(31 * NANOS_PER_DAY);
    harness.sweep();

    for share in &created.shares {
        harness.submit_share(&owner(), &id, &share.encoded).unwrap();
    }

    let stranger = AuthContext::new(Principal::anonymous());
    for share in &created.shares {
        let mut forged = KeyShare::decode(&share.encoded).unwrap();
        forged.value[0] ^= 0x5a;
        assert!(matches!(
            harness.submit_share(&stranger, &id, &forged.encode()),
            Err(SwitchError::MalformedShare(_))
        ));
    }
    // Resubmitting a genuine share changes nothing.
    harness.submit_share(&stranger, &id, &created.shares[2].encoded).unwrap();

    let stored = harness.store().share_submissions(&id).unwrap();
    assert_eq!(stored.len(), 4);

    let report = harness.sweep();
    assert_eq!(report.disclosures_completed, 1);
    assert_eq!(report.disclosure_failures, 0);
    assert!(harness
        .notifier()
        .disclosures()
        .iter()
        .all(|d| d.plaintext == PLAINTEXT));
}

#[test]
fn corrupted_stored_share_fails_until_replaced() {
    let harness = harness();
    let created = create_default(&harness);
    let id = created.secret.secret_id.clone();
    harness.clock().advance(31 * NANOS_PER_DAY);
    harness.sweep();

    // Damage at rest bypasses submission checks.
    let mut damaged = KeyShare::decode(&created.shares[0].encoded).unwrap();
    damaged.value[7] ^= 0x01;
    harness
        .store()
        .put_share_submission(ShareSubmission {
            secret_id: id.clone(),
            share: damaged,
            submitted_by: owner().principal,
            submitted_at: harness.clock().now(),
        })
        .unwrap();
    harness.submit_share(&owner(), &id, &created.shares[1].encoded).unwrap();

    let report = harness.sweep();
    assert_eq!(report.disclosure_failures, 1);
    match load(&harness, &id).disclosure.state {
        DisclosureState::Failed { reason, .. } => {
            assert_eq!(reason, SwitchError::ReconstructionMismatch.to_string())
        }
        other => panic!("expected Failed, got {other:?}"),
    }
    assert!(harness.notifier().disclosures().is_empty());

    // The genuine share for the same index replaces the damaged one.
    harness.submit_share(&owner(), &id, &created.shares[0].encoded).unwrap();
    let report = harness.sweep();
    assert_eq!(report.disclosures_completed, 1);
    assert_eq!(harness.notifier().disclosures().len(), 3);
}

#[test]
fn partial_delivery_failure_is_retried_without_resending() {
    let harness = harness();
    let created = create_default(&harness);
    let id = created.secret.secret_id.clone();
    harness.clock().advance(31 * NANOS_PER_DAY);
    harness.sweep();
    harness.submit_share(&owner(), &id, &created.shares[0].encoded).unwrap();
    harness.submit_share(&owner(), &id, &created.shares[1].encoded).unwrap();

    harness.notifier().fail_disclosures_to(&recipient_address(1));
    let report = harness.sweep();
    assert_eq!(report.disclosure_failures, 1);
    let secret = load(&harness, &id);
    assert!(matches!(secret.disclosure.state, DisclosureState::Failed { .. }));
    assert_eq!(secret.disclosure.delivered_to.len(), 2);
    assert_eq!(harness.notifier().disclosures().len(), 2);

    harness.notifier().stop_failing();
    let report = harness.sweep();
    assert_eq!(report.disclosures_completed, 1);

    let deliveries = harness.notifier().disclosures();
    assert_eq!(deliveries.len(), 3);
    let mut recipients: Vec<&str> = deliveries.iter().map(|d| d.recipient_id.as_str()).collect();
    recipients.sort_unstable();
    recipients.dedup();
    assert_eq!(recipients.len(), 3);
}

#[test]
fn server_share_alone_never_discloses() {
    let harness = harness();
    let created = harness.create_secret(&owner(), new_secret(3, 2, 2)).unwrap();
    let id = created.secret.secret_id;
    harness.clock().advance(31 * NANOS_PER_DAY);

    for _ in 0..3 {
        harness.sweep();
        harness.clock().advance(NANOS_PER_DAY);
    }
    assert!(harness.notifier().disclosures().is_empty());
    assert!(matches!(
        load(&harness, &id).disclosure.state,
        DisclosureState::Pending { attempts: 3, .. }
    ));
}

#[test]
fn server_share_index_cannot_be_submitted() {
    let harness = harness();
    let created = create_default(&harness);
    let id = created.secret.secret_id.clone();
    harness.clock().advance(31 * NANOS_PER_DAY);
    harness.sweep();

    let server_share = load(&harness, &id).server_share;
    assert!(matches!(
        harness.submit_share(&owner(), &id, &server_share.encode()),
        Err(SwitchError::InvalidInput(_))
    ));
    assert!(matches!(
        harness.submit_share(&owner(), &id, "dsw1-2-zz-00"),
        Err(SwitchError::MalformedShare(_))
    ));
}

#[test]
fn off_chain_host_with_os_entropy_round_trips() {
    use deadswitch_backend::models::SwitchConfig;
    use deadswitch_backend::services::SwitchService;
    use deadswitch_backend::storage::MemorySecretStore;
    use deadswitch_backend::utils::time::ManualClock;
    use rand_core::OsRng;

    let service = SwitchService::new(
        MemorySecretStore::new(),
        ManualClock::new(START),
        RecordingNotifier::default(),
        OsRng,
        SwitchConfig::default(),
    );
    let created = service.create_secret(&owner(), new_secret(3, 2, 1)).unwrap();
    let id = created.secret.secret_id.clone();
    service.clock().advance(31 * NANOS_PER_DAY);
    service.sweep();
    service.submit_share(&owner(), &id, &created.shares[1].encoded).unwrap();

    let report = service.sweep();
    assert_eq!(report.disclosures_completed, 1);
    assert_eq!(service.notifier().disclosures()[0].plaintext, PLAINTEXT);
}
