// src/backend/storage/conformance.rs
// Behaviour every SecretStore implementation must share.

use crate::error::SwitchError;
use crate::models::{
    CheckInToken, Disclosure, DisclosureState, Schedule, Secret, SecretStatus, ShareSubmission,
    TokenPurpose, NANOS_PER_DAY,
};
use crate::storage::SecretStore;
use crate::utils::cipher::EncryptedPayload;
use crate::utils::shamir::{KeyShare, ShareTagKey, SECRET_LEN, SHARE_TAG_LEN};
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha20Rng;
use candid::Principal;

pub(crate) fn owner() -> Principal {
    Principal::from_slice(&[7; 29])
}

pub(crate) fn share(index: u8, fill: u8) -> KeyShare {
    KeyShare {
        index,
        value: vec![fill; SECRET_LEN],
        tag: vec![fill; SHARE_TAG_LEN],
    }
}

/// Active secret with a 30 day interval, last checked in at `last_check_in`.
pub(crate) fn sample_secret(secret_id: &str, last_check_in: u64) -> Secret {
    Secret {
        secret_id: secret_id.to_string(),
        owner: owner(),
        title: "bank codes".to_string(),
        payload: EncryptedPayload {
            ciphertext: vec![1, 2, 3],
            nonce: vec![0; 12],
            tag: vec![0; 16],
        },
        shares_total: 3,
        threshold: 2,
        server_share: share(1, 0xAA),
        share_tag_key: ShareTagKey::generate(&mut ChaCha20Rng::seed_from_u64(0)),
        schedule: Schedule {
            check_in_interval_days: 30,
            last_check_in,
        },
        status: SecretStatus::Active,
        paused_at: None,
        recipients: Vec::new(),
        reminder: None,
        disclosure: Disclosure::default(),
        triggered_at: None,
        created_at: last_check_in,
        updated_at: last_check_in,
        version: 0,
    }
}

pub(crate) fn sample_token(hash: &str, expires_at: u64) -> CheckInToken {
    CheckInToken {
        token_hash: hash.to_string(),
        secret_id: "s".to_string(),
        purpose: TokenPurpose::OnDemand,
        created_at: 0,
        expires_at,
        consumed_at: None,
    }
}

pub(crate) fn run_all<S: SecretStore>(store: &S) {
    insert_and_load(store);
    stale_writes_are_rejected(store);
    due_secrets_cover_active_and_unfinished_disclosures(store);
    tokens_are_single_use(store);
    expired_tokens_are_purged(store);
    share_submissions_replace_by_index(store);
}

fn insert_and_load<S: SecretStore>(store: &S) {
    let secret = sample_secret("load", 0);
    store.insert_secret(&secret).unwrap();
    assert!(store.insert_secret(&secret).is_err());

    let loaded = store.load_secret("load").unwrap().unwrap();
    assert_eq!(loaded.secret_id, "load");
    assert_eq!(loaded.server_share, secret.server_share);
    assert!(store.load_secret("missing").unwrap().is_none());
    assert!(store
        .secrets_by_owner(&owner())
        .unwrap()
        .iter()
        .any(|s| s.secret_id == "load"));
    assert!(store
        .secrets_by_owner(&Principal::anonymous())
        .unwrap()
        .is_empty());
}

fn stale_writes_are_rejected<S: SecretStore>(store: &S) {
    store.insert_secret(&sample_secret("cas", 0)).unwrap();
    let mut first = store.load_secret("cas").unwrap().unwrap();
    let mut second = first.clone();

    first.title = "first".to_string();
    store.save_secret(&mut first).unwrap();
    assert_eq!(first.version, 1);

    second.title = "second".to_string();
    assert!(matches!(
        store.save_secret(&mut second),
        Err(SwitchError::ConcurrentModification(_))
    ));
    assert_eq!(second.version, 0);
    assert_eq!(store.load_secret("cas").unwrap().unwrap().title, "first");

    let mut ghost = sample_secret("ghost", 0);
    assert!(matches!(
        store.save_secret(&mut ghost),
        Err(SwitchError::SecretNotFound(_))
    ));
}

fn due_secrets_cover_active_and_unfinished_disclosures<S: SecretStore>(store: &S) {
    // Deadlines: due-a at day 30, due-b at day 40, far at day 400.
    store.insert_secret(&sample_secret("due-a", 0)).unwrap();
    store.insert_secret(&sample_secret("due-b", 10 * NANOS_PER_DAY)).unwrap();
    store.insert_secret(&sample_secret("far", 370 * NANOS_PER_DAY)).unwrap();

    let mut paused = sample_secret("paused", 0);
    paused.status = SecretStatus::Paused;
    store.insert_secret(&paused).unwrap();

    let mut triggered = sample_secret("triggered", 500 * NANOS_PER_DAY);
    triggered.status = SecretStatus::Triggered;
    triggered.disclosure.state = DisclosureState::Pending {
        attempts: 1,
        last_error: "waiting".to_string(),
    };
    store.insert_secret(&triggered).unwrap();

    let mut done = sample_secret("done", 0);
    done.status = SecretStatus::Triggered;
    done.disclosure.state = DisclosureState::Completed { at: 1 };
    store.insert_secret(&done).unwrap();

    let due: Vec<String> = store
        .load_due_secrets(45 * NANOS_PER_DAY)
        .unwrap()
        .into_iter()
        .map(|s| s.secret_id)
        .filter(|id| ["due-a", "due-b", "far", "paused", "triggered", "done"].contains(&id.as_str()))
        .collect();
    assert_eq!(due, vec!["due-a", "due-b", "triggered"]);
}

fn tokens_are_single_use<S: SecretStore>(store: &S) {
    store.insert_token(&sample_token("t1", 100)).unwrap();
    assert!(store.insert_token(&sample_token("t1", 100)).is_err());

    assert_eq!(store.consume_token("nope", 10), Err(SwitchError::TokenInvalid));
    let consumed = store.consume_token("t1", 10).unwrap();
    assert_eq!(consumed.consumed_at, Some(10));
    assert_eq!(store.consume_token("t1", 11), Err(SwitchError::TokenAlreadyUsed));

    store.insert_token(&sample_token("t2", 100)).unwrap();
    assert_eq!(store.consume_token("t2", 100), Err(SwitchError::TokenExpired));
    assert_eq!(store.load_token("t2").unwrap().unwrap().consumed_at, None);
}

fn expired_tokens_are_purged<S: SecretStore>(store: &S) {
    store.insert_token(&sample_token("old", 50)).unwrap();
    store.insert_token(&sample_token("fresh", 5_000)).unwrap();

    let removed = store.purge_tokens(1_000).unwrap();
    assert!(removed >= 1);
    assert!(store.load_token("old").unwrap().is_none());
    assert!(store.load_token("fresh").unwrap().is_some());
}

fn share_submissions_replace_by_index<S: SecretStore>(store: &S) {
    let submit = |index: u8, fill: u8| ShareSubmission {
        secret_id: "subs".to_string(),
        share: share(index, fill),
        submitted_by: owner(),
        submitted_at: 1,
    };
    store.put_share_submission(submit(3, 1)).unwrap();
    store.put_share_submission(submit(2, 1)).unwrap();
    store.put_share_submission(submit(3, 9)).unwrap();

    let stored = store.share_submissions("subs").unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].share.index, 2);
    assert_eq!(stored[1].share, share(3, 9));

    store.clear_share_submissions("subs").unwrap();
    assert!(store.share_submissions("subs").unwrap().is_empty());
}
