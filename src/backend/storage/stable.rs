// src/backend/storage/stable.rs
use crate::error::SwitchError;
use crate::models::{CheckInToken, PrincipalId, Secret, ShareSubmission, TimestampNs};
use crate::storage::memory::{
    get_secrets_memory, get_share_submissions_memory, get_tokens_memory, Memory,
};
use crate::storage::storable::Cbor;
use crate::storage::{
    apply_consume, check_version, is_due, sort_by_deadline, upsert_submission, SecretStore,
};
use ic_stable_structures::StableBTreeMap;
use std::cell::RefCell;

type StorableSecret = Cbor<Secret>;
type StorableToken = Cbor<CheckInToken>;
type StorableSubmissions = Cbor<Vec<ShareSubmission>>;

thread_local! {
    /// Secrets: Key = secret_id, Value = Secret
    static SECRETS: RefCell<StableBTreeMap<String, StorableSecret, Memory>> = RefCell::new(
        StableBTreeMap::init(get_secrets_memory())
    );

    /// Check-in tokens: Key = SHA-256 hex of the token, Value = CheckInToken
    static TOKENS: RefCell<StableBTreeMap<String, StorableToken, Memory>> = RefCell::new(
        StableBTreeMap::init(get_tokens_memory())
    );

    /// Recipient shares awaiting reconstruction: Key = secret_id
    static SHARE_SUBMISSIONS: RefCell<StableBTreeMap<String, StorableSubmissions, Memory>> = RefCell::new(
        StableBTreeMap::init(get_share_submissions_memory())
    );
}

/// Handle onto the canister's stable maps.
///
/// A canister executes one message at a time, so each method body is atomic;
/// the version check still rejects writes based on a record that an earlier
/// message (or an awaited call in between) already replaced.
#[derive(Clone, Copy, Debug, Default)]
pub struct StableSecretStore;

impl SecretStore for StableSecretStore {
    fn insert_secret(&self, secret: &Secret) -> Result<(), SwitchError> {
        SECRETS.with(|map_ref| {
            let mut map = map_ref.borrow_mut();
            if map.contains_key(&secret.secret_id) {
                return Err(SwitchError::StorageError(format!(
                    "Secret {} already exists",
                    secret.secret_id
                )));
            }
            map.insert(secret.secret_id.clone(), Cbor(secret.clone()));
            Ok(())
        })
    }

    fn load_secret(&self, secret_id: &str) -> Result<Option<Secret>, SwitchError> {
        Ok(SECRETS.with(|map_ref| map_ref.borrow().get(&secret_id.to_string()).map(|c| c.0)))
    }

    fn save_secret(&self, secret: &mut Secret) -> Result<(), SwitchError> {
        SECRETS.with(|map_ref| {
            let mut map = map_ref.borrow_mut();
            let stored = map
                .get(&secret.secret_id)
                .ok_or_else(|| SwitchError::SecretNotFound(secret.secret_id.clone()))?;
            check_version(&stored.0, secret)?;
            secret.version += 1;
            map.insert(secret.secret_id.clone(), Cbor(secret.clone()));
            Ok(())
        })
    }

    fn load_due_secrets(&self, horizon: TimestampNs) -> Result<Vec<Secret>, SwitchError> {
        let mut due = Vec::new();
        SECRETS.with(|map_ref| {
            for (_key, value) in map_ref.borrow().iter() {
                if is_due(&value.0, horizon) {
                    due.push(value.0);
                }
            }
        });
        sort_by_deadline(&mut due);
        Ok(due)
    }

    fn secrets_by_owner(&self, owner: &PrincipalId) -> Result<Vec<Secret>, SwitchError> {
        let mut owned = Vec::new();
        SECRETS.with(|map_ref| {
            for (_key, value) in map_ref.borrow().iter() {
                if value.0.owner == *owner {
                    owned.push(value.0);
                }
            }
        });
        owned.sort_by_key(|s| s.created_at);
        Ok(owned)
    }

    fn insert_token(&self, token: &CheckInToken) -> Result<(), SwitchError> {
        TOKENS.with(|map_ref| {
            let mut map = map_ref.borrow_mut();
            if map.contains_key(&token.token_hash) {
                return Err(SwitchError::StorageError("Token hash collision".to_string()));
            }
            map.insert(token.token_hash.clone(), Cbor(token.clone()));
            Ok(())
        })
    }

    fn load_token(&self, token_hash: &str) -> Result<Option<CheckInToken>, SwitchError> {
        Ok(TOKENS.with(|map_ref| map_ref.borrow().get(&token_hash.to_string()).map(|c| c.0)))
    }

    fn consume_token(&self, token_hash: &str, now: TimestampNs) -> Result<CheckInToken, SwitchError> {
        TOKENS.with(|map_ref| {
            let mut map = map_ref.borrow_mut();
            let key = token_hash.to_string();
            let mut token = map.get(&key).ok_or(SwitchError::TokenInvalid)?.0;
            apply_consume(&mut token, now)?;
            map.insert(key, Cbor(token.clone()));
            Ok(token)
        })
    }

    fn purge_tokens(&self, expired_before: TimestampNs) -> Result<usize, SwitchError> {
        TOKENS.with(|map_ref| {
            let mut map = map_ref.borrow_mut();
            let stale: Vec<String> = map
                .iter()
                .filter(|(_, token)| token.0.expires_at < expired_before)
                .map(|(key, _)| key)
                .collect();
            for key in &stale {
                map.remove(key);
            }
            Ok(stale.len())
        })
    }

    fn put_share_submission(&self, submission: ShareSubmission) -> Result<(), SwitchError> {
        SHARE_SUBMISSIONS.with(|map_ref| {
            let mut map = map_ref.borrow_mut();
            let key = submission.secret_id.clone();
            let mut list = map.get(&key).map(|c| c.0).unwrap_or_default();
            upsert_submission(&mut list, submission);
            map.insert(key, Cbor(list));
            Ok(())
        })
    }

    fn share_submissions(&self, secret_id: &str) -> Result<Vec<ShareSubmission>, SwitchError> {
        Ok(SHARE_SUBMISSIONS.with(|map_ref| {
            map_ref
                .borrow()
                .get(&secret_id.to_string())
                .map(|c| c.0)
                .unwrap_or_default()
        }))
    }

    fn clear_share_submissions(&self, secret_id: &str) -> Result<(), SwitchError> {
        SHARE_SUBMISSIONS.with(|map_ref| {
            map_ref.borrow_mut().remove(&secret_id.to_string());
        });
        Ok(())
    }
}
