// src/backend/storage/in_memory.rs
use crate::error::SwitchError;
use crate::models::{CheckInToken, PrincipalId, Secret, ShareSubmission, TimestampNs};
use crate::storage::{
    apply_consume, check_version, is_due, sort_by_deadline, upsert_submission, SecretStore,
};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct Tables {
    secrets: HashMap<String, Secret>,
    tokens: HashMap<String, CheckInToken>,
    submissions: HashMap<String, Vec<ShareSubmission>>,
}

/// Thread-safe store for native callers (tests, off-chain tooling).
///
/// One mutex guards all tables, so every trait method is a single atomic step
/// even when several sweeps run on different threads.
#[derive(Default)]
pub struct MemorySecretStore {
    tables: Mutex<Tables>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, SwitchError> {
        self.tables
            .lock()
            .map_err(|_| SwitchError::StorageError("store lock poisoned".to_string()))
    }
}

impl SecretStore for MemorySecretStore {
    fn insert_secret(&self, secret: &Secret) -> Result<(), SwitchError> {
        let mut tables = self.lock()?;
        if tables.secrets.contains_key(&secret.secret_id) {
            return Err(SwitchError::StorageError(format!(
                "Secret {} already exists",
                secret.secret_id
            )));
        }
        tables.secrets.insert(secret.secret_id.clone(), secret.clone());
        Ok(())
    }

    fn load_secret(&self, secret_id: &str) -> Result<Option<Secret>, SwitchError> {
        Ok(self.lock()?.secrets.get(secret_id).cloned())
    }

    fn save_secret(&self, secret: &mut Secret) -> Result<(), SwitchError> {
        let mut tables = self.lock()?;
        let stored = tables
            .secrets
            .get_mut(&secret.secret_id)
            .ok_or_else(|| SwitchError::SecretNotFound(secret.secret_id.clone()))?;
        check_version(stored, secret)?;
        secret.version += 1;
        *stored = secret.clone();
        Ok(())
    }

    fn load_due_secrets(&self, horizon: TimestampNs) -> Result<Vec<Secret>, SwitchError> {
        let mut due: Vec<Secret> = self
            .lock()?
            .secrets
            .values()
            .filter(|s| is_due(s, horizon))
            .cloned()
            .collect();
        sort_by_deadline(&mut due);
        Ok(due)
    }

    fn secrets_by_owner(&self, owner: &PrincipalId) -> Result<Vec<Secret>, SwitchError> {
        let mut owned: Vec<Secret> = self
            .lock()?
            .secrets
            .values()
            .filter(|s| s.owner == *owner)
            .cloned()
            .collect();
        owned.sort_by_key(|s| s.created_at);
        Ok(owned)
    }

    fn insert_token(&self, token: &CheckInToken) -> Result<(), SwitchError> {
        let mut tables = self.lock()?;
        if tables.tokens.contains_key(&token.token_hash) {
            return Err(SwitchError::StorageError("Token hash collision".to_string()));
        }
        tables.tokens.insert(token.token_hash.clone(), token.clone());
        Ok(())
    }

    fn load_token(&self, token_hash: &str) -> Result<Option<CheckInToken>, SwitchError> {
        Ok(self.lock()?.tokens.get(token_hash).cloned())
    }

    fn consume_token(&self, token_hash: &str, now: TimestampNs) -> Result<CheckInToken, SwitchError> {
        let mut tables = self.lock()?;
        let token = tables.tokens.get_mut(token_hash).ok_or(SwitchError::TokenInvalid)?;
        apply_consume(token, now)?;
        Ok(token.clone())
    }

    fn purge_tokens(&self, expired_before: TimestampNs) -> Result<usize, SwitchError> {
        let mut tables = self.lock()?;
        let before = tables.tokens.len();
        tables.tokens.retain(|_, token| token.expires_at >= expired_before);
        Ok(before - tables.tokens.len())
    }

    fn put_share_submission(&self, submission: ShareSubmission) -> Result<(), SwitchError> {
        let mut tables = self.lock()?;
        let list = tables
            .submissions
            .entry(submission.secret_id.clone())
            .or_default();
        upsert_submission(list, submission);
        Ok(())
    }

    fn share_submissions(&self, secret_id: &str) -> Result<Vec<ShareSubmission>, SwitchError> {
        Ok(self
            .lock()?
            .submissions
            .get(secret_id)
            .cloned()
            .unwrap_or_default())
    }

    fn clear_share_submissions(&self, secret_id: &str) -> Result<(), SwitchError> {
        self.lock()?.submissions.remove(secret_id);
        Ok(())
    }
}
