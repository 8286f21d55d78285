// src/backend/services/mod.rs
// Business logic of the disclosure engine. Nothing in here reads ambient
// canister state; time, identity, entropy, storage and delivery are injected.

pub mod lifecycle;
pub mod notifier;
pub mod scheduler;
pub mod secret_service;
pub mod urgency;

use crate::error::SwitchError;
use crate::models::config::SwitchConfig;
use crate::storage::SecretStore;
use crate::utils::time::Clock;
use notifier::Notifier;
use rand_core::{CryptoRng, RngCore};
use std::sync::Mutex;

pub use scheduler::{DisclosureOutcome, SecretOutcome, SweepError, SweepReport};
pub use secret_service::{CreatedSecret, DistributedShare, NewSecret, RecipientInput, SubmissionStatus};

/// The engine, wired to its collaborators.
pub struct SwitchService<S, C, N, R> {
    store: S,
    clock: C,
    notifier: N,
    rng: Mutex<R>,
    config: SwitchConfig,
}

impl<S, C, N, R> SwitchService<S, C, N, R>
where
    S: SecretStore,
    C: Clock,
    N: Notifier,
    R: RngCore + CryptoRng,
{
    pub fn new(store: S, clock: C, notifier: N, rng: R, config: SwitchConfig) -> Self {
        Self {
            store,
            clock,
            notifier,
            rng: Mutex::new(rng),
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn config(&self) -> &SwitchConfig {
        &self.config
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut R) -> T) -> Result<T, SwitchError> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| SwitchError::InternalError("rng lock poisoned".to_string()))?;
        Ok(f(&mut *rng))
    }
}
