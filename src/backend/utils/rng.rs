// src/backend/utils/rng.rs

use crate::error::SwitchError;
use ic_cdk::api::management_canister::main::raw_rand;
use rand_chacha::rand_core::{CryptoRng, Error as RngError, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::cell::RefCell;

thread_local! {
    // Seeded once from the management canister; every key, nonce, share
    // coefficient and token inside the canister is drawn from here.
    static INTERNAL_RNG: RefCell<Option<ChaCha20Rng>> = const { RefCell::new(None) };
}

/// Seeds the thread-local ChaCha20 RNG from `raw_rand`.
/// Called from a zero-delay timer after `init` and `post_upgrade`.
pub async fn initialize_internal_rng() -> Result<(), SwitchError> {
    let (bytes,) = raw_rand()
        .await
        .map_err(|(code, msg)| SwitchError::InternalError(format!("raw_rand failed: {:?} {}", code, msg)))?;
    let seed: [u8; 32] = bytes
        .get(..32)
        .and_then(|slice| slice.try_into().ok())
        .ok_or_else(|| SwitchError::InternalError("raw_rand returned insufficient bytes for seed".to_string()))?;
    seed_internal_rng(seed);
    tracing::info!("internal RNG seeded");
    Ok(())
}

pub fn seed_internal_rng(seed: [u8; 32]) {
    INTERNAL_RNG.with(|rng| {
        *rng.borrow_mut() = Some(ChaCha20Rng::from_seed(seed));
    });
}

pub fn is_initialized() -> bool {
    INTERNAL_RNG.with(|rng| rng.borrow().is_some())
}

/// Handle onto the thread-local RNG.
///
/// Callers must check [`is_initialized`] first; drawing from an unseeded RNG
/// traps the call, which rolls back any state changes of the message.
#[derive(Clone, Copy, Debug, Default)]
pub struct CanisterRng;

impl CanisterRng {
    fn with_rng<F, R>(f: F) -> R
    where
        F: FnOnce(&mut ChaCha20Rng) -> R,
    {
        INTERNAL_RNG.with(|rng| {
            let mut borrowed = rng.borrow_mut();
            match borrowed.as_mut() {
                Some(rng) => f(rng),
                None => ic_cdk::trap("internal RNG accessed before initialization"),
            }
        })
    }
}

impl RngCore for CanisterRng {
    fn next_u32(&mut self) -> u32 {
        Self::with_rng(|rng| rng.next_u32())
    }

    fn next_u64(&mut self) -> u64 {
        Self::with_rng(|rng| rng.next_u64())
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        Self::with_rng(|rng| rng.fill_bytes(dest))
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), RngError> {
        Self::with_rng(|rng| rng.try_fill_bytes(dest))
    }
}

impl CryptoRng for CanisterRng {}
