// src/backend/lib.rs

pub mod api;
pub mod error;
pub mod metrics;
pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

use crate::api::{CheckInRequest, CreateSecretRequest, GetMetricsResponse, SubmitShareRequest};
use crate::error::SwitchError;
use crate::models::common::SecretId;
use crate::models::config::SwitchConfig;
use crate::models::init::InitArgs;
use crate::models::{IssuedToken, OutboundMessage, SecretSummary};
use crate::services::{CreatedSecret, SubmissionStatus, SweepReport};
use crate::storage::config;
use crate::utils::{logging, rng};
use ic_cdk_timers::TimerId;
use std::cell::RefCell;
use std::time::Duration;

// Every randomness consumer goes through the seeded CanisterRng; getrandom must
// never be reached inside the canister.
#[cfg(target_arch = "wasm32")]
fn unsupported_getrandom(_buf: &mut [u8]) -> Result<(), getrandom::Error> {
    Err(getrandom::Error::UNSUPPORTED)
}

#[cfg(target_arch = "wasm32")]
getrandom::register_custom_getrandom!(unsupported_getrandom);

thread_local! {
    static SWEEP_TIMER: RefCell<Option<TimerId>> = const { RefCell::new(None) };
}

#[ic_cdk::init]
fn init(args: InitArgs) {
    logging::init_logging(tracing::Level::INFO);
    if let Err(e) = config::init_config(&args) {
        ic_cdk::trap(&format!("Invalid init arguments: {}", e));
    }
    seed_rng();
    schedule_sweeps(config::get_switch_config().sweep_interval_secs);
    tracing::info!("dead man's switch canister initialized");
}

#[ic_cdk::post_upgrade]
fn post_upgrade() {
    logging::init_logging(tracing::Level::INFO);
    seed_rng();
    schedule_sweeps(config::get_switch_config().sweep_interval_secs);
    tracing::info!("dead man's switch canister upgraded");
}

/// `raw_rand` is an inter-canister call, so seeding runs from a zero-delay timer.
fn seed_rng() {
    ic_cdk_timers::set_timer(Duration::ZERO, || {
        ic_cdk::spawn(async {
            if let Err(e) = rng::initialize_internal_rng().await {
                tracing::error!(error = %e, "failed to seed internal RNG");
            }
        })
    });
}

/// (Re)arms the periodic sweep.
pub(crate) fn schedule_sweeps(interval_secs: u64) {
    SWEEP_TIMER.with(|timer| {
        if let Some(previous) = timer.borrow_mut().take() {
            ic_cdk_timers::clear_timer(previous);
        }
        let id = ic_cdk_timers::set_timer_interval(Duration::from_secs(interval_secs), run_scheduled_sweep);
        *timer.borrow_mut() = Some(id);
    });
}

fn run_scheduled_sweep() {
    if !rng::is_initialized() {
        tracing::warn!("skipping sweep: RNG not seeded yet");
        return;
    }
    let report = api::service().sweep();
    metrics::record_sweep(&report);
}

// Export Candid interface
ic_cdk::export_candid!();
