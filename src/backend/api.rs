// src/backend/api.rs
// Candid endpoints. Requests are validated here; everything else is delegated
// to `SwitchService` wired to stable storage, the IC clock and the outbox.

use crate::{
    error::SwitchError,
    metrics::{self, SwitchMetrics},
    models::{
        common::{ContactChannel, SecretId},
        config::SwitchConfig,
        IssuedToken, OutboundMessage, SecretSummary,
    },
    services::{
        notifier::OutboxNotifier, CreatedSecret, NewSecret, RecipientInput, SubmissionStatus,
        SweepReport, SwitchService,
    },
    storage::{config, outbox, StableSecretStore},
    utils::{
        guards::{admin_guard, any_caller, authenticated_caller, cron_or_admin_guard, relay_or_admin_guard},
        rng::{self, CanisterRng},
        time::IcClock,
    },
};
use candid::CandidType;
use ic_cdk_macros::{query, update};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};
use zeroize::Zeroizing;

pub(crate) type CanisterService =
    SwitchService<StableSecretStore, IcClock, OutboxNotifier<IcClock>, CanisterRng>;

const MAX_DRAIN_BATCH: u32 = 100;

pub(crate) fn service() -> CanisterService {
    SwitchService::new(
        StableSecretStore,
        IcClock,
        OutboxNotifier::new(IcClock),
        CanisterRng,
        config::get_switch_config(),
    )
}

// --- Validation Helper ---
fn validate_request<T: Validate>(req: &T) -> Result<(), SwitchError> {
    req.validate().map_err(|e| SwitchError::InvalidInput(e.to_string()))
}

fn ensure_rng_ready() -> Result<(), SwitchError> {
    if rng::is_initialized() {
        Ok(())
    } else {
        Err(SwitchError::InternalError(
            "Randomness is not initialized yet, retry shortly".to_string(),
        ))
    }
}

fn validate_secret_id(secret_id: &str) -> Result<(), ValidationError> {
    if secret_id.len() == 32 && secret_id.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(())
    } else {
        Err(ValidationError::new("secret_id"))
    }
}

// --- Request/Response Structs ---

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, Validate)]
pub struct RecipientRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub channel: ContactChannel,
    #[validate(length(min = 3, max = 254))]
    pub address: String,
    pub primary: bool,
}

/// Not `Debug`: carries the plaintext.
#[derive(CandidType, Deserialize, Clone, Validate)]
pub struct CreateSecretRequest {
    #[validate(length(min = 1, max = 120))]
    pub title: String,
    #[serde(with = "serde_bytes")]
    #[validate(length(min = 1))]
    pub plaintext: Vec<u8>,
    #[validate(length(min = 1), nested)]
    pub recipients: Vec<RecipientRequest>,
    #[validate(range(min = 3, max = 7))]
    pub shares_total: u8,
    #[validate(range(min = 2, max = 7))]
    pub threshold: u8,
    #[validate(range(min = 1))]
    pub interval_days: u32,
}

#[derive(CandidType, Deserialize, Clone, Debug, Validate)]
pub struct CheckInRequest {
    #[validate(custom(function = "validate_secret_id"))]
    pub secret_id: SecretId,
    #[validate(length(min = 1, max = 128))]
    pub token: String,
}

#[derive(CandidType, Deserialize, Clone, Debug, Validate)]
pub struct SubmitShareRequest {
    #[validate(custom(function = "validate_secret_id"))]
    pub secret_id: SecretId,
    #[validate(length(min = 1, max = 256))]
    pub share: String,
}

#[derive(CandidType, Deserialize, Serialize, Clone, Debug)]
pub struct GetMetricsResponse {
    pub metrics: SwitchMetrics,
    pub outbox_pending: u64,
    pub cycle_balance: u128,
}

impl From<CreateSecretRequest> for NewSecret {
    fn from(req: CreateSecretRequest) -> Self {
        NewSecret {
            title: req.title,
            plaintext: Zeroizing::new(req.plaintext),
            recipients: req
                .recipients
                .into_iter()
                .map(|r| RecipientInput {
                    name: r.name,
                    channel: r.channel,
                    address: r.address,
                    primary: r.primary,
                })
                .collect(),
            shares_total: req.shares_total,
            threshold: req.threshold,
            interval_days: req.interval_days,
        }
    }
}

// --- Owner Endpoints ---

#[update]
fn create_secret(req: CreateSecretRequest) -> Result<CreatedSecret, SwitchError> {
    validate_request(&req)?;
    let auth = authenticated_caller()?;
    ensure_rng_ready()?;
    let created = service().create_secret(&auth, req.into())?;
    metrics::record_secret_created();
    Ok(created)
}

#[update]
fn issue_check_in_token(secret_id: SecretId) -> Result<IssuedToken, SwitchError> {
    let auth = authenticated_caller()?;
    ensure_rng_ready()?;
    service().issue_check_in_token(&auth, &secret_id)
}

#[update]
fn check_in(req: CheckInRequest) -> Result<SecretSummary, SwitchError> {
    validate_request(&req)?;
    let auth = authenticated_caller()?;
    let secret = service().record_check_in(&auth, &req.secret_id, &req.token)?;
    metrics::record_check_in();
    Ok(SecretSummary::from(&secret))
}

#[update]
fn toggle_pause(secret_id: SecretId) -> Result<SecretSummary, SwitchError> {
    let auth = authenticated_caller()?;
    let secret = service().toggle_pause(&auth, &secret_id)?;
    metrics::record_pause_toggle();
    Ok(SecretSummary::from(&secret))
}

#[query]
fn get_secret(secret_id: SecretId) -> Result<SecretSummary, SwitchError> {
    let auth = authenticated_caller()?;
    service().get_secret(&auth, &secret_id)
}

#[query]
fn list_my_secrets() -> Result<Vec<SecretSummary>, SwitchError> {
    let auth = authenticated_caller()?;
    service().list_secrets(&auth)
}

// --- Recipient Endpoints ---

/// Recipients hand back their share after being asked to; no login required.
#[update]
fn submit_share(req: SubmitShareRequest) -> Result<SubmissionStatus, SwitchError> {
    validate_request(&req)?;
    let status = service().submit_share(&any_caller(), &req.secret_id, &req.share)?;
    metrics::record_share_submitted();
    Ok(status)
}

// --- Scheduler / Relay / Admin Endpoints ---

#[update(guard = "cron_or_admin_guard")]
fn run_sweep() -> Result<SweepReport, SwitchError> {
    ensure_rng_ready()?;
    let report = service().sweep();
    metrics::record_sweep(&report);
    Ok(report)
}

#[update(guard = "relay_or_admin_guard")]
fn drain_outbox(limit: u32) -> Vec<OutboundMessage> {
    outbox::drain(limit.clamp(1, MAX_DRAIN_BATCH) as usize)
}

#[query(guard = "admin_guard")]
fn get_metrics() -> Result<GetMetricsResponse, SwitchError> {
    Ok(GetMetricsResponse {
        metrics: metrics::get_metrics(),
        outbox_pending: outbox::pending_count(),
        cycle_balance: ic_cdk::api::canister_balance128(),
    })
}

#[query(guard = "admin_guard")]
fn get_config() -> SwitchConfig {
    config::get_switch_config()
}

#[update(guard = "admin_guard")]
fn update_config(new_config: SwitchConfig) -> Result<(), SwitchError> {
    let interval = new_config.sweep_interval_secs;
    config::set_switch_config(new_config)?;
    crate::schedule_sweeps(interval);
    tracing::info!(sweep_interval_secs = interval, "configuration updated");
    Ok(())
}
