// src/backend/metrics.rs
use crate::error::SwitchError;
use crate::models::common::TimestampNs;
use crate::services::SweepReport;
use crate::storage::memory::{get_metrics_memory, Memory};
use crate::storage::Cbor;
use candid::CandidType;
use ic_stable_structures::StableCell;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;

/// Canister-wide counters, kept in stable memory across upgrades.
#[derive(CandidType, Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct SwitchMetrics {
    pub secrets_created: u64,
    pub check_ins: u64,
    pub pauses_toggled: u64,
    pub shares_submitted: u64,
    pub reminders_sent: u64,
    pub secrets_triggered: u64,
    pub disclosures_completed: u64,
    pub disclosure_failures: u64,
    pub sweep_errors: u64,
    pub last_sweep_at: Option<TimestampNs>,
    pub last_sweep: Option<SweepReport>,
}

thread_local! {
    static METRICS_CELL: RefCell<StableCell<Cbor<SwitchMetrics>, Memory>> = RefCell::new(
        StableCell::init(get_metrics_memory(), Cbor(SwitchMetrics::default()))
            .expect("Failed to initialize metrics stable cell")
    );
}

pub fn get_metrics() -> SwitchMetrics {
    METRICS_CELL.with(|cell| cell.borrow().get().0.clone())
}

/// Applies `update_fn` to a copy of the metrics and writes it back.
pub fn update_metrics<F>(update_fn: F) -> Result<(), SwitchError>
where
    F: FnOnce(&mut SwitchMetrics),
{
    METRICS_CELL.with(|cell| {
        let mut metrics = cell.borrow().get().0.clone();
        update_fn(&mut metrics);
        cell.borrow_mut()
            .set(Cbor(metrics))
            .map_err(|e| SwitchError::StorageError(format!("Failed to update metrics: {:?}", e)))?;
        Ok(())
    })
}

fn bump(update_fn: impl FnOnce(&mut SwitchMetrics)) {
    // Metrics never fail a user call.
    if let Err(e) = update_metrics(update_fn) {
        tracing::warn!(error = %e, "metrics update failed");
    }
}

pub fn record_secret_created() {
    bump(|m| m.secrets_created = m.secrets_created.saturating_add(1));
}

pub fn record_check_in() {
    bump(|m| m.check_ins = m.check_ins.saturating_add(1));
}

pub fn record_pause_toggle() {
    bump(|m| m.pauses_toggled = m.pauses_toggled.saturating_add(1));
}

pub fn record_share_submitted() {
    bump(|m| m.shares_submitted = m.shares_submitted.saturating_add(1));
}

pub fn record_sweep(report: &SweepReport) {
    bump(|m| {
        m.reminders_sent = m.reminders_sent.saturating_add(u64::from(report.reminders_sent));
        m.secrets_triggered = m.secrets_triggered.saturating_add(u64::from(report.triggered));
        m.disclosures_completed = m
            .disclosures_completed
            .saturating_add(u64::from(report.disclosures_completed));
        m.disclosure_failures = m
            .disclosure_failures
            .saturating_add(u64::from(report.disclosure_failures));
        m.sweep_errors = m.sweep_errors.saturating_add(report.errors.len() as u64);
        m.last_sweep_at = Some(report.started_at);
        m.last_sweep = Some(report.clone());
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweep_reports_accumulate() {
        let report = SweepReport {
            started_at: 77,
            reminders_sent: 2,
            triggered: 1,
            disclosures_completed: 1,
            ..SweepReport::default()
        };
        record_sweep(&report);
        record_sweep(&report);
        record_secret_created();

        let metrics = get_metrics();
        assert_eq!(metrics.reminders_sent, 4);
        assert_eq!(metrics.secrets_triggered, 2);
        assert_eq!(metrics.disclosures_completed, 2);
        assert_eq!(metrics.secrets_created, 1);
        assert_eq!(metrics.last_sweep_at, Some(77));
        assert_eq!(metrics.last_sweep, Some(report));
    }
}
