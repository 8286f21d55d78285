// src/backend/models/config.rs
use crate::error::SwitchError;
use crate::models::common::{TimestampNs, NANOS_PER_SECOND};
use candid::CandidType;
use serde::{Deserialize, Serialize};

const HOUR_SECS: u64 = 60 * 60;
const DAY_SECS: u64 = 24 * HOUR_SECS;

/// Tunables for check-in evaluation and disclosure.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct SwitchConfig {
    /// How long past the deadline a secret stays in reminder mode before triggering.
    pub grace_period_secs: u64,
    /// How far ahead of the deadline reminders start.
    pub reminder_window_secs: u64,
    pub token_ttl_secs: u64,
    /// Expired tokens are kept this long so late use reports `TokenExpired`.
    pub token_retention_secs: u64,
    /// A sweep that claimed delivery holds it this long before others may reclaim.
    pub delivery_lease_secs: u64,
    pub sweep_interval_secs: u64,
    pub max_recipients: u32,
    pub max_payload_bytes: u32,
    pub max_interval_days: u32,
}

impl Default for SwitchConfig {
    fn default() -> Self {
        Self {
            grace_period_secs: 12 * HOUR_SECS,
            reminder_window_secs: 7 * DAY_SECS,
            token_ttl_secs: 7 * DAY_SECS,
            token_retention_secs: 30 * DAY_SECS,
            delivery_lease_secs: HOUR_SECS,
            sweep_interval_secs: HOUR_SECS,
            max_recipients: 10,
            max_payload_bytes: 64 * 1024,
            max_interval_days: 365,
        }
    }
}

impl SwitchConfig {
    pub fn validate(&self) -> Result<(), SwitchError> {
        if self.sweep_interval_secs == 0 {
            return Err(SwitchError::InvalidInput("sweep_interval_secs must be positive".to_string()));
        }
        if self.token_ttl_secs == 0 {
            return Err(SwitchError::InvalidInput("token_ttl_secs must be positive".to_string()));
        }
        if self.delivery_lease_secs == 0 {
            return Err(SwitchError::InvalidInput("delivery_lease_secs must be positive".to_string()));
        }
        if self.token_retention_secs < self.token_ttl_secs {
            return Err(SwitchError::InvalidInput(
                "token_retention_secs must not be shorter than token_ttl_secs".to_string(),
            ));
        }
        if self.max_recipients == 0 || self.max_payload_bytes == 0 || self.max_interval_days == 0 {
            return Err(SwitchError::InvalidInput("limits must be positive".to_string()));
        }
        Ok(())
    }

    pub fn grace_period_ns(&self) -> u64 {
        secs_to_ns(self.grace_period_secs)
    }

    pub fn reminder_window_ns(&self) -> u64 {
        secs_to_ns(self.reminder_window_secs)
    }

    pub fn token_ttl_ns(&self) -> u64 {
        secs_to_ns(self.token_ttl_secs)
    }

    pub fn token_retention_ns(&self) -> u64 {
        secs_to_ns(self.token_retention_secs)
    }

    pub fn delivery_lease_ns(&self) -> u64 {
        secs_to_ns(self.delivery_lease_secs)
    }
}

fn secs_to_ns(secs: u64) -> TimestampNs {
    secs.saturating_mul(NANOS_PER_SECOND)
}
