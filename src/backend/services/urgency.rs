// src/backend/services/urgency.rs
// Reminder urgency tiers and the human readable time-remaining text.

use crate::models::common::{
    TimestampNs, UrgencyTier, NANOS_PER_DAY, NANOS_PER_HOUR, NANOS_PER_MINUTE,
};

/// Fractional days until `deadline`; negative once it has passed.
pub fn days_remaining(deadline: TimestampNs, now: TimestampNs) -> f64 {
    let delta = i128::from(deadline) - i128::from(now);
    delta as f64 / NANOS_PER_DAY as f64
}

pub fn tier_for_days(days: f64) -> UrgencyTier {
    if days <= 0.0 {
        UrgencyTier::Overdue
    } else if days < 1.0 {
        UrgencyTier::Today
    } else if days <= 3.0 {
        UrgencyTier::Approaching
    } else {
        UrgencyTier::Upcoming
    }
}

pub fn tier_for(deadline: TimestampNs, now: TimestampNs) -> UrgencyTier {
    tier_for_days(days_remaining(deadline, now))
}

/// "2 days", "5 hours", "56 minutes", "due now" or "overdue by 3 hours".
///
/// Always the coarsest whole unit, floored, so a fraction of a day is never
/// rendered as "0 days".
pub fn format_time_remaining(deadline: TimestampNs, now: TimestampNs) -> String {
    if deadline >= now {
        coarsest_unit(deadline - now).unwrap_or_else(|| "due now".to_string())
    } else {
        coarsest_unit(now - deadline)
            .map(|span| format!("overdue by {span}"))
            .unwrap_or_else(|| "due now".to_string())
    }
}

fn coarsest_unit(span_ns: u64) -> Option<String> {
    [
        (NANOS_PER_DAY, "day"),
        (NANOS_PER_HOUR, "hour"),
        (NANOS_PER_MINUTE, "minute"),
    ]
    .iter()
    .find_map(|&(unit, name)| {
        let count = span_ns / unit;
        (count >= 1).then(|| plural(count, name))
    })
}

fn plural(count: u64, unit: &str) -> String {
    if count == 1 {
        format!("1 {unit}")
    } else {
        format!("{count} {unit}s")
    }
}
