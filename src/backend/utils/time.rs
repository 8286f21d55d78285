use crate::models::common::TimestampNs;
use std::sync::atomic::{AtomicU64, Ordering};

/// Source of "now" for every deadline computation.
pub trait Clock: Send + Sync {
    fn now(&self) -> TimestampNs;
}

/// Internet Computer system time, nanoseconds since epoch.
#[derive(Clone, Copy, Debug, Default)]
pub struct IcClock;

impl Clock for IcClock {
    fn now(&self) -> TimestampNs {
        ic_cdk::api::time()
    }
}

/// Clock that only moves when told to. Used by off-chain hosts replaying
/// schedules and by tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start: TimestampNs) -> Self {
        Self { now: AtomicU64::new(start) }
    }

    pub fn set(&self, now: TimestampNs) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, by: u64) {
        self.now.fetch_add(by, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> TimestampNs {
        self.now.load(Ordering::SeqCst)
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> TimestampNs {
        (**self).now()
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> TimestampNs {
        (**self).now()
    }
}
