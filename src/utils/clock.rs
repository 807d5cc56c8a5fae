use chrono::{DateTime, Utc};

/// Source of "now" for everything time-sensitive in the recovery flow.
///
/// Injected instead of read from the system clock so expiry and rate-limit
/// behaviour can be driven deterministically in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
