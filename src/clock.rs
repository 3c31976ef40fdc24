//! Source of the current time
//!
//! Expiry and analytics ask a [`Clock`] instead of reading the system time directly, so tests can
//! move time forward.

use chrono::DateTime;
use chrono::Utc;

/// Something that knows what time it is
pub trait Clock: Send + Sync + 'static {
    /// The current moment
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
