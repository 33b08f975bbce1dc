//! Injectable time source.
//!
//! The scheduling logic never reads the wall clock directly; it takes
//! time from a `Clock` so tests can simulate a month of polling without
//! real sleeps.

use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Trait for obtaining the current time.
pub trait Clock: Send + Sync {
    /// Returns the current UTC time.
    fn now(&self) -> DateTime<Utc>;

    /// Returns the current time in milliseconds since the Unix epoch.
    fn now_ms(&self) -> u64 {
        self.now().timestamp_millis().max(0) as u64
    }
}

/// System clock implementation using real time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// Lets tests hand the same manual clock to the driver and to the test
// body via Arc.
impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}
