//! Nonce generation for signed Kraken requests.
//!
//! Kraken requires every private request to carry a nonce strictly greater
//! than the last one seen for the key. The generator tracks wall-clock
//! milliseconds but never goes backwards, so a clock regression cannot
//! invalidate the API key's nonce window.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::clock::{Clock, SystemClock};

/// Monotonic nonce source owned by the exchange client.
///
/// `next()` returns `max(previous + 1, now_ms)`: nonces track wall time
/// when it advances and fall back to a plain counter when it does not.
/// Thread-safe via a CAS loop.
pub struct NonceGenerator<C: Clock = SystemClock> {
    counter: AtomicU64,
    clock: C,
}

impl<C: Clock> NonceGenerator<C> {
    /// Create a generator seeded from the clock's current milliseconds.
    pub fn new(clock: C) -> Self {
        let now = clock.now_ms();
        Self {
            counter: AtomicU64::new(now),
            clock,
        }
    }

    /// Generate the next nonce: strictly greater than every prior one.
    pub fn next(&self) -> u64 {
        let target = self.clock.now_ms();

        loop {
            let current = self.counter.load(Ordering::Acquire);
            let next_val = current.saturating_add(1).max(target);

            match self.counter.compare_exchange_weak(
                current,
                next_val,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return next_val,
                Err(_) => continue,
            }
        }
    }
}

impl NonceGenerator<SystemClock> {
    pub fn with_system_clock() -> Self {
        Self::new(SystemClock)
    }
}
