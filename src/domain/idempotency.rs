//! Delivery de-duplication for at-least-once webhook providers.
//!
//! [`IdempotencyStore`] remembers delivery keys (Razorpay event IDs, Meta
//! message IDs) for a fixed TTL. A key is claimed before processing and
//! released again if processing fails, so the provider's redelivery of a
//! failed event is still handled.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// In-process `key -> first seen` set with expiry.
#[derive(Debug)]
pub struct IdempotencyStore {
    ttl: Duration,
    keys: Mutex<HashMap<String, Instant>>,
}

impl IdempotencyStore {
    /// Creates an empty store that forgets keys after `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            keys: Mutex::new(HashMap::new()),
        }
    }

    /// Records `key` and returns `true` if it was not seen within the TTL.
    ///
    /// Expired keys are swept on every call.
    pub fn claim(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut keys = self.keys.lock();

        keys.retain(|_, seen_at| now.duration_since(*seen_at) < self.ttl);

        if keys.contains_key(key) {
            return false;
        }
        keys.insert(key.to_owned(), now);
        true
    }

    /// Forgets `key` so a later delivery is processed again.
    pub fn release(&self, key: &str) {
        self.keys.lock().remove(key);
    }

    /// Returns the number of live keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.lock().len()
    }

    /// Returns `true` if no keys are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
