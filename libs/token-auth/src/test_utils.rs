//! Test utilities: a manual clock and a recording in-memory store.
//!
//! Shared by this crate's unit tests and by the middleware integration tests,
//! so they live in a regular public module rather than behind `cfg(test)`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::revocation::{RevocationStore, StoreError};
use crate::Clock;

/// Clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, delta: chrono::Duration) {
        let mut now = self.now.lock().unwrap();
        *now += delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// In-memory [`RevocationStore`] that records the TTL of every `put` and can
/// simulate a backend outage.
///
/// Entries never self-expire; tests that care about expiry assert on the
/// recorded TTL instead.
#[derive(Default)]
pub struct MockRevocationStore {
    entries: Mutex<HashMap<String, Duration>>,
    failing: AtomicBool,
}

impl MockRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with [`StoreError`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// TTL recorded for `key` by the last `put`, if any.
    pub fn ttl_of(&self, key: &str) -> Option<Duration> {
        self.entries.lock().unwrap().get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StoreError("simulated outage".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RevocationStore for MockRevocationStore {
    async fn put(&self, key: &str, ttl: Duration) -> Result<(), StoreError> {
        self.check_available()?;
        self.entries.lock().unwrap().insert(key.to_string(), ttl);
        Ok(())
    }

    async fn has(&self, key: &str) -> Result<bool, StoreError> {
        self.check_available()?;
        Ok(self.entries.lock().unwrap().contains_key(key))
    }
}
