// In-process store, for local runs and tests

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use super::{Store, StoreError, WindowCount};

// expired counters are dropped once every this many increments
const SWEEP_EVERY: u64 = 256;

// Counter entry - count plus the instant it expires
struct CounterEntry {
    count: u64,
    expires_at: Instant,
}

#[derive(Default)]
pub struct MemoryStore {
    values: DashMap<String, String>,
    counters: DashMap<String, CounterEntry>,
    increments: AtomicU64,
    closed: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    // Remove every counter whose window has passed
    fn sweep_expired(&self, now: Instant) {
        self.counters.retain(|_, entry| entry.expires_at > now);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.ensure_open()?;
        Ok(self.values.get(key).map(|v| v.value().clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn incr_with_expiry(&self, key: &str, ttl: Duration) -> Result<WindowCount, StoreError> {
        self.ensure_open()?;
        let now = Instant::now();

        // sweep before taking the entry guard, retain locks every shard
        if (self.increments.fetch_add(1, Ordering::Relaxed) + 1) % SWEEP_EVERY == 0 {
            self.sweep_expired(now);
        }

        // the entry guard holds the shard lock, so increment and check can't interleave
        let mut entry = self
            .counters
            .entry(key.to_string())
            .or_insert(CounterEntry {
                count: 0,
                expires_at: now + ttl,
            });

        // expired..? start a new window
        if entry.expires_at <= now {
            entry.count = 0;
            entry.expires_at = now + ttl;
        }

        entry.count += 1;

        Ok(WindowCount {
            count: entry.count,
            remaining: entry.expires_at.saturating_duration_since(now),
        })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.ensure_open()
    }

    async fn close(&self) -> Result<(), StoreError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(StoreError::Closed);
        }
        self.values.clear();
        self.counters.clear();
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
