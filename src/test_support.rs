use async_trait::async_trait;
use dashmap::DashMap;
use std::time::Duration;

use crate::store::{Store, StoreError, WindowCount};

// Store whose every call fails as if the backend were down
pub struct UnreachableStore;

fn unreachable() -> StoreError {
    StoreError::Connect {
        target: "redis://unreachable:6379/0".to_string(),
        reason: "connection refused".to_string(),
    }
}

#[async_trait]
impl Store for UnreachableStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(unreachable())
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
        Err(unreachable())
    }

    async fn incr_with_expiry(&self, _key: &str, _ttl: Duration) -> Result<WindowCount, StoreError> {
        Err(unreachable())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Err(unreachable())
    }

    async fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn describe(&self) -> String {
        "unreachable".to_string()
    }
}

// One key space for records and counters, like a single Redis database.
// INCR on a non-integer value fails the way Redis does.
#[derive(Default)]
pub struct SingleKeyspaceStore {
    keys: DashMap<String, String>,
}

#[async_trait]
impl Store for SingleKeyspaceStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.keys.get(key).map(|v| v.value().clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.keys.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn incr_with_expiry(&self, key: &str, ttl: Duration) -> Result<WindowCount, StoreError> {
        let mut entry = self.keys.entry(key.to_string()).or_insert_with(|| "0".to_string());
        let count: u64 = entry.parse().map_err(|_| {
            StoreError::Redis(redis::RedisError::from((
                redis::ErrorKind::TypeError,
                "value is not an integer or out of range",
            )))
        })?;
        *entry = (count + 1).to_string();

        Ok(WindowCount {
            count: count + 1,
            remaining: ttl,
        })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn describe(&self) -> String {
        "single-keyspace".to_string()
    }
}
