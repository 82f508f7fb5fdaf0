// Key-value store for phone records and limiter counters

pub mod memory;
pub mod redis;

use async_trait::async_trait;
use std::time::Duration;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("could not connect to store at {target}: {reason}")]
    Connect { target: String, reason: String },
    #[error("store operation `{operation}` timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },
    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),
    #[error("store connection is closed")]
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCount {
    pub count: u64,
    // time left before the counter expires
    pub remaining: Duration,
}

// One instance is shared by every in-flight request. `close` belongs to the
// process lifecycle, never to handlers.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    // Only the first increment of a window sets the expiry
    async fn incr_with_expiry(&self, key: &str, ttl: Duration) -> Result<WindowCount, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;

    // later calls fail with Closed
    async fn close(&self) -> Result<(), StoreError>;

    fn describe(&self) -> String;
}
