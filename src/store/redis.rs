// Redis backed store

use async_trait::async_trait;
use redis::{AsyncCommands, aio::ConnectionManager};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info};

use super::{Store, StoreError, WindowCount};

// INCR and first-hit PEXPIRE run in one script so no other client sees a
// counter without an expiry. A counter left without a TTL gets one too.
const INCR_WITH_EXPIRY: &str = r#"
local count = redis.call("INCR", KEYS[1])
local ttl = redis.call("PTTL", KEYS[1])

if count == 1 or ttl < 0 then
    redis.call("PEXPIRE", KEYS[1], ARGV[1])
    ttl = tonumber(ARGV[1])
end

return {count, ttl}
"#;

pub struct RedisStore {
    connection_manager: ConnectionManager,
    incr_script: redis::Script,
    target: String,
    timeout: Duration,
    closed: AtomicBool,
}

impl RedisStore {
    // fails if no connection is up within `timeout`
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self, StoreError> {
        let client = redis::Client::open(url).map_err(|e| StoreError::Connect {
            target: url.to_string(),
            reason: e.to_string(),
        })?;

        let connection_manager = tokio::time::timeout(timeout, client.get_connection_manager())
            .await
            .map_err(|_| StoreError::Timeout {
                operation: "connect",
                timeout,
            })?
            .map_err(|e| StoreError::Connect {
                target: url.to_string(),
                reason: e.to_string(),
            })?;

        info!(target = %url, "connected to redis");

        Ok(Self {
            connection_manager,
            incr_script: redis::Script::new(INCR_WITH_EXPIRY),
            target: url.to_string(),
            timeout,
            closed: AtomicBool::new(false),
        })
    }

    // The manager is multiplexed; each call works on its own cheap clone.
    fn connection(&self) -> Result<ConnectionManager, StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(self.connection_manager.clone())
    }
}

// Every store call gets the same upper bound; running out is a Timeout, not a hang
async fn bounded<T, F>(operation: &'static str, timeout: Duration, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = redis::RedisResult<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(StoreError::Timeout { operation, timeout }),
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.connection()?;
        bounded("get", self.timeout, conn.get(key)).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut conn = self.connection()?;
        bounded("set", self.timeout, conn.set(key, value)).await
    }

    async fn incr_with_expiry(&self, key: &str, ttl: Duration) -> Result<WindowCount, StoreError> {
        let mut conn = self.connection()?;
        let ttl_ms = ttl.as_millis().max(1) as u64;

        let (count, remaining_ms): (u64, i64) = bounded(
            "incr_with_expiry",
            self.timeout,
            self.incr_script.key(key).arg(ttl_ms).invoke_async(&mut conn),
        )
        .await?;

        Ok(WindowCount {
            count,
            remaining: Duration::from_millis(remaining_ms.max(0) as u64),
        })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.connection()?;
        let cmd = redis::cmd("PING");
        let _: String = bounded("ping", self.timeout, cmd.query_async(&mut conn)).await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), StoreError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(StoreError::Closed);
        }
        // the socket goes away with the last clone of the manager
        debug!(target = %self.target, "redis store closed");
        Ok(())
    }

    fn describe(&self) -> String {
        self.target.clone()
    }
}
