use clap::{Parser, ValueEnum};
use std::time::Duration;

// Rate limit: max requests per window, per client and route
pub const RATE_LIMIT_TIMES: u64 = 10;
pub const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

pub const SERVICE_VERSION: &str = "1.0";

// Which store backs the service
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Redis,
    Memory,
}

// What the limiter does when its counting backend fails
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    // allow the request and log a warning
    #[default]
    Open,
    // reject the request with 503
    Closed,
}

// CLI argument structure, every flag can also come from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "phonebook-gateway")]
#[command(about = "Rate limited phone -> address store backed by Redis")]
pub struct Args {
    // Environment name, "test" exposes /docs
    #[arg(long = "env", env = "ENV")]
    pub environment: Option<String>,

    // Address to bind the HTTP server on
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    // Port to run the server on
    #[arg(short, long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    // Store backend
    #[arg(long, env = "STORE_BACKEND", value_enum, default_value_t = StoreBackend::Redis)]
    pub store: StoreBackend,

    #[arg(long, env = "REDIS_HOST", default_value = "localhost")]
    pub redis_host: String,

    #[arg(long, env = "REDIS_PORT", default_value_t = 6379)]
    pub redis_port: u16,

    #[arg(long, env = "REDIS_DB", default_value_t = 0)]
    pub redis_db: u32,

    // Upper bound for connecting and for every store call, in milliseconds
    #[arg(long, env = "STORE_TIMEOUT_MS", default_value_t = 2000)]
    pub store_timeout_ms: u64,

    #[arg(long, env = "LIMITER_FAILURE_POLICY", value_enum, default_value_t = FailurePolicy::Open)]
    pub limiter_failure_policy: FailurePolicy,
}

impl Args {
    pub fn redis_url(&self) -> String {
        let host = self
            .redis_host
            .strip_prefix("redis://")
            .unwrap_or(&self.redis_host);
        format!("redis://{}:{}/{}", host, self.redis_port, self.redis_db)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn docs_enabled(&self) -> bool {
        self.environment.as_deref() == Some("test")
    }
}
