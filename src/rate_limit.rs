// Window counter per client and route, counted in the shared store.
// Past the limit, requests get 429 until the counter expires.

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::FailurePolicy;
use crate::error::AppError;
use crate::metrics::{RATE_LIMIT_BACKEND_ERRORS, RATE_LIMIT_REJECTIONS};
use crate::state::AppState;
use crate::store::Store;

pub const KEY_PREFIX: &str = "phonebook-limiter";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Rejected { retry_after: Duration },
}

pub struct RateLimiter {
    store: Arc<dyn Store>,
    times: u64,       // max requests allowed
    window: Duration, // duration of one window
    policy: FailurePolicy,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn Store>, times: u64, window: Duration, policy: FailurePolicy) -> Self {
        Self {
            store,
            times,
            window,
            policy,
        }
    }

    pub fn times(&self) -> u64 {
        self.times
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    // backend failures resolve through the failure policy
    pub async fn check(&self, identity: &str, route: &str) -> Result<RateLimitDecision, AppError> {
        let key = format!("{KEY_PREFIX}:{identity}:{route}");

        let counted = match self.store.incr_with_expiry(&key, self.window).await {
            Ok(counted) => counted,
            Err(e) => {
                RATE_LIMIT_BACKEND_ERRORS.inc();
                return match self.policy {
                    FailurePolicy::Open => {
                        warn!(error = %e, %key, "rate limit backend unavailable, allowing request");
                        Ok(RateLimitDecision::Allowed)
                    }
                    FailurePolicy::Closed => Err(AppError::LimiterUnavailable(e)),
                };
            }
        };

        if counted.count > self.times {
            debug!(%key, count = counted.count, "rate limit exceeded");
            return Ok(RateLimitDecision::Rejected {
                retry_after: counted.remaining,
            });
        }

        Ok(RateLimitDecision::Allowed)
    }
}

// first X-Forwarded-For hop, else the peer address
pub fn client_identity(request: &Request) -> String {
    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty());

    if let Some(ip) = forwarded {
        return ip.to_string();
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

// Whole seconds, rounded up so clients never retry early
fn retry_after_secs(retry_after: Duration) -> u64 {
    retry_after.as_millis().div_ceil(1000) as u64
}

pub async fn enforce(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    let identity = client_identity(&request);
    let route = request.uri().path().to_string();

    match state.rate_limiter.check(&identity, &route).await {
        Ok(RateLimitDecision::Allowed) => next.run(request).await,
        Ok(RateLimitDecision::Rejected { retry_after }) => {
            RATE_LIMIT_REJECTIONS.inc();
            AppError::RateLimited {
                retry_after_secs: retry_after_secs(retry_after),
            }
            .into_response()
        }
        Err(e) => e.into_response(),
    }
}
