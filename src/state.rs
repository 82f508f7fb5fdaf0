use std::sync::Arc;
use crate::rate_limit::RateLimiter;
use crate::store::Store;
// app's shared state, built once at startup and handed to every request

pub struct AppState {
    pub store: Arc<dyn Store>,       // phone -> address records
    pub rate_limiter: RateLimiter,   // counts in the same store
    pub docs_enabled: bool,          // /docs is only routed in the test env
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, rate_limiter: RateLimiter, docs_enabled: bool) -> Self {
        Self {
            store,
            rate_limiter,
            docs_enabled,
        }
    }
}
