use axum::{Json, extract::State};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::config::SERVICE_VERSION;
use crate::router::ROUTES;
use crate::state::AppState;

// route table plus limiter settings, only routed when ENV=test
pub async fn docs_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let limiter = &state.rate_limiter;

    Json(json!({
        "version": SERVICE_VERSION,
        "routes": ROUTES,
        "rate_limit": {
            "times": limiter.times(),
            "window_seconds": limiter.window().as_secs(),
            "failure_policy": format!("{:?}", limiter.policy()).to_lowercase(),
        },
    }))
}
