// Outermost layer: request logging and the fault boundary

use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Instant;
use tracing::{debug, error};

use crate::error::AppError;
use crate::metrics::{REQUEST_LATENCY, REQUEST_TOTAL};

// a panicking handler becomes a 500 instead of a dropped connection
pub async fn fault_boundary(request: Request, next: Next) -> Response {
    REQUEST_TOTAL.inc();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start_time = Instant::now();

    let response = match AssertUnwindSafe(next.run(request)).catch_unwind().await {
        Ok(response) => response,
        Err(panic) => {
            error!(%method, %path, panic = %panic_message(&*panic), "handler panicked");
            AppError::Internal(format!("{method} {path} panicked")).into_response()
        }
    };

    let elapsed = start_time.elapsed();
    REQUEST_LATENCY.observe(elapsed.as_secs_f64());

    let status = response.status();
    if status.is_server_error() {
        error!(%method, %path, status = status.as_u16(), ?elapsed, "request failed");
    } else {
        debug!(%method, %path, status = status.as_u16(), ?elapsed, "request served");
    }

    response
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
