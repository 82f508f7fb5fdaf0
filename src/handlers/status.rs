use axum::Json;

use crate::config::SERVICE_VERSION;
use crate::models::RootResponse;

// service status and version
pub async fn status_handler() -> Json<RootResponse> {
    Json(RootResponse {
        status: "OK".to_string(),
        version: SERVICE_VERSION.to_string(),
    })
}
