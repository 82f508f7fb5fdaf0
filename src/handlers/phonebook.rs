use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
};
use std::sync::Arc;
use tracing::debug;

use crate::error::AppError;
use crate::models::{Lookup, MessageResponse, PhoneAddress, PhoneQuery};
use crate::state::AppState;

// records get their own namespace so no phone can land on a limiter counter
const RECORD_PREFIX: &str = "phone";

fn record_key(phone: &str) -> String {
    format!("{RECORD_PREFIX}:{phone}")
}

// POST /write_data - overwrite whatever address the phone had
pub async fn write_data_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PhoneAddress>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Json(record) = payload.map_err(|e| AppError::Validation(e.body_text()))?;

    state.store.set(&record_key(&record.phone), &record.address).await?;
    debug!(phone = %record.phone, "address saved");

    Ok(Json(MessageResponse::new("Data saved")))
}

// GET /write_data?phone=... - 404 with a message when the phone is unknown
pub async fn read_data_handler(
    State(state): State<Arc<AppState>>,
    query: Result<Query<PhoneQuery>, QueryRejection>,
) -> Result<Lookup, AppError> {
    let Query(PhoneQuery { phone }) = query.map_err(|e| AppError::Validation(e.body_text()))?;

    let lookup = match state.store.get(&record_key(&phone)).await? {
        Some(address) => Lookup::Found(PhoneAddress { phone, address }),
        None => Lookup::NotFound,
    };

    Ok(lookup)
}
