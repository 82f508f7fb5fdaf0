use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

// GET / response
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct RootResponse {
    pub status: String,
    pub version: String,
}

// POST /write_data body, also the GET /write_data answer
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct PhoneAddress {
    pub phone: String,
    pub address: String,
}

// GET /write_data?phone=...
#[derive(Deserialize, Debug)]
pub struct PhoneQuery {
    pub phone: String,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// Outcome of a lookup - a missing phone is a normal answer, not an error
pub enum Lookup {
    Found(PhoneAddress),
    NotFound,
}

impl IntoResponse for Lookup {
    fn into_response(self) -> Response {
        match self {
            Lookup::Found(record) => (StatusCode::OK, Json(record)).into_response(),
            Lookup::NotFound => (
                StatusCode::NOT_FOUND,
                Json(MessageResponse::new("Phone number not found")),
            )
                .into_response(),
        }
    }
}
