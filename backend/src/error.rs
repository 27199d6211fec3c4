//! Errors surfaced by the prediction endpoints and their HTTP mapping.

use actix_web::error::JsonPayloadError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

use crate::models::ErrorResponse;

#[derive(Error, Debug)]
pub enum ApiError {
    /// A required key is absent or null.
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    /// A key is present but cannot be coerced to its column type.
    #[error("invalid value for `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// Body could not be read as JSON.
    #[error("invalid request body: {0}")]
    Payload(#[from] JsonPayloadError),

    /// The model raised or returned an unusable value.
    #[error("inference failed: {0}")]
    Inference(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::MissingField(_) => "missing_field",
            ApiError::InvalidField { .. } => "invalid_field",
            ApiError::Payload(_) => "invalid_payload",
            ApiError::Inference(_) => "inference_failed",
            ApiError::Internal(_) => "internal",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingField(_) | ApiError::InvalidField { .. } => StatusCode::BAD_REQUEST,
            ApiError::Payload(e) => e.status_code(),
            ApiError::Inference(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse::new(self.code(), self.to_string()))
    }
}
