use std::any::Any;

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use smile_types::api::ErrorResponse;

pub const FID_REQUIRED: &str = "The user's FID is required to join the whitelist.";
pub const FID_INVALID: &str = "The FID must be a non-negative integer.";
pub const BODY_NOT_OBJECT: &str = "The request body must be a JSON object.";
pub const PAYLOAD_INVALID: &str = "The request body is not a valid join payload.";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Method not allowed. Only POST requests are accepted.")]
    MethodNotAllowed,

    #[error("Server configuration error. Could not connect to the database.")]
    Configuration,

    #[error("{0}")]
    Validation(String),

    #[error("Failed to save to the database: {0}")]
    Store(String),

    #[error("An internal server error occurred while processing your request.")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Configuration | ApiError::Store(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(ref e) = self {
            error!("Unexpected error: {:#}", e);
        }

        let status = self.status();
        let mut response = (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response();

        if let ApiError::MethodNotAllowed = self {
            response
                .headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static("POST"));
        }

        response
    }
}

/// Turns a handler panic into the generic 500 body. Panic details stay in
/// the log.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");

    ApiError::Internal(anyhow::anyhow!("handler panicked: {}", detail)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_not_allowed_carries_allow_header() {
        let response = ApiError::MethodNotAllowed.into_response();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "POST");
    }

    #[test]
    fn internal_errors_hide_details() {
        let err = ApiError::Internal(anyhow::anyhow!("secret stack detail"));
        assert!(!err.to_string().contains("secret"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn store_errors_surface_the_store_message() {
        let err = ApiError::Store("connection refused".into());
        assert_eq!(err.to_string(), "Failed to save to the database: connection refused");
    }
}
