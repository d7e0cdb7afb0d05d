//! Shared error taxonomy for the orchestrator's HTTP responses.
//!
//! A `thiserror` enum with one `IntoResponse` impl that matches on the
//! variant to pick a status code and a JSON body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::rate_limit::RateLimits;

/// The client-facing error taxonomy for every failure this service can return.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("You did not send a token!")]
    MissingToken,

    #[error("That is not a valid FCM token")]
    InvalidTokenFormat,

    #[error("rate limited")]
    RateLimited {
        target: String,
        rate_limits: RateLimits,
    },

    #[error("invalid token: {message}")]
    InvalidToken {
        error_code: String,
        error_step: &'static str,
        message: String,
    },

    #[error("payload too large: {message}")]
    PayloadTooLarge {
        error_code: Option<String>,
        error_step: &'static str,
        message: String,
    },

    #[error("internal error: {message}")]
    InternalError {
        error_step: &'static str,
        message: String,
    },
}

impl AppError {
    /// `errorStep` tag, when one applies — used by the telemetry sink to pick
    /// the `errors-<step>` log name.
    pub fn error_step(&self) -> Option<&'static str> {
        match self {
            AppError::InvalidToken { error_step, .. }
            | AppError::PayloadTooLarge { error_step, .. }
            | AppError::InternalError { error_step, .. } => Some(error_step),
            _ => None,
        }
    }

    /// Whether the error classifier says this should be written to the
    /// structured error sink. InvalidToken/PayloadTooLarge are skipped as
    /// client-caused noise.
    pub fn should_log(&self) -> bool {
        matches!(self, AppError::InternalError { .. })
    }
}

#[derive(Serialize)]
struct TokenErrorBody {
    #[serde(rename = "errorMessage")]
    error_message: String,
}

#[derive(Serialize)]
struct RateLimitedBody {
    #[serde(rename = "errorType")]
    error_type: &'static str,
    message: String,
    target: String,
    #[serde(rename = "rateLimits")]
    rate_limits: RateLimits,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::MissingToken | AppError::InvalidTokenFormat => (
                StatusCode::FORBIDDEN,
                Json(TokenErrorBody {
                    error_message: self.to_string(),
                }),
            )
                .into_response(),
            AppError::RateLimited {
                target,
                rate_limits,
            } => (
                StatusCode::TOO_MANY_REQUESTS,
                Json(RateLimitedBody {
                    error_type: "RateLimited",
                    message:
                        "You have exceeded the maximum number of notifications allowed per day."
                            .to_string(),
                    target,
                    rate_limits,
                }),
            )
                .into_response(),
            AppError::InvalidToken {
                error_code,
                error_step,
                message,
            } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "errorType": "InvalidToken",
                    "errorCode": error_code,
                    "errorStep": error_step,
                    "message": message,
                })),
            )
                .into_response(),
            AppError::PayloadTooLarge {
                error_code,
                error_step,
                message,
            } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "errorType": "PayloadTooLarge",
                    "errorCode": error_code,
                    "errorStep": error_step,
                    "message": message,
                })),
            )
                .into_response(),
            AppError::InternalError {
                error_step,
                message,
            } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "errorType": "InternalError",
                    "errorStep": error_step,
                    "message": message,
                })),
            )
                .into_response(),
        }
    }
}
