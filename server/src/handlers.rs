//! Axum route handlers: thin adapters from HTTP JSON to
//! [`crate::orchestrator::Orchestrator`] calls — extract state, call one
//! collaborator, map its `Result` straight to an HTTP response.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::error::AppError;
use crate::metrics;
use crate::models::{CheckRateLimitsRequest, CheckRateLimitsResponse, NotificationRequest, SendSuccessResponse};
use crate::orchestrator::Orchestrator;
use crate::transformer::Variant;

pub type SharedOrchestrator = Arc<Orchestrator>;

fn variant_label(variant: Variant) -> &'static str {
    match variant {
        Variant::Legacy => "legacy",
        Variant::AndroidV1 => "androidV1",
        Variant::IosV1 => "iosV1",
    }
}

fn error_type_label(error: &AppError) -> &'static str {
    match error {
        AppError::MissingToken | AppError::InvalidTokenFormat => "InvalidRequest",
        AppError::RateLimited { .. } => "RateLimited",
        AppError::InvalidToken { .. } => "InvalidToken",
        AppError::PayloadTooLarge { .. } => "PayloadTooLarge",
        AppError::InternalError { .. } => "InternalError",
    }
}

async fn send(
    orchestrator: &Orchestrator,
    variant: Variant,
    request: Json<NotificationRequest>,
) -> Result<(axum::http::StatusCode, Json<SendSuccessResponse>), AppError> {
    match orchestrator.send(variant, &request).await {
        Ok(response) => {
            metrics::record_request(variant_label(variant), "success");
            Ok((axum::http::StatusCode::CREATED, Json(response)))
        }
        Err(error) => {
            metrics::record_request(variant_label(variant), error_type_label(&error));
            if matches!(error, AppError::RateLimited { .. }) {
                metrics::record_rate_limited();
            }
            if matches!(
                error,
                AppError::InvalidToken { .. } | AppError::PayloadTooLarge { .. } | AppError::InternalError { .. }
            ) {
                metrics::record_gateway_error(error_type_label(&error));
            }
            Err(error)
        }
    }
}

pub async fn send_push_notification(
    State(orchestrator): State<SharedOrchestrator>,
    request: Json<NotificationRequest>,
) -> Result<(axum::http::StatusCode, Json<SendSuccessResponse>), AppError> {
    send(&orchestrator, Variant::Legacy, request).await
}

pub async fn android_v1(
    State(orchestrator): State<SharedOrchestrator>,
    request: Json<NotificationRequest>,
) -> Result<(axum::http::StatusCode, Json<SendSuccessResponse>), AppError> {
    send(&orchestrator, Variant::AndroidV1, request).await
}

pub async fn ios_v1(
    State(orchestrator): State<SharedOrchestrator>,
    request: Json<NotificationRequest>,
) -> Result<(axum::http::StatusCode, Json<SendSuccessResponse>), AppError> {
    send(&orchestrator, Variant::IosV1, request).await
}

pub async fn check_rate_limits(
    State(orchestrator): State<SharedOrchestrator>,
    Json(request): Json<CheckRateLimitsRequest>,
) -> Result<Json<CheckRateLimitsResponse>, AppError> {
    let response = orchestrator.check(&request.push_token).await?;
    Ok(Json(response))
}
