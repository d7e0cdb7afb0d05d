//! The request pipeline state machine: validate → transform → admit → send
//! → account → classify.
//!
//! Grounded on `handlers.rs`'s per-request-owns-its-state idiom, generalized
//! from one conversation-mutation path to the branching
//! admission/send/accounting flow laid out here as an explicit state
//! machine — the central module of the gateway, built fresh around that
//! flow.

use serde_json::Value;
use std::sync::Arc;

use crate::error::AppError;
use crate::error_classifier::{self, classify};
use crate::gateway::PushGateway;
use crate::metrics;
use crate::models::{CheckRateLimitsResponse, NotificationRequest, SendSuccessResponse};
use crate::rate_limit::{RateLimitEngine, RateLimits};
use crate::telemetry;
use crate::transformer::{self, Variant};

pub struct Orchestrator {
    store_factory: Arc<dyn Fn() -> RateLimitEngine + Send + Sync>,
    gateway: Arc<dyn PushGateway>,
    maximum: u32,
}

impl Orchestrator {
    pub fn new(
        store_factory: Arc<dyn Fn() -> RateLimitEngine + Send + Sync>,
        gateway: Arc<dyn PushGateway>,
        maximum: u32,
    ) -> Self {
        Self {
            store_factory,
            gateway,
            maximum,
        }
    }

    fn engine(&self) -> RateLimitEngine {
        (self.store_factory)()
    }

    /// Shared token validation for every endpoint: reject missing or
    /// malformed tokens before doing any other work.
    fn validate_token(push_token: &str) -> Result<(), AppError> {
        if push_token.is_empty() {
            return Err(AppError::MissingToken);
        }
        if !push_token.contains(':') {
            return Err(AppError::InvalidTokenFormat);
        }
        Ok(())
    }

    /// `/checkRateLimits`: read-only quota lookup, no side effects.
    pub async fn check(&self, push_token: &str) -> Result<CheckRateLimitsResponse, AppError> {
        Self::validate_token(push_token)?;

        let engine = self.engine();
        let status = engine
            .check(push_token)
            .await
            .map_err(|e| AppError::InternalError {
                error_step: error_classifier::STEP_GET_RATE_LIMIT_DOC,
                message: e.to_string(),
            })?;

        Ok(CheckRateLimitsResponse {
            target: push_token.to_string(),
            rate_limits: status.rate_limits,
        })
    }

    /// One of the three notification endpoints.
    pub async fn send(
        &self,
        variant: Variant,
        request: &NotificationRequest,
    ) -> Result<SendSuccessResponse, AppError> {
        Self::validate_token(&request.push_token)?;

        let (update_rate_limits, mut payload) = variant.build(request);
        inject_token(&mut payload, &request.push_token);

        let engine = self.engine();

        let pre_attempt_rate_limits = if update_rate_limits {
            let pre_status = engine
                .check(&request.push_token)
                .await
                .map_err(|e| AppError::InternalError {
                    error_step: error_classifier::STEP_GET_RATE_LIMIT_DOC,
                    message: e.to_string(),
                })?;

            let attempt_status = engine
                .record_attempt(&request.push_token)
                .await
                .map_err(|e| AppError::InternalError {
                    error_step: error_classifier::STEP_CREATE_RATE_LIMIT_DOCUMENT,
                    message: e.to_string(),
                })?;

            if attempt_status.should_send_rate_limit_notification {
                self.send_rate_limit_notification_best_effort(request, attempt_status.rate_limits)
                    .await;
            }

            if attempt_status.is_rate_limited {
                return Err(AppError::RateLimited {
                    target: request.push_token.clone(),
                    rate_limits: attempt_status.rate_limits,
                });
            }

            let _ = pre_status;
            attempt_status.rate_limits
        } else {
            engine
                .check(&request.push_token)
                .await
                .map_err(|e| AppError::InternalError {
                    error_step: error_classifier::STEP_GET_RATE_LIMIT_DOC,
                    message: e.to_string(),
                })?
                .rate_limits
        };

        let send_started_at = std::time::Instant::now();
        let send_result = self.gateway.send(&payload).await;
        metrics::record_gateway_send_duration(variant.analytics_label(), send_started_at.elapsed().as_secs_f64());

        match send_result {
            Ok(message_id) => {
                let rate_limits = if update_rate_limits {
                    engine
                        .record_success(&request.push_token)
                        .await
                        .map_err(|e| AppError::InternalError {
                            error_step: error_classifier::STEP_UPDATE_RATE_LIMIT_DOCUMENT,
                            message: e.to_string(),
                        })?
                } else {
                    pre_attempt_rate_limits
                };

                Ok(SendSuccessResponse {
                    message_id,
                    sent_payload: payload,
                    target: request.push_token.clone(),
                    rate_limits,
                })
            }
            Err(gateway_error) => {
                if update_rate_limits {
                    // Upstream send failures always trigger record_error (when
                    // accounting is active) even when the response will be
                    // InvalidToken or PayloadTooLarge.
                    engine
                        .record_error(&request.push_token)
                        .await
                        .map_err(|e| AppError::InternalError {
                            error_step: error_classifier::STEP_UPDATE_RATE_LIMIT_DOCUMENT,
                            message: e.to_string(),
                        })?;
                }

                let classified = classify(&gateway_error, error_classifier::STEP_SEND_NOTIFICATION);
                if classified.should_log() {
                    telemetry::log_error(
                        error_classifier::STEP_SEND_NOTIFICATION,
                        &classified.to_string(),
                        request,
                        Some(&payload),
                    );
                }
                Err(classified)
            }
        }
    }

    /// Best-effort one-shot rate-limit push: failures are reported
    /// (logged) but never fail the surrounding request.
    async fn send_rate_limit_notification_best_effort(
        &self,
        request: &NotificationRequest,
        rate_limits: RateLimits,
    ) {
        let payload = transformer::build_rate_limit_notification(self.maximum, rate_limits.resets_at);
        let mut payload = payload;
        inject_token(&mut payload, &request.push_token);

        match self.gateway.send(&payload).await {
            Ok(_) => metrics::record_rate_limit_notification_sent(),
            Err(gateway_error) => {
                let classified = classify(
                    &gateway_error,
                    error_classifier::STEP_SEND_RATE_LIMIT_NOTIFICATION,
                );
                if classified.should_log() {
                    telemetry::log_error(
                        error_classifier::STEP_SEND_RATE_LIMIT_NOTIFICATION,
                        &classified.to_string(),
                        request,
                        Some(&payload),
                    );
                }
            }
        }
    }
}

fn inject_token(payload: &mut Value, token: &str) {
    if let Some(obj) = payload.as_object_mut() {
        obj.insert("token".to_string(), Value::String(token.to_string()));
    }
}
