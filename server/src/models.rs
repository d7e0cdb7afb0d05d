//! Wire types for the push notification request pipeline.
//!
//! Plain `serde`-derived structs for every request/response body, with a
//! free-form `data` tree where the variant-specific transformer needs one.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `registration_info` block carried on every notification request.
///
/// Every field defaults so that a request body missing this block entirely,
/// or missing fields within it, still deserializes — token validation is
/// the orchestrator's job, not serde's.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RegistrationInfo {
    #[serde(default)]
    pub app_id: String,
    #[serde(default)]
    pub app_version: Option<String>,
    #[serde(default)]
    pub os_version: Option<String>,
    #[serde(default)]
    pub webhook_id: Option<String>,
}

/// Body accepted by `/sendPushNotification`, `/androidV1`, and `/iOSV1`.
///
/// `push_token` and `registration_info` both default on a missing/malformed
/// body instead of failing deserialization, so a request that omits them
/// still reaches [`crate::orchestrator::Orchestrator::validate_token`] and
/// gets the client-facing `403` taxonomy rather than a generic extractor
/// rejection.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotificationRequest {
    #[serde(default)]
    pub push_token: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub registration_info: RegistrationInfo,
    /// Free-form tree; recognized keys are enumerated per-variant in the
    /// transformer. Unrecognized top-level keys are ignored.
    #[serde(default)]
    pub data: Option<Value>,
}

/// Body accepted by `/checkRateLimits` — only the token is required, and
/// even that defaults so a missing token is caught by `validate_token`
/// rather than by the `Json` extractor.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckRateLimitsRequest {
    #[serde(default)]
    pub push_token: String,
}

/// Successful-send response body (`201`).
#[derive(Debug, Clone, Serialize)]
pub struct SendSuccessResponse {
    #[serde(rename = "messageId")]
    pub message_id: String,
    #[serde(rename = "sentPayload")]
    pub sent_payload: Value,
    pub target: String,
    #[serde(rename = "rateLimits")]
    pub rate_limits: crate::rate_limit::RateLimits,
}

/// `/checkRateLimits` response body (`200`).
#[derive(Debug, Clone, Serialize)]
pub struct CheckRateLimitsResponse {
    pub target: String,
    #[serde(rename = "rateLimits")]
    pub rate_limits: crate::rate_limit::RateLimits,
}
