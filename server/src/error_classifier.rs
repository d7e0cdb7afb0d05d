//! Gateway-error → client-facing taxonomy classifier.
//!
//! Matches the upstream gateway's `(code, message)` pair against fixed
//! code tables and maps the result onto the client-facing `AppError`
//! taxonomy.

use crate::error::AppError;
use crate::gateway::GatewayError;

/// Processing-step tags this system names — also the `errorStep` field
/// surfaced to the client and the `errors-<step>` telemetry log name.
pub const STEP_GET_RATE_LIMIT_DOC: &str = "getRateLimitDoc";
pub const STEP_SEND_NOTIFICATION: &str = "sendNotification";
pub const STEP_SEND_RATE_LIMIT_NOTIFICATION: &str = "sendRateLimitNotification";
pub const STEP_CREATE_RATE_LIMIT_DOCUMENT: &str = "createRateLimitDocument";
pub const STEP_UPDATE_RATE_LIMIT_DOCUMENT: &str = "updateRateLimitDocument";

const INVALID_TOKEN_CODES: &[&str] = &["invalid-registration-token", "registration-token-not-registered"];
const PAYLOAD_TOO_LARGE_CODES: &[&str] = &["invalid-argument", "payload-too-large"];

/// Classify a gateway send failure into the client-facing `AppError`
/// taxonomy.
pub fn classify(error: &GatewayError, step: &'static str) -> AppError {
    let code = error.code.as_deref();
    let message_lower = error.message.to_lowercase();

    if let Some(code) = code {
        if INVALID_TOKEN_CODES.contains(&code) {
            return AppError::InvalidToken {
                error_code: code.to_string(),
                error_step: step,
                message: error.message.clone(),
            };
        }
        if PAYLOAD_TOO_LARGE_CODES.contains(&code) {
            return AppError::PayloadTooLarge {
                error_code: Some(code.to_string()),
                error_step: step,
                message: error.message.clone(),
            };
        }
    }

    if message_lower.contains("message is too big") || message_lower.contains("payload too large") {
        return AppError::PayloadTooLarge {
            error_code: code.map(str::to_string),
            error_step: step,
            message: error.message.clone(),
        };
    }

    AppError::InternalError {
        error_step: step,
        message: error.message.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn err(code: Option<&str>, message: &str) -> GatewayError {
        GatewayError {
            code: code.map(str::to_string),
            message: message.to_string(),
        }
    }

    #[test]
    fn registration_token_not_registered_is_invalid_token() {
        let classified = classify(
            &err(Some("registration-token-not-registered"), "gone"),
            STEP_SEND_NOTIFICATION,
        );
        assert!(matches!(classified, AppError::InvalidToken { .. }));
        assert!(!classified.should_log());
    }

    #[test]
    fn invalid_argument_is_payload_too_large() {
        let classified = classify(&err(Some("invalid-argument"), "nope"), STEP_SEND_NOTIFICATION);
        assert!(matches!(classified, AppError::PayloadTooLarge { .. }));
        assert!(!classified.should_log());
    }

    #[test]
    fn message_mentioning_oversize_is_payload_too_large_case_insensitive() {
        let classified = classify(
            &err(None, "Message Is Too Big for delivery"),
            STEP_SEND_NOTIFICATION,
        );
        assert!(matches!(classified, AppError::PayloadTooLarge { .. }));
    }

    #[test]
    fn unknown_error_is_internal_and_logged() {
        let classified = classify(&err(Some("unavailable"), "backend down"), STEP_SEND_NOTIFICATION);
        assert!(matches!(classified, AppError::InternalError { .. }));
        assert!(classified.should_log());
    }

    #[test]
    fn error_step_is_carried_through() {
        let classified = classify(&err(None, "oops"), STEP_CREATE_RATE_LIMIT_DOCUMENT);
        assert_eq!(classified.error_step(), Some(STEP_CREATE_RATE_LIMIT_DOCUMENT));
    }
}
