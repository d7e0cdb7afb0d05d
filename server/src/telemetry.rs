//! Structured error telemetry sink.
//!
//! A dedicated `tracing::error!` call site per failed request, carrying the
//! `errors-<step>` log name, `resource.type`, and the relevant fields (step,
//! serialized request body, serialized notification, `registration_info`
//! fields) as structured fields, on top of `main.rs`'s `tracing_subscriber`
//! registry/JSON-layer setup that ships every log line as structured JSON
//! on stdout.

use serde_json::Value;

use crate::models::NotificationRequest;

/// `resource.type` label: `global` unless overridden by a hosting
/// environment var (e.g. `cloud_function`/`cloud_run` when deployed there).
fn resource_type() -> String {
    std::env::var("RESOURCE_TYPE").unwrap_or_else(|_| "global".to_string())
}

/// Emit one structured error log entry for a failed request. Call sites
/// check [`crate::error::AppError::should_log`] first — InvalidToken and
/// PayloadTooLarge are client-caused noise that gets skipped.
pub fn log_error(step: &str, message: &str, request: &NotificationRequest, sent_payload: Option<&Value>) {
    tracing::error!(
        log_name = format!("errors-{step}"),
        resource_type = %resource_type(),
        step = %step,
        request_body = %serde_json::to_string(request).unwrap_or_default(),
        sent_payload = %sent_payload
            .map(|p| serde_json::to_string(p).unwrap_or_default())
            .unwrap_or_default(),
        app_id = %request.registration_info.app_id,
        app_version = %request.registration_info.app_version.as_deref().unwrap_or(""),
        os_version = %request.registration_info.os_version.as_deref().unwrap_or(""),
        "{message}",
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RegistrationInfo;

    #[test]
    fn resource_type_defaults_to_global() {
        std::env::remove_var("RESOURCE_TYPE");
        assert_eq!(resource_type(), "global");
    }

    #[test]
    fn log_error_does_not_panic_without_a_subscriber() {
        let request = NotificationRequest {
            push_token: "a:1".into(),
            message: Some("hi".into()),
            title: None,
            registration_info: RegistrationInfo {
                app_id: "com.example".into(),
                app_version: None,
                os_version: None,
                webhook_id: None,
            },
            data: None,
        };
        log_error("sendNotification", "backend down", &request, None);
    }
}
