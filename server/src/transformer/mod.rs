//! Payload transformer: three pure `Build` functions,
//! one per route variant, plus the fixed rate-limit one-shot template.
//!
//! "Transformer variants as tagged variant values": the orchestrator
//! holds a `route → transformer` dispatch table built from [`Variant::build`]
//! rather than subclassing or trait objects — each variant is just a
//! function pointer of the documented shape.

pub mod android;
mod common;
mod ios;
mod json_path;
pub mod legacy;

use serde_json::{json, Value};

use crate::models::NotificationRequest;

/// One of the three request-pipeline transformer variants routed to by
/// `/sendPushNotification`, `/androidV1`, `/iOSV1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Legacy,
    AndroidV1,
    IosV1,
}

impl Variant {
    /// `(updateRateLimits, payload)` for this variant.
    pub fn build(self, req: &NotificationRequest) -> (bool, Value) {
        match self {
            Variant::Legacy => legacy::build(req),
            Variant::AndroidV1 => android::build(req),
            Variant::IosV1 => ios::build(req),
        }
    }

    pub fn analytics_label(self) -> &'static str {
        match self {
            Variant::Legacy => legacy::ANALYTICS_LABEL,
            Variant::AndroidV1 => android::ANALYTICS_LABEL,
            Variant::IosV1 => ios::ANALYTICS_LABEL,
        }
    }
}

pub const RATE_LIMIT_ANALYTICS_LABEL: &str = "rateLimitNotification";

/// Fixed one-shot "you were rate-limited" payload template. Carries
/// both Android and APNS localization keys since the target platform isn't
/// known at this layer — the gateway gets one payload shape per send either
/// way, with both platforms' sections populated in parallel.
pub fn build_rate_limit_notification(
    maximum: u32,
    resets_at: chrono::DateTime<chrono::Utc>,
) -> Value {
    json!({
        "notification": {
            "title": "Notifications Rate Limited",
            "body": format!(
                "You have reached your limit of {maximum} notifications per day."
            ),
        },
        "android": {
            "notification": {
                "title_loc_key": "rate_limit_notification.title",
                "body_loc_key": "rate_limit_notification.body",
            }
        },
        "apns": {
            "payload": {
                "aps": {
                    "alert": {
                        "title-loc-key": "rate_limit_notification.title",
                        "loc-key": "rate_limit_notification.body",
                    }
                }
            }
        },
        "data": {
            "rateLimited": "true",
            "maxNotificationsPerDay": maximum.to_string(),
            "resetsAt": resets_at.to_rfc3339(),
        },
        "fcm_options": {
            "analytics_label": RATE_LIMIT_ANALYTICS_LABEL,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RegistrationInfo;

    fn req() -> NotificationRequest {
        NotificationRequest {
            push_token: "abc:1".into(),
            message: Some("hello".into()),
            title: None,
            registration_info: RegistrationInfo {
                app_id: "com.example".into(),
                app_version: None,
                os_version: None,
                webhook_id: None,
            },
            data: None,
        }
    }

    #[test]
    fn each_variant_sets_its_own_analytics_label() {
        for variant in [Variant::Legacy, Variant::AndroidV1, Variant::IosV1] {
            let (_, payload) = variant.build(&req());
            assert_eq!(
                payload["fcm_options"]["analytics_label"],
                json!(variant.analytics_label())
            );
        }
    }

    #[test]
    fn build_is_pure_and_idempotent() {
        let a = Variant::Legacy.build(&req());
        let b = Variant::Legacy.build(&req());
        assert_eq!(a.1, b.1);
    }

    #[test]
    fn rate_limit_notification_carries_required_fields() {
        let resets_at = chrono::Utc::now();
        let payload = build_rate_limit_notification(500, resets_at);
        assert_eq!(payload["data"]["rateLimited"], json!("true"));
        assert_eq!(payload["data"]["maxNotificationsPerDay"], json!("500"));
        assert_eq!(
            payload["fcm_options"]["analytics_label"],
            json!(RATE_LIMIT_ANALYTICS_LABEL)
        );
        assert_eq!(
            payload["android"]["notification"]["title_loc_key"],
            json!("rate_limit_notification.title")
        );
        assert_eq!(
            payload["apns"]["payload"]["aps"]["alert"]["loc-key"],
            json!("rate_limit_notification.body")
        );
    }
}
