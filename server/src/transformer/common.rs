//! Construction/post-processing helpers shared by all three transformer
//! variants.

use serde_json::{json, Map, Value};

use crate::models::NotificationRequest;

use super::json_path as jp;

pub const HA_IOS_APP_ID_MARKER: &str = "io.robbie.HomeAssistant";
pub const HA_ANDROID_APP_ID: &str = "io.homeassistant.companion.android";

pub fn is_home_assistant_ios(app_id: &str) -> bool {
    app_id.contains(HA_IOS_APP_ID_MARKER)
}

pub fn is_home_assistant_android(app_id: &str) -> bool {
    app_id == HA_ANDROID_APP_ID
}

/// Accumulates the payload tree and the bookkeeping flags
/// (`needsCategory`/`needsMutableContent`) the iOS post-processing pass
/// needs, plus the `updateRateLimits` bit every command overload can flip.
pub struct Builder {
    pub payload: Value,
    pub update_rate_limits: bool,
    pub needs_category: bool,
    pub needs_mutable_content: bool,
}

impl Builder {
    pub fn new(analytics_label: &'static str) -> Self {
        let mut payload = json!({});
        jp::set(&mut payload, &["fcm_options"], "analytics_label", json!(analytics_label));
        Self {
            payload,
            update_rate_limits: true,
            needs_category: false,
            needs_mutable_content: false,
        }
    }

    /// Common seed: `notification.body` from `message`, optional title
    /// (mirrored into both `notification.title` and
    /// `apns.payload.aps.alert.title`).
    pub fn seed(&mut self, req: &NotificationRequest) {
        if let Some(message) = &req.message {
            jp::set(&mut self.payload, &["notification"], "body", json!(message));
        }
        if let Some(title) = &req.title {
            jp::set(&mut self.payload, &["notification"], "title", json!(title));
            jp::set(
                &mut self.payload,
                &["apns", "payload", "aps", "alert"],
                "title",
                json!(title),
            );
        }
    }

    /// Passthrough of the recognized top-level `data` subtrees (variant-
    /// specific key set) plus the `apns_headers` → `apns.headers` rename.
    pub fn passthrough(&mut self, data: &Map<String, Value>, keys: &[&str]) {
        for key in keys {
            if let Some(value) = data.get(*key) {
                jp::set(&mut self.payload, &[], key, value.clone());
            }
        }
        if let Some(headers) = data.get("apns_headers") {
            jp::set(&mut self.payload, &["apns"], "headers", headers.clone());
        }
    }

    pub fn token(&self) -> &Value {
        &self.payload
    }

    /// Finalize: apply the universal sound/badge/category/push-type
    /// invariants and return `(updateRateLimits, payload)`.
    pub fn finish(mut self) -> (bool, Value) {
        apply_sound_normalization(&mut self.payload, &mut self.update_rate_limits);
        apply_badge_coercion(&mut self.payload);

        if self.needs_category {
            let category_path = ["apns", "payload", "aps"];
            let existing = jp::get(&self.payload, &category_path, "category").cloned();
            let normalized = match existing {
                Some(Value::String(s)) => s.to_uppercase(),
                _ => "DYNAMIC".to_string(),
            };
            jp::set(&mut self.payload, &category_path, "category", json!(normalized));
        }
        if self.needs_mutable_content {
            jp::set(
                &mut self.payload,
                &["apns", "payload", "aps"],
                "mutableContent",
                json!(true),
            );
        }

        let content_available = jp::get(&self.payload, &["apns", "payload", "aps"], "contentAvailable")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let push_type = if content_available { "background" } else { "alert" };
        jp::set(&mut self.payload, &["apns", "headers"], "apns-push-type", json!(push_type));

        (self.update_rate_limits, self.payload)
    }
}

/// Universal sound normalization, shared by the legacy and iOS paths; a
/// no-op when no sound was ever set.
fn apply_sound_normalization(payload: &mut Value, update_rate_limits: &mut bool) {
    let aps_path = ["apns", "payload", "aps"];
    let sound = match jp::get(payload, &aps_path, "sound").cloned() {
        Some(s) => s,
        None => return,
    };

    match sound {
        Value::String(ref s) if s.eq_ignore_ascii_case("none") => {
            jp::remove(payload, &aps_path, "sound");
        }
        Value::Object(ref obj) => {
            let mut normalized = obj.clone();
            let volume = normalized
                .get("volume")
                .and_then(Value::as_f64)
                .unwrap_or(0.0);
            let critical = normalized
                .get("critical")
                .map(|v| match v {
                    Value::Bool(b) => *b as i64,
                    Value::Number(n) => n.as_i64().unwrap_or(0),
                    _ => 0,
                })
                .unwrap_or(0);
            normalized.insert("volume".to_string(), json!(volume));
            normalized.insert("critical".to_string(), json!(critical));
            jp::set(payload, &aps_path, "sound", Value::Object(normalized));

            if critical != 0 && volume > 0.0 {
                *update_rate_limits = false;
            }
        }
        _ => {}
    }
}

fn apply_badge_coercion(payload: &mut Value) {
    let aps_path = ["apns", "payload", "aps"];
    if let Some(badge) = jp::get(payload, &aps_path, "badge").cloned() {
        let coerced = match &badge {
            Value::String(s) => s.parse::<f64>().unwrap_or(0.0),
            Value::Number(n) => n.as_f64().unwrap_or(0.0),
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            _ => 0.0,
        };
        jp::set(payload, &aps_path, "badge", json!(coerced));
    }
}

/// Attachment shorthand keys → FCM/APNs content-type.
pub fn attachment_shorthand_content_type(key: &str) -> Option<&'static str> {
    match key {
        "video" => Some("mpeg4"),
        "image" => Some("jpeg"),
        "audio" => Some("waveformaudio"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sound_none_case_insensitive_is_removed() {
        let mut payload = json!({});
        jp::set(&mut payload, &["apns", "payload", "aps"], "sound", json!("NoNe"));
        let mut update = true;
        apply_sound_normalization(&mut payload, &mut update);
        assert!(jp::get(&payload, &["apns", "payload", "aps"], "sound").is_none());
    }

    #[test]
    fn critical_sound_with_volume_disables_rate_limit_accounting() {
        let mut payload = json!({});
        jp::set(
            &mut payload,
            &["apns", "payload", "aps"],
            "sound",
            json!({"name": "default", "critical": true, "volume": 0.8}),
        );
        let mut update = true;
        apply_sound_normalization(&mut payload, &mut update);
        assert!(!update);
        let sound = jp::get(&payload, &["apns", "payload", "aps"], "sound").unwrap();
        assert_eq!(sound["critical"], json!(1));
        assert_eq!(sound["volume"], json!(0.8));
    }

    #[test]
    fn push_type_background_iff_content_available() {
        let mut builder = Builder::new("legacyNotification");
        jp::set(
            &mut builder.payload,
            &["apns", "payload", "aps"],
            "contentAvailable",
            json!(true),
        );
        let (_, payload) = builder.finish();
        assert_eq!(payload["apns"]["headers"]["apns-push-type"], json!("background"));
    }
}
