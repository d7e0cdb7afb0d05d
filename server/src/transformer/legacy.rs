//! Legacy (`/sendPushNotification`) transformer variant — the superset
//! passthrough surface (`android`, `apns`, `data`, `webpush`) plus both
//! Home Assistant quirk subsets.

use serde_json::{json, Value};

use crate::models::NotificationRequest;

use super::android::apply_home_assistant_android;
use super::common::{is_home_assistant_android, is_home_assistant_ios, Builder};
use super::ios::apply_home_assistant_ios;
use super::json_path as jp;

pub const ANALYTICS_LABEL: &str = "legacyNotification";
const PASSTHROUGH_KEYS: &[&str] = &["android", "apns", "data", "webpush"];

pub fn build(req: &NotificationRequest) -> (bool, Value) {
    let mut builder = Builder::new(ANALYTICS_LABEL);
    builder.seed(req);

    let data = req
        .data
        .as_ref()
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    builder.passthrough(&data, PASSTHROUGH_KEYS);

    // Legacy variant reflects registration_info.webhook_id into apns.payload.webhook_id.
    if let Some(webhook_id) = &req.registration_info.webhook_id {
        jp::set(
            &mut builder.payload,
            &["apns", "payload"],
            "webhook_id",
            json!(webhook_id),
        );
    }

    let app_id = &req.registration_info.app_id;
    if is_home_assistant_ios(app_id) {
        apply_home_assistant_ios(&mut builder, req, &data);
    } else if is_home_assistant_android(app_id) {
        apply_home_assistant_android(&mut builder, req, &data);
    }

    builder.finish()
}
