//! Push gateway collaborator: `Send(payload) -> (messageID, error)`.
//!
//! The real implementation is a thin `reqwest` wrapper around the FCM HTTP
//! v1 `projects/<id>/messages:send` endpoint: a small struct holding a
//! configured HTTP client plus whatever static config the endpoint needs,
//! one `send` method, errors propagated via a typed error. This layer does
//! not retry on failure — a failed send within a request must not be
//! retried automatically, since that would risk duplicate delivery — so
//! there is no backoff loop here.

use async_trait::async_trait;
use serde_json::{json, Value};

/// A single structured error from the gateway, carrying the FCM error code
/// (when the gateway supplied one) and a human-readable message. The
/// [`crate::error_classifier`] module maps this to the client-facing
/// taxonomy.
#[derive(Debug, Clone)]
pub struct GatewayError {
    pub code: Option<String>,
    pub message: String,
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{code}: {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for GatewayError {}

/// `Send(payload) → (messageID, error)`. `token` is injected into the
/// payload by the caller before `send` is invoked.
#[async_trait]
pub trait PushGateway: Send + Sync {
    async fn send(&self, payload: &Value) -> Result<String, GatewayError>;
}

/// Real FCM HTTP v1 client.
pub struct FcmGateway {
    client: reqwest::Client,
    project_id: String,
    access_token: String,
}

impl FcmGateway {
    pub fn new(project_id: String, access_token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            project_id,
            access_token,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "https://fcm.googleapis.com/v1/projects/{}/messages:send",
            self.project_id
        )
    }
}

#[async_trait]
impl PushGateway for FcmGateway {
    async fn send(&self, payload: &Value) -> Result<String, GatewayError> {
        let body = json!({ "message": payload });

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError {
                code: None,
                message: e.to_string(),
            })?;

        if response.status().is_success() {
            let parsed: Value = response.json().await.map_err(|e| GatewayError {
                code: None,
                message: e.to_string(),
            })?;
            let message_id = parsed
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            return Ok(message_id);
        }

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        let fcm_error = body
            .get("error")
            .and_then(|e| e.get("details"))
            .and_then(Value::as_array)
            .and_then(|details| details.iter().find_map(|d| d.get("errorCode")))
            .and_then(Value::as_str)
            .map(|s| s.to_string());
        let message = body
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str)
            .map(|s| s.to_string())
            .unwrap_or_else(|| format!("FCM send failed with status {status}"));

        Err(GatewayError {
            code: fcm_error,
            message,
        })
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use std::sync::Mutex;

    /// In-process fake used by the orchestrator's test suite: returns a
    /// scripted response for every call, recording every payload it was
    /// asked to send.
    pub struct FakeGateway {
        pub responses: Mutex<Vec<Result<String, GatewayError>>>,
        pub sent: Mutex<Vec<Value>>,
    }

    impl FakeGateway {
        pub fn always_succeeds() -> Self {
            Self {
                responses: Mutex::new(Vec::new()),
                sent: Mutex::new(Vec::new()),
            }
        }

        pub fn queue(results: Vec<Result<String, GatewayError>>) -> Self {
            Self {
                responses: Mutex::new(results),
                sent: Mutex::new(Vec::new()),
            }
        }

        pub fn send_count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl PushGateway for FakeGateway {
        async fn send(&self, payload: &Value) -> Result<String, GatewayError> {
            self.sent.lock().unwrap().push(payload.clone());
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                Ok(format!("fake-message-{}", self.sent.lock().unwrap().len()))
            } else {
                responses.remove(0)
            }
        }
    }
}
