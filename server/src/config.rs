//! Environment-driven settings for the push gateway.
//!
//! Read once at startup, fail fast on a bad value, generalized to every
//! variable this service depends on.

use std::time::Duration;

use anyhow::{Context, Result};

/// Which [`crate::store::RateLimitStore`] implementation to wire up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Transactional per-document Postgres backend.
    Document,
    /// Atomic hash-based Redis/Valkey backend.
    ClusterKv,
}

#[derive(Debug, Clone)]
pub struct Settings {
    /// Daily per-token delivery quota (`MAX_NOTIFICATIONS_PER_DAY`).
    pub max_notifications_per_day: u32,
    /// Deployment region label, used only for telemetry.
    pub region: String,
    /// `DEBUG=true` enables verbose info-level logs.
    pub debug: bool,
    /// HTTP listen port.
    pub port: u16,
    /// Which rate-limit backend to construct.
    pub store_backend: StoreBackend,
    /// `DATABASE_URL` for the document-store backend.
    pub database_url: String,
    /// `VALKEY_HOST` for the cluster KV backend.
    pub valkey_host: Option<String>,
    /// `VALKEY_PORT` for the cluster KV backend.
    pub valkey_port: Option<u16>,
    /// Overall per-request deadline, default 10s.
    pub request_timeout: Duration,
    /// FCM HTTP v1 endpoint base (project id is folded into the path).
    pub fcm_project_id: String,
    /// Bearer token used to authenticate against FCM. Acquisition (service
    /// account JWT exchange, OAuth2) is out of scope per this system's Non-goals;
    /// this is accepted pre-minted from configuration.
    pub fcm_access_token: String,
}

impl Settings {
    /// Load settings from the process environment, applying defaults for any
    /// unset variable. Returns an error for a present-but-unparseable value;
    /// an absent optional value falls back to its default silently.
    pub fn from_env() -> Result<Self> {
        let max_notifications_per_day = parse_env_or("MAX_NOTIFICATIONS_PER_DAY", 500)
            .context("MAX_NOTIFICATIONS_PER_DAY must be a positive integer")?;

        let region = std::env::var("REGION")
            .unwrap_or_else(|_| "us-central1".to_string())
            .to_lowercase();

        let debug = std::env::var("DEBUG")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let port = parse_env_or("PORT", 8080).context("PORT must be a valid port number")?;

        let valkey_host = std::env::var("VALKEY_HOST").ok();
        let valkey_port: Option<u16> = match std::env::var("VALKEY_PORT") {
            Ok(v) => Some(v.parse().context("VALKEY_PORT must be a valid port number")?),
            Err(_) => None,
        };

        let store_backend = if valkey_host.is_some() && valkey_port.is_some() {
            StoreBackend::ClusterKv
        } else {
            StoreBackend::Document
        };

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/hasspush".to_string());

        let request_timeout_secs: u64 = parse_env_or("REQUEST_TIMEOUT_SECONDS", 10)
            .context("REQUEST_TIMEOUT_SECONDS must be a positive integer")?;

        let fcm_project_id =
            std::env::var("FCM_PROJECT_ID").unwrap_or_else(|_| "home-assistant".to_string());
        let fcm_access_token = std::env::var("FCM_ACCESS_TOKEN").unwrap_or_default();

        Ok(Self {
            max_notifications_per_day,
            region,
            debug,
            port,
            store_backend,
            database_url,
            valkey_host,
            valkey_port,
            request_timeout: Duration::from_secs(request_timeout_secs),
            fcm_project_id,
            fcm_access_token,
        })
    }

    /// Redis connection string assembled from `VALKEY_HOST`/`VALKEY_PORT`.
    /// Only meaningful when `store_backend == StoreBackend::ClusterKv`.
    pub fn redis_url(&self) -> Option<String> {
        match (&self.valkey_host, self.valkey_port) {
            (Some(host), Some(port)) => Some(format!("redis://{host}:{port}")),
            _ => None,
        }
    }
}

fn parse_env_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(v) => v.parse::<T>().with_context(|| format!("invalid value for {key}: {v:?}")),
        Err(_) => Ok(default),
    }
}
