//! Per-token rate limit engine.
//!
//! A stateless, `Clone`-able wrapper over a [`RateLimitStore`] implementation,
//! parameterized by a daily limit, implementing the exact daily-counter
//! semantics rather than a token-bucket algorithm.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

use crate::store::{next_midnight_utc, RateLimitRecord, RateLimitStore, StoreError};

/// Derived, non-persisted summary of a token's daily quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimits {
    pub attempts: i64,
    pub successful: i64,
    pub errors: i64,
    pub total: i64,
    pub maximum: u32,
    pub remaining: u32,
    #[serde(rename = "resetsAt")]
    pub resets_at: chrono::DateTime<Utc>,
}

impl RateLimits {
    fn from_record(record: RateLimitRecord, maximum: u32) -> Self {
        let remaining = (maximum as i64 - record.delivered_count).max(0) as u32;
        Self {
            attempts: record.attempts_count,
            successful: record.delivered_count,
            errors: record.error_count,
            total: record.total_count,
            maximum,
            remaining,
            resets_at: next_midnight_utc(Utc::now()),
        }
    }
}

/// Derived admission decision. The strict-equality trigger on
/// `should_send_rate_limit_notification` is what guarantees the "you are now
/// rate-limited" push fires at most once per day per token, provided
/// `RecordSuccess`/`RecordAttempt` increments are serialized by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub is_rate_limited: bool,
    pub should_send_rate_limit_notification: bool,
    pub rate_limits: RateLimits,
}

impl RateLimitStatus {
    fn from_record(record: RateLimitRecord, maximum: u32) -> Self {
        Self {
            is_rate_limited: record.delivered_count >= maximum as i64,
            should_send_rate_limit_notification: record.delivered_count == maximum as i64,
            rate_limits: RateLimits::from_record(record, maximum),
        }
    }
}

/// Stateless per-token handle over the shared [`RateLimitStore`].
pub struct RateLimitEngine {
    store: Arc<dyn RateLimitStore>,
    maximum: u32,
}

impl RateLimitEngine {
    pub fn new(store: Arc<dyn RateLimitStore>, maximum: u32) -> Self {
        Self { store, maximum }
    }

    /// No side effects.
    pub async fn check(&self, token: &str) -> Result<RateLimitStatus, StoreError> {
        let record = self.store.read(token).await?;
        Ok(RateLimitStatus::from_record(record, self.maximum))
    }

    /// The single atomic increment that defines admission ordering.
    pub async fn record_attempt(&self, token: &str) -> Result<RateLimitStatus, StoreError> {
        let record = self.store.increment_attempt(token).await?;
        Ok(RateLimitStatus::from_record(record, self.maximum))
    }

    pub async fn record_success(&self, token: &str) -> Result<RateLimits, StoreError> {
        let record = self.store.record_success(token).await?;
        Ok(RateLimits::from_record(record, self.maximum))
    }

    pub async fn record_error(&self, token: &str) -> Result<RateLimits, StoreError> {
        let record = self.store.record_error(token).await?;
        Ok(RateLimits::from_record(record, self.maximum))
    }
}
