//! `RateLimitStore` contract  and its two backends.
//!
//! The trait is deliberately thin and async — the orchestrator and
//! [`crate::rate_limit::RateLimitEngine`] depend only on this interface,
//! with the concrete backend substitutable behind it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub mod memory;
pub mod postgres;
pub mod redis_store;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use redis_store::RedisStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("rate limit store backend error: {0}")]
    Backend(String),
}

/// One row per `(token, calendar-day-UTC)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RateLimitRecord {
    pub attempts_count: i64,
    pub delivered_count: i64,
    pub error_count: i64,
    pub total_count: i64,
}

impl RateLimitRecord {
    /// Invariant 1: `totalCount = deliveredCount + errorCount`.
    #[cfg(test)]
    fn invariant_holds(&self) -> bool {
        self.total_count == self.delivered_count + self.error_count
            && self.delivered_count <= self.attempts_count
            && self.error_count <= self.attempts_count
    }
}

/// Today's UTC calendar day, formatted `YYYYMMDD` — the per-(token,day)
/// partition key shared by both backends.
pub fn day_bucket(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d").to_string()
}

/// Midnight UTC of the day after `now` — used both as the record's
/// `expiresAt` and as `RateLimits.resetsAt`. This deployment's clock is
/// UTC, so "local date" and the UTC day-bucket coincide by construction.
pub fn next_midnight_utc(now: DateTime<Utc>) -> DateTime<Utc> {
    let tomorrow = (now + chrono::Duration::days(1)).date_naive();
    tomorrow
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always a valid time")
        .and_utc()
}

#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Non-mutating read. Returns a zero-valued record if no row exists yet.
    async fn read(&self, token: &str) -> Result<RateLimitRecord, StoreError>;

    /// Atomically create-if-absent and increment `attemptsCount` by 1.
    async fn increment_attempt(&self, token: &str) -> Result<RateLimitRecord, StoreError>;

    /// Atomically increment `deliveredCount` and `totalCount` by 1 each.
    async fn record_success(&self, token: &str) -> Result<RateLimitRecord, StoreError>;

    /// Atomically increment `errorCount` and `totalCount` by 1 each.
    async fn record_error(&self, token: &str) -> Result<RateLimitRecord, StoreError>;
}
