//! Cluster KV rate limit backend (Valkey/Redis).
//!
//! Each mutation is a single `MULTI`/`EXEC` pipeline (`redis::pipe().atomic()`)
//! combining the hash increment(s), the TTL refresh, and the read-back, so
//! that a crash mid-mutation can never leave the counters and the TTL out
//! of sync with each other.

use async_trait::async_trait;
use chrono::Utc;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use std::collections::HashMap;

use super::{day_bucket, next_midnight_utc, RateLimitRecord, RateLimitStore, StoreError};

const FIELD_ATTEMPTS: &str = "attemptsCount";
const FIELD_DELIVERED: &str = "deliveredCount";
const FIELD_ERRORS: &str = "errorCount";
const FIELD_TOTAL: &str = "totalCount";

#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let client = Client::open(redis_url).map_err(|e| StoreError::Backend(e.to_string()))?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(Self { conn })
    }

    fn key(token: &str) -> String {
        let day = day_bucket(Utc::now());
        format!("rate_limit:{token}:{day}")
    }

    fn ttl_seconds() -> i64 {
        let now = Utc::now();
        (next_midnight_utc(now) - now).num_seconds().max(1)
    }

    fn hash_to_record(hash: HashMap<String, i64>) -> RateLimitRecord {
        RateLimitRecord {
            attempts_count: *hash.get(FIELD_ATTEMPTS).unwrap_or(&0),
            delivered_count: *hash.get(FIELD_DELIVERED).unwrap_or(&0),
            error_count: *hash.get(FIELD_ERRORS).unwrap_or(&0),
            total_count: *hash.get(FIELD_TOTAL).unwrap_or(&0),
        }
    }

    /// Issue `HINCRBY <field> <by>` (for each pair) + `EXPIRE` + `HGETALL` as
    /// one atomic pipeline and return the post-mutation record.
    async fn atomic_increment(
        &self,
        token: &str,
        increments: &[(&str, i64)],
    ) -> Result<RateLimitRecord, StoreError> {
        let key = Self::key(token);
        let ttl = Self::ttl_seconds();

        let mut pipe = redis::pipe();
        pipe.atomic();
        for (field, by) in increments {
            pipe.hincr(&key, *field, *by).ignore();
        }
        pipe.expire(&key, ttl).ignore();
        pipe.hgetall(&key);

        let mut conn = self.conn.clone();
        let mut results: Vec<HashMap<String, i64>> = pipe
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let hash = results.pop().unwrap_or_default();
        Ok(Self::hash_to_record(hash))
    }
}

#[async_trait]
impl RateLimitStore for RedisStore {
    async fn read(&self, token: &str) -> Result<RateLimitRecord, StoreError> {
        let key = Self::key(token);
        let mut conn = self.conn.clone();
        let hash: HashMap<String, i64> = conn
            .hgetall(&key)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(Self::hash_to_record(hash))
    }

    async fn increment_attempt(&self, token: &str) -> Result<RateLimitRecord, StoreError> {
        self.atomic_increment(token, &[(FIELD_ATTEMPTS, 1)]).await
    }

    async fn record_success(&self, token: &str) -> Result<RateLimitRecord, StoreError> {
        self.atomic_increment(token, &[(FIELD_DELIVERED, 1), (FIELD_TOTAL, 1)])
            .await
    }

    async fn record_error(&self, token: &str) -> Result<RateLimitRecord, StoreError> {
        self.atomic_increment(token, &[(FIELD_ERRORS, 1), (FIELD_TOTAL, 1)])
            .await
    }
}
