//! Document-store rate limit backend.
//!
//! The document-store abstraction (Firestore in production) is modeled here as
//! a single Postgres table keyed by `(push_token, day_bucket)`, with each
//! mutation wrapped in an explicit transaction (`pool.begin()` /
//! `tx.commit()`), even though a single `INSERT ... ON CONFLICT` is already
//! atomic at the row level — this keeps the backend's shape obviously
//! equivalent to "one transaction per
//! document" if it's ever split into multiple statements later.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

use super::{day_bucket, next_midnight_utc, RateLimitRecord, RateLimitStore, StoreError};

#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(Self { pool })
    }

    #[cfg(test)]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_record(row: (i64, i64, i64, i64)) -> RateLimitRecord {
    RateLimitRecord {
        attempts_count: row.0,
        delivered_count: row.1,
        error_count: row.2,
        total_count: row.3,
    }
}

#[async_trait]
impl RateLimitStore for PostgresStore {
    /// Cheap non-transactional read, per this system's "MAY also expose a cheap
    /// non-transactional Read" allowance for the document-store variant.
    async fn read(&self, token: &str) -> Result<RateLimitRecord, StoreError> {
        let day = day_bucket(Utc::now());
        let row = sqlx::query_as::<_, (i64, i64, i64, i64)>(
            "SELECT attempts_count, delivered_count, error_count, total_count
             FROM rate_limits WHERE push_token = $1 AND day_bucket = $2",
        )
        .bind(token)
        .bind(&day)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(row.map(row_to_record).unwrap_or_default())
    }

    async fn increment_attempt(&self, token: &str) -> Result<RateLimitRecord, StoreError> {
        let now = Utc::now();
        let day = day_bucket(now);
        let expires_at = next_midnight_utc(now);

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let row = sqlx::query_as::<_, (i64, i64, i64, i64)>(
            r#"
            INSERT INTO rate_limits (push_token, day_bucket, attempts_count, expires_at)
            VALUES ($1, $2, 1, $3)
            ON CONFLICT (push_token, day_bucket) DO UPDATE
                SET attempts_count = rate_limits.attempts_count + 1,
                    expires_at = $3
            RETURNING attempts_count, delivered_count, error_count, total_count
            "#,
        )
        .bind(token)
        .bind(&day)
        .bind(expires_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(row_to_record(row))
    }

    async fn record_success(&self, token: &str) -> Result<RateLimitRecord, StoreError> {
        let now = Utc::now();
        let day = day_bucket(now);
        let expires_at = next_midnight_utc(now);

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let row = sqlx::query_as::<_, (i64, i64, i64, i64)>(
            r#"
            INSERT INTO rate_limits (push_token, day_bucket, delivered_count, total_count, expires_at)
            VALUES ($1, $2, 1, 1, $3)
            ON CONFLICT (push_token, day_bucket) DO UPDATE
                SET delivered_count = rate_limits.delivered_count + 1,
                    total_count = rate_limits.total_count + 1
            RETURNING attempts_count, delivered_count, error_count, total_count
            "#,
        )
        .bind(token)
        .bind(&day)
        .bind(expires_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(row_to_record(row))
    }

    async fn record_error(&self, token: &str) -> Result<RateLimitRecord, StoreError> {
        let now = Utc::now();
        let day = day_bucket(now);
        let expires_at = next_midnight_utc(now);

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let row = sqlx::query_as::<_, (i64, i64, i64, i64)>(
            r#"
            INSERT INTO rate_limits (push_token, day_bucket, error_count, total_count, expires_at)
            VALUES ($1, $2, 1, 1, $3)
            ON CONFLICT (push_token, day_bucket) DO UPDATE
                SET error_count = rate_limits.error_count + 1,
                    total_count = rate_limits.total_count + 1
            RETURNING attempts_count, delivered_count, error_count, total_count
            "#,
        )
        .bind(token)
        .bind(&day)
        .bind(expires_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(row_to_record(row))
    }
}
