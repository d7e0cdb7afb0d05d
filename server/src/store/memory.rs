//! In-process fake `RateLimitStore`, used by the orchestrator's test suite.
//!
//! An `Arc<DashMap<String, _>>`-per-key store, holding one counter record
//! per `(push_token, day_bucket)` instead of a token bucket.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

use super::{RateLimitRecord, RateLimitStore, StoreError};

#[derive(Clone, Default)]
pub struct InMemoryStore {
    records: Arc<DashMap<String, RateLimitRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn seed(&self, token: &str, record: RateLimitRecord) {
        self.records.insert(token.to_string(), record);
    }
}

#[async_trait]
impl RateLimitStore for InMemoryStore {
    async fn read(&self, token: &str) -> Result<RateLimitRecord, StoreError> {
        Ok(self.records.get(token).map(|r| *r).unwrap_or_default())
    }

    async fn increment_attempt(&self, token: &str) -> Result<RateLimitRecord, StoreError> {
        let mut entry = self.records.entry(token.to_string()).or_default();
        entry.attempts_count += 1;
        Ok(*entry)
    }

    async fn record_success(&self, token: &str) -> Result<RateLimitRecord, StoreError> {
        let mut entry = self.records.entry(token.to_string()).or_default();
        entry.delivered_count += 1;
        entry.total_count += 1;
        Ok(*entry)
    }

    async fn record_error(&self, token: &str) -> Result<RateLimitRecord, StoreError> {
        let mut entry = self.records.entry(token.to_string()).or_default();
        entry.error_count += 1;
        entry.total_count += 1;
        Ok(*entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn attempts_count_up_from_one() {
        let store = InMemoryStore::new();
        for expected in 1..=5 {
            let record = store.increment_attempt("tok:1").await.unwrap();
            assert_eq!(record.attempts_count, expected);
        }
    }

    #[tokio::test]
    async fn unrelated_tokens_do_not_interfere() {
        let store = InMemoryStore::new();
        store.increment_attempt("a:1").await.unwrap();
        store.increment_attempt("a:1").await.unwrap();
        store.increment_attempt("b:1").await.unwrap();

        assert_eq!(store.read("a:1").await.unwrap().attempts_count, 2);
        assert_eq!(store.read("b:1").await.unwrap().attempts_count, 1);
    }

    #[tokio::test]
    async fn success_and_error_maintain_total_invariant() {
        let store = InMemoryStore::new();
        for _ in 0..3 {
            store.increment_attempt("tok:1").await.unwrap();
        }
        store.record_success("tok:1").await.unwrap();
        store.record_success("tok:1").await.unwrap();
        let record = store.record_error("tok:1").await.unwrap();
        assert_eq!(record.delivered_count, 2);
        assert_eq!(record.error_count, 1);
        assert_eq!(record.total_count, 3);
        assert!(record.invariant_holds());
    }
}
