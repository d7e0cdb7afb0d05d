//! Liveness endpoint: `/health` → `200 {status: "ok"}`.
//!
//! This service's only process-wide dependency is the rate-limit store
//! connection, so liveness here is simply "the process is accepting
//! connections" — there is a single health endpoint, with no per-dependency
//! readiness breakdown.

use axum::{http::StatusCode, Json};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
}

pub async fn health() -> (StatusCode, Json<HealthResponse>) {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn health_reports_ok() {
        let (status, Json(body)) = health().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "ok");
    }
}
