use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hasspush_server::config::{Settings, StoreBackend};
use hasspush_server::gateway::FcmGateway;
use hasspush_server::rate_limit::RateLimitEngine;
use hasspush_server::store::{PostgresStore, RateLimitStore, RedisStore};
use hasspush_server::{gateway, handlers, health, metrics, orchestrator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;

    let log_level = if settings.debug { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string()),
        ))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    tracing::info!(
        region = %settings.region,
        backend = ?settings.store_backend,
        max_notifications_per_day = settings.max_notifications_per_day,
        "Starting push notification gateway"
    );

    let metrics_recorder = metrics::MetricsRecorder::new();
    let metrics_handle = metrics_recorder.handle().clone();

    // The KV backend connection/pool is process-wide, established at
    // startup; the only retryable state at the system level is startup of
    // the KV connection (bounded exponential backoff, capped at 2s).
    let store: Arc<dyn RateLimitStore> = match settings.store_backend {
        StoreBackend::Document => Arc::new(connect_postgres_with_backoff(&settings.database_url).await?),
        StoreBackend::ClusterKv => {
            let redis_url = settings
                .redis_url()
                .expect("ClusterKv backend selected implies VALKEY_HOST/VALKEY_PORT are set");
            Arc::new(connect_redis_with_backoff(&redis_url).await?)
        }
    };
    tracing::info!("Rate limit store connected");

    let gateway: Arc<dyn gateway::PushGateway> = Arc::new(FcmGateway::new(
        settings.fcm_project_id.clone(),
        settings.fcm_access_token.clone(),
    ));

    let maximum = settings.max_notifications_per_day;
    let store_for_factory = store.clone();
    let store_factory: Arc<dyn Fn() -> RateLimitEngine + Send + Sync> =
        Arc::new(move || RateLimitEngine::new(store_for_factory.clone(), maximum));

    let orchestrator = Arc::new(orchestrator::Orchestrator::new(store_factory, gateway, maximum));

    let metrics_router = if matches!(
        std::env::var("ENABLE_METRICS").as_deref(),
        Ok("1") | Ok("true") | Ok("TRUE") | Ok("yes") | Ok("YES")
    ) {
        Router::new()
            .route("/metrics", get(metrics::metrics_handler))
            .with_state(metrics_handle)
    } else {
        Router::new()
    };

    let app = Router::new()
        .route("/health", get(health::health))
        .route("/sendPushNotification", post(handlers::send_push_notification))
        .route("/androidV1", post(handlers::android_v1))
        .route("/iOSV1", post(handlers::ios_v1))
        .route("/checkRateLimits", post(handlers::check_rate_limits))
        .with_state(orchestrator)
        .merge(metrics_router)
        .layer(TraceLayer::new_for_http());

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], settings.port));
    tracing::info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Wait for SIGTERM/SIGINT so in-flight requests can drain.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received, draining in-flight requests");
}

/// Bounded exponential backoff, capped at 2s per attempt.
async fn connect_postgres_with_backoff(database_url: &str) -> anyhow::Result<PostgresStore> {
    let mut delay = std::time::Duration::from_millis(100);
    let max_delay = std::time::Duration::from_secs(2);
    let mut attempts = 0;
    loop {
        match PostgresStore::connect(database_url).await {
            Ok(store) => return Ok(store),
            Err(e) if attempts < 5 => {
                attempts += 1;
                tracing::warn!(attempt = attempts, error = %e, "Postgres connect failed, retrying");
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(max_delay);
            }
            Err(e) => return Err(anyhow::anyhow!("Postgres connect failed: {e}")),
        }
    }
}

async fn connect_redis_with_backoff(redis_url: &str) -> anyhow::Result<RedisStore> {
    let mut delay = std::time::Duration::from_millis(100);
    let max_delay = std::time::Duration::from_secs(2);
    let mut attempts = 0;
    loop {
        match RedisStore::connect(redis_url).await {
            Ok(store) => return Ok(store),
            Err(e) if attempts < 5 => {
                attempts += 1;
                tracing::warn!(attempt = attempts, error = %e, "Redis connect failed, retrying");
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(max_delay);
            }
            Err(e) => return Err(anyhow::anyhow!("Redis connect failed: {e}")),
        }
    }
}
