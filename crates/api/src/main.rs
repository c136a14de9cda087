//! API server entry point.

use std::sync::Arc;

use api::config::Config;
use api::state::AppState;
use cache::{CacheStore, InMemoryCache, RedisCache};
use refunds::RefundPolicy;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Wire the cache backend
    let cache_store: Arc<dyn CacheStore> = match &config.redis_url {
        Some(url) => {
            tracing::info!("using Redis cache backend");
            Arc::new(RedisCache::new(url).expect("invalid REDIS_URL"))
        }
        None => {
            tracing::info!("REDIS_URL not set, using in-memory cache");
            Arc::new(InMemoryCache::new())
        }
    };

    // 4. Wire the storage backends; one pool, injected everywhere
    let policy = RefundPolicy::with_window_days(config.refund_window_days);
    let state = match &config.database_url {
        Some(url) => {
            tracing::info!("using PostgreSQL backends");
            let pool = sqlx::PgPool::connect(url)
                .await
                .expect("failed to connect to PostgreSQL");
            sqlx::migrate!("../../migrations")
                .run(&pool)
                .await
                .expect("failed to run migrations");
            AppState::postgres(pool, cache_store, policy)
        }
        None => {
            tracing::info!("DATABASE_URL not set, using in-memory backends");
            AppState::in_memory_with_cache(cache_store, policy)
        }
    };

    // 5. Build and start the server
    let app = api::create_app(state, metrics_handle);
    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}
