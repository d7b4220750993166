//! Livestream Service
//!
//! Entry point for the livestream backend: token issuance, media server
//! admin queries, and health probes.

use livestream_service::auth::{AccessTokenIssuer, ServiceTokenVerifier};
use livestream_service::config::Config;
use livestream_service::observability::metrics::init_metrics_recorder;
use livestream_service::routes::{self, AppState};
use livestream_service::services::health::{
    PgDatastoreProbe, RedisCacheProbe, SysinfoDiskProbe,
};
use livestream_service::services::{HealthReporter, MediaServerClient};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "livestream_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Livestream Service");

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        bind_address = %config.bind_address,
        media_http_url = %config.media_http_url,
        media_fallback_configured = config.media_fallback_url.is_some(),
        require_service_auth = config.require_service_auth,
        environment = %config.environment,
        "Configuration loaded successfully"
    );

    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics recorder: {}", e);
        e
    })?;

    // Lazy pool: the service starts and reports NOT READY while the
    // database is down instead of exiting.
    let db_pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(600))
        .connect_lazy(&config.database_url)
        .map_err(|e| {
            error!("Invalid database configuration: {}", e);
            e
        })?;

    let cache_probe = RedisCacheProbe::new(&config.redis_url)?;

    let health = HealthReporter::new(
        Arc::new(PgDatastoreProbe::new(db_pool)),
        Arc::new(cache_probe),
        Some(Arc::new(SysinfoDiskProbe::new(&config.disk_check_path))),
        config.environment.clone(),
    );

    let issuer = AccessTokenIssuer::from_config(&config);
    let verifier = ServiceTokenVerifier::new(
        config.service_secret_key.clone(),
        Duration::from_secs(config.jwt_clock_skew_seconds.unsigned_abs()),
    );

    let media = MediaServerClient::new(
        config.media_endpoints(),
        Duration::from_secs(config.media_request_timeout_seconds),
        issuer.clone(),
    )?;

    let bind_address = config.bind_address.clone();

    let state = Arc::new(AppState {
        config,
        issuer,
        verifier,
        media,
        health,
    });

    let app = routes::build_routes(state, metrics_handle);

    let addr: SocketAddr = bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("Livestream Service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Livestream Service shutdown complete");

    Ok(())
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
/// Returns when a shutdown signal is received and drain period is complete.
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    let drain_secs: u64 = std::env::var("LS_DRAIN_SECONDS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(30);

    if drain_secs > 0 {
        warn!("Draining connections for {} seconds...", drain_secs);
        tokio::time::sleep(Duration::from_secs(drain_secs)).await;
        info!("Drain period complete");
    } else {
        info!("Skipping drain period (LS_DRAIN_SECONDS=0)");
    }
}
