use std::path::PathBuf;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use innkeep::auth::{DenyAll, IdentityProvider, RemoteIdentity};
use innkeep::http::{self, AppState};
use innkeep::mailer::{HttpMailTransport, Mailer, MailTransport, NoopTransport};
use innkeep::store::Store;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let metrics_port: Option<u16> = std::env::var("INNKEEP_METRICS_PORT")
        .ok()
        .and_then(|s| s.parse().ok());
    innkeep::observability::init(metrics_port);

    let port = std::env::var("INNKEEP_PORT").unwrap_or_else(|_| "8080".into());
    let bind = std::env::var("INNKEEP_BIND").unwrap_or_else(|_| "0.0.0.0".into());
    let data_dir = std::env::var("INNKEEP_DATA_DIR").unwrap_or_else(|_| "./data".into());
    let max_in_flight: usize = std::env::var("INNKEEP_MAX_IN_FLIGHT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(256);
    let compact_threshold: u64 = std::env::var("INNKEEP_COMPACT_THRESHOLD")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(1000);

    // Ensure data directory exists
    std::fs::create_dir_all(&data_dir)?;

    let transport: Arc<dyn MailTransport> = match (
        std::env::var("INNKEEP_MAIL_URL").ok(),
        std::env::var("INNKEEP_MAIL_TOKEN").ok(),
    ) {
        (Some(url), Some(token)) => {
            let from = std::env::var("INNKEEP_MAIL_FROM")
                .unwrap_or_else(|_| "bookings@innkeep.local".into());
            Arc::new(HttpMailTransport::new(url, token, from))
        }
        _ => {
            warn!("INNKEEP_MAIL_URL/INNKEEP_MAIL_TOKEN not set, confirmations disabled");
            Arc::new(NoopTransport)
        }
    };
    let mailer = Mailer::spawn(transport);

    let wal_path = PathBuf::from(&data_dir).join("innkeep.wal");
    let store = Arc::new(Store::open(wal_path, mailer)?);
    tokio::spawn(innkeep::compactor::run_compactor(store.clone(), compact_threshold));

    let identity: Arc<dyn IdentityProvider> = match std::env::var("INNKEEP_AUTH_URL").ok() {
        Some(url) => Arc::new(RemoteIdentity::new(url)),
        None => {
            warn!("INNKEEP_AUTH_URL not set, all authenticated routes will reject");
            Arc::new(DenyAll)
        }
    };

    let state = AppState {
        store,
        identity,
        limiter: Arc::new(Semaphore::new(max_in_flight)),
    };
    let app = http::router(state);

    let addr = format!("{bind}:{port}");
    let listener = TcpListener::bind(&addr).await?;
    info!("innkeep listening on {addr}");
    info!("  data_dir: {data_dir}");
    info!("  max_in_flight: {max_in_flight}");
    info!("  metrics: {}", metrics_port.map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics")));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("innkeep stopped");
    Ok(())
}

/// Resolve on SIGTERM or ctrl-c; axum then stops accepting and drains
/// in-flight connections.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to register SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }
    info!("shutdown signal received");
}
