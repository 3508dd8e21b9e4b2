use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cartcheck_api::annotation::{AnnotationSessions, DiagramMarkCache};
use cartcheck_api::config::ServerConfig;
use cartcheck_api::router::build_app_router;
use cartcheck_api::state::AppState;
use cartcheck_api::storage;
use cartcheck_events::{
    AirtableClient, AirtableConfig, EmailConfig, EmailDelivery, EventBus, NotificationConfig,
    NotificationDispatcher,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "cartcheck_api=debug,cartcheck_events=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env()?;
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?;

    let pool = cartcheck_db::create_pool(&database_url).await?;
    tracing::info!("Database connection pool created");

    cartcheck_db::health_check(&pool).await?;
    tracing::info!("Database health check passed");

    cartcheck_db::run_migrations(&pool).await?;
    tracing::info!("Database migrations applied");

    // --- Storage ---
    let storage = storage::from_config(&config.storage)?;
    tracing::info!(backend = storage.name(), "Object storage ready");

    // --- Outbound channels ---
    let email = Arc::new(EmailDelivery::new(EmailConfig::from_env()?)?);
    tracing::info!(provider = email.config().provider.name(), "Email delivery ready");

    let airtable = match AirtableConfig::from_env() {
        Ok(airtable_config) => Some(Arc::new(AirtableClient::new(airtable_config)?)),
        Err(e) => {
            tracing::warn!(error = %e, "Airtable sync disabled");
            None
        }
    };
    let notifications = NotificationConfig::from_env();

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::default());

    let dispatcher_cancel = CancellationToken::new();
    let dispatcher = NotificationDispatcher::new(
        pool.clone(),
        Arc::clone(&email),
        airtable,
        notifications.clone(),
    );
    let dispatcher_handle = tokio::spawn(
        dispatcher.run(event_bus.subscribe(), dispatcher_cancel.clone()),
    );
    tracing::info!("Notification dispatcher spawned");

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        event_bus: Arc::clone(&event_bus),
        storage,
        sessions: Arc::new(AnnotationSessions::new()),
        mark_cache: Arc::new(DiagramMarkCache::new()),
        email,
        notifications: Arc::new(notifications),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(config.host.parse()?, config.port);
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // Let queued notifications drain before cancelling the dispatcher.
    let drain = Duration::from_secs(config.shutdown_timeout_secs);
    drop(event_bus);
    let mut dispatcher_handle = dispatcher_handle;
    if tokio::time::timeout(drain, &mut dispatcher_handle).await.is_err() {
        tracing::warn!("Notification dispatcher did not drain in time, cancelling");
        dispatcher_cancel.cancel();
        let _ = tokio::time::timeout(Duration::from_secs(5), dispatcher_handle).await;
    }
    tracing::info!("Notification dispatcher stopped");

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
