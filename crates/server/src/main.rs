//! pollcast server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use pollcast_api::AppState;
use pollcast_common::Config;
use pollcast_core::{DatabasePollStore, SharedPollStore};
use pollcast_db::repositories::{PollOptionRepository, PollRepository, VoteRepository};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pollcast=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting pollcast server...");

    let config = Config::load()?;

    let db = Arc::new(pollcast_db::init(&config.database).await?);
    info!("Connected to database");

    info!("Running database migrations...");
    pollcast_db::migrate(&db).await?;
    info!("Migrations completed");

    let store: SharedPollStore = Arc::new(DatabasePollStore::new(
        PollRepository::new(Arc::clone(&db)),
        PollOptionRepository::new(Arc::clone(&db)),
        VoteRepository::new(Arc::clone(&db)),
    ));
    if config.voting.enforce_poll_window {
        info!("Voting window enforcement enabled");
    }
    let state = AppState::new(store, config.auth.clone(), config.voting.clone());

    let app = pollcast_api::app(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    let ip: std::net::IpAddr = config.server.host.parse()?;
    let addr = SocketAddr::from((ip, config.server.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
