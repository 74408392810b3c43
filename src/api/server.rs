use std::net::SocketAddr;

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use super::{
    services::{get_resource, health, list_resources, preview_file, webhook},
    state::AppState,
};

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Routes of the webhook server
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/reliefweb/webhook/{resource_uuid}",
            get(webhook).post(webhook),
        )
        .route("/reliefweb/resources", get(list_resources))
        .route("/reliefweb/resources/{resource_uuid}", get(get_resource))
        .route("/reliefweb/files/{file}", get(preview_file))
        .route("/health", get(health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub async fn run(address: SocketAddr, state: AppState) -> Result<(), AnyError> {
    let resources = state.resources.clone();
    let app = router(state);

    let listener = TcpListener::bind(address).await?;
    info!(%address, "ReliefWeb webhook server listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Err(e) = resources.flush() {
        tracing::error!(error = %e, "Failed to flush local stores");
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
