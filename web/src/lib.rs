//! HTTP surface of the bridge: `GET /{topic}` opens a Server-Sent Events stream of the
//! messages published to that topic.

use log::*;
use std::sync::Arc;
use tokio::net::TcpListener;

pub use service::AppState;

pub(crate) mod controller;
mod error;
pub(crate) mod middleware;
pub mod router;

pub use error::{Error, Result};

/// Binds the configured interface and serves until a shutdown signal arrives.
///
/// On shutdown every live session is cancelled first, so each one releases its broker
/// attachment and ends its stream before the server stops.
pub async fn init_server(app_state: AppState) -> std::io::Result<()> {
    let addr = format!(
        "{}:{}",
        app_state.config.interface(),
        app_state.config.port
    );
    let listener = TcpListener::bind(&addr).await?;
    info!("Server starting... listening for connections on http://{addr}");

    let sse_manager = Arc::clone(&app_state.sse_manager);
    axum::serve(listener, router::define_routes(app_state))
        .with_graceful_shutdown(shutdown_signal(sse_manager))
        .await
}

async fn shutdown_signal(sse_manager: Arc<sse::Manager>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {e}");
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
    sse_manager.shutdown();
}
