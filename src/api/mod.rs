//! HTTP surface of the explorer
//!
//! JSON REST endpoints served by hyper, one tokio task per connection.

mod handlers;
mod routes;
mod server;

pub use handlers::BoxBody;
pub use routes::{parse_query, ApiRoute, RouteMatch};
pub use server::serve;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

use crate::core::Core;

/// Bind the configured address and serve until SIGINT/SIGTERM
pub async fn run_server(core: Core) -> Result<()> {
    let listen = core.config.server.address.clone();
    let addr: SocketAddr = listen
        .parse()
        .context(format!("Invalid listen address: {}", listen))?;

    let listener = TcpListener::bind(addr)
        .await
        .context(format!("Failed to bind to {}", addr))?;

    info!(
        address = %addr,
        request_timeout_secs = core.config.server.request_timeout,
        "s3explorer listening"
    );

    serve(listener, core, shutdown_signal()).await
}

/// Resolves on Ctrl-C, or SIGTERM on unix
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
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
}
