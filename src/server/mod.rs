//! HTTP server exposing the invoice service
//!
//! [`InvoiceServer`] wires an [`InvoiceService`] into an axum router with
//! request tracing, and serves it with graceful shutdown on SIGTERM or Ctrl+C.

pub mod handlers;
pub mod router;

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::core::service::InvoiceService;
use handlers::AppState;

pub use router::build_invoice_routes;

/// HTTP front end over an [`InvoiceService`]
#[derive(Clone)]
pub struct InvoiceServer {
    service: InvoiceService,
}

impl InvoiceServer {
    pub fn new(service: InvoiceService) -> Self {
        Self { service }
    }

    /// Build the router with all invoice routes
    pub fn router(&self) -> Router {
        build_invoice_routes(AppState {
            service: self.service.clone(),
        })
        .layer(TraceLayer::new_for_http())
    }

    /// Serve on `addr` until a shutdown signal arrives
    pub async fn serve(self, addr: &str) -> Result<()> {
        let app = self.router();
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

/// Resolves on Ctrl+C, or SIGTERM on unix
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}
