//! HTTP API Server
//!
//! Axum-based HTTP server over the job registry.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::Method;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::{HttpConfig, OutputConfig};
use crate::job::JobRegistry;

use super::auth::AuthState;
use super::handlers::AppState;
use super::routes::create_router;

pub struct HttpServer {
    config: HttpConfig,
    output: OutputConfig,
    registry: Arc<JobRegistry>,
}

impl HttpServer {
    pub fn new(config: HttpConfig, output: OutputConfig, registry: Arc<JobRegistry>) -> Self {
        Self {
            config,
            output,
            registry,
        }
    }

    /// Run the HTTP server until `shutdown` fires.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        let addr: SocketAddr = self
            .config
            .listen_addr
            .parse()
            .context("Invalid HTTP listen address")?;

        let app_state = AppState {
            registry: Arc::clone(&self.registry),
        };
        let auth_state = AuthState::new(self.config.api_keys.clone());

        let mut app = create_router(app_state, auth_state, self.output.data_dir.clone());

        if self.config.cors_enabled {
            let cors = CorsLayer::new()
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers(Any)
                .allow_origin(Any);
            app = app.layer(cors);
        }

        app = app.layer(TraceLayer::new_for_http());

        let listener = TcpListener::bind(&addr)
            .await
            .context("Failed to bind HTTP server")?;

        info!("HTTP API server listening on http://{}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                info!("HTTP server shutting down");
            })
            .await
            .context("HTTP server error")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listen_addr_parses() {
        let addr: SocketAddr = "127.0.0.1:8080".parse().unwrap();
        assert_eq!(addr.port(), 8080);
    }
}
