//! Development backend for Trellis
//!
//! An in-memory implementation of the pipeline API: graph fetch and
//! replace per pipeline, plus a seeded component catalog.

pub mod catalog;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::info;

pub use catalog::{Catalog, CatalogEntry};
pub use error::BackendError;
pub use state::BackendState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7890,
        }
    }
}

pub struct TrellisServer {
    state: Arc<BackendState>,
    config: ServerConfig,
}

impl TrellisServer {
    pub fn new(state: BackendState, config: ServerConfig) -> Self {
        Self {
            state: Arc::new(state),
            config,
        }
    }

    pub fn state(&self) -> Arc<BackendState> {
        Arc::clone(&self.state)
    }

    /// Bind the configured address and serve until the task is dropped.
    pub async fn start(self) -> anyhow::Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener.
    pub async fn serve(self, listener: TcpListener) -> anyhow::Result<()> {
        let local: SocketAddr = listener.local_addr()?;
        info!("Trellis backend listening on http://{}", local);
        let app = router::create_router(self.state);
        axum::serve(listener, app).await.context("Server error")?;
        Ok(())
    }
}
