//! Backend API port for pipeline graphs and the component catalog

use async_trait::async_trait;
use thiserror::Error;
use trellis_core::{ComponentDescriptor, ComponentRole, WireGraph};

/// Failure talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid backend URL: {0}")]
    InvalidUrl(String),

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("backend returned {status} for {url}: {body}")]
    Status { url: String, status: u16, body: String },

    #[error("could not decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

impl ApiError {
    /// HTTP status code, when the backend answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Operations the editor needs from the backend.
#[async_trait]
pub trait PipelineApi: Send + Sync {
    /// `GET /pipelines/{id}/graph`
    async fn fetch_graph(&self, pipeline_id: &str) -> Result<WireGraph, ApiError>;

    /// `POST /pipelines/{id}/graph`: atomic replace of the whole graph.
    async fn replace_graph(&self, pipeline_id: &str, graph: &WireGraph) -> Result<(), ApiError>;

    /// `GET /component?type={role}`
    async fn list_components(&self, role: ComponentRole) -> Result<Vec<ComponentDescriptor>, ApiError>;

    /// `GET /component/schema/{name}`
    async fn component_schema(&self, component_name: &str) -> Result<serde_json::Value, ApiError>;

    /// `GET /component/ui-schema/{name}`
    async fn component_ui_schema(&self, component_name: &str) -> Result<serde_json::Value, ApiError>;

    /// Get backend name
    fn name(&self) -> &str;
}
