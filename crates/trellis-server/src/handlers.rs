//! REST API handlers for the development backend

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::warn;
use trellis_core::{ComponentDescriptor, ComponentRole, WireGraph};

use crate::error::BackendError;
use crate::state::BackendState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub pipelines: usize,
}

#[derive(Debug, Deserialize)]
pub struct ComponentQuery {
    #[serde(rename = "type")]
    pub role: ComponentRole,
}

/// `GET /pipelines/:id/graph`
pub async fn get_graph(
    State(state): State<Arc<BackendState>>,
    Path(pipeline_id): Path<String>,
) -> Json<WireGraph> {
    Json(state.graph(&pipeline_id))
}

/// `POST /pipelines/:id/graph`
pub async fn replace_graph(
    State(state): State<Arc<BackendState>>,
    Path(pipeline_id): Path<String>,
    Json(graph): Json<WireGraph>,
) -> Result<StatusCode, BackendError> {
    state.replace(&pipeline_id, graph).map_err(|e| {
        warn!("Rejected graph for pipeline {}: {}", pipeline_id, e);
        BackendError::from(e)
    })?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /component?type=receiver|processor|exporter`
pub async fn list_components(
    State(state): State<Arc<BackendState>>,
    Query(query): Query<ComponentQuery>,
) -> Json<Vec<ComponentDescriptor>> {
    Json(state.catalog.list(query.role))
}

/// `GET /component/schema/:name`
pub async fn component_schema(
    State(state): State<Arc<BackendState>>,
    Path(name): Path<String>,
) -> Result<Json<serde_json::Value>, BackendError> {
    state
        .catalog
        .get(&name)
        .map(|entry| Json(entry.schema.clone()))
        .ok_or(BackendError::UnknownComponent(name))
}

/// `GET /component/ui-schema/:name`
pub async fn component_ui_schema(
    State(state): State<Arc<BackendState>>,
    Path(name): Path<String>,
) -> Result<Json<serde_json::Value>, BackendError> {
    state
        .catalog
        .get(&name)
        .map(|entry| Json(entry.ui_schema.clone()))
        .ok_or(BackendError::UnknownComponent(name))
}

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<BackendState>>) -> impl IntoResponse {
    let health = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        pipelines: state.pipeline_count(),
    };
    Json(health)
}
