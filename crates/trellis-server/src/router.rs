//! Axum router setup for the development backend

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;

use crate::{
    handlers::{component_schema, component_ui_schema, get_graph, health_check, list_components, replace_graph},
    state::BackendState,
};

/// Create the axum router with all routes
pub fn create_router(state: Arc<BackendState>) -> Router {
    Router::new()
        // Pipeline graphs
        .route("/pipelines/:id/graph", get(get_graph).post(replace_graph))
        // Component catalog
        .route("/component", get(list_components))
        .route("/component/schema/:name", get(component_schema))
        .route("/component/ui-schema/:name", get(component_ui_schema))
        .route("/api/health", get(health_check))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_router_creation() {
        let state = Arc::new(BackendState::seeded());
        let _router = create_router(state);
    }
}
