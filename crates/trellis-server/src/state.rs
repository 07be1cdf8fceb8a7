//! Shared backend state

use dashmap::DashMap;
use tracing::info;
use trellis_core::{GraphError, PipelineEdge, PipelineGraph, Position, WireGraph};

use crate::catalog::Catalog;

/// Pipelines held in memory, keyed by pipeline id.
pub struct BackendState {
    pipelines: DashMap<String, WireGraph>,
    pub catalog: Catalog,
}

impl BackendState {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            pipelines: DashMap::new(),
            catalog,
        }
    }

    /// Seeded catalog, no pipelines.
    pub fn seeded() -> Self {
        Self::new(Catalog::seeded())
    }

    pub fn with_pipeline(self, pipeline_id: impl Into<String>, graph: WireGraph) -> Self {
        self.pipelines.insert(pipeline_id.into(), graph);
        self
    }

    /// Current graph of a pipeline. Pipelines that were never deployed
    /// are empty.
    pub fn graph(&self, pipeline_id: &str) -> WireGraph {
        self.pipelines
            .get(pipeline_id)
            .map(|g| g.value().clone())
            .unwrap_or_default()
    }

    /// Atomically replace a pipeline's graph after validating it.
    pub fn replace(&self, pipeline_id: &str, graph: WireGraph) -> Result<(), GraphError> {
        validate(&graph)?;
        info!(
            "Pipeline {} replaced: {} nodes, {} edges",
            pipeline_id,
            graph.nodes.len(),
            graph.edges.len()
        );
        self.pipelines.insert(pipeline_id.to_string(), graph);
        Ok(())
    }

    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }
}

/// Reject graphs the editor itself could never produce: duplicate node
/// ids or edges, dangling or self edges, and edges against the pipeline
/// direction.
pub fn validate(graph: &WireGraph) -> Result<(), GraphError> {
    let mut check = PipelineGraph::new();
    for node in &graph.nodes {
        check.insert_node(node.clone().into_node(Position::default()))?;
    }
    for edge in &graph.edges {
        let edge = PipelineEdge::new(edge.source, edge.target);
        if !check.insert_edge(edge)? {
            return Err(GraphError::DuplicateEdge(edge.key()));
        }
    }
    Ok(())
}
