//! Backend wire format for pipeline graphs

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::graph::PipelineGraph;
use crate::model::*;

/// Node as the backend represents it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WireNode {
    pub component_id: NodeId,
    pub name: String,
    pub component_role: ComponentRole,
    pub component_name: String,
    #[serde(default)]
    pub config: serde_json::Value,
    #[serde(default)]
    pub supported_signals: BTreeSet<Signal>,
}

impl WireNode {
    /// Convert to a store node placed at `position`.
    pub fn into_node(self, position: Position) -> PipelineNode {
        PipelineNode {
            id: self.component_id,
            kind: self.component_role.kind(),
            component_name: self.component_name,
            display_name: self.name,
            supported_signals: self.supported_signals,
            config: self.config,
            position,
        }
    }
}

impl From<&PipelineNode> for WireNode {
    fn from(node: &PipelineNode) -> Self {
        WireNode {
            component_id: node.id,
            name: node.display_name.clone(),
            component_role: node.kind.role(),
            component_name: node.component_name.clone(),
            config: node.config.clone(),
            supported_signals: node.supported_signals.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct WireEdge {
    pub source: NodeId,
    pub target: NodeId,
}

impl From<PipelineEdge> for WireEdge {
    fn from(edge: PipelineEdge) -> Self {
        WireEdge {
            source: edge.source,
            target: edge.target,
        }
    }
}

impl From<WireEdge> for PipelineEdge {
    fn from(edge: WireEdge) -> Self {
        PipelineEdge::new(edge.source, edge.target)
    }
}

/// Full graph payload for `GET`/`POST /pipelines/{id}/graph`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct WireGraph {
    #[serde(default)]
    pub nodes: Vec<WireNode>,
    #[serde(default)]
    pub edges: Vec<WireEdge>,
}

impl WireGraph {
    /// Serialize the store: nodes by id, edges by (source, target).
    pub fn from_graph(graph: &PipelineGraph) -> Self {
        WireGraph {
            nodes: graph.nodes().into_iter().map(WireNode::from).collect(),
            edges: graph.edges().into_iter().map(WireEdge::from).collect(),
        }
    }

    /// Split into store nodes and edges. Nodes already known to `positions`
    /// keep their canvas position; others start at the origin.
    pub fn into_parts(
        self,
        positions: &HashMap<NodeId, Position>,
    ) -> (Vec<PipelineNode>, Vec<PipelineEdge>) {
        let nodes = self
            .nodes
            .into_iter()
            .map(|n| {
                let position = positions.get(&n.component_id).copied().unwrap_or_default();
                n.into_node(position)
            })
            .collect();
        let edges = self.edges.into_iter().map(PipelineEdge::from).collect();
        (nodes, edges)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}
