//! Node/edge store backed by petgraph::StableDiGraph

use std::collections::HashMap;

use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use tracing::{debug, warn};

use crate::error::GraphError;
use crate::model::*;
use crate::patch::{EdgeChange, NodeChange, PatchOutcome};

/// The pipeline graph being edited. At most one edge per ordered node pair.
pub struct PipelineGraph {
    inner: StableDiGraph<PipelineNode, PipelineEdge>,
    index: HashMap<NodeId, NodeIndex>,
}

impl std::fmt::Debug for PipelineGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineGraph")
            .field("node_count", &self.inner.node_count())
            .field("edge_count", &self.inner.edge_count())
            .finish()
    }
}

impl PipelineGraph {
    pub fn new() -> Self {
        PipelineGraph {
            inner: StableDiGraph::new(),
            index: HashMap::new(),
        }
    }

    /// Insert a node. Ids must be unique.
    pub fn insert_node(&mut self, node: PipelineNode) -> Result<(), GraphError> {
        if self.index.contains_key(&node.id) {
            return Err(GraphError::DuplicateNode(node.id));
        }
        let id = node.id;
        let idx = self.inner.add_node(node);
        self.index.insert(id, idx);
        Ok(())
    }

    /// Get a node by ID.
    pub fn node(&self, id: NodeId) -> Option<&PipelineNode> {
        self.index.get(&id).and_then(|&idx| self.inner.node_weight(idx))
    }

    /// Get a mutable node by ID.
    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut PipelineNode> {
        let idx = *self.index.get(&id)?;
        self.inner.node_weight_mut(idx)
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.index.contains_key(&id)
    }

    /// Remove a node and all its edges.
    pub fn remove_node(&mut self, id: NodeId) -> Option<PipelineNode> {
        let idx = self.index.remove(&id)?;
        self.inner.remove_node(idx)
    }

    /// Check that an edge would keep the graph valid.
    pub fn validate_edge(&self, edge: &PipelineEdge) -> Result<(), GraphError> {
        if edge.source == edge.target {
            return Err(GraphError::SelfLoop(edge.source));
        }
        let source = self.node(edge.source).ok_or(GraphError::NodeNotFound(edge.source))?;
        let target = self.node(edge.target).ok_or(GraphError::NodeNotFound(edge.target))?;
        if !source.kind.emits_outgoing() {
            return Err(GraphError::DestinationHasOutgoing(source.id));
        }
        if !target.kind.accepts_incoming() {
            return Err(GraphError::SourceHasIncoming(target.id));
        }
        Ok(())
    }

    /// Insert an edge. Returns `Ok(false)` when the pair is already connected.
    pub fn insert_edge(&mut self, edge: PipelineEdge) -> Result<bool, GraphError> {
        self.validate_edge(&edge)?;
        let a = *self.index.get(&edge.source).ok_or(GraphError::NodeNotFound(edge.source))?;
        let b = *self.index.get(&edge.target).ok_or(GraphError::NodeNotFound(edge.target))?;
        if self.inner.find_edge(a, b).is_some() {
            return Ok(false);
        }
        self.inner.add_edge(a, b, edge);
        Ok(true)
    }

    /// Check if an edge exists between two nodes.
    pub fn has_edge(&self, key: EdgeKey) -> bool {
        self.edge(key).is_some()
    }

    /// Get an edge by its endpoint pair.
    pub fn edge(&self, key: EdgeKey) -> Option<&PipelineEdge> {
        let a = *self.index.get(&key.from)?;
        let b = *self.index.get(&key.to)?;
        self.inner.find_edge(a, b).and_then(|e| self.inner.edge_weight(e))
    }

    /// Remove an edge by its endpoint pair.
    pub fn remove_edge(&mut self, key: EdgeKey) -> Option<PipelineEdge> {
        let a = *self.index.get(&key.from)?;
        let b = *self.index.get(&key.to)?;
        let e = self.inner.find_edge(a, b)?;
        self.inner.remove_edge(e)
    }

    /// All edges touching a node, ordered by (source, target).
    pub fn incident_edges(&self, id: NodeId) -> Vec<PipelineEdge> {
        let Some(&idx) = self.index.get(&id) else {
            return Vec::new();
        };
        let mut edges: Vec<PipelineEdge> = self
            .inner
            .edges_directed(idx, Direction::Outgoing)
            .chain(self.inner.edges_directed(idx, Direction::Incoming))
            .map(|edge_ref| *edge_ref.weight())
            .collect();
        edges.sort_by_key(|e| e.key());
        edges
    }

    /// Total number of nodes.
    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    /// Total number of edges.
    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.node_count() == 0
    }

    /// All nodes ordered by id.
    pub fn nodes(&self) -> Vec<&PipelineNode> {
        let mut nodes: Vec<&PipelineNode> = self
            .inner
            .node_indices()
            .filter_map(|idx| self.inner.node_weight(idx))
            .collect();
        nodes.sort_by_key(|n| n.id);
        nodes
    }

    /// All edges ordered by (source, target).
    pub fn edges(&self) -> Vec<PipelineEdge> {
        let mut edges: Vec<PipelineEdge> = self
            .inner
            .edge_indices()
            .filter_map(|idx| self.inner.edge_weight(idx))
            .copied()
            .collect();
        edges.sort_by_key(|e| e.key());
        edges
    }

    /// Highest node id currently in the graph.
    pub fn max_node_id(&self) -> Option<NodeId> {
        self.index.keys().max().copied()
    }

    /// Find a node by display name (first match by id).
    pub fn find_node_by_name(&self, name: &str) -> Option<NodeId> {
        self.nodes()
            .into_iter()
            .find(|n| n.display_name == name)
            .map(|n| n.id)
    }

    /// Get all nodes of a specific kind.
    pub fn nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = NodeId> + '_ {
        self.inner
            .node_indices()
            .filter_map(move |idx| self.inner.node_weight(idx))
            .filter(move |n| n.kind == kind)
            .map(|n| n.id)
    }

    pub fn clear(&mut self) {
        self.inner.clear();
        self.index.clear();
    }

    /// Wholesale replace. Entries that would break the graph invariants are
    /// dropped with a warning; rejected edges are returned with the reason.
    /// Repeated pairs collapse to one edge and are not reported.
    pub fn replace_all(
        &mut self,
        nodes: Vec<PipelineNode>,
        edges: Vec<PipelineEdge>,
    ) -> Vec<(PipelineEdge, GraphError)> {
        self.clear();
        for node in nodes {
            if let Err(e) = self.insert_node(node) {
                warn!("Dropping node during replace: {}", e);
            }
        }
        let mut rejected = Vec::new();
        for edge in edges {
            match self.insert_edge(edge) {
                Ok(true) => {}
                Ok(false) => warn!("Dropping duplicate edge {} during replace", edge.key()),
                Err(e) => {
                    warn!("Dropping edge {} during replace: {}", edge.key(), e);
                    rejected.push((edge, e));
                }
            }
        }
        debug!(
            "Graph replaced: {} nodes, {} edges",
            self.node_count(),
            self.edge_count()
        );
        rejected
    }

    /// Apply canvas node deltas.
    pub fn apply_node_changes(&mut self, changes: Vec<NodeChange>) -> PatchOutcome {
        let mut outcome = PatchOutcome::default();
        for change in changes {
            let applied = match change {
                NodeChange::Add { node } => match self.insert_node(node) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!("Ignoring node patch: {}", e);
                        false
                    }
                },
                NodeChange::Remove { id } => self.remove_node(id).is_some(),
                NodeChange::Replace { node } => match self.replace_node(node) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!("Ignoring node patch: {}", e);
                        false
                    }
                },
                NodeChange::Position { id, position } => match self.node_mut(id) {
                    Some(node) => {
                        node.position = position;
                        true
                    }
                    None => false,
                },
            };
            if applied {
                outcome.applied += 1;
            } else {
                outcome.skipped += 1;
            }
        }
        outcome
    }

    /// Apply canvas edge deltas.
    pub fn apply_edge_changes(&mut self, changes: Vec<EdgeChange>) -> PatchOutcome {
        let mut outcome = PatchOutcome::default();
        for change in changes {
            let applied = match change {
                EdgeChange::Add { edge } => match self.insert_edge(edge) {
                    Ok(inserted) => inserted,
                    Err(e) => {
                        warn!("Ignoring edge patch: {}", e);
                        false
                    }
                },
                EdgeChange::Remove { key } => self.remove_edge(key).is_some(),
            };
            if applied {
                outcome.applied += 1;
            } else {
                outcome.skipped += 1;
            }
        }
        outcome
    }

    fn replace_node(&mut self, node: PipelineNode) -> Result<(), GraphError> {
        let current = self.node_mut(node.id).ok_or(GraphError::NodeNotFound(node.id))?;
        if current.kind != node.kind {
            return Err(GraphError::ImmutableField(node.id, "kind"));
        }
        if current.component_name != node.component_name {
            return Err(GraphError::ImmutableField(node.id, "component name"));
        }
        *current = node;
        Ok(())
    }
}

impl Default for PipelineGraph {
    fn default() -> Self {
        Self::new()
    }
}
