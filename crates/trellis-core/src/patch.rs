//! Incremental deltas emitted by the diagram surface
//!
//! These describe interactive canvas events (drags, drops, removals). They
//! update the store directly and never produce change log entries.

use serde::{Deserialize, Serialize};

use crate::model::{EdgeKey, NodeId, PipelineEdge, PipelineNode, Position};

/// A delta against the node collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeChange {
    /// Insert a node that the canvas created on its own.
    Add { node: PipelineNode },
    /// Drop a node and its incident edges.
    Remove { id: NodeId },
    /// Swap the stored node for a new version with the same id.
    Replace { node: PipelineNode },
    /// Move a node on the canvas.
    Position { id: NodeId, position: Position },
}

impl NodeChange {
    pub fn node_id(&self) -> NodeId {
        match self {
            NodeChange::Add { node } | NodeChange::Replace { node } => node.id,
            NodeChange::Remove { id } | NodeChange::Position { id, .. } => *id,
        }
    }

    /// True when the delta only moves things around on the canvas.
    pub fn is_cosmetic(&self) -> bool {
        matches!(self, NodeChange::Position { .. })
    }
}

/// A delta against the edge collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EdgeChange {
    Add { edge: PipelineEdge },
    Remove { key: EdgeKey },
}

/// Outcome counts from applying a batch of deltas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchOutcome {
    pub applied: usize,
    pub skipped: usize,
}

impl PatchOutcome {
    pub fn is_empty(&self) -> bool {
        self.applied == 0 && self.skipped == 0
    }
}
