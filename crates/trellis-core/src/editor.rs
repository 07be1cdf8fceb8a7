//! Graph mutation API
//!
//! [`PipelineEditor`] is the only sanctioned way to make a semantic change
//! to a pipeline: every add, edit and delete updates the store and records
//! a matching change log entry in the same call.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use dashmap::DashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::changes::{ChangeEntry, ChangeLog, ChangeStatus, Checkpoint, EntityType};
use crate::error::{GraphError, PersistError};
use crate::graph::PipelineGraph;
use crate::model::*;
use crate::patch::{EdgeChange, NodeChange, PatchOutcome};
use crate::persist::{Persistence, StorageKey, load_typed, save_typed};
use crate::wire::WireGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A user-facing notification produced by a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.level, self.message)
    }
}

/// Setup fields of the session, persisted alongside the graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMeta {
    pub pipeline_id: Option<String>,
    pub pipeline_name: Option<String>,
    pub platform: Option<String>,
    pub destination: Option<String>,
}

/// Payload captured at the start of a deploy.
///
/// Dropping a snapshot without passing it to
/// [`PipelineEditor::finish_deploy`] (for example when the deploy future is
/// cancelled) counts as a failed deploy: the editor releases its checkpoint
/// on the next mutation or deploy.
#[derive(Debug)]
pub struct DeploySnapshot {
    pub payload: WireGraph,
    /// Entries pending when the snapshot was taken.
    pub pending: usize,
    checkpoint: Checkpoint,
    abandoned: Arc<DashSet<Checkpoint>>,
    settled: bool,
}

impl Drop for DeploySnapshot {
    fn drop(&mut self) {
        if !self.settled {
            self.abandoned.insert(self.checkpoint);
        }
    }
}

/// Editing session for one pipeline.
pub struct PipelineEditor {
    graph: PipelineGraph,
    changes: ChangeLog,
    next_id: u64,
    meta: SessionMeta,
    notices: Vec<Notice>,
    persistence: Option<Arc<dyn Persistence>>,
    abandoned: Arc<DashSet<Checkpoint>>,
}

impl fmt::Debug for PipelineEditor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineEditor")
            .field("graph", &self.graph)
            .field("pending_changes", &self.changes.len())
            .field("next_id", &self.next_id)
            .field("meta", &self.meta)
            .field("persistent", &self.persistence.is_some())
            .finish()
    }
}

impl PipelineEditor {
    pub fn new() -> Self {
        PipelineEditor {
            graph: PipelineGraph::new(),
            changes: ChangeLog::new(),
            next_id: 1,
            meta: SessionMeta::default(),
            notices: Vec::new(),
            persistence: None,
            abandoned: Arc::new(DashSet::new()),
        }
    }

    /// Empty session that writes through to `store`.
    pub fn with_persistence(store: Arc<dyn Persistence>) -> Self {
        PipelineEditor {
            persistence: Some(store),
            ..Self::new()
        }
    }

    /// Rebuild a session from whatever `store` holds.
    pub fn restore(store: Arc<dyn Persistence>) -> Result<Self, PersistError> {
        let nodes: Vec<PipelineNode> = load_typed(&*store, StorageKey::Nodes)?.unwrap_or_default();
        let edges: Vec<PipelineEdge> =
            load_typed(&*store, StorageKey::PipelineEdges)?.unwrap_or_default();
        let entries: Vec<ChangeEntry> =
            load_typed(&*store, StorageKey::ChangesLog)?.unwrap_or_default();
        let meta = SessionMeta {
            pipeline_id: load_typed(&*store, StorageKey::PipelineId)?,
            pipeline_name: load_typed(&*store, StorageKey::PipelineName)?,
            platform: load_typed(&*store, StorageKey::Platform)?,
            destination: load_typed(&*store, StorageKey::Destination)?,
        };

        let mut graph = PipelineGraph::new();
        graph.replace_all(nodes, edges);
        let changes = ChangeLog::from_entries(entries);

        // Ids of deleted nodes only survive in the log; never hand them out again.
        let logged_max = changes
            .list()
            .iter()
            .filter(|e| !e.is_edge())
            .filter_map(|e| e.id.as_deref()?.parse::<NodeId>().ok())
            .max();
        let highest = graph.max_node_id().max(logged_max).map_or(0, |id| id.0);

        info!(
            "Restored session: {} nodes, {} edges, {} pending changes",
            graph.node_count(),
            graph.edge_count(),
            changes.len()
        );

        Ok(PipelineEditor {
            graph,
            changes,
            next_id: highest + 1,
            meta,
            notices: Vec::new(),
            persistence: Some(store),
            abandoned: Arc::new(DashSet::new()),
        })
    }

    pub fn graph(&self) -> &PipelineGraph {
        &self.graph
    }

    pub fn changes(&self) -> &ChangeLog {
        &self.changes
    }

    /// Pending entries in order of first touch.
    pub fn list_changes(&self) -> &[ChangeEntry] {
        self.changes.list()
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    pub fn meta(&self) -> &SessionMeta {
        &self.meta
    }

    pub fn set_meta(&mut self, meta: SessionMeta) {
        self.meta = meta;
        self.persist_meta();
    }

    /// Notices raised since the last call.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Serialize the current store for the backend.
    pub fn to_wire(&self) -> WireGraph {
        WireGraph::from_graph(&self.graph)
    }

    /// Create a node with a fresh id and log it as added.
    pub fn add_node(&mut self, spec: NodeSpec) -> NodeId {
        let id = self.allocate_id();
        let node = spec.into_node(id);
        let entry = ChangeEntry::new(
            id.to_string(),
            node.kind.into(),
            node.display_name.clone(),
            ChangeStatus::Added,
        )
        .with_final(node.config.clone());

        debug!("Adding {} node {} ({})", node.kind, id, node.component_name);
        if let Err(e) = self.graph.insert_node(node) {
            self.notice(NoticeLevel::Error, format!("Could not add node: {e}"));
            return id;
        }
        self.record(entry);
        self.persist();
        id
    }

    /// Replace a node's configuration. Unknown ids are a no-op.
    pub fn update_node_config(&mut self, id: NodeId, config: serde_json::Value) {
        let Some(node) = self.graph.node_mut(id) else {
            self.notice(
                NoticeLevel::Warning,
                format!("Node {id} not found; configuration was not saved"),
            );
            return;
        };
        if node.config == config {
            debug!("Configuration of node {} unchanged", id);
            return;
        }
        let previous = std::mem::replace(&mut node.config, config.clone());
        let entry = ChangeEntry::new(
            id.to_string(),
            node.kind.into(),
            node.display_name.clone(),
            ChangeStatus::Edited,
        )
        .with_initial(previous)
        .with_final(config);

        debug!("Updated configuration of node {}", id);
        self.record(entry);
        self.persist();
    }

    /// Change a node's display name. Unknown ids are a no-op.
    pub fn rename_node(&mut self, id: NodeId, display_name: impl Into<String>) {
        let display_name = display_name.into();
        let Some(node) = self.graph.node_mut(id) else {
            self.notice(NoticeLevel::Warning, format!("Node {id} not found; name was not changed"));
            return;
        };
        if node.display_name == display_name {
            return;
        }
        node.display_name = display_name.clone();
        let entry = ChangeEntry::new(id.to_string(), node.kind.into(), display_name, ChangeStatus::Edited)
            .with_initial(node.config.clone())
            .with_final(node.config.clone());

        self.record(entry);
        self.persist();
    }

    /// Delete a node. Incident edges are removed and logged first.
    pub fn delete_node(&mut self, id: NodeId) {
        let Some(node) = self.graph.node(id).cloned() else {
            self.notice(NoticeLevel::Warning, format!("Node {id} not found; nothing deleted"));
            return;
        };

        for edge in self.graph.incident_edges(id) {
            let entry = self.edge_entry(edge, ChangeStatus::Deleted);
            self.graph.remove_edge(edge.key());
            self.record(entry);
        }

        self.graph.remove_node(id);
        self.record(
            ChangeEntry::new(id.to_string(), node.kind.into(), node.display_name, ChangeStatus::Deleted)
                .with_initial(node.config),
        );
        debug!("Deleted node {}", id);
        self.persist();
    }

    /// Connect two nodes. Connecting an already connected pair is a no-op.
    pub fn connect_nodes(&mut self, source: NodeId, target: NodeId) -> Result<(), GraphError> {
        let edge = PipelineEdge::new(source, target);
        if let Err(e) = self.graph.validate_edge(&edge) {
            self.notice(
                NoticeLevel::Error,
                format!("Cannot connect {source} to {target}: {e}"),
            );
            return Err(e);
        }

        let entry = self.edge_entry(edge, ChangeStatus::Added);
        match self.graph.insert_edge(edge) {
            Ok(true) => {
                debug!("Connected {}", edge.key());
                self.record(entry);
                self.persist();
                Ok(())
            }
            Ok(false) => {
                debug!("Edge {} already exists", edge.key());
                Ok(())
            }
            Err(e) => {
                self.notice(
                    NoticeLevel::Error,
                    format!("Cannot connect {source} to {target}: {e}"),
                );
                Err(e)
            }
        }
    }

    /// Remove the edge between two nodes. A missing edge is a no-op.
    pub fn delete_edge(&mut self, source: NodeId, target: NodeId) {
        let key = EdgeKey::new(source, target);
        let Some(edge) = self.graph.edge(key).copied() else {
            self.notice(NoticeLevel::Warning, format!("No edge {key} to delete"));
            return;
        };
        let entry = self.edge_entry(edge, ChangeStatus::Deleted);
        self.graph.remove_edge(key);
        self.record(entry);
        self.persist();
    }

    /// Discard everything: store and change log.
    pub fn reset_graph(&mut self) {
        self.graph.clear();
        self.changes.clear();
        info!("Pipeline graph reset");
        self.persist();
    }

    /// Replace the store wholesale without touching the change log.
    pub fn replace_all(&mut self, nodes: Vec<PipelineNode>, edges: Vec<PipelineEdge>) {
        self.graph.replace_all(nodes, edges);
        self.bump_next_id();
        self.persist_graph();
    }

    /// Load a backend graph as the new baseline. Known nodes keep their
    /// canvas positions and the change log is emptied.
    pub fn hydrate(&mut self, graph: WireGraph) {
        let positions: HashMap<NodeId, Position> = self
            .graph
            .nodes()
            .into_iter()
            .map(|n| (n.id, n.position))
            .collect();
        let (nodes, edges) = graph.into_parts(&positions);
        let rejected = self.graph.replace_all(nodes, edges);
        self.changes.clear();
        self.bump_next_id();

        // The store no longer matches the backend for these edges; log them
        // so the next deploy's removal is visible.
        for (edge, reason) in rejected {
            self.notice(
                NoticeLevel::Warning,
                format!("Backend edge {} dropped: {reason}", edge.key()),
            );
            let entry = self.edge_entry(edge, ChangeStatus::Deleted);
            self.record(entry);
        }
        info!(
            "Hydrated pipeline: {} nodes, {} edges",
            self.graph.node_count(),
            self.graph.edge_count()
        );
        self.persist();
    }

    /// Apply canvas node deltas. Never logged as changes.
    pub fn patch_nodes(&mut self, changes: Vec<NodeChange>) -> PatchOutcome {
        let outcome = self.graph.apply_node_changes(changes);
        self.bump_next_id();
        if outcome.applied > 0 {
            self.persist_graph();
        }
        outcome
    }

    /// Apply canvas edge deltas. Never logged as changes.
    pub fn patch_edges(&mut self, changes: Vec<EdgeChange>) -> PatchOutcome {
        let outcome = self.graph.apply_edge_changes(changes);
        if outcome.applied > 0 {
            self.persist_graph();
        }
        outcome
    }

    /// Capture the payload for a deploy. Mutations made afterwards stay
    /// pending after the deploy finishes.
    pub fn begin_deploy(&mut self) -> DeploySnapshot {
        self.reap_abandoned();
        DeploySnapshot {
            payload: self.to_wire(),
            pending: self.changes.len(),
            checkpoint: self.changes.checkpoint(),
            abandoned: Arc::clone(&self.abandoned),
            settled: false,
        }
    }

    /// Settle a deploy started with [`begin_deploy`](Self::begin_deploy).
    /// Returns the number of entries still pending.
    pub fn finish_deploy(&mut self, mut snapshot: DeploySnapshot, succeeded: bool) -> usize {
        snapshot.settled = true;
        self.reap_abandoned();
        if succeeded {
            self.changes.commit(snapshot.checkpoint);
            info!(
                "Deploy applied {} changes; {} still pending",
                snapshot.pending,
                self.changes.len()
            );
            self.persist_changes();
        } else {
            self.changes.release(snapshot.checkpoint);
            error!("Deploy failed; {} changes kept for retry", self.changes.len());
        }
        self.changes.len()
    }

    /// Whether a deploy has been started and not yet finished.
    pub fn deploy_in_flight(&self) -> bool {
        self.changes.open_checkpoints() > self.abandoned.len()
    }

    fn record(&mut self, entry: ChangeEntry) {
        self.reap_abandoned();
        self.changes.add_change(entry);
    }

    /// Release checkpoints of snapshots that were dropped unsettled.
    fn reap_abandoned(&mut self) {
        if self.abandoned.is_empty() {
            return;
        }
        let dropped: Vec<Checkpoint> = self.abandoned.iter().map(|cp| *cp).collect();
        for checkpoint in dropped {
            self.abandoned.remove(&checkpoint);
            self.changes.release(checkpoint);
            warn!("Deploy was abandoned before it finished; its changes stay pending");
        }
    }

    fn allocate_id(&mut self) -> NodeId {
        self.bump_next_id();
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    fn bump_next_id(&mut self) {
        if let Some(max) = self.graph.max_node_id() {
            self.next_id = self.next_id.max(max.0 + 1);
        }
    }

    fn node_label(&self, id: NodeId) -> String {
        self.graph
            .node(id)
            .map(|n| n.display_name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    fn edge_entry(&self, edge: PipelineEdge, status: ChangeStatus) -> ChangeEntry {
        let name = format!("{} → {}", self.node_label(edge.source), self.node_label(edge.target));
        ChangeEntry::new(edge.key().change_id(), EntityType::Edge, name, status)
    }

    fn notice(&mut self, level: NoticeLevel, message: String) {
        match level {
            NoticeLevel::Info => info!("{}", message),
            NoticeLevel::Warning => warn!("{}", message),
            NoticeLevel::Error => error!("{}", message),
        }
        self.notices.push(Notice { level, message });
    }

    fn persist(&self) {
        self.persist_graph();
        self.persist_changes();
    }

    fn persist_graph(&self) {
        let Some(store) = &self.persistence else {
            return;
        };
        let nodes: Vec<&PipelineNode> = self.graph.nodes();
        let result = save_typed(&**store, StorageKey::Nodes, &nodes)
            .and_then(|()| save_typed(&**store, StorageKey::PipelineEdges, &self.graph.edges()));
        if let Err(e) = result {
            warn!("Failed to persist pipeline graph: {}", e);
        }
    }

    fn persist_changes(&self) {
        let Some(store) = &self.persistence else {
            return;
        };
        if let Err(e) = save_typed(&**store, StorageKey::ChangesLog, self.changes.list()) {
            warn!("Failed to persist change log: {}", e);
        }
    }

    fn persist_meta(&self) {
        let Some(store) = &self.persistence else {
            return;
        };
        let fields = [
            (StorageKey::PipelineId, &self.meta.pipeline_id),
            (StorageKey::PipelineName, &self.meta.pipeline_name),
            (StorageKey::Platform, &self.meta.platform),
            (StorageKey::Destination, &self.meta.destination),
        ];
        for (key, value) in fields {
            let result = match value {
                Some(v) => save_typed(&**store, key, v),
                None => store.clear(key),
            };
            if let Err(e) = result {
                warn!("Failed to persist {}: {}", key.as_str(), e);
            }
        }
    }
}

impl Default for PipelineEditor {
    fn default() -> Self {
        Self::new()
    }
}
