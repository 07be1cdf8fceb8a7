//! Pending-change log
//!
//! Records what changed since the graph was last synchronized with the
//! backend. Entries are upserted by id so repeated edits of one entity
//! collapse into a single entry, and an add paired with a delete of the
//! same id cancels out.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::NodeKind;

/// What kind of entity a change refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Source,
    Processor,
    Destination,
    Edge,
}

impl From<NodeKind> for EntityType {
    fn from(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Source => EntityType::Source,
            NodeKind::Processor => EntityType::Processor,
            NodeKind::Destination => EntityType::Destination,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeStatus {
    Added,
    Edited,
    Deleted,
}

/// One pending change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEntry {
    /// Node id, or `edge-<source>-<target>` for edges. Entries without an id
    /// are never merged.
    pub id: Option<String>,
    pub entity_type: EntityType,
    /// Human-readable description at the time of the change.
    pub name: String,
    pub status: ChangeStatus,
    #[serde(default)]
    pub initial_config: Option<serde_json::Value>,
    #[serde(default)]
    pub final_config: Option<serde_json::Value>,
}

impl ChangeEntry {
    pub fn new(
        id: impl Into<String>,
        entity_type: EntityType,
        name: impl Into<String>,
        status: ChangeStatus,
    ) -> Self {
        ChangeEntry {
            id: Some(id.into()),
            entity_type,
            name: name.into(),
            status,
            initial_config: None,
            final_config: None,
        }
    }

    pub fn with_initial(mut self, config: serde_json::Value) -> Self {
        self.initial_config = Some(config);
        self
    }

    pub fn with_final(mut self, config: serde_json::Value) -> Self {
        self.final_config = Some(config);
        self
    }

    pub fn is_edge(&self) -> bool {
        self.entity_type == EntityType::Edge
    }
}

/// Marks the log position a deploy snapshot was taken at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Checkpoint {
    id: u64,
    at: u64,
}

/// Ordered, id-indexed list of pending changes.
///
/// While a checkpoint is open, every incoming change is also journaled in
/// raw form. Committing a checkpoint rebuilds the log from the changes
/// recorded after it, so edits made during an in-flight deploy survive.
#[derive(Debug, Clone, Default)]
pub struct ChangeLog {
    entries: Vec<ChangeEntry>,
    journal: Vec<(u64, ChangeEntry)>,
    open: BTreeMap<u64, u64>,
    seq: u64,
    next_checkpoint: u64,
}

impl ChangeLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a log from persisted entries, kept in their stored order.
    pub fn from_entries(entries: Vec<ChangeEntry>) -> Self {
        ChangeLog {
            entries,
            ..Self::default()
        }
    }

    /// Record a change, merging with any existing entry for the same id.
    pub fn add_change(&mut self, entry: ChangeEntry) {
        self.seq += 1;
        if !self.open.is_empty() {
            self.journal.push((self.seq, entry.clone()));
        }
        self.merge(entry);
    }

    fn merge(&mut self, entry: ChangeEntry) {
        let Some(id) = entry.id.as_deref() else {
            self.entries.push(entry);
            return;
        };
        let Some(pos) = self.position(id) else {
            self.entries.push(entry);
            return;
        };

        let existing = &mut self.entries[pos];
        match (existing.status, entry.status) {
            (ChangeStatus::Deleted, ChangeStatus::Added) | (ChangeStatus::Added, ChangeStatus::Deleted) => {
                debug!("Change for {} cancels its pending {:?}", id, existing.status);
                self.entries.remove(pos);
            }
            (ChangeStatus::Added, ChangeStatus::Edited) => {
                existing.name = entry.name;
                existing.final_config = entry.final_config;
            }
            (_, status) => {
                existing.status = status;
                existing.entity_type = entry.entity_type;
                existing.name = entry.name;
                existing.final_config = entry.final_config;
                if existing.initial_config.is_none() {
                    existing.initial_config = entry.initial_config;
                }
            }
        }
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.id.as_deref() == Some(id))
    }

    /// Pending entries in order of first touch.
    pub fn list(&self) -> &[ChangeEntry] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&ChangeEntry> {
        self.position(id).map(|pos| &self.entries[pos])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Empty the log. Open checkpoints stay open but forget earlier changes.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.journal.clear();
    }

    /// Start tracking changes made from this point on.
    pub fn checkpoint(&mut self) -> Checkpoint {
        self.next_checkpoint += 1;
        let checkpoint = Checkpoint {
            id: self.next_checkpoint,
            at: self.seq,
        };
        self.open.insert(checkpoint.id, checkpoint.at);
        checkpoint
    }

    /// The snapshot taken at `checkpoint` reached the backend: only changes
    /// recorded after it remain pending.
    pub fn commit(&mut self, checkpoint: Checkpoint) {
        let at = checkpoint.at;
        let replay: Vec<ChangeEntry> = self
            .journal
            .iter()
            .filter(|(seq, _)| *seq > at)
            .map(|(_, entry)| entry.clone())
            .collect();
        self.entries.clear();
        for entry in replay {
            self.merge(entry);
        }
        self.close(checkpoint);
    }

    /// The snapshot taken at `checkpoint` was not applied; the log is left
    /// as it is.
    pub fn release(&mut self, checkpoint: Checkpoint) {
        self.close(checkpoint);
    }

    /// Number of checkpoints still awaiting commit or release.
    pub fn open_checkpoints(&self) -> usize {
        self.open.len()
    }

    fn close(&mut self, checkpoint: Checkpoint) {
        self.open.remove(&checkpoint.id);
        match self.open.values().min() {
            Some(&oldest) => self.journal.retain(|(seq, _)| *seq > oldest),
            None => self.journal.clear(),
        }
    }
}
