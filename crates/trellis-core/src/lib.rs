//! Trellis Core — pipeline graph store, change log, and mutation API

pub mod model;
pub mod graph;
pub mod changes;
pub mod editor;
pub mod patch;
pub mod wire;
pub mod persist;
pub mod error;


#[cfg(test)]
pub mod test_utils;

pub use model::{NodeId, EdgeKey, NodeKind, ComponentRole, Signal, Position, PipelineNode, PipelineEdge, NodeSpec, ComponentDescriptor};
pub use graph::PipelineGraph;
pub use changes::{ChangeEntry, ChangeLog, ChangeStatus, Checkpoint, EntityType};
pub use editor::{PipelineEditor, DeploySnapshot, Notice, NoticeLevel, SessionMeta};
pub use patch::{NodeChange, EdgeChange, PatchOutcome};
pub use wire::{WireGraph, WireNode, WireEdge};
pub use persist::{Persistence, StorageKey, MemoryPersistence, FilePersistence, SESSION_DIR, session_dir, save_typed, load_typed};
pub use error::{GraphError, PersistError};
