//! Session persistence port
//!
//! An editing session survives restarts by writing its state through a
//! [`Persistence`] implementation under a fixed, typed key schema.

use std::path::{Path, PathBuf};

use dashmap::DashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::PersistError;

/// Session directory: .trellis/
pub const SESSION_DIR: &str = ".trellis";

/// Keys under which session state is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    Nodes,
    PipelineEdges,
    ChangesLog,
    Destination,
    PipelineName,
    PipelineId,
    Platform,
}

impl StorageKey {
    pub const ALL: [StorageKey; 7] = [
        StorageKey::Nodes,
        StorageKey::PipelineEdges,
        StorageKey::ChangesLog,
        StorageKey::Destination,
        StorageKey::PipelineName,
        StorageKey::PipelineId,
        StorageKey::Platform,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKey::Nodes => "Nodes",
            StorageKey::PipelineEdges => "PipelineEdges",
            StorageKey::ChangesLog => "changesLog",
            StorageKey::Destination => "Destination",
            StorageKey::PipelineName => "pipelinename",
            StorageKey::PipelineId => "pipelineid",
            StorageKey::Platform => "platform",
        }
    }
}

/// Key/value storage for session state.
pub trait Persistence: Send + Sync {
    fn save(&self, key: StorageKey, value: &serde_json::Value) -> Result<(), PersistError>;

    fn load(&self, key: StorageKey) -> Result<Option<serde_json::Value>, PersistError>;

    fn clear(&self, key: StorageKey) -> Result<(), PersistError>;
}

/// Serialize and store a typed value.
pub fn save_typed<T: Serialize + ?Sized>(
    store: &dyn Persistence,
    key: StorageKey,
    value: &T,
) -> Result<(), PersistError> {
    let value = serde_json::to_value(value)?;
    store.save(key, &value)
}

/// Load and deserialize a typed value.
pub fn load_typed<T: DeserializeOwned>(
    store: &dyn Persistence,
    key: StorageKey,
) -> Result<Option<T>, PersistError> {
    match store.load(key)? {
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|error| PersistError::Malformed {
                key: key.as_str(),
                error,
            }),
        None => Ok(None),
    }
}

/// In-process storage. Thread-safe for concurrent access.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    slots: DashMap<StorageKey, serde_json::Value>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl Persistence for MemoryPersistence {
    fn save(&self, key: StorageKey, value: &serde_json::Value) -> Result<(), PersistError> {
        self.slots.insert(key, value.clone());
        Ok(())
    }

    fn load(&self, key: StorageKey) -> Result<Option<serde_json::Value>, PersistError> {
        Ok(self.slots.get(&key).map(|r| r.value().clone()))
    }

    fn clear(&self, key: StorageKey) -> Result<(), PersistError> {
        self.slots.remove(&key);
        Ok(())
    }
}

/// One JSON file per key under `<root>/.trellis/`.
#[derive(Debug, Clone)]
pub struct FilePersistence {
    dir: PathBuf,
}

impl FilePersistence {
    pub fn new(root: &Path) -> Self {
        FilePersistence {
            dir: session_dir(root),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: StorageKey) -> PathBuf {
        self.dir.join(format!("{}.json", key.as_str()))
    }

    /// Remove the whole session directory.
    pub fn clear_all(&self) -> Result<(), PersistError> {
        if self.dir.exists() {
            std::fs::remove_dir_all(&self.dir)?;
        }
        Ok(())
    }
}

impl Persistence for FilePersistence {
    fn save(&self, key: StorageKey, value: &serde_json::Value) -> Result<(), PersistError> {
        std::fs::create_dir_all(&self.dir)?;
        let envelope = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "saved_at": chrono::Utc::now().to_rfc3339(),
            "value": value,
        });
        let path = self.path(key);
        std::fs::write(&path, serde_json::to_string_pretty(&envelope)?)?;
        tracing::debug!("Session key {} saved: {}", key.as_str(), path.display());
        Ok(())
    }

    fn load(&self, key: StorageKey) -> Result<Option<serde_json::Value>, PersistError> {
        let path = self.path(key);
        if !path.exists() {
            return Ok(None);
        }
        let json_str = std::fs::read_to_string(&path)?;
        let mut envelope: serde_json::Value =
            serde_json::from_str(&json_str).map_err(|error| PersistError::Malformed {
                key: key.as_str(),
                error,
            })?;
        Ok(envelope.get_mut("value").map(serde_json::Value::take))
    }

    fn clear(&self, key: StorageKey) -> Result<(), PersistError> {
        let path = self.path(key);
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        Ok(())
    }
}

/// Get session directory path
pub fn session_dir(root: &Path) -> PathBuf {
    root.join(SESSION_DIR)
}
