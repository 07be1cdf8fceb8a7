//! Error types for graph mutation and session storage

use thiserror::Error;

use crate::model::{EdgeKey, NodeId};

/// Rejected graph mutation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    #[error("node {0} already exists")]
    DuplicateNode(NodeId),

    #[error("edge {0} not found")]
    EdgeNotFound(EdgeKey),

    #[error("edge {0} is listed more than once")]
    DuplicateEdge(EdgeKey),

    #[error("cannot connect node {0} to itself")]
    SelfLoop(NodeId),

    #[error("source node {0} cannot receive edges")]
    SourceHasIncoming(NodeId),

    #[error("destination node {0} cannot send edges")]
    DestinationHasOutgoing(NodeId),

    #[error("node {0} cannot change its {1}")]
    ImmutableField(NodeId, &'static str),
}

/// Failure reading or writing persisted session state.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed stored value for {key}: {error}")]
    Malformed {
        key: &'static str,
        #[source]
        error: serde_json::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
