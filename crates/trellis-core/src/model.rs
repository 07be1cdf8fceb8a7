//! Core data structures for the pipeline graph

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Unique, stable identifier for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NodeId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(NodeId)
    }
}

/// An edge is identified by its ordered endpoint pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeKey {
    pub from: NodeId,
    pub to: NodeId,
}

impl EdgeKey {
    pub fn new(from: NodeId, to: NodeId) -> Self {
        EdgeKey { from, to }
    }

    /// Change log identifier for this edge: `edge-<source>-<target>`.
    pub fn change_id(&self) -> String {
        format!("edge-{}-{}", self.from, self.to)
    }

    /// Whether the edge touches the given node at either end.
    pub fn touches(&self, node: NodeId) -> bool {
        self.from == node || self.to == node
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} → {}", self.from, self.to)
    }
}

/// Discriminates what role a node plays in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Ingests telemetry. Never has incoming edges.
    Source,
    /// Transforms telemetry. Both incoming and outgoing edges.
    Processor,
    /// Ships telemetry out. Never has outgoing edges.
    Destination,
}

impl NodeKind {
    pub fn accepts_incoming(&self) -> bool {
        !matches!(self, NodeKind::Source)
    }

    pub fn emits_outgoing(&self) -> bool {
        !matches!(self, NodeKind::Destination)
    }

    /// Backend role for this kind.
    pub fn role(&self) -> ComponentRole {
        match self {
            NodeKind::Source => ComponentRole::Receiver,
            NodeKind::Processor => ComponentRole::Processor,
            NodeKind::Destination => ComponentRole::Exporter,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Source => "source",
            NodeKind::Processor => "processor",
            NodeKind::Destination => "destination",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Component role as the backend names it.
///
/// Sources are receivers and destinations are exporters; the mapping is
/// the same on every serialization path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentRole {
    Receiver,
    Processor,
    Exporter,
}

impl ComponentRole {
    pub const ALL: [ComponentRole; 3] = [
        ComponentRole::Receiver,
        ComponentRole::Processor,
        ComponentRole::Exporter,
    ];

    pub fn kind(&self) -> NodeKind {
        match self {
            ComponentRole::Receiver => NodeKind::Source,
            ComponentRole::Processor => NodeKind::Processor,
            ComponentRole::Exporter => NodeKind::Destination,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentRole::Receiver => "receiver",
            ComponentRole::Processor => "processor",
            ComponentRole::Exporter => "exporter",
        }
    }
}

impl From<NodeKind> for ComponentRole {
    fn from(kind: NodeKind) -> Self {
        kind.role()
    }
}

impl fmt::Display for ComponentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "receiver" | "source" => Ok(ComponentRole::Receiver),
            "processor" => Ok(ComponentRole::Processor),
            "exporter" | "destination" => Ok(ComponentRole::Exporter),
            other => Err(format!("unknown component role: {other}")),
        }
    }
}

/// Telemetry signal types a component can handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Logs,
    Metrics,
    Traces,
}

/// Canvas coordinate. Carries no meaning for the pipeline itself.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Position { x, y }
    }
}

/// A single node in the pipeline graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineNode {
    pub id: NodeId,
    pub kind: NodeKind,
    /// Plugin backing this node. Fixed at creation.
    pub component_name: String,
    pub display_name: String,
    #[serde(default)]
    pub supported_signals: BTreeSet<Signal>,
    /// Opaque configuration produced by the schema-driven form.
    #[serde(default)]
    pub config: serde_json::Value,
    #[serde(default)]
    pub position: Position,
}

/// A directed edge between two nodes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct PipelineEdge {
    pub source: NodeId,
    pub target: NodeId,
}

impl PipelineEdge {
    pub fn new(source: NodeId, target: NodeId) -> Self {
        PipelineEdge { source, target }
    }

    pub fn key(&self) -> EdgeKey {
        EdgeKey::new(self.source, self.target)
    }
}

/// Everything needed to create a node except its id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeSpec {
    pub kind: NodeKind,
    pub component_name: String,
    pub display_name: String,
    #[serde(default)]
    pub supported_signals: BTreeSet<Signal>,
    #[serde(default)]
    pub config: serde_json::Value,
    #[serde(default)]
    pub position: Option<Position>,
}

impl NodeSpec {
    pub fn new(kind: NodeKind, component_name: impl Into<String>, display_name: impl Into<String>) -> Self {
        NodeSpec {
            kind,
            component_name: component_name.into(),
            display_name: display_name.into(),
            supported_signals: BTreeSet::new(),
            config: serde_json::Value::Object(Default::default()),
            position: None,
        }
    }

    /// Build a spec from a catalog entry; kind follows the component's role.
    pub fn from_component(
        component: &ComponentDescriptor,
        display_name: Option<String>,
        config: serde_json::Value,
    ) -> Self {
        NodeSpec {
            kind: component.role.kind(),
            component_name: component.name.clone(),
            display_name: display_name.unwrap_or_else(|| component.display_name.clone()),
            supported_signals: component.supported_signals.clone(),
            config,
            position: None,
        }
    }

    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        self.config = config;
        self
    }

    pub fn with_signals(mut self, signals: impl IntoIterator<Item = Signal>) -> Self {
        self.supported_signals = signals.into_iter().collect();
        self
    }

    pub fn at(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    pub(crate) fn into_node(self, id: NodeId) -> PipelineNode {
        PipelineNode {
            id,
            kind: self.kind,
            component_name: self.component_name,
            display_name: self.display_name,
            supported_signals: self.supported_signals,
            config: self.config,
            position: self.position.unwrap_or_default(),
        }
    }
}

/// A component offered by the backend catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComponentDescriptor {
    pub name: String,
    pub display_name: String,
    #[serde(rename = "type")]
    pub role: ComponentRole,
    #[serde(default)]
    pub supported_signals: BTreeSet<Signal>,
}
