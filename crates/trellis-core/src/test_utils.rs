//! Test fixtures for Trellis

use serde_json::json;

use crate::model::*;
use crate::wire::{WireEdge, WireGraph, WireNode};
use crate::editor::PipelineEditor;

pub fn otlp_receiver() -> NodeSpec {
    NodeSpec::new(NodeKind::Source, "otlp", "OTLP in")
        .with_signals([Signal::Logs, Signal::Metrics, Signal::Traces])
        .with_config(json!({"protocols": {"grpc": {"endpoint": "0.0.0.0:4317"}}}))
}

pub fn batch_processor() -> NodeSpec {
    NodeSpec::new(NodeKind::Processor, "batch", "Batch")
        .with_signals([Signal::Logs, Signal::Metrics, Signal::Traces])
        .with_config(json!({"timeout": "5s"}))
}

pub fn debug_exporter() -> NodeSpec {
    NodeSpec::new(NodeKind::Destination, "debug", "Debug out")
        .with_signals([Signal::Logs, Signal::Traces])
        .with_config(json!({"verbosity": "basic"}))
}

/// Backend graph: receiver(1) → processor(2) → exporter(3).
pub fn linear_wire_graph() -> WireGraph {
    let node = |id: u64, spec: NodeSpec| WireNode {
        component_id: NodeId(id),
        name: spec.display_name,
        component_role: spec.kind.role(),
        component_name: spec.component_name,
        config: spec.config,
        supported_signals: spec.supported_signals,
    };
    WireGraph {
        nodes: vec![
            node(1, otlp_receiver()),
            node(2, batch_processor()),
            node(3, debug_exporter()),
        ],
        edges: vec![
            WireEdge { source: NodeId(1), target: NodeId(2) },
            WireEdge { source: NodeId(2), target: NodeId(3) },
        ],
    }
}

/// Editor hydrated with [`linear_wire_graph`] and an empty change log.
pub fn baseline_editor() -> PipelineEditor {
    let mut editor = PipelineEditor::new();
    editor.hydrate(linear_wire_graph());
    editor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baseline_editor_has_no_changes() {
        let editor = baseline_editor();
        assert_eq!(editor.graph().node_count(), 3);
        assert_eq!(editor.graph().edge_count(), 2);
        assert!(editor.list_changes().is_empty());
    }
}
