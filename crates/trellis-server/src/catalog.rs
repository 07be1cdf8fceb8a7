//! Seeded component catalog

use serde_json::{json, Value};
use trellis_core::{ComponentDescriptor, ComponentRole, Signal};

/// A catalog component with its config schema and UI hints.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub descriptor: ComponentDescriptor,
    pub schema: Value,
    pub ui_schema: Value,
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    /// Common collector components.
    pub fn seeded() -> Self {
        use ComponentRole::*;
        use Signal::*;

        Self::new(vec![
            entry(
                "otlp",
                "OTLP",
                Receiver,
                &[Logs, Metrics, Traces],
                json!({
                    "grpc_endpoint": {"type": "string", "default": "0.0.0.0:4317"},
                    "http_endpoint": {"type": "string", "default": "0.0.0.0:4318"}
                }),
            ),
            entry(
                "filelog",
                "File Log",
                Receiver,
                &[Logs],
                json!({
                    "include": {"type": "array", "items": {"type": "string"}},
                    "start_at": {"type": "string", "enum": ["beginning", "end"]}
                }),
            ),
            entry(
                "hostmetrics",
                "Host Metrics",
                Receiver,
                &[Metrics],
                json!({
                    "collection_interval": {"type": "string", "default": "10s"}
                }),
            ),
            entry(
                "batch",
                "Batch",
                Processor,
                &[Logs, Metrics, Traces],
                json!({
                    "timeout": {"type": "string", "default": "200ms"},
                    "send_batch_size": {"type": "integer", "default": 8192}
                }),
            ),
            entry(
                "memory_limiter",
                "Memory Limiter",
                Processor,
                &[Logs, Metrics, Traces],
                json!({
                    "check_interval": {"type": "string"},
                    "limit_mib": {"type": "integer"}
                }),
            ),
            entry(
                "attributes",
                "Attributes",
                Processor,
                &[Logs, Metrics, Traces],
                json!({
                    "actions": {"type": "array", "items": {"type": "object"}}
                }),
            ),
            entry(
                "debug",
                "Debug",
                Exporter,
                &[Logs, Metrics, Traces],
                json!({
                    "verbosity": {"type": "string", "enum": ["basic", "normal", "detailed"]}
                }),
            ),
            entry(
                "otlphttp",
                "OTLP/HTTP",
                Exporter,
                &[Logs, Metrics, Traces],
                json!({
                    "endpoint": {"type": "string", "format": "uri"},
                    "headers": {"type": "object"}
                }),
            ),
            entry(
                "prometheus",
                "Prometheus",
                Exporter,
                &[Metrics],
                json!({
                    "endpoint": {"type": "string", "default": "0.0.0.0:8889"}
                }),
            ),
        ])
    }

    pub fn list(&self, role: ComponentRole) -> Vec<ComponentDescriptor> {
        self.entries
            .iter()
            .filter(|e| e.descriptor.role == role)
            .map(|e| e.descriptor.clone())
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.descriptor.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn entry(
    name: &str,
    display_name: &str,
    role: ComponentRole,
    signals: &[Signal],
    properties: Value,
) -> CatalogEntry {
    let order: Vec<String> = properties
        .as_object()
        .map(|props| props.keys().cloned().collect())
        .unwrap_or_default();

    CatalogEntry {
        descriptor: ComponentDescriptor {
            name: name.to_string(),
            display_name: display_name.to_string(),
            role,
            supported_signals: signals.iter().copied().collect(),
        },
        schema: json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "title": display_name,
            "type": "object",
            "properties": properties,
        }),
        ui_schema: json!({ "ui:order": order }),
    }
}
