//! Integration tests for Trellis
//!
//! These tests run the client, the CLI and the development backend together.

use std::path::Path;
use std::process::Output;
use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::process::Command;
use trellis_client::{ApiError, ClientConfig, HttpPipelineApi, PipelineApi, Syncer};
use trellis_core::*;
use trellis_server::{BackendState, ServerConfig, TrellisServer};

fn wire_node(id: u64, role: ComponentRole, component: &str, name: &str) -> WireNode {
    WireNode {
        component_id: NodeId(id),
        name: name.to_string(),
        component_role: role,
        component_name: component.to_string(),
        config: json!({}),
        supported_signals: [Signal::Logs, Signal::Metrics, Signal::Traces].into_iter().collect(),
    }
}

/// receiver(1) → processor(2) → exporter(3)
fn seed_graph() -> WireGraph {
    WireGraph {
        nodes: vec![
            wire_node(1, ComponentRole::Receiver, "otlp", "OTLP in"),
            wire_node(2, ComponentRole::Processor, "batch", "Batch"),
            wire_node(3, ComponentRole::Exporter, "debug", "Debug out"),
        ],
        edges: vec![
            WireEdge { source: NodeId(1), target: NodeId(2) },
            WireEdge { source: NodeId(2), target: NodeId(3) },
        ],
    }
}

/// Start a backend on an ephemeral port and return its URL.
async fn spawn_backend() -> (String, Arc<BackendState>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let state = BackendState::seeded().with_pipeline("p1", seed_graph());
    let server = TrellisServer::new(state, ServerConfig::default());
    let state = server.state();
    tokio::spawn(server.serve(listener));

    (format!("http://{}", addr), state)
}

fn http_api(url: &str) -> HttpPipelineApi {
    let config = ClientConfig {
        api_url: url.to_string(),
        ..ClientConfig::default()
    };
    HttpPipelineApi::new(&config).unwrap()
}

async fn trellis(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_trellis"))
        .arg("--root")
        .arg(root)
        .args(args)
        .env_remove("TRELLIS_API_URL")
        .output()
        .await
        .expect("Failed to execute trellis")
}

/// Test that the CLI can be invoked
#[tokio::test]
async fn test_cli_invocation() {
    let dir = TempDir::new().unwrap();
    let output = trellis(dir.path(), &["--help"]).await;

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("Telemetry pipeline graph editor"));
    assert!(stdout.contains("deploy"));
}

#[tokio::test]
async fn test_open_edit_deploy_round_trip() {
    let (url, state) = spawn_backend().await;
    let dir = TempDir::new().unwrap();
    let store = Arc::new(FilePersistence::new(dir.path()));
    let syncer = Syncer::new(Arc::new(http_api(&url))).with_refetch(true);

    let mut editor = PipelineEditor::with_persistence(store.clone());
    syncer.open(&mut editor, "p1").await.unwrap();
    assert_eq!(editor.graph().node_count(), 3);

    let vendor = editor.add_node(
        NodeSpec::new(NodeKind::Destination, "otlphttp", "Vendor")
            .with_config(json!({"endpoint": "https://ingest.example.com"})),
    );
    editor.connect_nodes(NodeId(2), vendor).unwrap();
    editor.update_node_config(NodeId(2), json!({"timeout": "1s"}));
    assert_eq!(editor.list_changes().len(), 3);

    let report = syncer.deploy(&mut editor, "p1").await.unwrap();
    assert_eq!(report.nodes, 4);
    assert_eq!(report.edges, 3);
    assert!(report.refetched);
    assert!(editor.list_changes().is_empty());

    let stored = state.graph("p1");
    assert_eq!(stored, editor.to_wire());
    assert_eq!(stored.nodes[3].component_role, ComponentRole::Exporter);

    // the session on disk reflects the deployed state
    let restored = PipelineEditor::restore(store).unwrap();
    assert_eq!(restored.graph().node_count(), 4);
    assert!(restored.list_changes().is_empty());
    assert_eq!(restored.meta().pipeline_id.as_deref(), Some("p1"));
}

#[tokio::test]
async fn test_backend_rejects_invalid_graph() {
    let (url, state) = spawn_backend().await;
    let api = http_api(&url);

    let mut graph = seed_graph();
    graph.edges.push(WireEdge { source: NodeId(3), target: NodeId(1) });

    let err = api.replace_graph("p1", &graph).await.unwrap_err();
    assert_eq!(err.status(), Some(422));
    assert!(matches!(err, ApiError::Status { ref body, .. } if body.contains("ERR_VALIDATION_ERROR")));
    assert_eq!(state.graph("p1"), seed_graph());
}

#[tokio::test]
async fn test_catalog_over_http() {
    let (url, _state) = spawn_backend().await;
    let api = http_api(&url);

    let receivers = api.list_components(ComponentRole::Receiver).await.unwrap();
    let otlp = receivers.iter().find(|c| c.name == "otlp").unwrap();
    assert!(otlp.supported_signals.contains(&Signal::Traces));

    let spec = NodeSpec::from_component(otlp, None, json!({}));
    assert_eq!(spec.kind, NodeKind::Source);

    let schema = api.component_schema("batch").await.unwrap();
    assert_eq!(schema["type"], "object");
    let ui = api.component_ui_schema("batch").await.unwrap();
    assert!(ui["ui:order"].is_array());

    let err = api.component_schema("nope").await.unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn test_unreachable_backend_fails_deploy() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let syncer = Syncer::new(Arc::new(http_api(&url)));
    let mut editor = PipelineEditor::new();
    editor.add_node(NodeSpec::new(NodeKind::Source, "otlp", "OTLP in"));

    assert!(syncer.deploy(&mut editor, "p1").await.is_err());
    assert_eq!(editor.list_changes().len(), 1);
    assert!(!editor.deploy_in_flight());
}

#[tokio::test]
async fn test_cli_offline_session() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    assert!(trellis(root, &["add", "otlp", "--role", "receiver"]).await.status.success());
    assert!(trellis(root, &["add", "debug", "--role", "exporter", "--name", "Debug out"])
        .await
        .status
        .success());
    assert!(trellis(root, &["connect", "1", "2"]).await.status.success());

    // exporters have no outputs
    let rejected = trellis(root, &["connect", "2", "1"]).await;
    assert!(!rejected.status.success());

    let output = trellis(root, &["changes", "--json"]).await;
    assert!(output.status.success());
    let entries: Vec<ChangeEntry> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[2].id.as_deref(), Some("edge-1-2"));
    assert!(entries.iter().all(|e| e.status == ChangeStatus::Added));

    // deleting the new exporter collapses its entries
    assert!(trellis(root, &["rm", "2"]).await.status.success());
    let output = trellis(root, &["changes", "--json"]).await;
    let entries: Vec<ChangeEntry> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].id.as_deref(), Some("1"));
}

#[tokio::test]
async fn test_cli_open_and_deploy() {
    let (url, state) = spawn_backend().await;
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    let api = ["--api-url", url.as_str()];

    let open = trellis(root, &[&api[..], &["open", "p1", "--name", "Gateway"][..]].concat()).await;
    assert!(open.status.success(), "{}", String::from_utf8_lossy(&open.stderr));

    assert!(trellis(root, &["rename", "3", "Debug sink"]).await.status.success());
    assert!(trellis(root, &["disconnect", "1", "2"]).await.status.success());

    let deploy = trellis(root, &[&api[..], &["deploy"][..]].concat()).await;
    assert!(deploy.status.success(), "{}", String::from_utf8_lossy(&deploy.stderr));
    assert!(String::from_utf8_lossy(&deploy.stdout).contains("Deployed p1"));

    let stored = state.graph("p1");
    assert_eq!(stored.edges.len(), 1);
    assert_eq!(stored.nodes[2].name, "Debug sink");

    let output = trellis(root, &["changes"]).await;
    assert!(String::from_utf8_lossy(&output.stdout).contains("No pending changes"));
}
