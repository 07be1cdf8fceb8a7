//! CLI command implementations

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context as _};
use trellis_client::{ClientConfig, HttpPipelineApi, PipelineApi, Syncer};
use trellis_core::{
    ChangeStatus, ComponentDescriptor, ComponentRole, FilePersistence, NodeId, NodeSpec, PipelineEditor,
};
use trellis_server::{BackendState, ServerConfig, TrellisServer};

pub struct Context {
    pub root: PathBuf,
    pub api_url: Option<String>,
}

impl Context {
    fn store(&self) -> Arc<FilePersistence> {
        Arc::new(FilePersistence::new(&self.root))
    }

    fn load_editor(&self) -> anyhow::Result<PipelineEditor> {
        PipelineEditor::restore(self.store())
            .with_context(|| format!("Failed to load session from {}", self.store().dir().display()))
    }

    fn config(&self) -> anyhow::Result<ClientConfig> {
        let mut config = ClientConfig::load(&self.root)?;
        if let Some(url) = &self.api_url {
            config.api_url = url.clone();
        }
        Ok(config)
    }

    fn syncer(&self) -> anyhow::Result<Syncer> {
        let config = self.config()?;
        let api = HttpPipelineApi::new(&config)?;
        tracing::debug!("Using backend {}", api.base_url());
        Ok(Syncer::new(Arc::new(api)).with_refetch(config.refetch_after_deploy))
    }
}

fn report_notices(editor: &mut PipelineEditor) {
    for notice in editor.take_notices() {
        eprintln!("{}", notice);
    }
}

pub async fn serve(host: String, port: u16) -> anyhow::Result<()> {
    tracing::info!("Starting Trellis backend on {}:{}", host, port);
    let server = TrellisServer::new(BackendState::seeded(), ServerConfig { host, port });
    server.start().await
}

pub async fn open(ctx: &Context, pipeline_id: &str, name: Option<String>) -> anyhow::Result<()> {
    let syncer = ctx.syncer()?;
    let mut editor = ctx.load_editor()?;
    if editor.has_pending_changes() && editor.meta().pipeline_id.as_deref() != Some(pipeline_id) {
        tracing::warn!(
            "Dropping {} pending changes from the previous pipeline",
            editor.list_changes().len()
        );
    }

    syncer.open(&mut editor, pipeline_id).await?;
    if name.is_some() {
        let mut meta = editor.meta().clone();
        meta.pipeline_name = name;
        editor.set_meta(meta);
    }

    println!(
        "Opened {}: {} nodes, {} edges",
        pipeline_id,
        editor.graph().node_count(),
        editor.graph().edge_count()
    );
    Ok(())
}

pub async fn components(ctx: &Context, role: Option<ComponentRole>, schema: Option<String>) -> anyhow::Result<()> {
    let syncer = ctx.syncer()?;
    let api = syncer.api();

    if let Some(name) = schema {
        let config_schema = api.component_schema(&name).await?;
        let ui_schema = api.component_ui_schema(&name).await?;
        let both = serde_json::json!({ "schema": config_schema, "uiSchema": ui_schema });
        println!("{}", serde_json::to_string_pretty(&both)?);
        return Ok(());
    }

    let roles = match role {
        Some(role) => vec![role],
        None => ComponentRole::ALL.to_vec(),
    };
    for role in roles {
        println!("{}:", role);
        for component in api.list_components(role).await? {
            let signals: Vec<String> = component.supported_signals.iter().map(|s| format!("{:?}", s).to_lowercase()).collect();
            println!("  {:<16} {:<20} [{}]", component.name, component.display_name, signals.join(", "));
        }
    }
    Ok(())
}

pub fn show(ctx: &Context) -> anyhow::Result<()> {
    let editor = ctx.load_editor()?;
    let meta = editor.meta();
    match (&meta.pipeline_id, &meta.pipeline_name) {
        (Some(id), Some(name)) => println!("Pipeline {} ({})", id, name),
        (Some(id), None) => println!("Pipeline {}", id),
        _ => println!("No pipeline opened"),
    }

    let graph = editor.graph();
    println!("Nodes ({}):", graph.node_count());
    for node in graph.nodes() {
        println!(
            "  [{}] {:<11} {:<16} {}",
            node.id, node.kind, node.component_name, node.display_name
        );
    }
    println!("Edges ({}):", graph.edge_count());
    for edge in graph.edges() {
        println!("  {}", edge.key());
    }
    if editor.has_pending_changes() {
        println!("{} pending changes", editor.list_changes().len());
    }
    Ok(())
}

pub async fn add(
    ctx: &Context,
    component: &str,
    name: Option<String>,
    config: Option<String>,
    role: Option<ComponentRole>,
) -> anyhow::Result<()> {
    let config = match config {
        Some(text) => serde_json::from_str(&text).context("--config must be valid JSON")?,
        None => serde_json::json!({}),
    };

    let spec = match role {
        Some(role) => {
            let display_name = name.unwrap_or_else(|| component.to_string());
            NodeSpec::new(role.kind(), component, display_name).with_config(config)
        }
        None => {
            let descriptor = find_component(&ctx.syncer()?, component).await?;
            NodeSpec::from_component(&descriptor, name, config)
        }
    };

    let mut editor = ctx.load_editor()?;
    let id = editor.add_node(spec);
    report_notices(&mut editor);
    println!("Added node {}", id);
    Ok(())
}

async fn find_component(syncer: &Syncer, name: &str) -> anyhow::Result<ComponentDescriptor> {
    for role in ComponentRole::ALL {
        let found = syncer
            .api()
            .list_components(role)
            .await?
            .into_iter()
            .find(|c| c.name == name);
        if let Some(descriptor) = found {
            return Ok(descriptor);
        }
    }
    bail!("Component {} is not in the catalog", name)
}

pub fn edit(ctx: &Context, id: NodeId, config: &str) -> anyhow::Result<()> {
    let config = serde_json::from_str(config).context("config must be valid JSON")?;
    let mut editor = ctx.load_editor()?;
    editor.update_node_config(id, config);
    report_notices(&mut editor);
    Ok(())
}

pub fn rename(ctx: &Context, id: NodeId, name: &str) -> anyhow::Result<()> {
    let mut editor = ctx.load_editor()?;
    editor.rename_node(id, name);
    report_notices(&mut editor);
    Ok(())
}

pub fn remove(ctx: &Context, id: NodeId) -> anyhow::Result<()> {
    let mut editor = ctx.load_editor()?;
    editor.delete_node(id);
    report_notices(&mut editor);
    Ok(())
}

pub fn connect(ctx: &Context, source: NodeId, target: NodeId) -> anyhow::Result<()> {
    let mut editor = ctx.load_editor()?;
    let result = editor.connect_nodes(source, target);
    report_notices(&mut editor);
    result?;
    Ok(())
}

pub fn disconnect(ctx: &Context, source: NodeId, target: NodeId) -> anyhow::Result<()> {
    let mut editor = ctx.load_editor()?;
    editor.delete_edge(source, target);
    report_notices(&mut editor);
    Ok(())
}

pub fn changes(ctx: &Context, json: bool) -> anyhow::Result<()> {
    let editor = ctx.load_editor()?;
    let entries = editor.list_changes();

    if json {
        println!("{}", serde_json::to_string_pretty(entries)?);
        return Ok(());
    }
    if entries.is_empty() {
        println!("No pending changes");
        return Ok(());
    }
    for entry in entries {
        let marker = match entry.status {
            ChangeStatus::Added => '+',
            ChangeStatus::Edited => '~',
            ChangeStatus::Deleted => '-',
        };
        println!(
            "{} {:<11} {:<12} {}",
            marker,
            format!("{:?}", entry.entity_type).to_lowercase(),
            entry.id.as_deref().unwrap_or("-"),
            entry.name
        );
    }
    Ok(())
}

pub async fn deploy(ctx: &Context) -> anyhow::Result<()> {
    let syncer = ctx.syncer()?;
    let mut editor = ctx.load_editor()?;
    if !editor.has_pending_changes() {
        println!("Nothing to deploy");
        return Ok(());
    }

    let report = syncer.deploy_current(&mut editor).await?;
    println!(
        "Deployed {}: {} nodes, {} edges ({} changes)",
        report.pipeline_id, report.nodes, report.edges, report.applied
    );
    Ok(())
}

pub async fn discard(ctx: &Context) -> anyhow::Result<()> {
    let editor = ctx.load_editor()?;
    let meta = editor.meta().clone();
    let dropped = editor.list_changes().len();
    drop(editor);

    ctx.store().clear_all()?;

    let Some(pipeline_id) = meta.pipeline_id.clone() else {
        println!("Session cleared ({} changes dropped)", dropped);
        return Ok(());
    };

    let mut editor = PipelineEditor::with_persistence(ctx.store());
    ctx.syncer()?.open(&mut editor, &pipeline_id).await?;
    editor.set_meta(meta);
    println!("Reloaded {} ({} changes dropped)", pipeline_id, dropped);
    Ok(())
}
