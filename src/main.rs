//! Trellis CLI entry point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trellis_core::{ComponentRole, NodeId};

mod commands;

#[derive(Parser)]
#[command(name = "trellis")]
#[command(about = "Telemetry pipeline graph editor", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Project root holding the session (defaults to current directory)
    #[arg(short, long, default_value = ".")]
    root: PathBuf,

    /// Backend URL, overriding config and environment
    #[arg(long)]
    api_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the development backend
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "7890")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },
    /// Load a pipeline from the backend as the session baseline
    Open {
        pipeline_id: String,

        /// Display name for the pipeline
        #[arg(long)]
        name: Option<String>,
    },
    /// Browse the component catalog
    Components {
        /// Only list this role (receiver, processor, exporter)
        role: Option<ComponentRole>,

        /// Print the config and UI schema of one component
        #[arg(long)]
        schema: Option<String>,
    },
    /// Print the current graph
    Show,
    /// Add a node for a catalog component
    Add {
        component: String,

        /// Display name (defaults to the catalog name)
        #[arg(long)]
        name: Option<String>,

        /// Initial config as JSON
        #[arg(long)]
        config: Option<String>,

        /// Role to use without consulting the catalog
        #[arg(long)]
        role: Option<ComponentRole>,
    },
    /// Replace a node's config
    Edit {
        id: NodeId,
        /// New config as JSON
        config: String,
    },
    /// Rename a node
    Rename { id: NodeId, name: String },
    /// Delete a node and its edges
    Rm { id: NodeId },
    /// Connect two nodes
    Connect { source: NodeId, target: NodeId },
    /// Remove the edge between two nodes
    Disconnect { source: NodeId, target: NodeId },
    /// List pending changes
    Changes {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Deploy the graph to the backend
    Deploy,
    /// Drop local edits and reload the baseline
    Discard,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!("trellis={}", log_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("Trellis v{}", env!("CARGO_PKG_VERSION"));
    tracing::debug!("Project root: {}", cli.root.display());

    let ctx = commands::Context {
        root: cli.root,
        api_url: cli.api_url,
    };

    match cli.command {
        Commands::Serve { port, host } => commands::serve(host, port).await,
        Commands::Open { pipeline_id, name } => commands::open(&ctx, &pipeline_id, name).await,
        Commands::Components { role, schema } => commands::components(&ctx, role, schema).await,
        Commands::Show => commands::show(&ctx),
        Commands::Add {
            component,
            name,
            config,
            role,
        } => commands::add(&ctx, &component, name, config, role).await,
        Commands::Edit { id, config } => commands::edit(&ctx, id, &config),
        Commands::Rename { id, name } => commands::rename(&ctx, id, &name),
        Commands::Rm { id } => commands::remove(&ctx, id),
        Commands::Connect { source, target } => commands::connect(&ctx, source, target),
        Commands::Disconnect { source, target } => commands::disconnect(&ctx, source, target),
        Commands::Changes { json } => commands::changes(&ctx, json),
        Commands::Deploy => commands::deploy(&ctx).await,
        Commands::Discard => commands::discard(&ctx).await,
        Commands::Version => {
            println!("Trellis v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
