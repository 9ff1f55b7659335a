use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use mindmap_app::{GraphSession, MindmapSettings, spawn_surface};
use mindmap_core::{
    Document, DocumentId, EdgeId, IdGenerator, NodeId, NodePatch, NodeShape, PaletteColor, Vec2,
};
use mindmap_events::{AlertLevel, LinkState, SessionEvent};
use mindmap_storage::{DocumentStore, SqliteDocumentStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about = "Edit UPSC study mind maps from the terminal")]
struct Args {
    /// Path to the SQLite database
    #[arg(long)]
    db: Option<PathBuf>,

    /// Path to settings.json
    #[arg(long)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List mind maps, most recently edited first
    List,
    /// Create an empty mind map
    New {
        title: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a mind map and everything in it
    Remove { document: String },
    /// Rename a mind map
    Rename {
        document: String,
        title: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Print nodes and connections
    Show {
        document: String,
        /// Only show nodes within `--depth` hops of this node
        #[arg(long)]
        local: Option<String>,
        #[arg(long)]
        depth: Option<u32>,
        /// Mark nodes whose label contains this text
        #[arg(long)]
        search: Option<String>,
        /// Print the whole document as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a node, optionally connected to an existing one
    Add {
        document: String,
        label: String,
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        x: f64,
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        y: f64,
        #[arg(long)]
        connect_to: Option<String>,
    },
    /// Change a node's label or style
    Edit {
        document: String,
        node: String,
        #[arg(long)]
        label: Option<String>,
        #[arg(long)]
        color: Option<PaletteColor>,
        #[arg(long)]
        shape: Option<NodeShape>,
    },
    Move {
        document: String,
        node: String,
        #[arg(allow_hyphen_values = true)]
        x: f64,
        #[arg(allow_hyphen_values = true)]
        y: f64,
    },
    /// Delete a node and its connections
    Delete { document: String, node: String },
    Connect {
        document: String,
        from: String,
        to: String,
    },
    Disconnect { document: String, edge: String },
}

impl Command {
    fn document(&self) -> Option<&str> {
        match self {
            Command::List | Command::New { .. } | Command::Remove { .. } => None,
            Command::Rename { document, .. }
            | Command::Show { document, .. }
            | Command::Add { document, .. }
            | Command::Edit { document, .. }
            | Command::Move { document, .. }
            | Command::Delete { document, .. }
            | Command::Connect { document, .. }
            | Command::Disconnect { document, .. } => Some(document),
        }
    }
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("mindmap").join("mindmaps.db"))
        .unwrap_or_else(|| PathBuf::from("mindmaps.db"))
}

fn load_settings(path: Option<&Path>) -> Result<MindmapSettings> {
    let Some(path) = path.map(Path::to_path_buf).or_else(MindmapSettings::default_path) else {
        return Ok(MindmapSettings::default());
    };
    Ok(MindmapSettings::load_from(&path)?)
}

fn open_store(path: Option<PathBuf>) -> Result<SqliteDocumentStore> {
    let path = path.unwrap_or_else(default_db_path);
    tracing::debug!(path = %path.display(), "Opening database");
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    SqliteDocumentStore::open(&path)
        .with_context(|| format!("Failed to open database {}", path.display()))
}

/// Pumps the surface link until the handshake completes.
async fn wait_until_ready(session: &mut GraphSession<SqliteDocumentStore>) -> Result<()> {
    loop {
        session.pump_surface(Instant::now());
        match session.link().state() {
            LinkState::Ready => return Ok(()),
            LinkState::Failed { reason } => bail!("Rendering surface failed: {reason}"),
            LinkState::Loading { .. } => tokio::time::sleep(Duration::from_millis(5)).await,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();
    let settings = load_settings(args.settings.as_deref())?;
    let store = Arc::new(open_store(args.db)?);

    let Some(document) = args.command.document().map(DocumentId::new) else {
        return run_library_command(store.as_ref(), args.command).await;
    };

    let (link, _surface) = spawn_surface(&settings)?;
    let mut session = GraphSession::new(
        Arc::clone(&store),
        link,
        settings.session.clone(),
        Handle::current(),
    );
    let events = session.events();
    session.load_document(&document).await?;
    wait_until_ready(&mut session).await?;

    run_session_command(&mut session, args.command)?;
    session.pump_surface(Instant::now());
    session.flush().await;

    let mut failed = false;
    for event in events.try_iter() {
        if let SessionEvent::Alert { level, message } = event {
            failed |= level == AlertLevel::Error;
            eprintln!("{message}");
        }
    }
    if failed {
        bail!("Some changes were not saved");
    }
    Ok(())
}

async fn run_library_command(store: &SqliteDocumentStore, command: Command) -> Result<()> {
    match command {
        Command::List => {
            for summary in store.list_documents().await? {
                println!(
                    "{}  {}  ({} nodes, edited {})",
                    summary.id,
                    summary.title,
                    summary.node_count,
                    summary.updated_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        Command::New { title, description } => {
            let id = DocumentId::new(IdGenerator::Secure.generate());
            let mut document = Document::new(id.clone(), title.trim());
            if let Some(description) = description {
                document.meta.description = description;
            }
            store.create_document(&document).await?;
            println!("{id}");
        }
        Command::Remove { document } => {
            store.delete_document(&DocumentId::new(document)).await?;
        }
        other => bail!("{other:?} needs an open document"),
    }
    Ok(())
}

fn run_session_command(
    session: &mut GraphSession<SqliteDocumentStore>,
    command: Command,
) -> Result<()> {
    match command {
        Command::Rename {
            title, description, ..
        } => session.rename_document(&title, description.as_deref())?,
        Command::Show {
            local,
            depth,
            search,
            json,
            ..
        } => {
            if let Some(focus) = local {
                session.show_local(NodeId::new(focus), depth)?;
            }
            let matches = search.map(|q| session.search(&q)).unwrap_or_default();
            if json {
                let document = session.document().context("No document loaded")?;
                println!("{}", serde_json::to_string_pretty(document)?);
                return Ok(());
            }
            print_graph(session, &matches);
        }
        Command::Add {
            label,
            x,
            y,
            connect_to,
            ..
        } => {
            let id = session.create_node(Vec2::new(x, y), &label)?;
            if let Some(parent) = connect_to {
                session.create_connection(&NodeId::new(parent), &id)?;
            }
            println!("{id}");
        }
        Command::Edit {
            node,
            label,
            color,
            shape,
            ..
        } => {
            let patch = NodePatch {
                label,
                color,
                shape,
                ..Default::default()
            };
            session.update_node(&NodeId::new(node), patch)?;
        }
        Command::Move { node, x, y, .. } => session.move_node(&NodeId::new(node), Vec2::new(x, y))?,
        Command::Delete { node, .. } => session.delete_node(&NodeId::new(node))?,
        Command::Connect { from, to, .. } => {
            match session.create_connection(&NodeId::new(from), &NodeId::new(to))? {
                Some(edge) => println!("{edge}"),
                None => eprintln!("Those nodes are already connected"),
            }
        }
        Command::Disconnect { edge, .. } => session.delete_connection(&EdgeId::new(edge))?,
        other @ (Command::List | Command::New { .. } | Command::Remove { .. }) => {
            bail!("{other:?} does not operate on an open document")
        }
    }
    Ok(())
}

fn print_graph(session: &GraphSession<SqliteDocumentStore>, matches: &[NodeId]) {
    if let Some(document) = session.document() {
        println!("{}", document.meta.title);
        if !document.meta.description.is_empty() {
            println!("{}", document.meta.description);
        }
    }
    for node in session.visible_nodes() {
        let marker = if matches.contains(&node.id) { '*' } else { ' ' };
        println!(
            "{marker} {}  {}  ({:.0}, {:.0})  {}",
            node.id,
            node.label,
            node.position.x,
            node.position.y,
            node.color.token()
        );
    }
    let labels = |id: &NodeId| {
        session
            .document()
            .and_then(|d| d.node(id))
            .map(|n| n.label.clone())
            .unwrap_or_else(|| id.to_string())
    };
    for edge in session.visible_edges() {
        println!(
            "  {}  {} -- {}",
            edge.id,
            labels(&edge.source),
            labels(&edge.target)
        );
    }
}
