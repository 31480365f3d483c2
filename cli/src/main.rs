use anyhow::Result;
use anyhow::bail;
use clap::Parser;
use clap::Subcommand;
use graphex_backend_client::BackendOptions;
use graphex_backend_client::HttpBackendClient;
use graphex_core::Config;
use graphex_core::Explorer;
use graphex_core::ResultDocumentStore;
use graphex_core::ResultViewer;
use graphex_core::StatusSink;
use graphex_protocol::CatalogElement;
use graphex_protocol::HistoryMessage;
use graphex_protocol::result_uri;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "graphex",
    version,
    about = "Browse a graph store's catalog, run traversal queries, keep a durable query history"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List databases and their collections, marking the active target.
    Tree,
    /// Make a collection the active query target.
    Activate {
        /// Collection path, e.g. /dbs/db1/colls/coll1
        path: String,
    },
    /// Execute query text against the active (or an explicit) collection.
    Execute {
        /// Run against this collection path instead of the active one.
        #[arg(long)]
        target: Option<String>,
        query: String,
    },
    /// Inspect or clear the persisted query history.
    History {
        #[command(subcommand)]
        command: HistoryCommand,
    },
}

#[derive(Subcommand)]
enum HistoryCommand {
    /// Show the stored history, most recent first.
    List,
    /// Print one stored result document.
    Show { file_name: String },
    /// Delete every stored history record.
    Clear,
}

/// Operator notices go straight to stderr.
struct PrintStatusSink;

impl StatusSink for PrintStatusSink {
    fn info(&self, message: &str) {
        eprintln!("{message}");
    }

    fn warn(&self, message: &str) {
        eprintln!("warning: {message}");
    }

    fn error(&self, message: &str) {
        eprintln!("error: {message}");
    }
}

/// Text rendition of the result viewer: resolves the stored document via
/// its `gremlin-res` uri and prints it.
struct PrintViewer {
    documents: ResultDocumentStore,
}

impl ResultViewer for PrintViewer {
    fn open(&self, file_name: &str) -> Result<()> {
        let content = self.documents.content(&result_uri(file_name))?;
        println!("--- {file_name}");
        println!("{content}");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let backend = Arc::new(HttpBackendClient::new(BackendOptions {
        endpoint: config.endpoint.clone(),
        primary_key: config.primary_key.clone(),
        traversal_source: config.traversal_source.clone(),
    })?);
    let viewer = Arc::new(PrintViewer {
        documents: ResultDocumentStore::new(config.results_dir()),
    });
    let (explorer, mut surface) =
        Explorer::new(backend, &config, viewer, Arc::new(PrintStatusSink));

    match cli.command {
        Command::Tree => print_tree(&explorer).await,
        Command::Activate { path } => activate(&explorer, &path).await?,
        Command::Execute { target, query } => {
            explorer.execute(target.as_deref(), &query).await;
        }
        Command::History { command } => match command {
            HistoryCommand::List => print_history(&explorer, &mut surface),
            HistoryCommand::Show { file_name } => {
                println!("{}", explorer.documents().content(&result_uri(&file_name))?);
            }
            HistoryCommand::Clear => clear_history(&explorer, &mut surface),
        },
    }

    explorer.dispose().await;
    Ok(())
}

async fn print_tree(explorer: &Explorer) {
    let active = explorer.catalog().active().await;
    for database in explorer.catalog().list_roots().await {
        println!("{}", database.path);
        for collection in explorer.catalog().list_children(&database).await {
            let marker = if collection.path == active { "*" } else { " " };
            println!("  {marker} {}", collection.name);
        }
    }
}

async fn activate(explorer: &Explorer, path: &str) -> Result<()> {
    let Some(database_name) = CatalogElement::database_name_of(path) else {
        bail!("not a collection path: {path}");
    };
    // Populate the owning subtree so the element and its parent are known
    // to the catalog before the switch.
    let databases = explorer.catalog().list_roots().await;
    let Some(database) = databases
        .into_iter()
        .find(|element| element.name == database_name)
    else {
        bail!("unknown database in {path}");
    };
    let collections = explorer.catalog().list_children(&database).await;
    let Some(collection) = collections
        .into_iter()
        .find(|element| element.path == path)
    else {
        bail!("unknown collection {path}");
    };
    explorer.activate_collection(&collection).await
}

/// The surface contract: new entries are inserted at the front, so feeding
/// the reloaded records oldest-first shows the most recent on top.
fn print_history(explorer: &Explorer, surface: &mut UnboundedReceiver<HistoryMessage>) {
    explorer.reload_history();
    let mut display = Vec::new();
    while let Ok(message) = surface.try_recv() {
        match message {
            HistoryMessage::AddHistory { file_name, result } => {
                display.insert(
                    0,
                    format!("{file_name}  {}  {}  {}", result.when, result.target, result.query),
                );
            }
            HistoryMessage::RemoveHistory { file_name } => {
                display.retain(|line: &String| !line.starts_with(&file_name));
            }
            HistoryMessage::RerunQuery { .. } | HistoryMessage::OpenResult { .. } => {}
        }
    }
    for line in display {
        println!("{line}");
    }
}

fn clear_history(explorer: &Explorer, surface: &mut UnboundedReceiver<HistoryMessage>) {
    explorer.clear_history();
    while let Ok(message) = surface.try_recv() {
        if let HistoryMessage::RemoveHistory { file_name } = message {
            println!("removed {file_name}");
        }
    }
}
