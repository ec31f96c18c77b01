use anyhow::Context;
use clap::{Parser, Subcommand};
use lib::bridge::{shutdown, Bridge};
use lib::config::Config;
use lib::context::{ContextOperations, ContextStore, ExportFormat, LocalContext};
use lib::feed::CommsFeed;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "shared-context")]
#[command(about = "Shared Copilot context: context.md, chat history and the COMMS bridge", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Run the COMMS bridge: answer `@copilot` commands until Ctrl+C / SIGTERM.
    Bridge {
        /// Config file path (default: SHARED_CONTEXT_CONFIG or ~/.shared-context/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Create context.md in the workspace from the template.
    Init {
        /// Workspace directory (default: WORKSPACE or the current directory)
        #[arg(long, short, value_name = "DIR")]
        workspace: Option<PathBuf>,
    },

    /// Print context.md.
    Read {
        #[arg(long, short, value_name = "DIR")]
        workspace: Option<PathBuf>,

        /// Print the file only, without the metadata header.
        #[arg(long)]
        raw: bool,
    },

    /// Append a session entry to context.md.
    Append {
        /// Entry text (joined with spaces).
        #[arg(required = true)]
        content: Vec<String>,

        #[arg(long, short, value_name = "DIR")]
        workspace: Option<PathBuf>,

        /// Heading for the entry (default: current UTC time).
        #[arg(long, short)]
        title: Option<String>,
    },

    /// Show context.md statistics.
    Summary {
        #[arg(long, short, value_name = "DIR")]
        workspace: Option<PathBuf>,
    },

    /// List the editor's chat sessions, newest first.
    Sessions {
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Max sessions to print.
        #[arg(long, short, default_value_t = lib::bridge::DEFAULT_SESSION_LIMIT)]
        limit: usize,
    },

    /// Search chat sessions and context.md.
    Search {
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        #[arg(required = true)]
        query: Vec<String>,

        /// Max results to print.
        #[arg(long, short, default_value_t = 10)]
        limit: usize,
    },

    /// Append a chat session to context.md.
    Export {
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Session id (or a unique prefix).
        id: String,

        /// Append the whole transcript instead of a summary.
        #[arg(long)]
        full: bool,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Version) => {
            println!("shared-context {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Some(Commands::Bridge { config }) => run_bridge(config).await,
        Some(Commands::Init { workspace }) => run_init(workspace).await,
        Some(Commands::Read { workspace, raw }) => run_read(workspace, raw).await,
        Some(Commands::Append {
            content,
            workspace,
            title,
        }) => run_append(workspace, content.join(" "), title).await,
        Some(Commands::Summary { workspace }) => run_summary(workspace).await,
        Some(Commands::Sessions { config, limit }) => run_sessions(config, limit).await,
        Some(Commands::Search {
            config,
            query,
            limit,
        }) => run_search(config, query.join(" "), limit).await,
        Some(Commands::Export { config, id, full }) => run_export(config, id, full).await,
        None => {
            println!("Run with --help for usage");
            Ok(())
        }
    };

    if let Err(e) = result {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

/// Config file plus environment overrides.
fn load(config_path: Option<PathBuf>) -> anyhow::Result<Config> {
    let (mut config, path) = lib::config::load_config(config_path)?;
    config.apply_env_overrides();
    log::debug!("config: {}", path.display());
    Ok(config)
}

/// context.md store for `workspace`, else the configured workspace.
fn store(workspace: Option<PathBuf>) -> anyhow::Result<ContextStore> {
    let dir = match workspace {
        Some(dir) => dir,
        None => lib::config::resolve_workspace_dir(&load(None)?),
    };
    Ok(ContextStore::new(&dir))
}

async fn run_bridge(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let config = load(config_path)?;
    let feed = CommsFeed::new(&config.bridge.comms_url, config.bridge.timeout())
        .context("creating comms client")?;
    let context = LocalContext::from_config(&config);
    log::info!(
        "context: {} (sessions from {})",
        context.store().path().display(),
        context.storage_root().display()
    );
    let mut bridge = Bridge::new(&config.bridge, Arc::new(feed), Arc::new(context))?;

    let (trigger, mut shutdown) = shutdown::channel();
    tokio::spawn(async move {
        shutdown_signal().await;
        trigger.trigger();
    });

    bridge.start().await?;
    bridge.run(&mut shutdown).await;
    bridge.stop().await?;
    Ok(())
}

/// Completes on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                log::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received");
}

async fn run_init(workspace: Option<PathBuf>) -> anyhow::Result<()> {
    let path = store(workspace)?.init().await?;
    println!("created {}", path.display());
    Ok(())
}

async fn run_read(workspace: Option<PathBuf>, raw: bool) -> anyhow::Result<()> {
    let doc = store(workspace)?.read().await?;
    if !raw {
        let modified = doc
            .metadata
            .last_modified
            .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
            .unwrap_or_else(|| "unknown".to_string());
        println!(
            "# {} ({} bytes, {} sessions, modified {})\n",
            doc.metadata.path.display(),
            doc.metadata.size,
            doc.metadata.session_count,
            modified
        );
    }
    print!("{}", doc.content);
    Ok(())
}

async fn run_append(
    workspace: Option<PathBuf>,
    content: String,
    title: Option<String>,
) -> anyhow::Result<()> {
    let receipt = store(workspace)?
        .append(&content, title.as_deref())
        .await?;
    println!(
        "appended session entry to {} ({})",
        receipt.path.display(),
        receipt.timestamp
    );
    Ok(())
}

async fn run_summary(workspace: Option<PathBuf>) -> anyhow::Result<()> {
    let summary = store(workspace)?.summary().await?;
    println!("file:     {}", summary.path.display());
    println!("sessions: {}", summary.sessions);
    println!("lines:    {}", summary.lines);
    println!("words:    {}", summary.words);
    println!("size:     {} KB", summary.size_kb());
    Ok(())
}

async fn run_sessions(config_path: Option<PathBuf>, limit: usize) -> anyhow::Result<()> {
    let context = LocalContext::from_config(&load(config_path)?);
    let sessions = context.list_sessions().await?;
    if sessions.is_empty() {
        println!("no chat sessions found under {}", context.storage_root().display());
        return Ok(());
    }
    for s in sessions.iter().take(limit) {
        let date = s
            .date
            .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "unknown".to_string());
        println!("{}  {}  {:>3} msgs  {}", s.id, date, s.message_count, s.title);
    }
    if sessions.len() > limit {
        println!("(+{} more)", sessions.len() - limit);
    }
    Ok(())
}

async fn run_search(config_path: Option<PathBuf>, query: String, limit: usize) -> anyhow::Result<()> {
    let context = LocalContext::from_config(&load(config_path)?);
    let found = context.search_conversations(&query, limit).await?;
    if found.results.is_empty() {
        println!("no results for \"{}\"", query);
        return Ok(());
    }
    println!("{} match(es) for \"{}\"", found.total_found, query);
    for hit in &found.results {
        println!("[{}] {}", hit.relevance, hit.source);
        if !hit.preview.is_empty() {
            println!("    {}", hit.preview);
        }
    }
    Ok(())
}

async fn run_export(config_path: Option<PathBuf>, id: String, full: bool) -> anyhow::Result<()> {
    let context = LocalContext::from_config(&load(config_path)?);
    let format = if full {
        ExportFormat::Full
    } else {
        ExportFormat::Summary
    };
    let summary = context
        .export_conversation(&id, format)
        .await
        .with_context(|| format!("exporting session {}", id))?;
    println!(
        "exported \"{}\" ({} messages, {}) to {}",
        summary.title,
        summary.message_count,
        summary.format,
        context.store().path().display()
    );
    Ok(())
}
