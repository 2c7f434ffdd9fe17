//! Command-line front end. Indexes text into a vault, searches it, and
//! manages vault lifecycle. Logging layers
//! `tracing_subscriber::registry().with(fmt::layer()).with(EnvFilter)`,
//! with a second, non-blocking rolling-file layer added so a long-running
//! `search`/`add` session leaves a trail on disk.

use std::io::Read as _;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vaultrag::Engine;
use vaultrag_common::{config::get_config, error::AppError};

#[derive(Parser)]
#[command(name = "vaultrag")]
#[command(about = "Local hybrid lexical/vector retrieval over text corpora", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index a file (or stdin, with `-`) under a source name.
    Add {
        /// Name identifying this document within the vault.
        source: String,
        /// Path to read content from; omit to read stdin.
        path: Option<PathBuf>,
        #[arg(short, long)]
        vault: Option<String>,
        /// Replace an already-indexed source instead of skipping it.
        #[arg(short, long)]
        update_existing: bool,
        /// Destroy all vaults before indexing this document.
        #[arg(long)]
        reset_db: bool,
    },

    /// Run a hybrid search and print results as JSON.
    Search {
        query: String,
        #[arg(short, long)]
        vault: Option<String>,
        #[arg(short, long, default_value_t = 10)]
        top_n: usize,
    },

    /// Remove a previously indexed source from a vault.
    Remove {
        source: String,
        #[arg(short, long)]
        vault: Option<String>,
    },

    /// Destroy all vaults.
    Reset,
}

fn init_logging() {
    let _ = std::fs::create_dir_all("./logs");
    let file_appender = tracing_appender::rolling::daily("./logs", "vaultrag.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    // Leaking the guard is deliberate: it must outlive the process for the
    // background writer thread to flush on exit, and the CLI never tears
    // itself down mid-run.
    std::mem::forget(guard);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::from(0),
        Err(AppError::UsageError(msg)) => {
            error!("{msg}");
            ExitCode::from(2)
        }
        Err(e) => {
            error!("{e}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let config = get_config()?;
    let engine = Engine::new(config)?;

    match cli.command {
        Commands::Add {
            source,
            path,
            vault,
            update_existing,
            reset_db,
        } => {
            let text = read_input(path)?;
            let chunks = engine
                .build(vault.as_deref(), vec![(source.clone(), text)], update_existing, reset_db)
                .await?;
            info!(source = %source, chunks = chunks.len(), "indexed source");
            println!("indexed {} chunk(s) from '{}'", chunks.len(), source);
            Ok(())
        }
        Commands::Search { query, vault, top_n } => {
            let hits = engine.search(vault.as_deref(), &query, top_n).await?;
            let json = serde_json::to_string_pretty(&hits)
                .map_err(|e| AppError::UsageError(format!("failed to serialize results: {e}")))?;
            println!("{json}");
            Ok(())
        }
        Commands::Remove { source, vault } => {
            let removed = engine.remove_source(vault.as_deref(), &source).await?;
            println!("removed {removed} chunk(s) for source '{source}'");
            Ok(())
        }
        Commands::Reset => {
            engine.reset().await?;
            println!("all vaults reset");
            Ok(())
        }
    }
}

fn read_input(path: Option<PathBuf>) -> Result<String, AppError> {
    match path {
        Some(path) => std::fs::read_to_string(&path).map_err(AppError::from),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(AppError::from)?;
            Ok(buf)
        }
    }
}
