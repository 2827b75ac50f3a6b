//! # Command Line Interface
//!
//! `vaultsearch <TERM>` runs one search against Vault, streaming path hits and
//! deep matches as they arrive. Ctrl-C cancels the search and still prints
//! what was found so far.

pub mod config;
pub mod output;

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use crate::config::{EngineConfig, ObservabilityConfig};
use crate::observability::init_tracing;
use crate::search::{
    MatchMode, SearchEngine, SearchEvent, SearchQuery, TaskSnapshot, TaskStatus,
    DEFAULT_MAX_DEPTH, DEFAULT_WORKER_COUNT,
};
use crate::vault::VaultCredentials;
use output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "vaultsearch")]
#[command(about = "Search HashiCorp Vault KV mounts by path, key and value")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Text to search for
    pub term: String,

    /// Match mode: contains, exact, regex or fuzzy
    #[arg(long, default_value = "contains")]
    pub mode: MatchMode,

    /// Compare case-sensitively
    #[arg(long)]
    pub case_sensitive: bool,

    /// Nesting depth scanned inside each secret (1-50)
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    pub max_depth: usize,

    /// Concurrent workers per phase (8-64)
    #[arg(long, default_value_t = DEFAULT_WORKER_COUNT)]
    pub workers: usize,

    /// Only search mounts whose path starts with this
    #[arg(long)]
    pub mount: Option<String>,

    /// Only search paths under this prefix, e.g. secret/prod/
    #[arg(long)]
    pub path_prefix: Option<String>,

    /// Vault address (defaults to VAULT_ADDR)
    #[arg(long)]
    pub addr: Option<String>,

    /// Vault token (defaults to VAULT_TOKEN, then ~/.vault-token)
    #[arg(long)]
    pub token: Option<String>,

    /// Path to file containing the Vault token
    #[arg(long)]
    pub token_file: Option<PathBuf>,

    /// Vault Enterprise namespace (defaults to VAULT_NAMESPACE)
    #[arg(long)]
    pub namespace: Option<String>,

    /// Print events and summary as JSON lines
    #[arg(long)]
    pub json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn query(&self) -> SearchQuery {
        let mut query = SearchQuery::new(self.term.clone())
            .with_mode(self.mode)
            .with_case_insensitive(!self.case_sensitive)
            .with_max_depth(self.max_depth)
            .with_worker_count(self.workers);
        if let Some(mount) = &self.mount {
            query = query.with_mount_filter(mount.clone());
        }
        if let Some(prefix) = &self.path_prefix {
            query = query.with_path_prefix_filter(prefix.clone());
        }
        query
    }
}

/// Run the CLI
pub async fn run_cli() -> anyhow::Result<()> {
    load_dotenv();
    let cli = Cli::parse();

    initialise_logging(cli.verbose)?;

    let credentials = config::resolve_credentials(
        cli.addr.clone(),
        cli.token.clone(),
        cli.token_file.clone(),
        cli.namespace.clone(),
    )?;
    let engine_config = EngineConfig::from_env().context("Failed to load engine configuration")?;
    let engine = SearchEngine::new(engine_config).context("Failed to create search engine")?;

    let format = OutputFormat::from_flag(cli.json);
    let snapshot = run_search(&engine, &credentials, cli.query(), format).await?;
    output::print_summary(&snapshot, format)?;

    if snapshot.status == TaskStatus::Errored {
        anyhow::bail!("Search failed: {}", snapshot.error.unwrap_or_default());
    }
    Ok(())
}

/// Stream one search to stdout until it finishes or Ctrl-C cancels it.
async fn run_search(
    engine: &SearchEngine,
    credentials: &VaultCredentials,
    query: SearchQuery,
    format: OutputFormat,
) -> anyhow::Result<TaskSnapshot> {
    let (id, mut events) = engine.start_streaming(credentials, query)?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    let finished = matches!(event, SearchEvent::Finished { .. });
                    output::print_event(&event, format)?;
                    if finished {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Output fell behind, some events were not printed");
                }
                Err(RecvError::Closed) => break,
            },
            _ = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                eprintln!("Cancelling search...");
                engine.cancel(id.as_str()).await;
            }
        }
    }

    engine
        .status(id.as_str())
        .await
        .with_context(|| format!("Search {} is no longer available", id))
}

fn load_dotenv() {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: Error loading .env file: {}", e);
        }
    }
}

fn initialise_logging(verbose: bool) -> anyhow::Result<()> {
    let mut observability = ObservabilityConfig::from_env()?;
    if verbose {
        observability.log_level = "info,vaultsearch=debug".to_string();
    } else if std::env::var("VAULTSEARCH_LOG_LEVEL").is_err() {
        observability.log_level = "warn".to_string();
    }

    init_tracing(&observability).context("Failed to initialise logging")
}
