//! task-roles command line tool
//!
//! Reads and writes role assignments on markdown checklist lines and keeps a
//! persisted index of the tasks in a vault.

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use std::sync::Arc;
use task_roles::cli::apply::ApplyArgs;
use task_roles::cli::list::ListArgs;
use task_roles::cli::status::StatusArgs;
use task_roles::cli::{Cli, Command};
use task_roles::codec::RoleCodec;
use task_roles::config::{Config, ConfigLoader, ConfigPaths};
use task_roles::format::{OutputFormat, format_tasks_json, format_tasks_markdown};
use task_roles::index::TaskIndex;
use task_roles::logging::{LogTarget, init_tracing};
use task_roles::roles::RoleTable;
use task_roles::store::{DocumentStore, FsStore};
use task_roles::watcher::{WatcherConfig, start_document_watcher};
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(&LogTarget::parse(&cli.log), cli.verbose)?;

    let mut loader = match &cli.config {
        Some(path) => ConfigLoader::load_file(path, ConfigPaths::discover())?,
        None => ConfigLoader::load()?,
    };
    for (tier, path) in loader.sources() {
        debug!(tier = %tier, path = %path.display(), "Config source");
    }

    // Override vault from CLI arguments
    if let Some(vault) = &cli.vault {
        loader.config_mut().vault.root = vault.into();
    }
    let config = loader.into_config();

    match cli.command {
        Command::Index { rebuild } => run_index(&config, rebuild).await,
        Command::Watch => run_watch(&config).await,
        Command::List(args) => run_list(&config, &args).await,
        Command::Parse { line } => run_parse(&config, &line),
        Command::Apply(args) => run_apply(&config, &args),
        Command::Status(args) => run_status(&config, &args).await,
    }
}

fn open_store(config: &Config) -> FsStore {
    FsStore::new(&config.vault.root, &config.vault.extension)
}

/// Build an index over the configured vault and bring it to ready.
async fn open_index(config: &Config, store: FsStore) -> Result<TaskIndex> {
    if !config.vault.root.is_dir() {
        return Err(anyhow!(
            "vault root is not a directory: {}",
            config.vault.root.display()
        ));
    }
    let index = TaskIndex::from_config(Arc::new(store), config);
    let source = index.initialize().await;
    debug!(source = ?source, records = index.len(), "Index ready");
    Ok(index)
}

async fn run_index(config: &Config, rebuild: bool) -> Result<()> {
    let index = open_index(config, open_store(config)).await?;
    if rebuild && index.stats().refreshes == 0 {
        index.refresh().await;
    }
    index.shutdown().await;

    let stats = index.stats();
    println!(
        "{} tasks in {} documents (snapshot: {})",
        stats.records,
        stats.documents,
        config.snapshot_file().display()
    );
    Ok(())
}

async fn run_watch(config: &Config) -> Result<()> {
    let store = open_store(config);
    let index = open_index(config, store.clone()).await?;

    let known = store.enumerate().await.unwrap_or_default();
    let mut watcher = start_document_watcher(store, known, WatcherConfig::from(&config.watcher))
        .context("Failed to start document watcher")?;
    info!(records = index.len(), "Watching for document changes; press Ctrl-C to stop");

    loop {
        tokio::select! {
            event = watcher.next_event() => match event {
                Some(event) => index.handle_event(&event).await,
                None => {
                    warn!("Document watcher stopped");
                    break;
                }
            },
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!("Failed to listen for Ctrl-C: {}", e);
                }
                break;
            }
        }
    }

    if index.shutdown().await {
        info!("Flushed pending index snapshot");
    }
    Ok(())
}

async fn run_list(config: &Config, args: &ListArgs) -> Result<()> {
    let format = args
        .output_format()
        .ok_or_else(|| anyhow!("unknown format '{}'", args.format))?;
    let index = open_index(config, open_store(config)).await?;
    let roles = index.roles();

    let mut tasks = match &args.role {
        Some(key) => {
            let role = roles
                .resolve(key)
                .ok_or_else(|| anyhow!("unknown role '{}'", key))?;
            index.tasks_for_role(&role.id)
        }
        None => index.tasks(),
    };
    tasks.retain(|t| args.keep(t));
    index.shutdown().await;

    match format {
        OutputFormat::Json => println!("{}", format_tasks_json(&tasks)?),
        OutputFormat::Markdown => print!("{}", format_tasks_markdown(&tasks, &roles)),
    }
    Ok(())
}

fn run_parse(config: &Config, line: &str) -> Result<()> {
    let roles = RoleTable::from_config(&config.roles);
    let codec = RoleCodec::new(&roles, &config.assignees);
    let parsed: Vec<serde_json::Value> = codec
        .parse(line)
        .into_iter()
        .map(|a| {
            serde_json::json!({
                "role": a.role.id,
                "icon": a.role.icon,
                "assignees": a.assignees,
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&parsed)?);
    Ok(())
}

fn run_apply(config: &Config, args: &ApplyArgs) -> Result<()> {
    let roles = RoleTable::from_config(&config.roles);
    let assignments = args.assignments(&roles)?;
    let codec = RoleCodec::new(&roles, &config.assignees);
    println!("{}", codec.apply(&args.line, &assignments));
    Ok(())
}

async fn run_status(config: &Config, args: &StatusArgs) -> Result<()> {
    let status = args.task_status()?;
    let index = open_index(config, open_store(config)).await?;
    let record = index.update_status(&args.id, status).await;
    // the optimistic record, completion date included, is what gets flushed
    index.shutdown().await;

    let record = record.with_context(|| format!("Failed to update {}", args.id))?;
    println!("{} -> {}", record.id, record.status);
    Ok(())
}
