///
/// This module implements the CLI interface for nvim-sync: command parsing, wiring of the
/// concrete collaborators, and user-visible output.
///
/// All domain logic (entry file detection, traversal, extraction, orchestration) lives in the
/// [`nvim-sync-core`] crate. This module is strictly glue.
///
/// ## How To Use
/// - For command-line users: use the installed `nvim-sync` binary with `--help`.
/// - For programmatic/integration use: call [`run`] with a constructed [`Cli`].
///
/// [`nvim-sync-core`]: ../../nvim-sync-core/
use crate::load_config::{load_config, CliConfig};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nvim_sync_core::contract::TreeFetcher;
use nvim_sync_core::github::GithubClient;
use nvim_sync_core::locate::EntryFileLocator;
use nvim_sync_core::store::{JsonFileStore, JsonPluginCatalog};
use nvim_sync_core::synchronise::SyncerFactory;
use std::path::PathBuf;

/// CLI for nvim-sync: extract facts from a Neovim configuration repository.
#[derive(Parser)]
#[clap(
    name = "nvim-sync",
    version,
    about = "Sync a Neovim configuration repository: plugins, language servers, leader key and lines of code"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Synchronise the configured repository and store the snapshot
    Sync {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
    /// List the init files found in the configured repository
    Locate {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Sync { config } => {
            let config = load_config(config)?;
            tracing::info!(command = "sync", config_id = config.config.id, "Starting synchronisation");
            sync(config).await
        }
        Commands::Locate { config } => {
            let config = load_config(config)?;
            tracing::info!(command = "locate", config_id = config.config.id, "Locating init files");
            locate(config).await
        }
    }
}

async fn sync(config: CliConfig) -> Result<()> {
    let github = GithubClient::with_base_url(&config.github.api_base_url)?;
    let store = JsonFileStore::new(&config.store.output_dir);
    let catalog = JsonPluginCatalog::new(&config.store.plugins_file);

    let factory = SyncerFactory::new(&catalog, &github, &github, &store, config.sync).await?;
    match factory.sync(&config.token, &config.config).await {
        Ok(report) => {
            tracing::info!(command = "sync", revision = %report.revision, "Synchronisation complete");
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Err(e) => {
            tracing::error!(
                command = "sync",
                error = %e,
                client_error = e.is_client_error(),
                "Synchronisation failed"
            );
            Err(anyhow::Error::new(e).context(format!(
                "Synchronisation failed for {}/{}",
                config.config.owner, config.config.repo
            )))
        }
    }
}

async fn locate(config: CliConfig) -> Result<()> {
    let github = GithubClient::with_base_url(&config.github.api_base_url)?;
    let target = &config.config;
    let tree = github
        .fetch_tree(&config.token, &target.owner, &target.repo, &target.branch)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to fetch tree: {e}"))?;

    let locator = EntryFileLocator::with_exclusions(config.sync.excluded_entry_paths.clone());
    let entries = locator
        .locate(&tree.tree)
        .with_context(|| format!("No init file in {}/{}@{}", target.owner, target.repo, target.branch))?;
    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}
