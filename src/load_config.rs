/// `load_config` module: loads a static YAML config and injects the GitHub token from the environment.
///
/// This module is the only place where untrusted YAML is parsed and mapped to the strongly-typed
/// structs of `nvim-sync-core`.
///
/// # Responsibilities
/// - Parse the user-supplied YAML file into [`CliConfig`]
/// - Apply defaults for every optional section (`github`, `sync`)
/// - Inject secrets from the environment (`GITHUB_TOKEN`); secrets never live in the YAML file
///
/// # Errors
/// All errors use `anyhow::Error` and are surfaced at the CLI boundary.
use anyhow::Result;
use nvim_sync_core::config::SyncOptions;
use nvim_sync_core::contract::NeovimConfig;
use nvim_sync_core::github::DEFAULT_API_BASE_URL;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

#[derive(Debug)]
pub struct CliConfig {
    pub config: NeovimConfig,
    pub github: GithubSection,
    pub sync: SyncOptions,
    pub store: StoreSection,
    /// From `GITHUB_TOKEN`; empty means unauthenticated requests.
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct GithubSection {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
}

impl Default for GithubSection {
    fn default() -> Self {
        GithubSection {
            api_base_url: default_api_base_url(),
        }
    }
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

#[derive(Debug, Deserialize)]
pub struct StoreSection {
    /// Directory receiving one `<config id>.json` snapshot per configuration.
    pub output_dir: PathBuf,
    /// JSON array of tracked plugins.
    pub plugins_file: PathBuf,
}

/// Loads a static YAML config file (no secrets) and injects the token from the environment.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    #[derive(Debug, Deserialize)]
    struct RawConfig {
        config: NeovimConfig,
        #[serde(default)]
        github: GithubSection,
        #[serde(default)]
        sync: SyncOptions,
        store: StoreSection,
    }

    let raw: RawConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };
    raw.sync.trace_loaded();

    let token = std::env::var(TOKEN_ENV).unwrap_or_default();
    if token.is_empty() {
        info!("{TOKEN_ENV} not set, GitHub requests will be unauthenticated");
    }

    Ok(CliConfig {
        config: raw.config,
        github: raw.github,
        sync: raw.sync,
        store: raw.store,
        token,
    })
}
