use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::language_servers::DEFAULT_LANGUAGE_SERVERS;
use crate::locate::DEFAULT_EXCLUDED_PATHS;
use crate::traverse::DEFAULT_FILE_EXTENSIONS;

/// Tunables for a sync run. Every field has a default, so an empty `sync:`
/// section (or none at all) is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOptions {
    /// Upper bound for fetching a single file body. Must be at least 1.
    #[serde(
        default = "default_fetch_timeout_secs",
        deserialize_with = "deserialize_fetch_timeout_secs"
    )]
    pub fetch_timeout_secs: u64,
    /// Substrings that disqualify a path from being an entry file.
    #[serde(default = "default_excluded_entry_paths")]
    pub excluded_entry_paths: Vec<String>,
    /// File name suffixes the traversal inspects.
    #[serde(default = "default_file_extensions")]
    pub file_extensions: Vec<String>,
    /// Language server identifiers to look for, in reporting order.
    #[serde(default = "default_language_servers")]
    pub language_servers: Vec<String>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        SyncOptions {
            fetch_timeout_secs: default_fetch_timeout_secs(),
            excluded_entry_paths: default_excluded_entry_paths(),
            file_extensions: default_file_extensions(),
            language_servers: default_language_servers(),
        }
    }
}

impl SyncOptions {
    /// Never shorter than one second, also for options built in code.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs.max(1))
    }

    pub fn trace_loaded(&self) {
        info!(
            fetch_timeout_secs = self.fetch_timeout_secs,
            excluded_entry_paths = ?self.excluded_entry_paths,
            file_extensions = ?self.file_extensions,
            language_servers_count = self.language_servers.len(),
            "Loaded SyncOptions"
        );
        debug!(?self, "SyncOptions loaded (full debug)");
    }
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

fn deserialize_fetch_timeout_secs<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = u64::deserialize(deserializer)?;
    if secs == 0 {
        return Err(serde::de::Error::custom(
            "fetch_timeout_secs must be at least 1",
        ));
    }
    Ok(secs)
}

fn default_excluded_entry_paths() -> Vec<String> {
    DEFAULT_EXCLUDED_PATHS.iter().map(|s| s.to_string()).collect()
}

fn default_file_extensions() -> Vec<String> {
    DEFAULT_FILE_EXTENSIONS.iter().map(|s| s.to_string()).collect()
}

fn default_language_servers() -> Vec<String> {
    DEFAULT_LANGUAGE_SERVERS
        .iter()
        .map(|s| s.to_string())
        .collect()
}
