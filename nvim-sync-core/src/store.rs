//! Local JSON implementations of [`ConfigStore`] and [`PluginCatalog`].
//!
//! `JsonFileStore` keeps one finalised `<config_id>.json` record per
//! configuration in a directory. Saves never touch that record directly: they
//! land in a pending record for their revision, `<config_id>.<revision>.pending.json`,
//! which is promoted over the finalised record once all four parts of the
//! snapshot (leader key, line count, language servers, plugin associations)
//! have been saved. Until then readers keep seeing the last finalised
//! snapshot, so a sync that fails halfway leaves nothing visible. A pending
//! record left behind by a failed sync is reused by the next sync of the same
//! revision.
//!
//! Every file is written through a temporary file and renamed into place,
//! under a store-wide lock.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::contract::{
    CollaboratorError, ConfigStore, ConfigWithPlugins, PluginAssociation, PluginCatalog,
    TrackedPlugin,
};

/// One part of a snapshot, written by one `ConfigStore` save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum SnapshotPart {
    LeaderKey,
    LineCount,
    LanguageServers,
    PluginAssociations,
}

const ALL_PARTS: [SnapshotPart; 4] = [
    SnapshotPart::LeaderKey,
    SnapshotPart::LineCount,
    SnapshotPart::LanguageServers,
    SnapshotPart::PluginAssociations,
];

#[derive(Debug, Serialize, Deserialize)]
struct PendingRecord {
    record: ConfigWithPlugins,
    saved: BTreeSet<SnapshotPart>,
}

impl PendingRecord {
    fn is_complete(&self) -> bool {
        ALL_PARTS.iter().all(|part| self.saved.contains(part))
    }
}

pub struct JsonFileStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        JsonFileStore {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Location of the finalised record read by `get_config_with_plugins`.
    pub fn record_path(&self, config_id: i64) -> PathBuf {
        self.dir.join(format!("{config_id}.json"))
    }

    /// Location of the not yet finalised record for `revision`.
    pub fn pending_path(&self, config_id: i64, revision: &str) -> PathBuf {
        let revision: String = revision
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{config_id}.{revision}.pending.json"))
    }

    async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, CollaboratorError> {
        match tokio::fs::read_to_string(path).await {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), CollaboratorError> {
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(value)?).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    async fn update<A>(
        &self,
        config_id: i64,
        revision: &str,
        part: SnapshotPart,
        apply: A,
    ) -> Result<(), CollaboratorError>
    where
        A: FnOnce(&mut ConfigWithPlugins) + Send,
    {
        let _guard = self.write_lock.lock().await;
        tokio::fs::create_dir_all(&self.dir).await?;

        let pending_path = self.pending_path(config_id, revision);
        let mut pending = match Self::read_json::<PendingRecord>(&pending_path).await? {
            Some(pending) => pending,
            None => {
                debug!(config_id, revision, "Starting pending record for revision");
                let mut record = ConfigWithPlugins::empty(config_id);
                record.revision = Some(revision.to_string());
                PendingRecord {
                    record,
                    saved: BTreeSet::new(),
                }
            }
        };
        apply(&mut pending.record);
        pending.saved.insert(part);

        if !pending.is_complete() {
            return Self::write_json(&pending_path, &pending).await;
        }

        Self::write_json(&pending_path, &pending.record).await?;
        tokio::fs::rename(&pending_path, self.record_path(config_id)).await?;
        info!(config_id, revision, "Stored sync snapshot");
        Ok(())
    }
}

#[async_trait]
impl ConfigStore for JsonFileStore {
    async fn save_leader_key(
        &self,
        config_id: i64,
        revision: &str,
        leader_key: &str,
    ) -> Result<(), CollaboratorError> {
        let leader_key = leader_key.to_string();
        self.update(config_id, revision, SnapshotPart::LeaderKey, move |r| {
            r.leader_key = leader_key
        })
        .await
    }

    async fn save_line_count(
        &self,
        config_id: i64,
        revision: &str,
        line_count: u64,
    ) -> Result<(), CollaboratorError> {
        self.update(config_id, revision, SnapshotPart::LineCount, move |r| {
            r.line_count = line_count
        })
        .await
    }

    async fn save_language_servers(
        &self,
        config_id: i64,
        revision: &str,
        language_servers: &[String],
    ) -> Result<(), CollaboratorError> {
        let language_servers = language_servers.to_vec();
        self.update(config_id, revision, SnapshotPart::LanguageServers, move |r| {
            r.language_servers = language_servers
        })
        .await
    }

    async fn save_plugin_associations(
        &self,
        config_id: i64,
        revision: &str,
        associations: &[PluginAssociation],
    ) -> Result<(), CollaboratorError> {
        let associations = associations.to_vec();
        self.update(config_id, revision, SnapshotPart::PluginAssociations, move |r| {
            r.plugins = associations
        })
        .await
    }

    async fn get_config_with_plugins(
        &self,
        config_id: i64,
    ) -> Result<ConfigWithPlugins, CollaboratorError> {
        Self::read_json::<ConfigWithPlugins>(&self.record_path(config_id))
            .await?
            .ok_or_else(|| format!("no stored configuration with id {config_id}").into())
    }
}

/// Tracked plugin catalog read from a JSON array of
/// `{"id": .., "owner": .., "name": ..}` objects.
pub struct JsonPluginCatalog {
    path: PathBuf,
}

impl JsonPluginCatalog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        JsonPluginCatalog {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl PluginCatalog for JsonPluginCatalog {
    async fn list_tracked_plugins(&self) -> Result<Vec<TrackedPlugin>, CollaboratorError> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            format!("failed to read plugin catalog {}: {e}", self.path.display())
        })?;
        let plugins: Vec<TrackedPlugin> = serde_json::from_str(&raw)?;
        debug!(path = %self.path.display(), count = plugins.len(), "Read plugin catalog");
        Ok(plugins)
    }
}
