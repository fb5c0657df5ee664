//! High-level pipeline: orchestrates locate → traverse → extract → persist for
//! one configuration repository.
//!
//! # Major Types
//! - [`SyncerFactory`]: holds the plugin catalog and collaborators, prepares a
//!   [`ConfigSyncer`] per configuration
//! - [`ConfigSyncer`]: runs one sync for one tree revision
//! - [`SyncAccumulator`]: the per-sync working state
//!
//! # Responsibilities
//! - Traverse the configuration once, feeding every file to the extractors in
//!   traversal order
//! - Reconcile the accumulated facts into the store, tagged with the tree
//!   revision, then read the record back
//! - Fail fast: any collaborator failure aborts the sync and leaves the
//!   previously stored snapshot authoritative
//!
//! # Concurrency
//! A sync is a single task. The accumulator is owned by that task and only
//! mutated between content fetches, so nothing is locked. The final writes
//! run concurrently (leader key, line count, and language servers followed by
//! plugin associations) and all of them settle before the sync returns.

use std::collections::BTreeMap;
use std::fmt;

use futures::StreamExt;
use serde::Serialize;
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

use crate::config::SyncOptions;
use crate::contract::{
    CollaboratorError, ConfigStore, ConfigWithPlugins, ContentFetcher, NeovimConfig,
    PluginAssociation, PluginCatalog, RepoTree, TrackedPlugin, TreeFetcher,
};
use crate::language_servers::LanguageServerExtractor;
use crate::leader_key::{find_leader_key, UNKNOWN_LEADER};
use crate::locate::{resolve_root, EntryFileLocator};
use crate::plugin_refs::PluginReferenceExtractor;
use crate::traverse::{ConfigFile, ContentTraverser};
use crate::SyncError;

/// Lifecycle of a single sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Traversing,
    Aggregating,
    Persisting,
    Done,
    Failed,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncState::Idle => "idle",
            SyncState::Traversing => "traversing",
            SyncState::Aggregating => "aggregating",
            SyncState::Persisting => "persisting",
            SyncState::Done => "done",
            SyncState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Extractors shared by every sync created from one catalog.
#[derive(Debug, Clone)]
pub struct Extractors {
    pub plugins: PluginReferenceExtractor,
    pub language_servers: LanguageServerExtractor,
}

impl Extractors {
    pub fn new(tracked: &[TrackedPlugin], options: &SyncOptions) -> Self {
        Extractors {
            plugins: PluginReferenceExtractor::new(tracked),
            language_servers: LanguageServerExtractor::new(options.language_servers.clone()),
        }
    }
}

/// Facts collected while traversing. Created per sync, consumed once.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncAccumulator {
    pub found_plugins: BTreeMap<i64, Vec<String>>,
    pub leader_key: Option<String>,
    pub language_servers: Vec<String>,
    pub total_lines: u64,
    pub files: usize,
}

impl SyncAccumulator {
    /// Feeds one file through the extractors.
    pub fn ingest(&mut self, extractors: &Extractors, file: &ConfigFile) {
        for (id, references) in extractors.plugins.extract(&file.path, &file.content) {
            self.found_plugins.entry(id).or_default().extend(references);
        }

        if self.leader_key.is_none() {
            if let Some(key) = find_leader_key(&file.content) {
                debug!(path = %file.path, leader_key = key, "[SYNC] Found leader key");
                self.leader_key = Some(key.to_string());
            }
        }

        self.language_servers.extend(
            extractors
                .language_servers
                .extract(&file.content)
                .into_iter()
                .map(str::to_string),
        );

        self.total_lines += file.content.split('\n').count() as u64;
        self.files += 1;
    }

    pub fn leader_key(&self) -> &str {
        self.leader_key.as_deref().unwrap_or(UNKNOWN_LEADER)
    }

    /// Persistence-ready associations, in plugin id order.
    pub fn plugin_associations(&self) -> Vec<PluginAssociation> {
        self.found_plugins
            .iter()
            .map(|(id, references)| PluginAssociation {
                plugin_id: *id,
                references: references.join(","),
            })
            .collect()
    }
}

/// What a caller needs to run one sync.
#[derive(Debug, Clone)]
pub struct SyncTarget {
    pub token: String,
    pub config: NeovimConfig,
    pub tree: RepoTree,
    /// Directory the traversal is anchored to; empty for the repo root.
    pub root: String,
}

/// Summary of a finished sync, for CLI output and audit logs.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub revision: String,
    pub root: String,
    pub config: ConfigWithPlugins,
}

pub struct ConfigSyncer<'a, F, S> {
    content_fetcher: &'a F,
    store: &'a S,
    extractors: &'a Extractors,
    options: &'a SyncOptions,
    target: SyncTarget,
    state: SyncState,
}

impl<'a, F, S> ConfigSyncer<'a, F, S>
where
    F: ContentFetcher,
    S: ConfigStore,
{
    pub fn new(
        content_fetcher: &'a F,
        store: &'a S,
        extractors: &'a Extractors,
        options: &'a SyncOptions,
        target: SyncTarget,
    ) -> Self {
        ConfigSyncer {
            content_fetcher,
            store,
            extractors,
            options,
            target,
            state: SyncState::Idle,
        }
    }

    pub fn revision(&self) -> &str {
        &self.target.tree.sha
    }

    pub fn root(&self) -> &str {
        &self.target.root
    }

    /// Runs the sync and returns the stored record as read back after the
    /// writes.
    pub async fn sync(self) -> Result<ConfigWithPlugins, SyncError> {
        let span = info_span!(
            "sync",
            config_id = self.target.config.id,
            revision = %self.target.tree.sha,
            root = %self.target.root,
            run_id = %Uuid::new_v4()
        );
        self.run().instrument(span).await
    }

    async fn run(mut self) -> Result<ConfigWithPlugins, SyncError> {
        info!("[SYNC] Starting configuration sync");

        self.transition(SyncState::Traversing);
        let accumulator = match self.traverse().await {
            Ok(accumulator) => accumulator,
            Err(e) => return Err(self.fail(e)),
        };
        info!(
            files = accumulator.files,
            plugins = accumulator.found_plugins.len(),
            leader_key = accumulator.leader_key(),
            lines = accumulator.total_lines,
            "[SYNC] Traversal complete"
        );

        self.transition(SyncState::Aggregating);
        let associations = accumulator.plugin_associations();

        self.transition(SyncState::Persisting);
        if let Err(e) = self.persist(&accumulator, &associations).await {
            return Err(self.fail(e));
        }

        let config_id = self.target.config.id;
        let record = match self.store.get_config_with_plugins(config_id).await {
            Ok(record) => record,
            Err(source) => {
                return Err(self.fail(SyncError::Persistence {
                    step: "read back",
                    config_id,
                    source,
                }))
            }
        };

        self.transition(SyncState::Done);
        Ok(record)
    }

    async fn traverse(&self) -> Result<SyncAccumulator, SyncError> {
        let target = &self.target;
        let traverser = ContentTraverser::new(
            self.content_fetcher,
            &target.token,
            &target.config.owner,
            &target.config.repo,
            &target.tree,
            &target.root,
            &self.options.file_extensions,
            self.options.fetch_timeout(),
        );
        info!(files = traverser.paths().len(), "[SYNC] Traversing configuration files");

        let mut accumulator = SyncAccumulator::default();
        let mut files = traverser.traverse();
        while let Some(file) = files.next().await {
            accumulator.ingest(self.extractors, &file?);
        }
        Ok(accumulator)
    }

    async fn persist(
        &self,
        accumulator: &SyncAccumulator,
        associations: &[PluginAssociation],
    ) -> Result<(), SyncError> {
        let config_id = self.target.config.id;
        let revision = self.target.tree.sha.as_str();
        let store = self.store;
        let failed = move |step: &'static str| {
            move |source: CollaboratorError| SyncError::Persistence {
                step,
                config_id,
                source,
            }
        };

        let leader_key = async {
            store
                .save_leader_key(config_id, revision, accumulator.leader_key())
                .await
                .map_err(failed("leader key"))
        };
        let line_count = async {
            store
                .save_line_count(config_id, revision, accumulator.total_lines)
                .await
                .map_err(failed("line count"))
        };
        let servers_then_plugins = async {
            store
                .save_language_servers(config_id, revision, &accumulator.language_servers)
                .await
                .map_err(failed("language servers"))?;
            store
                .save_plugin_associations(config_id, revision, associations)
                .await
                .map_err(failed("plugin associations"))
        };

        // Every write settles before the first error is reported.
        let (leader_key, line_count, servers_then_plugins) =
            futures::join!(leader_key, line_count, servers_then_plugins);
        leader_key.and(line_count).and(servers_then_plugins)?;
        info!(
            plugins = associations.len(),
            language_servers = accumulator.language_servers.len(),
            "[SYNC] Persisted sync results"
        );
        Ok(())
    }

    fn transition(&mut self, next: SyncState) {
        debug!(from = %self.state, to = %next, "[SYNC] State transition");
        self.state = next;
    }

    fn fail(&mut self, e: SyncError) -> SyncError {
        error!(state = %self.state, error = %e, "[SYNC][ERROR] Sync failed");
        self.state = SyncState::Failed;
        e
    }
}

/// Prepares syncs. The tracked plugin catalog is read once, when the factory
/// is built, and shared by every sync it creates.
pub struct SyncerFactory<'a, T, F, S> {
    tree_fetcher: &'a T,
    content_fetcher: &'a F,
    store: &'a S,
    locator: EntryFileLocator,
    extractors: Extractors,
    options: SyncOptions,
}

impl<'a, T, F, S> SyncerFactory<'a, T, F, S>
where
    T: TreeFetcher,
    F: ContentFetcher,
    S: ConfigStore,
{
    pub async fn new<C>(
        catalog: &C,
        tree_fetcher: &'a T,
        content_fetcher: &'a F,
        store: &'a S,
        options: SyncOptions,
    ) -> Result<Self, SyncError>
    where
        C: PluginCatalog,
    {
        let tracked = catalog.list_tracked_plugins().await.map_err(|e| {
            error!(error = %e, "[SYNC][ERROR] Failed to read tracked plugins");
            SyncError::Catalog(e)
        })?;
        info!(tracked = tracked.len(), "[SYNC] Loaded tracked plugin catalog");

        Ok(SyncerFactory {
            tree_fetcher,
            content_fetcher,
            store,
            locator: EntryFileLocator::with_exclusions(options.excluded_entry_paths.clone()),
            extractors: Extractors::new(&tracked, &options),
            options,
        })
    }

    /// Fetches the current tree of `config`, checks it holds an init file and
    /// resolves the traversal root.
    pub async fn create(
        &self,
        token: &str,
        config: &NeovimConfig,
    ) -> Result<ConfigSyncer<'_, F, S>, SyncError> {
        let tree = self
            .tree_fetcher
            .fetch_tree(token, &config.owner, &config.repo, &config.branch)
            .await
            .map_err(|source| {
                error!(
                    owner = %config.owner,
                    repo = %config.repo,
                    branch = %config.branch,
                    error = %source,
                    "[SYNC][ERROR] Tree fetch failed"
                );
                SyncError::TreeFetch {
                    owner: config.owner.clone(),
                    repo: config.repo.clone(),
                    branch: config.branch.clone(),
                    source,
                }
            })?;
        if tree.truncated {
            tracing::warn!(revision = %tree.sha, "[SYNC] Tree listing was truncated");
        }

        let candidates = self.locator.locate(&tree.tree)?;
        let root = resolve_root(&candidates, config.root.as_deref());
        info!(revision = %tree.sha, root = %root, "[SYNC] Prepared sync target");

        Ok(ConfigSyncer::new(
            self.content_fetcher,
            self.store,
            &self.extractors,
            &self.options,
            SyncTarget {
                token: token.to_string(),
                config: config.clone(),
                tree,
                root,
            },
        ))
    }

    /// Creates and runs a sync in one go.
    pub async fn sync(&self, token: &str, config: &NeovimConfig) -> Result<SyncReport, SyncError> {
        let syncer = self.create(token, config).await?;
        let revision = syncer.revision().to_string();
        let root = syncer.root().to_string();
        let record = syncer.sync().await?;
        Ok(SyncReport {
            revision,
            root,
            config: record,
        })
    }
}
