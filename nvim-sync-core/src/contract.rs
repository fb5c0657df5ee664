#![allow(unused)]

//! # contract: collaborator interfaces and the data they exchange
//!
//! The sync engine never talks to GitHub or a database directly. It depends on
//! four traits defined here:
//! - [`TreeFetcher`]: lists the file tree of a repository snapshot
//! - [`ContentFetcher`]: fetches the raw body of a single file
//! - [`PluginCatalog`]: reads the catalog of tracked plugins
//! - [`ConfigStore`]: persists sync results, keyed by config id and tagged
//!   with the tree revision
//!
//! ## Mocking & Testing
//! - Every trait is annotated for `mockall`; the mocks are exported with the
//!   `test-export-mocks` feature so integration tests can use them.
//!
//! ## Errors
//! - All collaborator methods return a boxed error ([`CollaboratorError`]).
//!   The orchestrator wraps them into the matching [`crate::SyncError`] kind.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use mockall::{automock, predicate::*};

/// Error type for all collaborator traits.
pub type CollaboratorError = Box<dyn std::error::Error + Send + Sync>;

/// Kind of a node in a repository tree listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Blob,
    Tree,
    /// Submodule reference.
    Commit,
}

/// One file or directory of a repository snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub mode: String,
    #[serde(default)]
    pub sha: String,
    #[serde(default)]
    pub size: Option<u64>,
}

impl TreeEntry {
    /// Convenience constructor for a file entry.
    pub fn blob(path: impl Into<String>) -> Self {
        TreeEntry {
            path: path.into(),
            kind: NodeKind::Blob,
            mode: "100644".to_string(),
            sha: String::new(),
            size: None,
        }
    }

    /// Convenience constructor for a directory entry.
    pub fn tree(path: impl Into<String>) -> Self {
        TreeEntry {
            path: path.into(),
            kind: NodeKind::Tree,
            mode: "040000".to_string(),
            sha: String::new(),
            size: None,
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::Blob
    }
}

/// A repository snapshot: the tree revision and the flat, recursive listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoTree {
    /// Content hash of the tree; persisted results are keyed by it.
    pub sha: String,
    pub tree: Vec<TreeEntry>,
    /// Set by GitHub when the listing was cut short.
    #[serde(default)]
    pub truncated: bool,
}

/// A plugin the system knows how to detect by its `owner/name` identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedPlugin {
    pub id: i64,
    pub owner: String,
    pub name: String,
}

impl TrackedPlugin {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// The configuration repository being synced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeovimConfig {
    pub id: i64,
    pub owner: String,
    pub repo: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Directory the traversal is anchored to. When absent the root of the
    /// first located entry file is used.
    #[serde(default)]
    pub root: Option<String>,
}

fn default_branch() -> String {
    "main".to_string()
}

/// A plugin found in the configuration with its comma-joined `path#Lline`
/// references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginAssociation {
    pub plugin_id: i64,
    pub references: String,
}

impl PluginAssociation {
    pub fn reference_list(&self) -> Vec<&str> {
        self.references
            .split(',')
            .filter(|r| !r.is_empty())
            .collect()
    }
}

/// The persisted result of a sync, as read back from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigWithPlugins {
    pub config_id: i64,
    /// Tree revision the revision-scoped fields were computed from.
    pub revision: Option<String>,
    pub leader_key: String,
    pub line_count: u64,
    pub language_servers: Vec<String>,
    pub plugins: Vec<PluginAssociation>,
}

impl ConfigWithPlugins {
    pub fn empty(config_id: i64) -> Self {
        ConfigWithPlugins {
            config_id,
            revision: None,
            leader_key: crate::leader_key::UNKNOWN_LEADER.to_string(),
            line_count: 0,
            language_servers: Vec::new(),
            plugins: Vec::new(),
        }
    }
}

/// Lists the file tree of a repository at a branch.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait TreeFetcher: Send + Sync {
    async fn fetch_tree(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> Result<RepoTree, CollaboratorError>;
}

/// Fetches the raw body of one file. Implementations should report missing
/// files and rate limiting as errors, never as empty content.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch_content(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        path: &str,
    ) -> Result<String, CollaboratorError>;
}

/// Read-only access to the catalog of tracked plugins.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait PluginCatalog: Send + Sync {
    async fn list_tracked_plugins(&self) -> Result<Vec<TrackedPlugin>, CollaboratorError>;
}

/// Persistence of sync results.
///
/// Every write is an idempotent overwrite for the given revision: saving the
/// same values twice leaves the same record, and a save under a new revision
/// replaces the revision-scoped data instead of merging into it.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn save_leader_key(
        &self,
        config_id: i64,
        revision: &str,
        leader_key: &str,
    ) -> Result<(), CollaboratorError>;

    async fn save_line_count(
        &self,
        config_id: i64,
        revision: &str,
        line_count: u64,
    ) -> Result<(), CollaboratorError>;

    async fn save_language_servers(
        &self,
        config_id: i64,
        revision: &str,
        language_servers: &[String],
    ) -> Result<(), CollaboratorError>;

    /// Finalising write for a revision; called after the language servers
    /// are saved.
    async fn save_plugin_associations(
        &self,
        config_id: i64,
        revision: &str,
        associations: &[PluginAssociation],
    ) -> Result<(), CollaboratorError>;

    async fn get_config_with_plugins(
        &self,
        config_id: i64,
    ) -> Result<ConfigWithPlugins, CollaboratorError>;
}
