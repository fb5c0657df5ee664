//! Error types for nvim-sync-core

use std::time::Duration;

use thiserror::Error;

use crate::contract::CollaboratorError;

/// Structural failures of a sync. Parsing-level problems (ambiguous
/// assignments, unknown leader literals) never show up here; they are logged
/// and skipped by the extractors.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The repository contains no recognisable init file.
    #[error("failed to identify init file")]
    NoEntryFileFound,

    #[error("failed to fetch tree for {owner}/{repo}@{branch}: {source}")]
    TreeFetch {
        owner: String,
        repo: String,
        branch: String,
        #[source]
        source: CollaboratorError,
    },

    #[error("failed to read tracked plugin catalog: {0}")]
    Catalog(#[source] CollaboratorError),

    #[error("failed to fetch content of '{path}': {source}")]
    ContentFetch {
        path: String,
        #[source]
        source: CollaboratorError,
    },

    #[error("fetching content of '{path}' timed out after {timeout:?}")]
    ContentFetchTimeout { path: String, timeout: Duration },

    #[error("failed to persist {step} for config {config_id}: {source}")]
    Persistence {
        step: &'static str,
        config_id: i64,
        #[source]
        source: CollaboratorError,
    },
}

impl SyncError {
    /// Whether the failure is caused by the submitted repository rather than
    /// by a collaborator, i.e. a "bad request" for the caller.
    pub fn is_client_error(&self) -> bool {
        matches!(self, SyncError::NoEntryFileFound)
    }

    /// Content fetch failures and timeouts are transient; re-running the sync
    /// for the same revision is safe.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncError::ContentFetch { .. }
                | SyncError::ContentFetchTimeout { .. }
                | SyncError::TreeFetch { .. }
                | SyncError::Persistence { .. }
        )
    }
}
