//! Lazy, single-pass traversal of the file bodies under a configuration root.
//!
//! The traverser selects the relevant paths from the tree listing up front
//! (cheap, no I/O) and then fetches one body at a time while the consumer
//! polls the stream. Only the file currently being inspected is held in
//! memory. `traverse` consumes the traverser, so a traversal cannot be
//! restarted; build a new one per sync.

use std::time::Duration;

use futures::stream::{self, BoxStream, StreamExt};
use tracing::{debug, error};

use crate::contract::{ContentFetcher, RepoTree};
use crate::SyncError;

/// File name suffixes inspected by default. `.json` covers plugin manager
/// lockfiles, which name every installed plugin.
pub const DEFAULT_FILE_EXTENSIONS: &[&str] = &[".lua", ".vim", ".fnl", ".json", "vimrc"];

/// One traversed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub path: String,
    pub content: String,
}

pub struct ContentTraverser<'a, F> {
    fetcher: &'a F,
    token: &'a str,
    owner: &'a str,
    repo: &'a str,
    paths: Vec<String>,
    timeout: Duration,
}

impl<'a, F> ContentTraverser<'a, F>
where
    F: ContentFetcher,
{
    pub fn new(
        fetcher: &'a F,
        token: &'a str,
        owner: &'a str,
        repo: &'a str,
        tree: &RepoTree,
        root: &str,
        extensions: &[String],
        timeout: Duration,
    ) -> Self {
        let paths = tree
            .tree
            .iter()
            .filter(|entry| entry.is_file())
            .filter(|entry| is_under_root(&entry.path, root))
            .filter(|entry| has_extension(&entry.path, extensions))
            .map(|entry| entry.path.clone())
            .collect();

        ContentTraverser {
            fetcher,
            token,
            owner,
            repo,
            paths,
            timeout,
        }
    }

    /// Paths that will be fetched, in traversal order.
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Yields `{path, content}` for each selected file. The first fetch
    /// failure or timeout is yielded as an error and ends the stream.
    pub fn traverse(self) -> BoxStream<'a, Result<ConfigFile, SyncError>> {
        stream::unfold(Some((self, 0usize)), |state| async move {
            let Some((traverser, index)) = state else {
                return None;
            };
            let Some(path) = traverser.paths.get(index).cloned() else {
                return None;
            };
            match traverser.fetch(&path).await {
                Ok(content) => {
                    debug!(path = %path, bytes = content.len(), "[TRAVERSE] Fetched file");
                    Some((Ok(ConfigFile { path, content }), Some((traverser, index + 1))))
                }
                Err(e) => Some((Err(e), None)),
            }
        })
        .boxed()
    }

    async fn fetch(&self, path: &str) -> Result<String, SyncError> {
        let request = self
            .fetcher
            .fetch_content(self.token, self.owner, self.repo, path);
        match tokio::time::timeout(self.timeout, request).await {
            Ok(Ok(content)) => Ok(content),
            Ok(Err(source)) => {
                error!(path, error = %source, "[TRAVERSE][ERROR] Content fetch failed");
                Err(SyncError::ContentFetch {
                    path: path.to_string(),
                    source,
                })
            }
            Err(_) => {
                error!(path, timeout = ?self.timeout, "[TRAVERSE][ERROR] Content fetch timed out");
                Err(SyncError::ContentFetchTimeout {
                    path: path.to_string(),
                    timeout: self.timeout,
                })
            }
        }
    }
}

fn is_under_root(path: &str, root: &str) -> bool {
    if root.is_empty() {
        return true;
    }
    path.strip_prefix(root)
        .is_some_and(|rest| rest.starts_with('/'))
}

fn has_extension(path: &str, extensions: &[String]) -> bool {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    extensions.iter().any(|ext| file_name.ends_with(ext.as_str()))
}
