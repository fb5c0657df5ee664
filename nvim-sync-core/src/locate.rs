//! Entry file detection.
//!
//! Finds the init files of a Neovim configuration in a flat tree listing. A
//! repository may contain several (dotfiles repos often carry a `.vimrc` next
//! to an `init.lua`); all of them are returned and the caller picks the root
//! to traverse.
//!
//! Known limitation: a nested `lua/init.lua` inside an unrelated directory is
//! indistinguishable from a real top-level entry file and is reported as a
//! candidate as well.

use serde::Serialize;
use tracing::{debug, info};

use crate::contract::TreeEntry;
use crate::SyncError;

/// Paths containing one of these are never entry files. `ginit.vim` is the
/// GUI init file loaded in addition to the real one.
pub const DEFAULT_EXCLUDED_PATHS: &[&str] = &["ginit.vim"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntryFileKind {
    LuaInit,
    FennelInit,
    VimInit,
    Vimrc,
}

impl EntryFileKind {
    /// Order in which candidates are reported.
    pub const SEARCH_ORDER: [EntryFileKind; 4] = [
        EntryFileKind::LuaInit,
        EntryFileKind::FennelInit,
        EntryFileKind::VimInit,
        EntryFileKind::Vimrc,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            EntryFileKind::LuaInit => "init.lua",
            EntryFileKind::FennelInit => "init.fnl",
            EntryFileKind::VimInit => "init.vim",
            EntryFileKind::Vimrc => ".vimrc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryFile {
    pub path: String,
    pub kind: EntryFileKind,
    /// Everything before the last `/`; empty for a top-level file.
    pub root: String,
}

impl EntryFile {
    fn from_path(path: &str, kind: EntryFileKind) -> Self {
        let root = match path.rfind('/') {
            Some(idx) => &path[..idx],
            None => "",
        };
        EntryFile {
            path: path.to_string(),
            kind,
            root: root.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EntryFileLocator {
    excluded: Vec<String>,
}

impl Default for EntryFileLocator {
    fn default() -> Self {
        Self::with_exclusions(DEFAULT_EXCLUDED_PATHS.iter().map(|s| s.to_string()))
    }
}

impl EntryFileLocator {
    pub fn with_exclusions<I, S>(excluded: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        EntryFileLocator {
            excluded: excluded.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns every candidate entry file, lua first, then fennel, vim and
    /// vimrc. Fails with [`SyncError::NoEntryFileFound`] when there is none.
    pub fn locate(&self, entries: &[TreeEntry]) -> Result<Vec<EntryFile>, SyncError> {
        let mut found = Vec::new();
        for kind in EntryFileKind::SEARCH_ORDER {
            let suffix = kind.file_name();
            for entry in entries {
                if !entry.is_file() || !entry.path.ends_with(suffix) {
                    continue;
                }
                if let Some(excluded) = self.excluded_by(&entry.path) {
                    debug!(path = %entry.path, excluded, "[LOCATE] Skipping excluded init file");
                    continue;
                }
                found.push(EntryFile::from_path(&entry.path, kind));
            }
        }

        if found.is_empty() {
            info!(entries = entries.len(), "[LOCATE] No init file in tree");
            return Err(SyncError::NoEntryFileFound);
        }
        info!(candidates = found.len(), "[LOCATE] Located init files");
        Ok(found)
    }

    fn excluded_by(&self, path: &str) -> Option<&str> {
        self.excluded
            .iter()
            .find(|excluded| path.contains(excluded.as_str()))
            .map(String::as_str)
    }
}

/// Picks the directory to traverse: an explicitly configured root wins,
/// otherwise the root of the first candidate.
pub fn resolve_root(candidates: &[EntryFile], configured: Option<&str>) -> String {
    match configured {
        Some(root) => {
            let root = root.trim_matches('/');
            if !candidates.iter().any(|c| c.root == root) {
                tracing::warn!(
                    root,
                    "[LOCATE] Configured root has no init file, traversing it anyway"
                );
            }
            root.to_string()
        }
        None => candidates
            .first()
            .map(|c| c.root.clone())
            .unwrap_or_default(),
    }
}
