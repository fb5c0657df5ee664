//! Tracked plugin references.
//!
//! A plugin counts as referenced when its full `owner/name` identifier occurs
//! in a file. Every line that mentions it is recorded as `path#L<line>`
//! (1-indexed), so a plugin declared in a plugin table and configured further down
//! gets two references.

use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::contract::TrackedPlugin;

#[derive(Debug, Clone)]
pub struct PluginReferenceExtractor {
    /// `(plugin id, "owner/name")`, built once per catalog.
    identifiers: Vec<(i64, String)>,
}

impl PluginReferenceExtractor {
    pub fn new(plugins: &[TrackedPlugin]) -> Self {
        PluginReferenceExtractor {
            identifiers: plugins.iter().map(|p| (p.id, p.full_name())).collect(),
        }
    }

    pub fn tracked(&self) -> usize {
        self.identifiers.len()
    }

    /// Returns the references per plugin id found in one file.
    pub fn extract(&self, path: &str, content: &str) -> BTreeMap<i64, Vec<String>> {
        let content = unescape_slashes(content);
        let mut found: BTreeMap<i64, Vec<String>> = BTreeMap::new();
        for (id, identifier) in &self.identifiers {
            if !content.contains(identifier.as_str()) {
                continue;
            }
            let references = found.entry(*id).or_default();
            for (index, line) in content.split('\n').enumerate() {
                if line.contains(identifier.as_str()) {
                    references.push(format!("{}#L{}", path, index + 1));
                }
            }
        }
        found
    }
}

/// JSON files (lockfiles, `dotfyle.json`) may carry `\/` for `/`.
fn unescape_slashes(content: &str) -> Cow<'_, str> {
    if content.contains("\\/") {
        Cow::Owned(content.replace("\\/", "/"))
    } else {
        Cow::Borrowed(content)
    }
}
