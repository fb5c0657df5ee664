//! Leader key detection.
//!
//! Looks for a `mapleader` assignment (`vim.g.mapleader = " "`,
//! `let mapleader = ","`, ...) and maps the assigned literal to a symbolic
//! name. This is line-based text matching, not parsing: anything ambiguous is
//! skipped.

use tracing::warn;

/// Stored when no file assigns a recognised leader.
pub const UNKNOWN_LEADER: &str = "unknown";

const LEADER_MARKER: &str = "mapleader";

/// Normalised literal (quotes stripped, lowercased) to symbolic name.
/// New literal forms go here.
const LEADER_LITERALS: &[(&str, &str)] = &[
    ("\"", "\""),
    ("'", "'"),
    ("-", "-"),
    (";", ";"),
    (" ", "Space"),
    ("\\<space>", "Space"),
    ("<space>", "Space"),
    (",", ","),
    ("\\", "\\"),
    ("\\\\", "\\"),
];

/// Returns the leader key assigned in `content`, if any. The first
/// recognised assignment wins; unrecognised literals are logged and skipped.
pub fn find_leader_key(content: &str) -> Option<&'static str> {
    for line in content.split('\n') {
        if !line.contains(LEADER_MARKER) {
            continue;
        }
        let parts: Vec<&str> = line.trim().split('=').collect();
        let [_, assigned] = parts.as_slice() else {
            continue;
        };
        let literal = assigned.split("--").next().unwrap_or_default().trim();
        match lookup(literal) {
            Some(key) => return Some(key),
            None => {
                warn!(literal, "[SYNC][LEADER] Could not match leader key literal");
            }
        }
    }
    None
}

fn lookup(literal: &str) -> Option<&'static str> {
    let normalised = normalise(literal);
    LEADER_LITERALS
        .iter()
        .find(|(form, _)| *form == normalised)
        .map(|(_, key)| *key)
}

/// Strips one trailing comma (table field syntax) and one layer of matching
/// quotes, then lowercases.
fn normalise(literal: &str) -> String {
    let mut value = literal.trim();
    if let Some(stripped) = value.strip_suffix(',') {
        value = stripped.trim_end();
    }
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            value = &value[1..value.len() - 1];
            break;
        }
    }
    value.to_lowercase()
}
