// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Digests used for task ids and structural-change detection.
//!
//! Both hashes are computed over the task's *declared* shape (name/info for
//! the id, ordered step headers+commands for the structural hash) so they
//! are stable across process restarts and independent of in-memory layout.

use sha2::{Digest, Sha256};

/// 8 lowercase hex characters derived from `name||info`.
///
/// Used as the suffix of a [`crate::task::TaskId`] so that two tasks with the
/// same display name (but different info) never collide in the log
/// directory layout.
pub fn short_hash(name: &str, info: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update([0u8]);
    hasher.update(info.as_bytes());
    let digest = hasher.finalize();
    hex_prefix(&digest, 8)
}

/// Full hex digest of the ordered sequence of (header, command) pairs.
///
/// Two tasks hash equal iff they have the same steps in the same order with
/// the same headers and commands; renaming a column or reordering/adding/
/// removing a step changes the hash. Empty/absent commands participate as
/// an empty string, not as an absent marker, so "no-op" is stable across
/// edits that don't otherwise touch the step.
pub fn structural_hash<'a>(steps: impl IntoIterator<Item = (&'a str, Option<&'a str>)>) -> String {
    let mut hasher = Sha256::new();
    for (header, command) in steps {
        hasher.update(header.as_bytes());
        hasher.update([0u8]);
        hasher.update(command.unwrap_or("").as_bytes());
        hasher.update([0u8]);
    }
    let digest = hasher.finalize();
    hex_prefix(&digest, digest.len())
}

fn hex_prefix(digest: &[u8], n: usize) -> String {
    digest
        .iter()
        .take(n)
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Replace anything other than ASCII alphanumerics, `-`, and `_` with `_`.
pub fn sanitize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
            out.push(c);
        } else {
            out.push('_');
        }
    }
    if out.is_empty() {
        out.push('_');
    }
    out
}
