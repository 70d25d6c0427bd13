//! Saved filters: the text behind each directory's `query.json`.
//!
//! A directory without its own entry can still have an effective filter,
//! derived from the parent's stored text by substituting `$1` with the
//! directory's basename. That is what makes `by_age/25` a live view: the
//! parent stores `{"age": $1}` and the child resolves to `{"age": 25}`.

use crate::path::{basename, dirname};
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

pub const PLACEHOLDER: &str = "$1";
/// Match-all filter used when a directory has no stored or derived text.
pub const DEFAULT_FILTER: &str = "{}";

#[derive(Default)]
pub struct QueryStore {
    filters: HashMap<String, String>,
}

impl QueryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store filter text verbatim; no validation. Parameterized text with an
    /// unresolved `$1` is legitimate here and only becomes usable in child
    /// directories.
    pub fn set(&mut self, dir: &str, text: impl Into<String>) {
        self.filters.insert(dir.to_string(), text.into());
    }

    /// Whether `dir` has its own stored entry (and therefore a listable,
    /// stat-able `query.json`).
    pub fn contains(&self, dir: &str) -> bool {
        self.filters.contains_key(dir)
    }

    pub fn stored(&self, dir: &str) -> Option<String> {
        self.filters.get(dir).cloned()
    }

    /// Effective filter text: own entry, else the parent's entry with the
    /// placeholder substituted by this directory's basename, else match-all.
    pub fn text_for(&self, dir: &str) -> String {
        if let Some(own) = self.filters.get(dir) {
            return own.clone();
        }
        if let Some(parent) = self.filters.get(dirname(dir)) {
            return parent.replace(PLACEHOLDER, basename(dir));
        }
        DEFAULT_FILTER.to_string()
    }

    /// Parse the effective filter. `None` means the directory is malformed:
    /// the text still holds an unresolved placeholder or is not valid JSON.
    /// Callers list such a directory as empty rather than failing.
    pub fn resolve_filter(&self, dir: &str) -> Option<Value> {
        let text = self.text_for(dir);
        if text.contains(PLACEHOLDER) {
            warn!(dir, "filter still contains a placeholder; listing as empty");
            return None;
        }
        match serde_json::from_str(&text) {
            Ok(filter) => Some(filter),
            Err(err) => {
                warn!(dir, %err, "stored filter does not parse; listing as empty");
                None
            }
        }
    }

    /// Keep the first `len` bytes of the stored text. No-op when `dir` has no
    /// entry.
    pub fn truncate(&mut self, dir: &str, len: u64) {
        if let Some(text) = self.filters.get_mut(dir) {
            let mut len = (len as usize).min(text.len());
            while !text.is_char_boundary(len) {
                len -= 1;
            }
            text.truncate(len);
        }
    }

    pub fn remove(&mut self, dir: &str) -> bool {
        self.filters.remove(dir).is_some()
    }
}
