//! Filesystem-only names with no store backing: user-created subfolders and,
//! transiently, documents announced via `create` but not yet written.

use std::collections::{BTreeSet, HashMap};

#[derive(Default)]
pub struct VirtualDirectoryOverlay {
    children: HashMap<String, BTreeSet<String>>,
}

impl VirtualDirectoryOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_created(&mut self, parent: &str, name: &str) {
        self.children
            .entry(parent.to_string())
            .or_default()
            .insert(name.to_string());
    }

    pub fn contains(&self, parent: &str, name: &str) -> bool {
        self.children
            .get(parent)
            .map(|set| set.contains(name))
            .unwrap_or(false)
    }

    pub fn children_of(&self, parent: &str) -> Vec<String> {
        self.children
            .get(parent)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn remove(&mut self, parent: &str, name: &str) -> bool {
        match self.children.get_mut(parent) {
            Some(set) => {
                let removed = set.remove(name);
                if set.is_empty() {
                    self.children.remove(parent);
                }
                removed
            }
            None => false,
        }
    }
}
