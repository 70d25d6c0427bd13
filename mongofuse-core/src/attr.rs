//! Synthesized file attributes for a virtual node.
//!
//! Everything here is derived on demand from the document store; nothing is
//! persisted.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeType {
    Directory,
    File,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Attributes {
    pub kind: NodeType,
    pub size: u64,
}

impl Attributes {
    pub fn directory() -> Self {
        Self {
            kind: NodeType::Directory,
            size: 0,
        }
    }

    pub fn file(size: u64) -> Self {
        Self {
            kind: NodeType::File,
            size,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == NodeType::Directory
    }
}
