//! Path splitting, normalization and node classification.
//!
//! Every operation handler starts here: a well-formed absolute path string
//! comes in, an ordered component list and a [`NodeKind`] come out. The
//! classifier is a pure function; the engine matches the kind exhaustively
//! instead of re-counting depth in each handler.

use crate::error::{FsError, Result};
use crate::oid::ObjectId;

pub const ROOT: &str = "/";
pub const QUERY_FILE: &str = "query.json";
pub const NEW_DOC_FILE: &str = "new.json";
pub const JSON_EXT: &str = ".json";
/// Directories named `by_<field>` seed a parameterized filter at mkdir time.
pub const VIEW_PREFIX: &str = "by_";

/// What a path resolves to, decided purely by depth and basename.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    Database,
    Collection,
    /// `<24-hex>.json` below a collection.
    Document(ObjectId),
    /// `query.json`: the saved filter of its directory.
    QueryFile,
    /// `new.json`: write-only creation target.
    NewDocument,
    /// `*.json` whose stem is not a valid identifier; behaves as a miss.
    Unknown,
    /// Any other name below a collection; backed only by the overlay.
    Subfolder,
}

/// A normalized path plus its classification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedPath {
    /// `components[0]` is always the literal root marker `/`.
    pub components: Vec<String>,
    pub kind: NodeKind,
}

impl ParsedPath {
    pub fn depth(&self) -> usize {
        self.components.len() - 1
    }

    /// The normalized absolute path, used as the identity key for the
    /// attribute cache, query store and overlay.
    pub fn path(&self) -> String {
        join_components(&self.components)
    }

    pub fn parent(&self) -> String {
        join_components(&self.components[..self.components.len() - 1])
    }

    /// Last component; the root marker for the root itself.
    pub fn name(&self) -> &str {
        self.components.last().map(String::as_str).unwrap_or(ROOT)
    }

    pub fn database(&self) -> Option<&str> {
        self.components.get(1).map(String::as_str)
    }

    pub fn collection(&self) -> Option<&str> {
        self.components.get(2).map(String::as_str)
    }
}

/// Split `path` into normalized components, collapsing `.`/`..` and
/// duplicate separators. Relative paths are rejected.
pub fn split_path(path: &str) -> Result<Vec<String>> {
    if !path.starts_with('/') {
        return Err(FsError::InvalidPath);
    }
    let mut components = vec![ROOT.to_string()];
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if components.len() > 1 {
                    components.pop();
                }
            }
            name => components.push(name.to_string()),
        }
    }
    Ok(components)
}

pub fn classify(path: &str) -> Result<ParsedPath> {
    let components = split_path(path)?;
    let depth = components.len() - 1;
    let kind = match depth {
        0 => NodeKind::Root,
        1 => NodeKind::Database,
        2 => NodeKind::Collection,
        _ => classify_entry(components.last().expect("non-empty components")),
    };
    Ok(ParsedPath { components, kind })
}

fn classify_entry(name: &str) -> NodeKind {
    if name == QUERY_FILE {
        NodeKind::QueryFile
    } else if name == NEW_DOC_FILE {
        NodeKind::NewDocument
    } else if let Some(stem) = name.strip_suffix(JSON_EXT) {
        match ObjectId::parse_str(stem) {
            Ok(id) => NodeKind::Document(id),
            Err(_) => NodeKind::Unknown,
        }
    } else {
        NodeKind::Subfolder
    }
}

pub fn join_components(components: &[String]) -> String {
    if components.len() <= 1 {
        ROOT.to_string()
    } else {
        format!("/{}", components[1..].join("/"))
    }
}

/// Parent directory of a normalized path string.
pub fn dirname(path: &str) -> &str {
    match path.rsplit_once('/') {
        Some(("", _)) | None => ROOT,
        Some((parent, _)) => parent,
    }
}

/// Last component of a normalized path string.
pub fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or("")
}

/// Join a directory path and a child name.
pub fn child_path(dir: &str, name: &str) -> String {
    if dir == ROOT {
        format!("/{name}")
    } else {
        format!("{dir}/{name}")
    }
}
