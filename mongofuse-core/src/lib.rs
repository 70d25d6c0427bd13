//! Projects a document store (databases → collections → documents) onto a
//! POSIX filesystem namespace: documents read and write as JSON files, and a
//! directory's `query.json` turns it into a live filter over its collection.

pub mod attr;
pub mod cache;
pub mod codec;
pub mod engine;
pub mod error;
pub mod oid;
pub mod overlay;
pub mod path;
pub mod query;
pub mod store;

pub use attr::{Attributes, NodeType};
pub use engine::{FsStats, ProjectionEngine};
pub use error::{FsError, Result};
pub use oid::ObjectId;
pub use store::{Document, DocumentStore, MemoryStore, StoreError};
