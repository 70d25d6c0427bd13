//! The document-store collaborator.
//!
//! The engine talks to storage exclusively through [`DocumentStore`]; a
//! networked client would implement the same trait. Calls are synchronous and
//! may block; the engine never holds an in-memory lock across one.

use crate::oid::ObjectId;
use serde_json::Value;

pub mod memory;

pub use memory::MemoryStore;

/// A document is a JSON object whose `_id` field carries its identifier.
pub type Document = Value;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("malformed document: {0}")]
    Malformed(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub trait DocumentStore: Send + Sync {
    fn list_databases(&self) -> Result<Vec<String>, StoreError>;

    fn list_collections(&self, db: &str) -> Result<Vec<String>, StoreError>;

    /// All documents in `db.coll` matching `filter`.
    fn find(&self, db: &str, coll: &str, filter: &Value) -> Result<Vec<Document>, StoreError>;

    fn find_one(&self, db: &str, coll: &str, id: ObjectId)
        -> Result<Option<Document>, StoreError>;

    /// Insert or replace, keyed by the document's `_id`.
    fn upsert(&self, db: &str, coll: &str, doc: Document) -> Result<(), StoreError>;

    /// Returns whether a document was actually removed.
    fn remove(&self, db: &str, coll: &str, id: ObjectId) -> Result<bool, StoreError>;

    fn create_collection(&self, db: &str, coll: &str) -> Result<(), StoreError>;
}
