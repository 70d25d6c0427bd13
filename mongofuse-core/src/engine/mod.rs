//! The projection engine: translates filesystem operations into document
//! store calls plus the in-memory query/overlay/cache bookkeeping.
//!
//! Each operation is independent and stateless apart from the three shared
//! stores. Every lock guards only in-memory mutation and is released before
//! any store round-trip, so concurrent handler invocations from the exposure
//! layer stay safe without serializing on the network.

use crate::attr::Attributes;
use crate::cache::{self, AttributeCache};
use crate::codec;
use crate::error::{FsError, Result};
use crate::oid::ObjectId;
use crate::overlay::VirtualDirectoryOverlay;
use crate::path::{self, classify, NodeKind, ParsedPath};
use crate::query::{QueryStore, DEFAULT_FILTER};
use crate::store::DocumentStore;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

mod tests;

/// Collection created as a side channel when a database directory is made:
/// the store only persists a database once it holds a collection.
const BOOTSTRAP_COLLECTION: &str = "tmp";

/// Fixed placeholder capacity figures; meaningful reporting is out of scope.
#[derive(Clone, Copy, Debug)]
pub struct FsStats {
    pub blocks: u64,
    pub bfree: u64,
    pub bavail: u64,
    pub files: u64,
    pub ffree: u64,
    pub bsize: u32,
    pub namelen: u32,
    pub frsize: u32,
}

pub struct ProjectionEngine {
    store: Arc<dyn DocumentStore>,
    cache: Mutex<AttributeCache>,
    queries: Mutex<QueryStore>,
    overlay: Mutex<VirtualDirectoryOverlay>,
    next_fh: AtomicU64,
}

impl ProjectionEngine {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_cache_ttl(store, cache::DEFAULT_TTL)
    }

    pub fn with_cache_ttl(store: Arc<dyn DocumentStore>, ttl: Duration) -> Self {
        Self {
            store,
            cache: Mutex::new(AttributeCache::new(ttl)),
            queries: Mutex::new(QueryStore::new()),
            overlay: Mutex::new(VirtualDirectoryOverlay::new()),
            next_fh: AtomicU64::new(1),
        }
    }

    /// Names inside a directory, starting with `.` and `..`. Attributes of
    /// every synthesized child are pushed into the cache so the stat calls
    /// that follow a listing stay off the store.
    pub fn list(&self, raw_path: &str) -> Result<Vec<String>> {
        let parsed = classify(raw_path)?;
        let dir = parsed.path();
        let mut names = vec![".".to_string(), "..".to_string()];
        match parsed.kind {
            NodeKind::Root => {
                for db in self.store.list_databases()? {
                    self.cache_child(&dir, &db, Attributes::directory());
                    names.push(db);
                }
            }
            NodeKind::Database => {
                let db = parsed.database().unwrap_or_default();
                for coll in self.store.list_collections(db)? {
                    self.cache_child(&dir, &coll, Attributes::directory());
                    names.push(coll);
                }
            }
            NodeKind::Collection | NodeKind::Subfolder => {
                self.list_document_dir(&parsed, &dir, &mut names)?;
            }
            _ => return Err(FsError::NotFound),
        }
        Ok(names)
    }

    fn list_document_dir(
        &self,
        parsed: &ParsedPath,
        dir: &str,
        names: &mut Vec<String>,
    ) -> Result<()> {
        let db = parsed.database().unwrap_or_default();
        let coll = parsed.collection().unwrap_or_default();

        let overlay_children = self.overlay.lock().children_of(dir);
        for name in overlay_children {
            // Pending documents are files; everything else here is a folder.
            let attr = match classify(&path::child_path(dir, &name)) {
                Ok(p) if matches!(p.kind, NodeKind::Document(_)) => Attributes::file(0),
                _ => Attributes::directory(),
            };
            self.cache_child(dir, &name, attr);
            names.push(name);
        }

        let (has_query, stored_len, filter) = {
            let queries = self.queries.lock();
            (
                queries.contains(dir),
                queries.stored(dir).map(|t| t.len() as u64),
                queries.resolve_filter(dir),
            )
        };
        if has_query {
            self.cache_child(dir, path::QUERY_FILE, Attributes::file(stored_len.unwrap_or(0)));
            names.push(path::QUERY_FILE.to_string());
        }

        // Store naming restriction passthrough: a dotted database name can
        // never enumerate documents.
        if db.contains('.') {
            debug!(db, "database name contains '.'; skipping document listing");
            return Ok(());
        }

        // Malformed filter: list zero documents instead of erroring, so one
        // bad query.json cannot take down a directory scan.
        let Some(filter) = filter else { return Ok(()) };
        for doc in self.store.find(db, coll, &filter)? {
            let Some(id) = codec::document_id(&doc) else { continue };
            let name = format!("{}{}", id.to_hex(), path::JSON_EXT);
            let size = codec::encode(&doc).len() as u64;
            self.cache_child(dir, &name, Attributes::file(size));
            if !names.contains(&name) {
                names.push(name);
            }
        }
        Ok(())
    }

    /// Attribute record for a path, or `NotFound`. A live cache entry wins;
    /// otherwise the answer is re-derived from the store, which is why losing
    /// the cache is never incorrect, only slower.
    pub fn stat(&self, raw_path: &str) -> Result<Attributes> {
        let parsed = classify(raw_path)?;
        let key = parsed.path();
        if let Some(attr) = self.cache.lock().get(&key) {
            debug!(path = %key, "attribute cache hit");
            return Ok(attr);
        }
        match parsed.kind {
            NodeKind::Root => Ok(Attributes::directory()),
            NodeKind::Database => {
                let db = parsed.name();
                if self.store.list_databases()?.iter().any(|d| d == db) {
                    Ok(Attributes::directory())
                } else {
                    Err(FsError::NotFound)
                }
            }
            NodeKind::Collection => {
                let db = parsed.database().unwrap_or_default();
                let coll = parsed.name();
                if self.store.list_collections(db)?.iter().any(|c| c == coll) {
                    Ok(Attributes::directory())
                } else {
                    Err(FsError::NotFound)
                }
            }
            NodeKind::QueryFile => {
                let dir = parsed.parent();
                match self.queries.lock().stored(&dir) {
                    Some(text) => Ok(Attributes::file(text.len() as u64)),
                    None => Err(FsError::NotFound),
                }
            }
            NodeKind::Document(id) => {
                let db = parsed.database().unwrap_or_default();
                let coll = parsed.collection().unwrap_or_default();
                match self.store.find_one(db, coll, id)? {
                    Some(doc) => Ok(Attributes::file(codec::encode(&doc).len() as u64)),
                    // Announced via create but not written yet: report an
                    // empty placeholder instead of NotFound.
                    None if self.overlay.lock().contains(&parsed.parent(), parsed.name()) => {
                        Ok(Attributes::file(0))
                    }
                    None => Err(FsError::NotFound),
                }
            }
            NodeKind::Subfolder => {
                if self.overlay.lock().contains(&parsed.parent(), parsed.name()) {
                    Ok(Attributes::directory())
                } else {
                    Err(FsError::NotFound)
                }
            }
            NodeKind::NewDocument | NodeKind::Unknown => Err(FsError::NotFound),
        }
    }

    /// Slice `[offset, offset+size)` of the node's canonical text.
    pub fn read(&self, raw_path: &str, offset: u64, size: u32) -> Result<Vec<u8>> {
        let parsed = classify(raw_path)?;
        let text = match parsed.kind {
            NodeKind::QueryFile => self
                .queries
                .lock()
                .stored(&parsed.parent())
                .ok_or(FsError::NotFound)?,
            NodeKind::Document(id) => {
                let db = parsed.database().unwrap_or_default();
                let coll = parsed.collection().unwrap_or_default();
                match self.store.find_one(db, coll, id)? {
                    Some(doc) => codec::encode(&doc),
                    None if self.overlay.lock().contains(&parsed.parent(), parsed.name()) => {
                        String::new()
                    }
                    None => return Err(FsError::NotFound),
                }
            }
            _ => return Err(FsError::NotFound),
        };
        let bytes = text.as_bytes();
        let start = (offset as usize).min(bytes.len());
        let end = start.saturating_add(size as usize).min(bytes.len());
        Ok(bytes[start..end].to_vec())
    }

    /// Announce a new file. Returns a fresh handle; handles are never reused.
    pub fn create(&self, raw_path: &str) -> Result<u64> {
        let parsed = classify(raw_path)?;
        match parsed.kind {
            NodeKind::QueryFile => {
                self.queries.lock().set(&parsed.parent(), DEFAULT_FILTER);
            }
            NodeKind::Document(_) => {
                // Remember the name so stat/read before the first write do
                // not report NotFound.
                self.overlay
                    .lock()
                    .mark_created(&parsed.parent(), parsed.name());
            }
            _ => {}
        }
        Ok(self.next_fh.fetch_add(1, Ordering::SeqCst))
    }

    /// Route data to its destination: filter text for `query.json`, a
    /// keyed upsert for a document, a fresh insert for `new.json`.
    pub fn write(&self, raw_path: &str, data: &[u8]) -> Result<usize> {
        let parsed = classify(raw_path)?;
        match parsed.kind {
            NodeKind::QueryFile => {
                let dir = parsed.parent();
                let text = String::from_utf8_lossy(data).into_owned();
                self.queries.lock().set(&dir, text);
                self.cache.lock().remove(&parsed.path());
                Ok(data.len())
            }
            NodeKind::Document(id) => {
                let mut doc = self.decode_document(data)?;
                codec::ensure_id(&mut doc, id);
                let db = parsed.database().unwrap_or_default();
                let coll = parsed.collection().unwrap_or_default();
                self.store.upsert(db, coll, doc)?;
                // The store holds it now; the pending marker has done its job.
                self.overlay.lock().remove(&parsed.parent(), parsed.name());
                self.cache.lock().remove(&parsed.path());
                Ok(data.len())
            }
            NodeKind::NewDocument => {
                let mut doc = self.decode_document(data)?;
                if codec::document_id(&doc).is_none() {
                    codec::ensure_id(&mut doc, ObjectId::generate());
                }
                let db = parsed.database().unwrap_or_default();
                let coll = parsed.collection().unwrap_or_default();
                self.store.upsert(db, coll, doc)?;
                Ok(data.len())
            }
            _ => {
                debug!(path = %parsed.path(), "write to non-writable node ignored");
                Ok(0)
            }
        }
    }

    fn decode_document(&self, data: &[u8]) -> Result<serde_json::Value> {
        let doc = codec::decode(data).map_err(|e| FsError::InvalidDocument(e.to_string()))?;
        if !doc.is_object() {
            return Err(FsError::InvalidDocument(
                "document body must be a JSON object".to_string(),
            ));
        }
        Ok(doc)
    }

    /// Only `query.json` has truncatable content; everywhere else this is a
    /// no-op.
    pub fn truncate(&self, raw_path: &str, len: u64) -> Result<()> {
        let parsed = classify(raw_path)?;
        if parsed.kind == NodeKind::QueryFile {
            self.queries.lock().truncate(&parsed.parent(), len);
            self.cache.lock().remove(&parsed.path());
        }
        Ok(())
    }

    /// Remove a document (or a saved query file). Removing databases and
    /// collections through the filesystem is not supported.
    pub fn unlink(&self, raw_path: &str) -> Result<()> {
        let parsed = classify(raw_path)?;
        match parsed.kind {
            NodeKind::Document(id) => {
                let db = parsed.database().unwrap_or_default();
                let coll = parsed.collection().unwrap_or_default();
                let removed = self.store.remove(db, coll, id)?;
                self.overlay.lock().remove(&parsed.parent(), parsed.name());
                self.cache.lock().remove(&parsed.path());
                if removed {
                    Ok(())
                } else {
                    Err(FsError::NotFound)
                }
            }
            NodeKind::QueryFile => {
                let existed = self.queries.lock().remove(&parsed.parent());
                self.cache.lock().remove(&parsed.path());
                if existed {
                    Ok(())
                } else {
                    Err(FsError::NotFound)
                }
            }
            // Invalid identifiers are silent misses elsewhere, but unlink
            // reports the failure.
            NodeKind::Unknown | NodeKind::NewDocument => Err(FsError::NotFound),
            _ => Err(FsError::Unsupported),
        }
    }

    /// Create a directory. Databases materialize through a bootstrap
    /// collection; `by_<field>` names seed a parameterized filter.
    pub fn mkdir(&self, raw_path: &str) -> Result<()> {
        let parsed = classify(raw_path)?;
        match parsed.kind {
            NodeKind::Root => return Err(FsError::InvalidPath),
            NodeKind::Database => {
                let db = parsed.name();
                if !self.store.list_databases()?.iter().any(|d| d == db) {
                    info!(db, "materializing database via bootstrap collection");
                    self.store.create_collection(db, BOOTSTRAP_COLLECTION)?;
                }
            }
            NodeKind::Collection => {
                let db = parsed.database().unwrap_or_default();
                self.store.create_collection(db, parsed.name())?;
            }
            _ => {
                if let Some(field) = parsed
                    .name()
                    .strip_prefix(path::VIEW_PREFIX)
                    .filter(|f| !f.is_empty())
                {
                    self.queries
                        .lock()
                        .set(&parsed.path(), format!("{{\"{field}\": $1}}"));
                }
            }
        }
        self.overlay
            .lock()
            .mark_created(&parsed.parent(), parsed.name());
        Ok(())
    }

    pub fn statfs(&self) -> FsStats {
        FsStats {
            blocks: 1 << 20,
            bfree: 1 << 20,
            bavail: 1 << 20,
            files: 1 << 10,
            ffree: 1 << 10,
            bsize: 512,
            namelen: 255,
            frsize: 512,
        }
    }

    fn cache_child(&self, dir: &str, name: &str, attr: Attributes) {
        self.cache.lock().put(&path::child_path(dir, name), attr);
    }
}
