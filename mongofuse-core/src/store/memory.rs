//! In-memory [`DocumentStore`] with a small MongoDB-style filter matcher.
//!
//! Backs the test suite and the demo mount. Namespaces appear implicitly on
//! first insert, the way a real document store materializes them.

use super::{Document, DocumentStore, StoreError};
use crate::codec;
use crate::oid::ObjectId;
use parking_lot::RwLock;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;

type Collection = BTreeMap<ObjectId, Document>;
type Database = BTreeMap<String, Collection>;

#[derive(Default)]
pub struct MemoryStore {
    databases: RwLock<BTreeMap<String, Database>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for MemoryStore {
    fn list_databases(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.databases.read().keys().cloned().collect())
    }

    fn list_collections(&self, db: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .databases
            .read()
            .get(db)
            .map(|d| d.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn find(&self, db: &str, coll: &str, filter: &Value) -> Result<Vec<Document>, StoreError> {
        let databases = self.databases.read();
        let Some(collection) = databases.get(db).and_then(|d| d.get(coll)) else {
            return Ok(Vec::new());
        };
        Ok(collection
            .values()
            .filter(|doc| matches(doc, filter))
            .cloned()
            .collect())
    }

    fn find_one(
        &self,
        db: &str,
        coll: &str,
        id: ObjectId,
    ) -> Result<Option<Document>, StoreError> {
        Ok(self
            .databases
            .read()
            .get(db)
            .and_then(|d| d.get(coll))
            .and_then(|c| c.get(&id))
            .cloned())
    }

    fn upsert(&self, db: &str, coll: &str, doc: Document) -> Result<(), StoreError> {
        let id = codec::document_id(&doc)
            .ok_or_else(|| StoreError::Malformed("document has no _id".to_string()))?;
        self.databases
            .write()
            .entry(db.to_string())
            .or_default()
            .entry(coll.to_string())
            .or_default()
            .insert(id, doc);
        Ok(())
    }

    fn remove(&self, db: &str, coll: &str, id: ObjectId) -> Result<bool, StoreError> {
        Ok(self
            .databases
            .write()
            .get_mut(db)
            .and_then(|d| d.get_mut(coll))
            .map(|c| c.remove(&id).is_some())
            .unwrap_or(false))
    }

    fn create_collection(&self, db: &str, coll: &str) -> Result<(), StoreError> {
        self.databases
            .write()
            .entry(db.to_string())
            .or_default()
            .entry(coll.to_string())
            .or_default();
        Ok(())
    }
}

/// Does `doc` satisfy `filter`? Top-level fields only; a condition is either
/// an operator object (`{"$lte": 25}`) or a literal compared for equality.
fn matches(doc: &Document, filter: &Value) -> bool {
    let Value::Object(conditions) = filter else {
        return false;
    };
    conditions.iter().all(|(field, condition)| {
        let actual = doc.get(field);
        match condition {
            Value::Object(ops) if ops.keys().any(|k| k.starts_with('$')) => {
                ops.iter().all(|(op, operand)| apply_op(actual, op, operand))
            }
            literal => actual == Some(literal),
        }
    })
}

fn apply_op(actual: Option<&Value>, op: &str, operand: &Value) -> bool {
    match op {
        "$eq" => actual == Some(operand),
        "$ne" => actual != Some(operand),
        "$in" => match operand {
            Value::Array(choices) => actual.map_or(false, |a| choices.contains(a)),
            _ => false,
        },
        "$lt" => ordered(actual, operand).map_or(false, |o| o == Ordering::Less),
        "$lte" => ordered(actual, operand).map_or(false, |o| o != Ordering::Greater),
        "$gt" => ordered(actual, operand).map_or(false, |o| o == Ordering::Greater),
        "$gte" => ordered(actual, operand).map_or(false, |o| o != Ordering::Less),
        _ => false,
    }
}

fn ordered(actual: Option<&Value>, operand: &Value) -> Option<Ordering> {
    match (actual?, operand) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}
