//! Canonical JSON text for documents.
//!
//! Field names come out sorted (serde_json's default map is ordered by key)
//! with fixed 4-space indentation, so a document always serializes to the
//! same bytes. Attribute sizes and read/write length accounting rely on that.
//! Identifier values travel as `{"$oid": "<hex>"}` so decoding recovers the
//! original value shape.

use crate::oid::{ObjectId, OID_TAG};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Serializer, Value};

/// Conventional identifier field of a document.
pub const ID_FIELD: &str = "_id";

pub fn encode(doc: &Value) -> String {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = Serializer::with_formatter(&mut buf, formatter);
    // Serializing a Value into a Vec cannot fail.
    doc.serialize(&mut ser).expect("in-memory serialization");
    String::from_utf8(buf).expect("serde_json emits UTF-8")
}

pub fn decode(data: &[u8]) -> serde_json::Result<Value> {
    serde_json::from_slice(data)
}

/// The tagged JSON encoding of an identifier.
pub fn oid_value(id: ObjectId) -> Value {
    let mut map = Map::new();
    map.insert(OID_TAG.to_string(), Value::String(id.to_hex()));
    Value::Object(map)
}

/// Extract a document's identifier from its `_id` field. Accepts the tagged
/// form and, leniently, a bare hex string.
pub fn document_id(doc: &Value) -> Option<ObjectId> {
    match doc.get(ID_FIELD)? {
        Value::Object(map) => map
            .get(OID_TAG)
            .and_then(Value::as_str)
            .and_then(|s| ObjectId::parse_str(s).ok()),
        Value::String(s) => ObjectId::parse_str(s).ok(),
        _ => None,
    }
}

/// Inject `id` as `_id` if the document does not already carry one. Client
/// text normally omits the identifier; the filename supplies it.
pub fn ensure_id(doc: &mut Value, id: ObjectId) {
    if let Value::Object(map) = doc {
        map.entry(ID_FIELD.to_string()).or_insert_with(|| oid_value(id));
    }
}
