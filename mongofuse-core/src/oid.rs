//! Document identifiers: 12 raw bytes, canonically a 24-char hex string.

use rand::RngCore;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// JSON key used for the tagged identifier encoding, `{"$oid": "<hex>"}`.
pub const OID_TAG: &str = "$oid";

#[derive(Debug, thiserror::Error)]
#[error("invalid object id")]
pub struct InvalidId;

/// Unique key of a document within a collection.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    /// Parse the canonical 24-character hex form. Anything else is rejected,
    /// which is how invalid document filenames become misses.
    pub fn parse_str(s: &str) -> Result<Self, InvalidId> {
        if s.len() != 24 {
            return Err(InvalidId);
        }
        let mut bytes = [0u8; 12];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| InvalidId)?;
        Ok(Self(bytes))
    }

    /// Allocate a fresh identifier: 4 big-endian timestamp bytes followed by
    /// 8 random bytes.
    pub fn generate() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);
        let mut bytes = [0u8; 12];
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        rand::thread_rng().fill_bytes(&mut bytes[4..]);
        Self(bytes)
    }

    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(OID_TAG, &self.to_hex())?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OidVisitor;

        impl<'de> Visitor<'de> for OidVisitor {
            type Value = ObjectId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map {\"$oid\": \"<24-char hex>\"}")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut id = None;
                while let Some((key, value)) = map.next_entry::<String, String>()? {
                    if key == OID_TAG {
                        id = Some(
                            ObjectId::parse_str(&value)
                                .map_err(|_| de::Error::custom("invalid object id hex"))?,
                        );
                    }
                }
                id.ok_or_else(|| de::Error::custom("missing $oid key"))
            }
        }

        deserializer.deserialize_map(OidVisitor)
    }
}
