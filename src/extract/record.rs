//! Extracted records: ordered field maps with null-safe values
//!
//! A record is an ordered mapping from field name to an optional string.
//! Order matters for readable output files and for stable fingerprints, so
//! the serde implementations preserve insertion order in both directions
//! instead of going through a sorted map.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;

/// One extracted item: field names mapped to values in insertion order.
/// Never mutated after the extraction engine hands it out.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Record {
    fields: Vec<(String, Option<String>)>,
}

impl Record {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Appends a field, keeping insertion order. A repeated name replaces
    /// the earlier value instead of duplicating the key.
    pub fn insert(&mut self, name: impl Into<String>, value: Option<String>) {
        let name = name.into();
        if let Some(slot) = self.fields.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.fields.push((name, value));
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| v.as_deref())
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Feeds this record's content into a hasher in field order, with
    /// separators so `("ab", "c")` and `("a", "bc")` hash differently.
    fn hash_into(&self, hasher: &mut Sha256) {
        for (name, value) in &self.fields {
            hasher.update(name.as_bytes());
            hasher.update([0x1f]);
            match value {
                Some(v) => {
                    hasher.update([1]);
                    hasher.update(v.as_bytes());
                }
                None => hasher.update([0]),
            }
            hasher.update([0x1e]);
        }
    }
}

/// Content fingerprint of a batch of records, used to detect a pagination
/// loop that re-serves identical data for an out-of-range offset.
pub fn fingerprint(records: &[Record]) -> String {
    let mut hasher = Sha256::new();
    for record in records {
        record.hash_into(&mut hasher);
    }
    hex::encode(hasher.finalize())
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

struct RecordVisitor;

impl<'de> Visitor<'de> for RecordVisitor {
    type Value = Record;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map of field names to nullable strings")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Record, A::Error> {
        let mut record = Record::new();
        while let Some((name, value)) = access.next_entry::<String, Option<String>>()? {
            record.insert(name, value);
        }
        Ok(record)
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Record, D::Error> {
        deserializer.deserialize_map(RecordVisitor)
    }
}
