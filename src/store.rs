//! Ordered collection of accepted records.

use crate::record::{CanonicalRecord, OUTPUT_COLUMNS};

/// Append-ordered store of canonical records. All mutation happens through
/// the reconciliation engine; the store itself is plain data.
#[derive(Debug, Default)]
pub struct CanonicalStore {
    records: Vec<CanonicalRecord>,
}

impl CanonicalStore {
    pub fn new() -> Self {
        CanonicalStore::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&CanonicalRecord> {
        self.records.get(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CanonicalRecord> {
        self.records.iter()
    }

    pub fn records(&self) -> &[CanonicalRecord] {
        &self.records
    }

    pub fn push(&mut self, record: CanonicalRecord) {
        self.records.push(record);
    }

    /// Replace the record at `idx` in place, preserving store order.
    pub fn replace(&mut self, idx: usize, record: CanonicalRecord) {
        self.records[idx] = record;
    }

    /// Remove the record at `idx`. Used when the record being superseded
    /// has no link key to match on.
    pub fn remove_at(&mut self, idx: usize) -> Option<CanonicalRecord> {
        if idx < self.records.len() {
            Some(self.records.remove(idx))
        } else {
            None
        }
    }

    /// Remove the first record whose link key matches.
    pub fn remove_by_link_key(&mut self, link_key: &str) -> Option<CanonicalRecord> {
        let idx = self
            .records
            .iter()
            .position(|r| r.record.link_key == link_key)?;
        Some(self.records.remove(idx))
    }

    pub fn header() -> &'static [&'static str] {
        &OUTPUT_COLUMNS
    }

    /// Serialize to rows under the fixed union schema. Inapplicable fields
    /// are emitted as empty strings, never omitted.
    pub fn to_rows(&self) -> Vec<Vec<String>> {
        self.records
            .iter()
            .map(|r| {
                OUTPUT_COLUMNS
                    .iter()
                    .map(|col| r.record.field(col).to_string())
                    .collect()
            })
            .collect()
    }
}
