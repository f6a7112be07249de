//! Single-pass classification of fresh records against persisted state.

use std::collections::HashMap;

use crate::core::{ColumnSet, Record};

use super::fingerprint::{fingerprint, Fingerprint};
use super::identity::{key_value, KeyColumns, KeyValue};

/// Maximum number of sample keys kept for diagnostics.
const MAX_SAMPLES: usize = 5;

/// A destination row as loaded for comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedRow {
    pub id: i64,
    /// Key components in key-column order; `None` for NULL.
    pub key_parts: Vec<Option<String>>,
    /// Stored fingerprint; `None` when the row predates fingerprinting.
    pub fingerprint: Option<String>,
}

/// Key anomalies seen while indexing one side of the comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyDiagnostics {
    /// Rows whose key matched an earlier row; the later row won.
    pub collisions: usize,
    /// Rows with an empty key component.
    pub incomplete: usize,
    /// A few of the colliding keys, for logging.
    pub samples: Vec<String>,
}

impl KeyDiagnostics {
    fn record_collision(&mut self, key: &str) {
        self.collisions += 1;
        if self.samples.len() < MAX_SAMPLES {
            self.samples.push(key.to_string());
        }
    }

    fn observe(&mut self, key: &KeyValue) {
        if key.is_incomplete() {
            self.incomplete += 1;
        }
    }

    pub fn is_clean(&self) -> bool {
        self.collisions == 0 && self.incomplete == 0
    }
}

#[derive(Debug, Clone)]
struct StoredEntry {
    id: i64,
    fingerprint: Option<Fingerprint>,
}

/// Index of persisted rows by normalized key.
#[derive(Debug, Default)]
pub struct ExistingState {
    entries: HashMap<String, StoredEntry>,
    diagnostics: KeyDiagnostics,
}

impl ExistingState {
    /// Index persisted rows. When keys collide the later row wins.
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = PersistedRow>,
    {
        let mut state = Self::default();
        for row in rows {
            let key = KeyValue::from_parts(row.key_parts.iter().map(|p| p.as_deref()));
            state.diagnostics.observe(&key);
            let entry = StoredEntry {
                id: row.id,
                fingerprint: row.fingerprint.map(Fingerprint::from_stored),
            };
            let key = key.into_string();
            if state.entries.contains_key(&key) {
                state.diagnostics.record_collision(&key);
            }
            state.entries.insert(key, entry);
        }
        state
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn diagnostics(&self) -> &KeyDiagnostics {
        &self.diagnostics
    }

    /// Stored id for a key, if persisted.
    pub fn id_of(&self, key: &str) -> Option<i64> {
        self.entries.get(key).map(|e| e.id)
    }
}

/// An in-place update of a persisted row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedUpdate {
    pub id: i64,
    /// Index into the fresh record slice.
    pub record: usize,
    pub fingerprint: Fingerprint,
}

/// Outcome of one classification pass.
#[derive(Debug, Default)]
pub struct DiffResult {
    /// Fresh records with no persisted counterpart: `(record index, fingerprint)`.
    pub to_insert: Vec<(usize, Fingerprint)>,
    pub to_update: Vec<PlannedUpdate>,
    pub unchanged: usize,
    /// Key anomalies within the fresh snapshot.
    pub diagnostics: KeyDiagnostics,
}

/// Classify every fresh record as insert, update or unchanged.
///
/// When the snapshot contains the same key more than once the last occurrence
/// wins, keeping the position of the first. Every key is therefore written at
/// most once per run, and re-running on an unchanged snapshot writes nothing.
pub fn diff(
    existing: &ExistingState,
    records: &[Record],
    columns: &ColumnSet,
    key: &KeyColumns,
) -> DiffResult {
    let mut result = DiffResult::default();

    // Collapse duplicate keys first: key -> slot in `winners`.
    let mut slots: HashMap<String, usize> = HashMap::with_capacity(records.len());
    let mut winners: Vec<(String, usize)> = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        let identity = key_value(record, key);
        result.diagnostics.observe(&identity);
        let identity = identity.into_string();
        match slots.get(&identity) {
            Some(&slot) => {
                result.diagnostics.record_collision(&identity);
                winners[slot].1 = index;
            }
            None => {
                slots.insert(identity.clone(), winners.len());
                winners.push((identity, index));
            }
        }
    }

    for (identity, index) in winners {
        let fp = fingerprint(&records[index], columns);
        match existing.entries.get(&identity) {
            None => result.to_insert.push((index, fp)),
            Some(stored) if stored.fingerprint.as_ref() == Some(&fp) => result.unchanged += 1,
            Some(stored) => result.to_update.push(PlannedUpdate {
                id: stored.id,
                record: index,
                fingerprint: fp,
            }),
        }
    }

    result
}
