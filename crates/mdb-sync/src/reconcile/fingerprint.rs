//! Content fingerprints.
//!
//! The byte layout is fixed: persisted fingerprints from earlier runs must keep
//! comparing equal, so the marker, delimiter and column order cannot change.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::core::{ColumnSet, Record};

/// Stand-in for an absent or empty value.
///
/// A literal source value of `NULL` hashes the same as a missing one.
pub const NULL_MARKER: &str = "NULL";

/// Separator between column values.
pub const DELIMITER: &str = "|";

/// Hex-encoded SHA-256 of a record's values over a column set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wrap a fingerprint read back from the destination.
    pub fn from_stored(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fingerprint a record over the columns observed in its extraction pass.
///
/// Values are taken in lexicographic column order so the result does not
/// depend on extraction order. Columns absent from the record contribute
/// [`NULL_MARKER`], so adding a column to the source changes every fingerprint
/// of that table.
pub fn fingerprint(record: &Record, columns: &ColumnSet) -> Fingerprint {
    let mut hasher = Sha256::new();
    for (i, column) in columns.sorted().iter().enumerate() {
        if i > 0 {
            hasher.update(DELIMITER.as_bytes());
        }
        let value = record.text(column).unwrap_or(NULL_MARKER);
        hasher.update(value.as_bytes());
    }
    Fingerprint(hex::encode(hasher.finalize()))
}
