//! Raw records as produced by the export utility.

use std::collections::HashSet;

/// A single extracted value.
///
/// A column absent from a record is represented by the lookup returning `None`;
/// `Empty` is a present column with no text. The two are kept apart so that
/// callers can tell "column missing" from "value empty".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    /// Present but empty.
    Empty,
    /// Present with raw text, exactly as exported.
    Value(String),
}

impl Field {
    /// Build a field from exported text; an empty string becomes `Empty`.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        if raw.is_empty() {
            Field::Empty
        } else {
            Field::Value(raw)
        }
    }

    /// The raw text, or `None` when empty.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Field::Empty => None,
            Field::Value(v) => Some(v),
        }
    }
}

/// An extracted row: column name to raw value, in extraction order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, Field)>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from `(column, raw text)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut record = Self::new();
        for (k, v) in pairs {
            record.set(k, Field::from_raw(v));
        }
        record
    }

    /// Set a column, replacing any previous value for it.
    pub fn set(&mut self, column: impl Into<String>, field: Field) {
        let column = column.into();
        match self.fields.iter_mut().find(|(c, _)| *c == column) {
            Some(slot) => slot.1 = field,
            None => self.fields.push((column, field)),
        }
    }

    /// Look up a column. `None` means the column is absent from this record.
    pub fn get(&self, column: &str) -> Option<&Field> {
        self.fields
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, f)| f)
    }

    /// Raw text for a column, `None` when absent or empty.
    pub fn text(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(Field::as_str)
    }

    /// Column names in extraction order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(c, _)| c.as_str())
    }

    /// Number of columns present.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the record has no columns.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Union of the columns observed across one extraction pass.
///
/// Keeps first-seen order for DDL and writes, and a lexicographically sorted
/// copy for fingerprinting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSet {
    ordered: Vec<String>,
    sorted: Vec<String>,
}

impl ColumnSet {
    /// Collect the union of columns over all records.
    pub fn from_records(records: &[Record]) -> Self {
        let mut seen = HashSet::new();
        let mut ordered = Vec::new();
        for record in records {
            for column in record.columns() {
                if seen.insert(column) {
                    ordered.push(column.to_string());
                }
            }
        }
        Self::from_columns(ordered)
    }

    /// Build a column set from an explicit column list (duplicates dropped).
    pub fn from_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ordered: Vec<String> = Vec::new();
        for column in columns {
            let column = column.into();
            if !ordered.contains(&column) {
                ordered.push(column);
            }
        }
        let mut sorted = ordered.clone();
        sorted.sort();
        Self { ordered, sorted }
    }

    /// Columns in first-seen order.
    pub fn ordered(&self) -> &[String] {
        &self.ordered
    }

    /// Columns in lexicographic order.
    pub fn sorted(&self) -> &[String] {
        &self.sorted
    }

    /// Check membership.
    pub fn contains(&self, column: &str) -> bool {
        self.ordered.iter().any(|c| c == column)
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    /// Check if no columns were observed.
    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}
