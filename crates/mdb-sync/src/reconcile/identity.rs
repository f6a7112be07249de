//! Natural-key identity.
//!
//! The same logical row is read from two places with different type systems:
//! untyped text from the export, and typed columns from the destination.
//! Fresh key components are first converted the way they will be stored,
//! then both sides are normalized so they agree, e.g. `"30"`, `"30.0"` and
//! `" 30 "` all become `30`, and `01/27/22` matches `2022-01-27 00:00:00`.

use rust_decimal::Decimal;
use tracing::warn;

use crate::config::TableConfig;
use crate::core::{ColumnSet, Record, TableSpec};
use crate::typemap::{parse_decimal, ColumnType};

const SEPARATOR: char = '|';
const ESCAPE: char = '\\';

/// Ordered natural-key columns of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyColumns {
    columns: Vec<String>,
    stored: Vec<String>,
    types: Vec<Option<ColumnType>>,
}

impl KeyColumns {
    /// Untyped key; components are compared as extracted.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        Self {
            stored: columns.clone(),
            types: vec![None; columns.len()],
            columns,
        }
    }

    /// Bind the key to the destination layout: destination column names and
    /// the types key components are converted through.
    pub fn with_layout(mut self, spec: &TableSpec) -> Self {
        for (i, column) in self.columns.iter().enumerate() {
            if let Some(col) = spec.column(column) {
                self.stored[i] = col.name.clone();
                self.types[i] = Some(col.ty);
            }
        }
        self
    }

    /// Source column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Destination column names, as read back by `load_state`.
    pub fn stored_columns(&self) -> &[String] {
        &self.stored
    }

    pub fn is_composite(&self) -> bool {
        self.columns.len() > 1
    }
}

/// Resolve the key for a table against the columns actually extracted.
///
/// Returns `None` when no key is configured or when any key column is missing
/// from the extraction; callers then fall back to a full refresh.
pub fn resolve_key(table: &TableConfig, observed: &ColumnSet) -> Option<KeyColumns> {
    if table.key.is_empty() {
        return None;
    }

    let missing: Vec<&str> = table
        .key
        .iter()
        .filter(|c| !observed.contains(c))
        .map(String::as_str)
        .collect();

    if !missing.is_empty() {
        warn!(
            "{}: key column(s) {} not present in extracted data",
            table.name,
            missing.join(", ")
        );
        return None;
    }

    Some(KeyColumns::new(table.key.iter().cloned()))
}

/// Canonical form of one key component.
///
/// Whitespace is trimmed. Text that parses as a number is replaced by its
/// canonical decimal form, with integral values rendered without a
/// fractional part. Other text is kept as-is, case preserved.
pub fn normalize_component(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return String::new();
    };
    let trimmed = raw.trim();
    match parse_decimal(trimmed) {
        Some(d) => canonical_decimal(d),
        None => trimmed.to_string(),
    }
}

fn canonical_decimal(d: Decimal) -> String {
    if d.fract().is_zero() {
        d.trunc().normalize().to_string()
    } else {
        d.normalize().to_string()
    }
}

/// Normalized identity of a row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyValue {
    value: String,
    incomplete: bool,
}

impl KeyValue {
    /// Build from raw component values (absent components as `None`).
    pub fn from_parts<'a, I>(parts: I) -> Self
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        let normalized: Vec<String> = parts.into_iter().map(normalize_component).collect();
        let incomplete = normalized.iter().any(String::is_empty);

        let value = if normalized.len() == 1 {
            normalized.into_iter().next().unwrap_or_default()
        } else {
            normalized
                .iter()
                .map(|p| escape(p))
                .collect::<Vec<_>>()
                .join(&SEPARATOR.to_string())
        };

        Self { value, incomplete }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn into_string(self) -> String {
        self.value
    }

    /// True when at least one component normalized to empty.
    pub fn is_incomplete(&self) -> bool {
        self.incomplete
    }
}

/// Identity of an extracted record.
///
/// Typed components are converted as they would be written, so the value
/// matches what `load_state` reads back. A component its column rejects is
/// stored as NULL and therefore counts as absent.
pub fn key_value(record: &Record, key: &KeyColumns) -> KeyValue {
    let parts: Vec<Option<String>> = key
        .columns
        .iter()
        .zip(&key.types)
        .map(|(column, ty)| match ty {
            Some(ty) => ty.convert(record.get(column)).ok().and_then(|v| v.render()),
            None => record.text(column).map(str::to_string),
        })
        .collect();
    KeyValue::from_parts(parts.iter().map(Option::as_deref))
}

fn escape(part: &str) -> String {
    let mut out = String::with_capacity(part.len());
    for ch in part.chars() {
        if ch == ESCAPE || ch == SEPARATOR {
            out.push(ESCAPE);
        }
        out.push(ch);
    }
    out
}
