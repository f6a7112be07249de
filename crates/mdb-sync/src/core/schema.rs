//! Declared source schema and destination table layout.

use std::collections::HashMap;

use crate::typemap::ColumnType;

/// Column type as declared by the source schema dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclaredType {
    /// `varchar`, with its declared length when present.
    VarChar(Option<u32>),
    /// `text` / memo.
    Text,
    /// `smallint`, `int`, `integer`, `bigint`, or an auto-increment counter.
    Integer,
    /// `float`, `double`, `numeric`, `decimal`, `money`.
    Real,
    /// `boolean` / `bit`.
    Boolean,
    /// `date` / `datetime`.
    DateTime,
    /// Anything else, kept verbatim.
    Other(String),
}

impl DeclaredType {
    /// Parse a column type as written in a `CREATE TABLE` body.
    ///
    /// Nullability and auto-increment markers are stripped; a counter column
    /// is treated as an integer.
    pub fn parse(raw: &str) -> Self {
        let lower = raw.to_lowercase();
        let clean = lower.replace("not null", "");
        let clean = clean.trim();

        if clean.contains("auto_increment") {
            return DeclaredType::Integer;
        }

        if let Some(rest) = clean.strip_prefix("varchar") {
            let length = rest
                .trim()
                .strip_prefix('(')
                .and_then(|r| r.split(')').next())
                .and_then(|n| n.trim().parse().ok());
            return DeclaredType::VarChar(length);
        }

        // Drop any precision suffix: "numeric (18, 0)" -> "numeric".
        let base = clean
            .split(|c: char| c == '(' || c.is_whitespace())
            .next()
            .unwrap_or_default();

        match base {
            "text" | "memo" | "longtext" | "mediumtext" => DeclaredType::Text,
            "smallint" | "int" | "integer" | "bigint" | "long" => DeclaredType::Integer,
            "float" | "double" | "real" | "numeric" | "decimal" | "money" | "currency" => {
                DeclaredType::Real
            }
            "boolean" | "bool" | "bit" => DeclaredType::Boolean,
            "date" | "datetime" | "timestamp" => DeclaredType::DateTime,
            _ => DeclaredType::Other(clean.to_string()),
        }
    }
}

/// Declared column types for one source table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSchema {
    pub name: String,
    columns: HashMap<String, DeclaredType>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: HashMap::new(),
        }
    }

    /// Add a declared column.
    pub fn with_column(mut self, column: impl Into<String>, ty: DeclaredType) -> Self {
        self.columns.insert(column.into(), ty);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, ty: DeclaredType) {
        self.columns.insert(column.into(), ty);
    }

    /// Declared type of a column, if the schema lists it.
    pub fn column(&self, column: &str) -> Option<&DeclaredType> {
        self.columns.get(column)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// A data column of a destination table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Column name in the extracted records.
    pub source: String,
    /// Column name in the destination table.
    pub name: String,
    pub ty: ColumnType,
}

impl ColumnSpec {
    /// A column stored under its source name.
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        let name = name.into();
        Self {
            source: name.clone(),
            name,
            ty,
        }
    }

    /// A column stored under a different name than it is extracted with.
    pub fn mapped(source: impl Into<String>, name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            source: source.into(),
            name: name.into(),
            ty,
        }
    }

    pub fn is_renamed(&self) -> bool {
        self.source != self.name
    }
}

/// Layout of a destination table.
///
/// Besides the data columns every table carries a surrogate auto-increment
/// id, the row fingerprint column, and `created_at` / `updated_at`
/// timestamps maintained by the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    pub name: String,
    pub id_column: String,
    pub hash_column: String,
    pub columns: Vec<ColumnSpec>,
}

impl TableSpec {
    /// Column names written on insert/update: data columns, then the hash column.
    pub fn write_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .map(|c| c.name.clone())
            .chain(std::iter::once(self.hash_column.clone()))
            .collect()
    }

    /// Look up a data column by its source name.
    pub fn column(&self, source: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.source == source)
    }
}
