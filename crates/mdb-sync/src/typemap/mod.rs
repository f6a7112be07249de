//! Destination column typing: inference from the declared source schema or
//! from column-naming conventions, DDL rendering, and value conversion.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::config::TypingConfig;
use crate::core::{DeclaredType, Field, SqlValue, TableSchema};

/// Precision and scale used for every monetary / floating column.
pub const DECIMAL_PRECISION: u8 = 15;
pub const DECIMAL_SCALE: u8 = 4;

/// Timestamp layouts produced by the export utility, tried in order.
const DATETIME_FORMATS: &[&str] = &["%m/%d/%y %H:%M:%S", "%m/%d/%Y %H:%M:%S", "%Y-%m-%d %H:%M:%S"];
const DATE_FORMATS: &[&str] = &["%m/%d/%y", "%m/%d/%Y", "%Y-%m-%d"];

/// Destination column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    DateTime,
    Decimal { precision: u8, scale: u8 },
    Integer,
    /// Boolean flag stored as `TINYINT(1)`.
    TinyInt,
    VarChar(u32),
    Text,
}

impl ColumnType {
    /// The monetary decimal type.
    pub const fn money() -> Self {
        ColumnType::Decimal {
            precision: DECIMAL_PRECISION,
            scale: DECIMAL_SCALE,
        }
    }

    /// MySQL DDL for this type.
    pub fn ddl(&self) -> String {
        match self {
            ColumnType::DateTime => "DATETIME".to_string(),
            ColumnType::Decimal { precision, scale } => format!("DECIMAL({},{})", precision, scale),
            ColumnType::Integer => "INT".to_string(),
            ColumnType::TinyInt => "TINYINT(1)".to_string(),
            ColumnType::VarChar(n) => format!("VARCHAR({})", n),
            ColumnType::Text => "TEXT".to_string(),
        }
    }

    /// Convert an extracted field to a typed value.
    ///
    /// Absent and empty fields become NULL. A value that cannot be parsed for
    /// this type is returned as `Err` with the offending text; callers store
    /// NULL and count it.
    pub fn convert(&self, field: Option<&Field>) -> Result<SqlValue, MalformedValue> {
        let Some(raw) = field.and_then(Field::as_str) else {
            return Ok(SqlValue::Null);
        };

        let parsed = match self {
            ColumnType::VarChar(_) | ColumnType::Text => Some(SqlValue::Text(raw.to_string())),
            ColumnType::DateTime => parse_datetime(raw).map(SqlValue::DateTime),
            ColumnType::Decimal { scale, .. } => {
                parse_decimal(raw).map(|d| {
                // MySQL rounds half away from zero when narrowing to the scale.
                SqlValue::Decimal(d.round_dp_with_strategy(
                    u32::from(*scale),
                    RoundingStrategy::MidpointAwayFromZero,
                ))
            })
            }
            ColumnType::Integer => parse_integer(raw).map(SqlValue::Int),
            ColumnType::TinyInt => parse_flag(raw).map(SqlValue::Int),
        };

        parsed.ok_or_else(|| MalformedValue {
            raw: raw.to_string(),
            expected: *self,
        })
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.ddl())
    }
}

/// A source value that does not parse as its column's type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedValue {
    pub raw: String,
    pub expected: ColumnType,
}

impl fmt::Display for MalformedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is not a valid {}", self.raw, self.expected)
    }
}

/// Decide the destination type of a column.
///
/// The declared source schema wins when it lists the column; otherwise the
/// column name is matched against the naming conventions in `rules`, in the
/// order date, decimal, integer, text.
pub fn infer_type(column: &str, schema: Option<&TableSchema>, rules: &TypingConfig) -> ColumnType {
    if let Some(declared) = schema.and_then(|s| s.column(column)) {
        return translate(declared, rules.text_length);
    }
    infer_from_name(column, rules)
}

/// Map a declared source type to a destination type.
pub fn translate(declared: &DeclaredType, text_length: u32) -> ColumnType {
    match declared {
        DeclaredType::VarChar(Some(n)) => ColumnType::VarChar(*n),
        DeclaredType::VarChar(None) => ColumnType::VarChar(text_length),
        DeclaredType::Text => ColumnType::Text,
        DeclaredType::Integer => ColumnType::Integer,
        DeclaredType::Real => ColumnType::money(),
        DeclaredType::Boolean => ColumnType::TinyInt,
        DeclaredType::DateTime => ColumnType::DateTime,
        DeclaredType::Other(_) => ColumnType::VarChar(text_length),
    }
}

/// Naming-convention inference, used when no declared type is available.
pub fn infer_from_name(column: &str, rules: &TypingConfig) -> ColumnType {
    let upper = column.to_uppercase();
    let listed = |list: &[String]| list.iter().any(|c| c.eq_ignore_ascii_case(&upper));
    let contains = |list: &[String]| list.iter().any(|t| upper.contains(&t.to_uppercase()));
    let prefixed = |list: &[String]| list.iter().any(|p| upper.starts_with(&p.to_uppercase()));
    let suffixed = |list: &[String]| list.iter().any(|s| upper.ends_with(&s.to_uppercase()));

    if contains(&rules.date_tokens) || listed(&rules.date_columns) {
        return ColumnType::DateTime;
    }

    if prefixed(&rules.decimal_prefixes)
        || suffixed(&rules.decimal_suffixes)
        || contains(&rules.decimal_tokens)
        || listed(&rules.decimal_columns)
    {
        return ColumnType::money();
    }

    let integer_pattern = prefixed(&rules.integer_prefixes) || suffixed(&rules.integer_suffixes);
    if (integer_pattern && !listed(&rules.text_columns)) || listed(&rules.integer_columns) {
        return ColumnType::Integer;
    }

    ColumnType::VarChar(rules.text_length)
}

/// Parse an exported timestamp; date-only values get midnight.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Parse a decimal, accepting scientific notation.
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

/// Parse an `INT` value. Integral decimals ("30.0") are accepted.
fn parse_integer(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    let value = match raw.parse::<i64>() {
        Ok(v) => v,
        Err(_) => {
            let d = parse_decimal(raw)?;
            if !d.fract().is_zero() {
                return None;
            }
            d.to_i64()?
        }
    };
    i32::try_from(value).ok().map(i64::from)
}

fn parse_flag(raw: &str) -> Option<i64> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "-1" | "yes" => Some(1),
        "0" | "false" | "no" => Some(0),
        _ => None,
    }
}
