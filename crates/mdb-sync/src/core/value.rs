//! Typed values bound into destination statements.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

/// Format used when rendering DATETIME values as text.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A value converted to its destination column type.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL NULL.
    Null,

    /// INT / TINYINT.
    Int(i64),

    /// DECIMAL(p,s).
    Decimal(Decimal),

    /// DATETIME.
    DateTime(NaiveDateTime),

    /// VARCHAR / TEXT.
    Text(String),
}

impl SqlValue {
    /// Check if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Render as text the way MySQL's text protocol would, `None` for NULL.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        match self {
            SqlValue::Null => None,
            SqlValue::Int(v) => Some(v.to_string()),
            SqlValue::Decimal(v) => Some(v.to_string()),
            SqlValue::DateTime(v) => Some(v.format(DATETIME_FORMAT).to_string()),
            SqlValue::Text(v) => Some(v.clone()),
        }
    }

    /// The text payload, if this is a text value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            SqlValue::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<Decimal> for SqlValue {
    fn from(v: Decimal) -> Self {
        SqlValue::Decimal(v)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(v: NaiveDateTime) -> Self {
        SqlValue::DateTime(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}
