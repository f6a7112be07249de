//! Core data types shared by the reconciliation engine and its adapters.
//!
//! - [`Record`] / [`Field`] / [`ColumnSet`]: raw extracted rows
//! - [`SqlValue`]: typed values bound into destination statements
//! - [`TableSpec`] / [`TableSchema`]: destination DDL and declared source schema

pub mod record;
pub mod schema;
pub mod value;

pub use record::{ColumnSet, Field, Record};
pub use schema::{ColumnSpec, DeclaredType, TableSchema, TableSpec};
pub use value::SqlValue;
