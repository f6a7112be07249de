//! Source side: record extraction and declared-schema discovery.

mod mdb;
mod memory;

pub use mdb::{parse_export, parse_schema_dump, MdbTools};
pub use memory::StaticSource;

use async_trait::async_trait;

use crate::core::{Record, TableSchema};
use crate::error::Result;

/// Reads every record of a source table.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Extract all records of `table`, in source order.
    ///
    /// A table with zero rows is `Ok(vec![])`. A table that cannot be read is
    /// an extraction error attributed to that table.
    async fn extract(&self, table: &str) -> Result<Vec<Record>>;

    /// Short name of the source, for logs.
    fn source_type(&self) -> &'static str;
}

/// Provides declared column types, when the source can describe itself.
#[async_trait]
pub trait SchemaSource: Send + Sync {
    /// Declared schema of `table`, or `None` if it is unavailable.
    ///
    /// Discovery problems are logged and reported as `None`; callers fall back
    /// to name-based type inference.
    async fn table_schema(&self, table: &str) -> Option<TableSchema>;
}
