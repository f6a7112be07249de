//! Destination store abstraction.

mod memory;
mod mysql;

pub use memory::MemoryStore;
pub use mysql::{create_table_sql, quote_ident, MysqlStore};

use async_trait::async_trait;

use crate::core::{ColumnSpec, SqlValue, TableSpec};
use crate::error::Result;
use crate::reconcile::PersistedRow;

/// MySQL's limit on bound parameters per statement.
pub const MAX_PLACEHOLDERS: usize = 65535;

/// Name of the row creation timestamp column.
pub const CREATED_AT_COLUMN: &str = "created_at";

/// Name of the row update timestamp column.
pub const UPDATED_AT_COLUMN: &str = "updated_at";

/// Largest number of rows that fit in one multi-row INSERT.
pub fn max_rows_per_statement(num_cols: usize) -> usize {
    if num_cols == 0 {
        return 1;
    }
    (MAX_PLACEHOLDERS / num_cols).max(1)
}

/// Relational operations the sync needs from the destination.
#[async_trait]
pub trait DestinationStore: Send + Sync {
    /// Check whether a table exists.
    async fn table_exists(&self, table: &str) -> Result<bool>;

    /// Drop a table if it exists.
    async fn drop_table(&self, table: &str) -> Result<()>;

    /// Create a table from its layout.
    async fn create_table(&self, spec: &TableSpec) -> Result<()>;

    /// Column names of an existing table.
    async fn existing_columns(&self, table: &str) -> Result<Vec<String>>;

    /// Add a nullable data column to an existing table.
    async fn add_column(&self, table: &str, column: &ColumnSpec) -> Result<()>;

    /// Insert rows; every row has one value per entry in `columns`.
    ///
    /// Returns the number of rows written.
    async fn insert_batch(&self, table: &str, columns: &[String], rows: &[Vec<SqlValue>])
        -> Result<u64>;

    /// Rewrite `columns` of the row identified by `id` and bump its update timestamp.
    async fn update_row(
        &self,
        table: &str,
        id_column: &str,
        id: i64,
        columns: &[String],
        values: &[SqlValue],
    ) -> Result<()>;

    /// Scan `(id, key columns..., fingerprint)` of every row.
    async fn load_state(
        &self,
        table: &str,
        id_column: &str,
        key_columns: &[String],
        hash_column: &str,
    ) -> Result<Vec<PersistedRow>>;

    /// Number of rows in a table.
    async fn row_count(&self, table: &str) -> Result<i64>;

    /// Enable or disable foreign-key and unique checks for subsequent writes.
    async fn set_constraint_checks(&self, enabled: bool) -> Result<()>;

    /// Check the destination is reachable.
    async fn ping(&self) -> Result<()>;

    /// Short name of the store, for logs.
    fn store_type(&self) -> &'static str;

    /// Release the connection.
    async fn close(&self);
}
