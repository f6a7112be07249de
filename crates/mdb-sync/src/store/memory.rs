//! In-memory destination store.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::core::{ColumnSpec, SqlValue, TableSpec};
use crate::error::{Result, SyncError};
use crate::reconcile::PersistedRow;

use super::{DestinationStore, CREATED_AT_COLUMN, UPDATED_AT_COLUMN};

/// A stored row.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryRow {
    pub id: i64,
    pub values: HashMap<String, SqlValue>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Number of updates applied since insert.
    pub updates: u32,
}

impl MemoryRow {
    /// Value of a column rendered as text; `None` for NULL or unknown columns.
    pub fn text(&self, column: &str) -> Option<String> {
        self.values.get(column).and_then(SqlValue::render)
    }
}

#[derive(Debug)]
struct MemoryTable {
    id_column: String,
    columns: Vec<String>,
    rows: BTreeMap<i64, MemoryRow>,
    next_id: i64,
}

/// Destination store kept entirely in memory.
///
/// Mirrors the MySQL store's behaviour closely enough to drive the whole
/// pipeline in tests: surrogate ids, timestamps, unknown-column errors, and
/// optional rejection of rows carrying a marker value.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, MemoryTable>>,
    reject_marker: Option<String>,
    checks_disabled: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject any insert or update containing a text value equal to `marker`.
    ///
    /// A multi-row insert containing one such row fails as a whole, the same
    /// way a single bad row fails a MySQL multi-row INSERT.
    pub fn with_reject_marker(mut self, marker: impl Into<String>) -> Self {
        self.reject_marker = Some(marker.into());
        self
    }

    /// Rows of a table ordered by id; empty when the table does not exist.
    pub async fn rows(&self, table: &str) -> Vec<MemoryRow> {
        self.tables
            .lock()
            .await
            .get(table)
            .map(|t| t.rows.values().cloned().collect())
            .unwrap_or_default()
    }

    /// First row whose `column` renders as `value`.
    pub async fn find(&self, table: &str, column: &str, value: &str) -> Option<MemoryRow> {
        self.rows(table)
            .await
            .into_iter()
            .find(|r| r.text(column).as_deref() == Some(value))
    }

    /// Whether constraint checks are currently enabled.
    pub fn constraint_checks_enabled(&self) -> bool {
        !self.checks_disabled.load(Ordering::SeqCst)
    }

    fn check_rejected(&self, table: &str, values: &[SqlValue]) -> Result<()> {
        let Some(marker) = &self.reject_marker else {
            return Ok(());
        };
        if values.iter().any(|v| v.as_text() == Some(marker.as_str())) {
            return Err(SyncError::write(table, format!("value '{}' rejected", marker)));
        }
        Ok(())
    }
}

fn missing_table(table: &str) -> SyncError {
    SyncError::write(table, "table does not exist")
}

fn check_columns(table: &str, known: &[String], columns: &[String]) -> Result<()> {
    match columns.iter().find(|c| !known.contains(c)) {
        Some(unknown) => Err(SyncError::write(table, format!("unknown column '{}'", unknown))),
        None => Ok(()),
    }
}

#[async_trait]
impl DestinationStore for MemoryStore {
    async fn table_exists(&self, table: &str) -> Result<bool> {
        Ok(self.tables.lock().await.contains_key(table))
    }

    async fn drop_table(&self, table: &str) -> Result<()> {
        self.tables.lock().await.remove(table);
        Ok(())
    }

    async fn create_table(&self, spec: &TableSpec) -> Result<()> {
        let mut tables = self.tables.lock().await;
        if tables.contains_key(&spec.name) {
            return Err(SyncError::write(&spec.name, "table already exists"));
        }

        let mut columns = vec![spec.id_column.clone()];
        columns.extend(spec.write_columns());
        columns.push(CREATED_AT_COLUMN.to_string());
        columns.push(UPDATED_AT_COLUMN.to_string());

        // Column names are case-insensitive, as in MySQL.
        for (i, column) in columns.iter().enumerate() {
            if columns[..i].iter().any(|c| c.eq_ignore_ascii_case(column)) {
                return Err(SyncError::write(
                    &spec.name,
                    format!("duplicate column name '{}'", column),
                ));
            }
        }

        tables.insert(
            spec.name.clone(),
            MemoryTable {
                id_column: spec.id_column.clone(),
                columns,
                rows: BTreeMap::new(),
                next_id: 1,
            },
        );
        Ok(())
    }

    async fn existing_columns(&self, table: &str) -> Result<Vec<String>> {
        let tables = self.tables.lock().await;
        let t = tables.get(table).ok_or_else(|| missing_table(table))?;
        Ok(t.columns.clone())
    }

    async fn add_column(&self, table: &str, column: &ColumnSpec) -> Result<()> {
        let mut tables = self.tables.lock().await;
        let t = tables.get_mut(table).ok_or_else(|| missing_table(table))?;
        if t.columns.iter().any(|c| c.eq_ignore_ascii_case(&column.name)) {
            return Err(SyncError::write(table, format!("duplicate column '{}'", column.name)));
        }
        t.columns.push(column.name.clone());
        Ok(())
    }

    async fn insert_batch(
        &self,
        table: &str,
        columns: &[String],
        rows: &[Vec<SqlValue>],
    ) -> Result<u64> {
        let mut tables = self.tables.lock().await;
        let t = tables.get_mut(table).ok_or_else(|| missing_table(table))?;
        check_columns(table, &t.columns, columns)?;

        for row in rows {
            if row.len() != columns.len() {
                return Err(SyncError::write(
                    table,
                    format!("expected {} values, got {}", columns.len(), row.len()),
                ));
            }
            self.check_rejected(table, row)?;
        }

        let now = Utc::now();
        for row in rows {
            let id = t.next_id;
            t.next_id += 1;
            let mut values: HashMap<String, SqlValue> =
                columns.iter().cloned().zip(row.iter().cloned()).collect();
            values.insert(t.id_column.clone(), SqlValue::Int(id));
            t.rows.insert(
                id,
                MemoryRow {
                    id,
                    values,
                    created_at: now,
                    updated_at: now,
                    updates: 0,
                },
            );
        }
        Ok(rows.len() as u64)
    }

    async fn update_row(
        &self,
        table: &str,
        _id_column: &str,
        id: i64,
        columns: &[String],
        values: &[SqlValue],
    ) -> Result<()> {
        let mut tables = self.tables.lock().await;
        let t = tables.get_mut(table).ok_or_else(|| missing_table(table))?;
        check_columns(table, &t.columns, columns)?;
        self.check_rejected(table, values)?;

        // Like an UPDATE matching no rows, an unknown id is not an error.
        if let Some(row) = t.rows.get_mut(&id) {
            for (column, value) in columns.iter().zip(values) {
                row.values.insert(column.clone(), value.clone());
            }
            row.updated_at = Utc::now();
            row.updates += 1;
        }
        Ok(())
    }

    async fn load_state(
        &self,
        table: &str,
        _id_column: &str,
        key_columns: &[String],
        hash_column: &str,
    ) -> Result<Vec<PersistedRow>> {
        let tables = self.tables.lock().await;
        let t = tables.get(table).ok_or_else(|| missing_table(table))?;
        Ok(t.rows
            .values()
            .map(|row| PersistedRow {
                id: row.id,
                key_parts: key_columns.iter().map(|k| row.text(k)).collect(),
                fingerprint: row.text(hash_column),
            })
            .collect())
    }

    async fn row_count(&self, table: &str) -> Result<i64> {
        let tables = self.tables.lock().await;
        let t = tables.get(table).ok_or_else(|| missing_table(table))?;
        Ok(t.rows.len() as i64)
    }

    async fn set_constraint_checks(&self, enabled: bool) -> Result<()> {
        self.checks_disabled.store(!enabled, Ordering::SeqCst);
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn store_type(&self) -> &'static str {
        "memory"
    }

    async fn close(&self) {}
}
