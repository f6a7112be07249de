//! In-memory source, used by tests and dry exercises of the pipeline.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::core::{Record, TableSchema};
use crate::error::{Result, SyncError};

use super::{Extractor, SchemaSource};

/// Source whose tables are provided up front.
///
/// Tables can be replaced between runs to simulate source changes, and marked
/// as failing to exercise per-table error handling.
#[derive(Default)]
pub struct StaticSource {
    tables: RwLock<HashMap<String, Vec<Record>>>,
    schemas: HashMap<String, TableSchema>,
    failing: RwLock<HashSet<String>>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style table registration.
    pub fn with_table(mut self, name: &str, records: Vec<Record>) -> Self {
        self.tables.get_mut().insert(name.to_string(), records);
        self
    }

    /// Builder-style declared schema registration.
    pub fn with_schema(mut self, schema: TableSchema) -> Self {
        self.schemas.insert(schema.name.clone(), schema);
        self
    }

    /// Replace a table's records.
    pub async fn set_table(&self, name: &str, records: Vec<Record>) {
        self.tables.write().await.insert(name.to_string(), records);
    }

    /// Make extraction of `name` fail (or succeed again).
    pub async fn set_failing(&self, name: &str, failing: bool) {
        let mut set = self.failing.write().await;
        if failing {
            set.insert(name.to_string());
        } else {
            set.remove(name);
        }
    }
}

#[async_trait]
impl Extractor for StaticSource {
    async fn extract(&self, table: &str) -> Result<Vec<Record>> {
        if self.failing.read().await.contains(table) {
            return Err(SyncError::extraction(table, "source table is unreadable"));
        }
        self.tables
            .read()
            .await
            .get(table)
            .cloned()
            .ok_or_else(|| SyncError::extraction(table, "table not found in source"))
    }

    fn source_type(&self) -> &'static str {
        "static"
    }
}

#[async_trait]
impl SchemaSource for StaticSource {
    async fn table_schema(&self, table: &str) -> Option<TableSchema> {
        self.schemas.get(table).cloned()
    }
}
