//! Per-table reports and the run summary.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::RefreshStrategy;
use crate::error::Result;

/// Outcome of one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    Completed,
    Failed,
    /// Not attempted (run cancelled first).
    Skipped,
}

impl TableStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableStatus::Completed => "completed",
            TableStatus::Failed => "failed",
            TableStatus::Skipped => "skipped",
        }
    }
}

/// What happened to one table during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableReport {
    pub table: String,

    /// Strategy actually used (a keyless incremental table reports full_refresh).
    pub strategy: RefreshStrategy,

    pub status: TableStatus,

    pub rows_extracted: usize,
    pub rows_after_filters: usize,

    pub inserted: u64,
    pub updated: u64,
    pub unchanged: u64,

    /// Rows that could not be written even one at a time.
    pub failed_rows: u64,

    /// Values stored as NULL because they did not parse as their column type.
    pub malformed_values: u64,

    /// Persisted rows sharing a key with an earlier persisted row.
    pub state_collisions: usize,

    /// Extracted records sharing a key with an earlier record.
    pub fresh_collisions: usize,

    /// Extracted records with an empty key component.
    pub incomplete_keys: usize,

    /// Destination row count after the table was processed (stale on failure).
    pub final_count: i64,

    pub error: Option<String>,
}

impl TableReport {
    pub fn new(table: impl Into<String>, strategy: RefreshStrategy) -> Self {
        Self {
            table: table.into(),
            strategy,
            status: TableStatus::Completed,
            rows_extracted: 0,
            rows_after_filters: 0,
            inserted: 0,
            updated: 0,
            unchanged: 0,
            failed_rows: 0,
            malformed_values: 0,
            state_collisions: 0,
            fresh_collisions: 0,
            incomplete_keys: 0,
            final_count: 0,
            error: None,
        }
    }

    /// A table that was never attempted.
    pub fn skipped(table: impl Into<String>, strategy: RefreshStrategy) -> Self {
        Self {
            status: TableStatus::Skipped,
            ..Self::new(table, strategy)
        }
    }

    /// True if any key anomaly was observed.
    pub fn has_key_anomalies(&self) -> bool {
        self.state_collisions > 0 || self.fresh_collisions > 0 || self.incomplete_keys > 0
    }
}

/// Result of a sync run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResult {
    /// Unique run identifier.
    pub run_id: String,

    /// `completed`, `completed_with_errors` or `cancelled`.
    pub status: String,

    /// Nothing was written.
    pub dry_run: bool,

    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_seconds: f64,

    pub tables: Vec<TableReport>,

    /// Sum of final destination counts.
    pub grand_total: i64,

    pub tables_failed: usize,
    pub failed_tables: Vec<String>,
}

impl SyncResult {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check if any table failed.
    pub fn has_failures(&self) -> bool {
        self.tables_failed > 0
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == "cancelled"
    }

    /// Report for a table, by name.
    pub fn table(&self, name: &str) -> Option<&TableReport> {
        self.tables.iter().find(|t| t.table == name)
    }

    /// Human-readable summary table.
    pub fn render(&self) -> String {
        let width = self
            .tables
            .iter()
            .map(|t| t.table.len())
            .max()
            .unwrap_or(0)
            .max(5);

        let mut out = String::new();
        let _ = writeln!(
            out,
            "Sync {} ({}){}",
            self.status,
            self.run_id,
            if self.dry_run { " [dry run]" } else { "" }
        );
        let _ = writeln!(
            out,
            "{:<width$}  {:<12}  {:<9}  {:>9}  {:>8}  {:>8}  {:>9}  {:>6}  {:>9}",
            "Table", "Strategy", "Status", "Extracted", "Inserted", "Updated", "Unchanged", "Failed",
            "Count",
            width = width
        );
        for t in &self.tables {
            let _ = writeln!(
                out,
                "{:<width$}  {:<12}  {:<9}  {:>9}  {:>8}  {:>8}  {:>9}  {:>6}  {:>9}",
                t.table,
                t.strategy.to_string(),
                t.status.as_str(),
                t.rows_after_filters,
                t.inserted,
                t.updated,
                t.unchanged,
                t.failed_rows,
                t.final_count,
                width = width
            );
        }
        let _ = writeln!(out, "{:<width$}  {:>9}", "TOTAL", self.grand_total, width = width);

        for t in self.tables.iter().filter(|t| t.has_key_anomalies() || t.malformed_values > 0) {
            let _ = writeln!(
                out,
                "  {}: {} state collisions, {} duplicate keys, {} incomplete keys, {} malformed values",
                t.table, t.state_collisions, t.fresh_collisions, t.incomplete_keys, t.malformed_values
            );
        }
        for t in &self.tables {
            if let Some(err) = &t.error {
                let _ = writeln!(out, "  {}: ERROR {}", t.table, err);
            }
        }
        let _ = write!(out, "Duration: {:.1}s", self.duration_seconds);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result() -> SyncResult {
        let mut ok = TableReport::new("Cobradores", RefreshStrategy::Incremental);
        ok.rows_after_filters = 3;
        ok.inserted = 3;
        ok.final_count = 3;
        let mut failed = TableReport::new("Socios", RefreshStrategy::Incremental);
        failed.status = TableStatus::Failed;
        failed.error = Some("extraction failed".into());
        failed.final_count = 10;

        SyncResult {
            run_id: "run-1".into(),
            status: "completed_with_errors".into(),
            dry_run: false,
            started_at: Utc::now(),
            completed_at: Utc::now(),
            duration_seconds: 1.25,
            tables: vec![ok, failed],
            grand_total: 13,
            tables_failed: 1,
            failed_tables: vec!["Socios".into()],
        }
    }

    #[test]
    fn test_render_contains_tables_and_total() {
        let text = result().render();
        assert!(text.contains("Cobradores"));
        assert!(text.contains("TOTAL"));
        assert!(text.contains("13"));
        assert!(text.contains("Socios: ERROR extraction failed"));
    }

    #[test]
    fn test_to_json() {
        let json = result().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["grand_total"], 13);
        assert_eq!(value["tables"][0]["strategy"], "incremental");
        assert_eq!(value["tables"][1]["status"], "failed");
    }

    #[test]
    fn test_lookup_and_flags() {
        let r = result();
        assert!(r.has_failures());
        assert!(!r.is_cancelled());
        assert_eq!(r.table("Cobradores").map(|t| t.inserted), Some(3));
        assert_eq!(
            TableReport::skipped("Zonas", RefreshStrategy::FullRefresh).status,
            TableStatus::Skipped
        );
    }
}
