//! Sync orchestrator: runs every configured table through extraction,
//! filtering, typing, change detection and writes, then summarizes.

mod health;
mod report;
mod writer;

pub use health::{health_check, HealthCheckResult};
pub use report::{SyncResult, TableReport, TableStatus};
pub use writer::{BatchWriter, WriteOutcome};

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{Config, RefreshStrategy, TableConfig};
use crate::core::{ColumnSet, ColumnSpec, Record, SqlValue, TableSpec};
use crate::error::Result;
use crate::filter::{apply_filters, required_captures, CapturedSets};
use crate::reconcile::{diff, fingerprint, resolve_key, ExistingState, Fingerprint, KeyColumns};
use crate::source::{Extractor, MdbTools, SchemaSource};
use crate::store::{DestinationStore, MysqlStore, CREATED_AT_COLUMN, UPDATED_AT_COLUMN};
use crate::typemap::infer_type;

/// Prefix for source columns whose name is taken by a bookkeeping column.
const RENAMED_PREFIX: &str = "src_";

/// Sync orchestrator.
pub struct Orchestrator {
    config: Config,
    extractor: Arc<dyn Extractor>,
    schema_source: Option<Arc<dyn SchemaSource>>,
    store: Arc<dyn DestinationStore>,
    dry_run: bool,
}

impl Orchestrator {
    /// Build from explicit components.
    pub fn new(
        config: Config,
        extractor: Arc<dyn Extractor>,
        schema_source: Option<Arc<dyn SchemaSource>>,
        store: Arc<dyn DestinationStore>,
    ) -> Self {
        Self {
            config,
            extractor,
            schema_source,
            store,
            dry_run: false,
        }
    }

    /// Build the production pipeline: mdbtools source, MySQL destination.
    pub async fn connect(config: Config) -> Result<Self> {
        let tools = Arc::new(MdbTools::new(&config.source));
        let schema_source: Option<Arc<dyn SchemaSource>> = if config.source.use_schema {
            Some(tools.clone() as Arc<dyn SchemaSource>)
        } else {
            None
        };
        let store = Arc::new(MysqlStore::connect(&config.target).await?);
        Ok(Self::new(config, tools, schema_source, store))
    }

    /// Extract and diff without writing anything.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Run the sync over every configured table, in order.
    ///
    /// Per-table failures are recorded in the result and never abort the run.
    /// Cancellation is checked between tables. The destination connection is
    /// released before returning.
    pub async fn run(self, cancel: Option<CancellationToken>) -> Result<SyncResult> {
        let outcome = self.run_tables(cancel.unwrap_or_else(CancellationToken::new)).await;
        self.store.close().await;
        outcome
    }

    async fn run_tables(&self, cancel: CancellationToken) -> Result<SyncResult> {
        let started_at = Utc::now();
        let run_id = uuid::Uuid::new_v4().to_string();

        info!(
            "Starting sync run {} ({} tables, source: {}, target: {}{})",
            run_id,
            self.config.sync.tables.len(),
            self.extractor.source_type(),
            self.store.store_type(),
            if self.dry_run { ", dry run" } else { "" }
        );

        self.store.ping().await?;

        let captures = required_captures(&self.config.sync.tables);
        let mut captured = CapturedSets::new();
        let mut reports = Vec::with_capacity(self.config.sync.tables.len());

        for table in &self.config.sync.tables {
            if cancel.is_cancelled() {
                info!("{}: skipped (cancellation requested)", table.name);
                reports.push(TableReport::skipped(&table.name, table.strategy));
                continue;
            }

            info!("{}: syncing ({})", table.name, table.strategy);
            let mut report = TableReport::new(&table.name, table.strategy);

            match self.sync_table(table, &captures, &mut captured, &mut report).await {
                Ok(()) => {
                    info!(
                        "{}: {} inserted, {} updated, {} unchanged, {} failed, {} rows total",
                        table.name,
                        report.inserted,
                        report.updated,
                        report.unchanged,
                        report.failed_rows,
                        report.final_count
                    );
                }
                Err(e) => {
                    error!("{}: {}", table.name, e);
                    report.status = TableStatus::Failed;
                    report.error = Some(e.to_string());
                    report.final_count = self.prior_count(&table.name).await;
                    if !self.dry_run {
                        if let Err(e) = self.store.set_constraint_checks(true).await {
                            warn!("Could not re-enable constraint checks: {}", e);
                        }
                    }
                }
            }
            reports.push(report);
        }

        let completed_at = Utc::now();
        let duration_seconds = (completed_at - started_at).num_milliseconds() as f64 / 1000.0;
        let failed_tables: Vec<String> = reports
            .iter()
            .filter(|r| r.status == TableStatus::Failed)
            .map(|r| r.table.clone())
            .collect();

        let status = if cancel.is_cancelled() {
            "cancelled"
        } else if !failed_tables.is_empty() {
            "completed_with_errors"
        } else {
            "completed"
        };

        let result = SyncResult {
            run_id,
            status: status.to_string(),
            dry_run: self.dry_run,
            started_at,
            completed_at,
            duration_seconds,
            grand_total: reports.iter().map(|r| r.final_count).sum(),
            tables_failed: failed_tables.len(),
            failed_tables,
            tables: reports,
        };

        info!(
            "Sync {}: {} tables, {} rows in destination, {:.1}s",
            result.status,
            result.tables.len(),
            result.grand_total,
            result.duration_seconds
        );

        Ok(result)
    }

    /// Destination count before a failure; zero when unknown.
    async fn prior_count(&self, table: &str) -> i64 {
        match self.store.table_exists(table).await {
            Ok(true) => self.store.row_count(table).await.unwrap_or(0),
            _ => 0,
        }
    }

    async fn sync_table(
        &self,
        table: &TableConfig,
        captures: &[(String, String)],
        captured: &mut CapturedSets,
        report: &mut TableReport,
    ) -> Result<()> {
        let records = self.extractor.extract(&table.name).await?;
        report.rows_extracted = records.len();

        let records = apply_filters(&table.name, records, &table.filters, captured);
        report.rows_after_filters = records.len();
        if !table.filters.is_empty() {
            info!(
                "{}: {} of {} records pass filters",
                table.name, report.rows_after_filters, report.rows_extracted
            );
        }

        for (source, column) in captures {
            if *source == table.name {
                captured.capture(source, column, &records);
            }
        }

        if records.is_empty() {
            info!("{}: no records, nothing to write", table.name);
            report.final_count = self.prior_count(&table.name).await;
            return Ok(());
        }

        let columns = ColumnSet::from_records(&records);
        let spec = self.table_spec(&table.name, &columns).await;

        let key = match table.strategy {
            RefreshStrategy::FullRefresh => None,
            RefreshStrategy::Incremental => {
                let key = resolve_key(table, &columns);
                if key.is_none() {
                    warn!("{}: no usable key, falling back to full refresh", table.name);
                }
                key
            }
        };

        match key {
            Some(key) => {
                let key = key.with_layout(&spec);
                self.incremental(&spec, &key, &columns, &records, report).await?
            }
            None => {
                report.strategy = RefreshStrategy::FullRefresh;
                self.full_refresh(&spec, &columns, &records, report).await?
            }
        }

        if report.malformed_values > 0 {
            warn!(
                "{}: {} values did not match their column type and were stored as NULL",
                table.name, report.malformed_values
            );
        }

        report.final_count = if self.dry_run {
            self.prior_count(&table.name).await
        } else {
            self.store.row_count(&table.name).await?
        };
        Ok(())
    }

    /// Destination layout: observed columns typed by declared schema or name.
    async fn table_spec(&self, table: &str, columns: &ColumnSet) -> TableSpec {
        let schema = match &self.schema_source {
            Some(source) => source.table_schema(table).await,
            None => None,
        };
        if schema.is_none() {
            debug!("{}: no declared schema, using name-based typing", table);
        }

        let reserved = [
            self.config.sync.id_column.as_str(),
            self.config.sync.row_hash_column.as_str(),
            CREATED_AT_COLUMN,
            UPDATED_AT_COLUMN,
        ];
        let spec_columns: Vec<ColumnSpec> = columns
            .ordered()
            .iter()
            .map(|c| {
                let ty = infer_type(c, schema.as_ref(), &self.config.typing);
                ColumnSpec::mapped(c, destination_name(c, &reserved, columns), ty)
            })
            .collect();

        for column in spec_columns.iter().filter(|c| c.is_renamed()) {
            warn!(
                "{}: column {} clashes with a reserved column, stored as {}",
                table, column.source, column.name
            );
        }

        TableSpec {
            name: table.to_string(),
            id_column: self.config.sync.id_column.clone(),
            hash_column: self.config.sync.row_hash_column.clone(),
            columns: spec_columns,
        }
    }

    async fn full_refresh(
        &self,
        spec: &TableSpec,
        columns: &ColumnSet,
        records: &[Record],
        report: &mut TableReport,
    ) -> Result<()> {
        let rows: Vec<Vec<SqlValue>> = records
            .iter()
            .map(|r| typed_row(spec, r, fingerprint(r, columns), report))
            .collect();

        if self.dry_run {
            report.inserted = rows.len() as u64;
            return Ok(());
        }

        info!("{}: recreating table", spec.name);
        self.store.drop_table(&spec.name).await?;
        self.store.create_table(spec).await?;

        let write_columns = spec.write_columns();
        let writer = BatchWriter::new(
            self.store.as_ref(),
            &spec.name,
            &write_columns,
            self.config.sync.batch_size,
        );

        self.store.set_constraint_checks(false).await?;
        let outcome = writer.insert_all(&rows).await;
        self.store.set_constraint_checks(true).await?;

        report.inserted = outcome.written;
        report.failed_rows = outcome.failed;
        Ok(())
    }

    async fn incremental(
        &self,
        spec: &TableSpec,
        key: &KeyColumns,
        columns: &ColumnSet,
        records: &[Record],
        report: &mut TableReport,
    ) -> Result<()> {
        let exists = self.store.table_exists(&spec.name).await?;

        let mut added = Vec::new();
        if exists {
            added = self.add_missing_columns(spec).await?;
        } else if !self.dry_run {
            info!("{}: creating table", spec.name);
            self.store.create_table(spec).await?;
        }

        // A dry run does not add columns, so a key column new to the table
        // cannot be read back; no persisted row can match it anyway.
        let key_is_new = key.stored_columns().iter().any(|k| added.contains(k));
        let state = if exists && !(self.dry_run && key_is_new) {
            let rows = self
                .store
                .load_state(
                    &spec.name,
                    &spec.id_column,
                    key.stored_columns(),
                    &spec.hash_column,
                )
                .await?;
            ExistingState::from_rows(rows)
        } else {
            ExistingState::default()
        };

        let diagnostics = state.diagnostics();
        report.state_collisions = diagnostics.collisions;
        if diagnostics.collisions > 0 {
            warn!(
                "{}: {} persisted rows share a key with another row (e.g. {}); the last one is matched",
                spec.name,
                diagnostics.collisions,
                diagnostics.samples.join(", ")
            );
        }

        let plan = diff(&state, records, columns, key);
        report.fresh_collisions = plan.diagnostics.collisions;
        report.incomplete_keys = plan.diagnostics.incomplete;
        report.unchanged = plan.unchanged as u64;
        if plan.diagnostics.collisions > 0 {
            warn!(
                "{}: {} extracted records repeat an earlier key (e.g. {}); the last one wins",
                spec.name,
                plan.diagnostics.collisions,
                plan.diagnostics.samples.join(", ")
            );
        }
        if plan.diagnostics.incomplete > 0 {
            warn!(
                "{}: {} extracted records have an empty key component",
                spec.name, plan.diagnostics.incomplete
            );
        }

        info!(
            "{}: {} to insert, {} to update, {} unchanged",
            spec.name,
            plan.to_insert.len(),
            plan.to_update.len(),
            plan.unchanged
        );

        let inserts: Vec<Vec<SqlValue>> = plan
            .to_insert
            .into_iter()
            .map(|(i, fp)| typed_row(spec, &records[i], fp, report))
            .collect();
        let updates: Vec<(i64, Vec<SqlValue>)> = plan
            .to_update
            .into_iter()
            .map(|u| {
                let row = typed_row(spec, &records[u.record], u.fingerprint, report);
                (u.id, row)
            })
            .collect();

        if self.dry_run {
            report.inserted = inserts.len() as u64;
            report.updated = updates.len() as u64;
            return Ok(());
        }

        let write_columns = spec.write_columns();
        let writer = BatchWriter::new(
            self.store.as_ref(),
            &spec.name,
            &write_columns,
            self.config.sync.batch_size,
        );

        self.store.set_constraint_checks(false).await?;
        let inserted = writer.insert_all(&inserts).await;
        let updated = writer.update_all(&spec.id_column, &updates).await;
        self.store.set_constraint_checks(true).await?;

        report.inserted = inserted.written;
        report.updated = updated.written;
        report.failed_rows = inserted.failed + updated.failed;
        Ok(())
    }

    /// Add observed columns the destination table does not have yet.
    ///
    /// Returns the destination names of the missing columns, whether or not
    /// they were actually added.
    async fn add_missing_columns(&self, spec: &TableSpec) -> Result<Vec<String>> {
        let existing = self.store.existing_columns(&spec.name).await?;
        let mut added = Vec::new();
        for column in spec
            .columns
            .iter()
            .filter(|c| !existing.iter().any(|e| e.eq_ignore_ascii_case(&c.name)))
        {
            if self.dry_run {
                info!("{}: would add column {} {}", spec.name, column.name, column.ty);
            } else {
                info!("{}: adding column {} {}", spec.name, column.name, column.ty);
                self.store.add_column(&spec.name, column).await?;
            }
            added.push(column.name.clone());
        }
        Ok(added)
    }
}

/// Convert a record to the table's write columns, fingerprint last.
fn typed_row(
    spec: &TableSpec,
    record: &Record,
    fp: Fingerprint,
    report: &mut TableReport,
) -> Vec<SqlValue> {
    let mut row = Vec::with_capacity(spec.columns.len() + 1);
    for column in &spec.columns {
        let value = match column.ty.convert(record.get(&column.source)) {
            Ok(v) => v,
            Err(malformed) => {
                debug!("{}.{}: {}", spec.name, column.name, malformed);
                report.malformed_values += 1;
                SqlValue::Null
            }
        };
        row.push(value);
    }
    row.push(SqlValue::Text(fp.into_string()));
    row
}

/// Destination name for a source column.
///
/// MySQL compares column names case-insensitively, so a source `ID` clashes
/// with the surrogate `id`. Clashing names get `src_` prefixes until the name
/// is free among the reserved and the observed columns.
fn destination_name(column: &str, reserved: &[&str], observed: &ColumnSet) -> String {
    let taken = |name: &str| {
        reserved.iter().any(|r| r.eq_ignore_ascii_case(name))
            || (name != column
                && observed
                    .ordered()
                    .iter()
                    .any(|c| c.eq_ignore_ascii_case(name)))
    };

    let mut name = column.to_string();
    while taken(&name) {
        name = format!("{}{}", RENAMED_PREFIX, name);
    }
    name
}
