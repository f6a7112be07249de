//! Batched writes with row-by-row fallback.

use tracing::{debug, info, warn};

use crate::core::SqlValue;
use crate::store::{max_rows_per_statement, DestinationStore};

/// Rows between progress log lines.
const PROGRESS_INTERVAL: usize = 10_000;

/// Rows written and rows that could not be written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOutcome {
    pub written: u64,
    pub failed: u64,
}

/// Writes one table's inserts and updates.
pub struct BatchWriter<'a> {
    store: &'a dyn DestinationStore,
    table: &'a str,
    columns: &'a [String],
    batch_size: usize,
}

impl<'a> BatchWriter<'a> {
    /// Batches never exceed what one INSERT statement can carry, so a failed
    /// batch has written nothing and can be retried row by row.
    pub fn new(
        store: &'a dyn DestinationStore,
        table: &'a str,
        columns: &'a [String],
        batch_size: usize,
    ) -> Self {
        let batch_size = batch_size.clamp(1, max_rows_per_statement(columns.len()));
        Self {
            store,
            table,
            columns,
            batch_size,
        }
    }

    /// Insert rows in batches. A failed batch is retried one row at a time;
    /// rows that still fail are counted, not fatal.
    pub async fn insert_all(&self, rows: &[Vec<SqlValue>]) -> WriteOutcome {
        let mut outcome = WriteOutcome::default();
        let total = rows.len();

        for (n, batch) in rows.chunks(self.batch_size).enumerate() {
            let offset = n * self.batch_size;
            if offset > 0 && offset % PROGRESS_INTERVAL < self.batch_size {
                info!("{}: inserted {} / {}", self.table, offset, total);
            }

            match self.store.insert_batch(self.table, self.columns, batch).await {
                Ok(written) => outcome.written += written,
                Err(e) => {
                    warn!(
                        "{}: batch of {} rows failed ({}), retrying row by row",
                        self.table,
                        batch.len(),
                        e
                    );
                    for row in batch {
                        match self
                            .store
                            .insert_batch(self.table, self.columns, std::slice::from_ref(row))
                            .await
                        {
                            Ok(written) => outcome.written += written,
                            Err(e) => {
                                debug!("{}: row rejected: {}", self.table, e);
                                outcome.failed += 1;
                            }
                        }
                    }
                }
            }
        }

        if outcome.failed > 0 {
            warn!("{}: {} rows could not be inserted", self.table, outcome.failed);
        }
        outcome
    }

    /// Apply updates one row at a time, keyed by surrogate id.
    pub async fn update_all(&self, id_column: &str, updates: &[(i64, Vec<SqlValue>)]) -> WriteOutcome {
        let mut outcome = WriteOutcome::default();
        for (n, (id, values)) in updates.iter().enumerate() {
            if n > 0 && n % PROGRESS_INTERVAL == 0 {
                info!("{}: updated {} / {}", self.table, n, updates.len());
            }
            match self
                .store
                .update_row(self.table, id_column, *id, self.columns, values)
                .await
            {
                Ok(()) => outcome.written += 1,
                Err(e) => {
                    debug!("{}: update of {} {} failed: {}", self.table, id_column, id, e);
                    outcome.failed += 1;
                }
            }
        }

        if outcome.failed > 0 {
            warn!("{}: {} rows could not be updated", self.table, outcome.failed);
        }
        outcome
    }
}
