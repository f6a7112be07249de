//! MySQL destination store.

use async_trait::async_trait;
use chrono::{Datelike, Timelike};
use mysql_async::prelude::*;
use mysql_async::{Conn, OptsBuilder, Row, SslOpts, Value};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::TargetConfig;
use crate::core::{ColumnSpec, SqlValue, TableSpec};
use crate::error::{Result, SyncError};
use crate::reconcile::PersistedRow;

use super::{max_rows_per_statement, DestinationStore, CREATED_AT_COLUMN, UPDATED_AT_COLUMN};

/// Quote a MySQL identifier.
pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Full `CREATE TABLE` statement for a table layout.
pub fn create_table_sql(spec: &TableSpec) -> String {
    let mut defs = Vec::with_capacity(spec.columns.len() + 4);
    defs.push(format!("{} INT AUTO_INCREMENT PRIMARY KEY", quote_ident(&spec.id_column)));
    for col in &spec.columns {
        defs.push(column_def(col));
    }
    defs.push(format!("{} VARCHAR(64) NULL", quote_ident(&spec.hash_column)));
    defs.push(format!(
        "{} TIMESTAMP DEFAULT CURRENT_TIMESTAMP",
        quote_ident(CREATED_AT_COLUMN)
    ));
    defs.push(format!(
        "{} TIMESTAMP DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP",
        quote_ident(UPDATED_AT_COLUMN)
    ));

    format!(
        "CREATE TABLE {} (\n    {}\n) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4",
        quote_ident(&spec.name),
        defs.join(",\n    ")
    )
}

fn column_def(col: &ColumnSpec) -> String {
    format!("{} {} NULL", quote_ident(&col.name), col.ty.ddl())
}

/// MySQL store holding one dedicated connection for the whole run.
///
/// Session settings such as `FOREIGN_KEY_CHECKS` are per connection, so every
/// statement goes through the same one.
pub struct MysqlStore {
    conn: Mutex<Option<Conn>>,
    database: String,
}

impl MysqlStore {
    /// Connect using the target configuration.
    pub async fn connect(config: &TargetConfig) -> Result<Self> {
        let ssl_opts = match config.ssl_mode.to_lowercase().as_str() {
            "disable" => {
                warn!("MySQL TLS is disabled. Credentials will be transmitted in plaintext.");
                None
            }
            "prefer" | "require" => Some(SslOpts::default().with_danger_accept_invalid_certs(true)),
            "verify-ca" | "verify_ca" | "verify-full" | "verify_identity" => Some(SslOpts::default()),
            other => {
                warn!("Unknown ssl_mode '{}', defaulting to prefer", other);
                Some(SslOpts::default().with_danger_accept_invalid_certs(true))
            }
        };

        let mut builder = OptsBuilder::default()
            .ip_or_hostname(&config.host)
            .tcp_port(config.port)
            .db_name(Some(&config.database))
            .user(Some(&config.user))
            .pass(Some(&config.password))
            .init(vec!["SET NAMES utf8mb4"]);

        if let Some(ssl) = ssl_opts {
            builder = builder.ssl_opts(ssl);
        }

        let mut conn = Conn::new(builder).await?;
        conn.query_drop("SELECT 1").await?;

        info!(
            "Connected to MySQL target: {}:{}/{}",
            config.host, config.port, config.database
        );

        Ok(Self {
            conn: Mutex::new(Some(conn)),
            database: config.database.clone(),
        })
    }

    /// Database (schema) name.
    pub fn database(&self) -> &str {
        &self.database
    }
}

fn closed() -> SyncError {
    SyncError::Config("MySQL connection already closed".to_string())
}

#[async_trait]
impl DestinationStore for MysqlStore {
    async fn table_exists(&self, table: &str) -> Result<bool> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(closed)?;

        let sql = r#"
            SELECT COUNT(*) as cnt FROM information_schema.TABLES
            WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?
        "#;
        let count: Option<i64> = conn.exec_first(sql, (table,)).await?;
        Ok(count.unwrap_or(0) > 0)
    }

    async fn drop_table(&self, table: &str) -> Result<()> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(closed)?;

        let sql = format!("DROP TABLE IF EXISTS {}", quote_ident(table));
        conn.query_drop(&sql)
            .await
            .map_err(|e| SyncError::write(table, format!("DROP TABLE: {}", e)))?;
        debug!("Dropped table {}", table);
        Ok(())
    }

    async fn create_table(&self, spec: &TableSpec) -> Result<()> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(closed)?;

        let sql = create_table_sql(spec);
        debug!("{}", sql);
        conn.query_drop(&sql)
            .await
            .map_err(|e| SyncError::write(&spec.name, format!("CREATE TABLE: {}", e)))?;
        debug!("Created table {} with {} data columns", spec.name, spec.columns.len());
        Ok(())
    }

    async fn existing_columns(&self, table: &str) -> Result<Vec<String>> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(closed)?;

        let sql = r#"
            SELECT COLUMN_NAME FROM information_schema.COLUMNS
            WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?
            ORDER BY ORDINAL_POSITION
        "#;
        let columns: Vec<String> = conn.exec(sql, (table,)).await?;
        Ok(columns)
    }

    async fn add_column(&self, table: &str, column: &ColumnSpec) -> Result<()> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(closed)?;

        let sql = format!("ALTER TABLE {} ADD COLUMN {}", quote_ident(table), column_def(column));
        conn.query_drop(&sql)
            .await
            .map_err(|e| SyncError::write(table, format!("ADD COLUMN {}: {}", column.name, e)))?;
        Ok(())
    }

    async fn insert_batch(
        &self,
        table: &str,
        columns: &[String],
        rows: &[Vec<SqlValue>],
    ) -> Result<u64> {
        if rows.is_empty() || columns.is_empty() {
            return Ok(0);
        }

        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(closed)?;

        let num_cols = columns.len();
        let col_list = columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        let row_placeholders = format!("({})", vec!["?"; num_cols].join(", "));

        for chunk in rows.chunks(max_rows_per_statement(num_cols)) {
            let sql = format!(
                "INSERT INTO {} ({}) VALUES {}",
                quote_ident(table),
                col_list,
                vec![row_placeholders.as_str(); chunk.len()].join(", ")
            );

            let params: Vec<Value> = chunk
                .iter()
                .flat_map(|row| row.iter().map(sql_value_to_mysql))
                .collect();

            conn.exec_drop(&sql, params)
                .await
                .map_err(|e| SyncError::write(table, format!("INSERT batch: {}", e)))?;
        }

        debug!("MySQL: wrote {} rows to {}", rows.len(), table);
        Ok(rows.len() as u64)
    }

    async fn update_row(
        &self,
        table: &str,
        id_column: &str,
        id: i64,
        columns: &[String],
        values: &[SqlValue],
    ) -> Result<()> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(closed)?;

        let set_clause = columns
            .iter()
            .map(|c| format!("{} = ?", quote_ident(c)))
            .chain(std::iter::once(format!(
                "{} = CURRENT_TIMESTAMP",
                quote_ident(UPDATED_AT_COLUMN)
            )))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?",
            quote_ident(table),
            set_clause,
            quote_ident(id_column)
        );

        let mut params: Vec<Value> = values.iter().map(sql_value_to_mysql).collect();
        params.push(Value::Int(id));

        conn.exec_drop(&sql, params)
            .await
            .map_err(|e| SyncError::write(table, format!("UPDATE {} = {}: {}", id_column, id, e)))?;
        Ok(())
    }

    async fn load_state(
        &self,
        table: &str,
        id_column: &str,
        key_columns: &[String],
        hash_column: &str,
    ) -> Result<Vec<PersistedRow>> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(closed)?;

        let select_list = std::iter::once(id_column)
            .chain(key_columns.iter().map(String::as_str))
            .chain(std::iter::once(hash_column))
            .map(quote_ident)
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("SELECT {} FROM {}", select_list, quote_ident(table));

        let rows: Vec<Row> = conn.query(&sql).await?;
        let key_len = key_columns.len();
        let mut state = Vec::with_capacity(rows.len());

        for row in rows {
            let id = row
                .as_ref(0)
                .and_then(value_to_text)
                .and_then(|s| s.parse::<i64>().ok());
            let Some(id) = id else {
                warn!("{}: skipping row with unreadable {}", table, id_column);
                continue;
            };
            let key_parts = (1..=key_len)
                .map(|i| row.as_ref(i).and_then(value_to_text))
                .collect();
            let fingerprint = row.as_ref(key_len + 1).and_then(value_to_text);
            state.push(PersistedRow {
                id,
                key_parts,
                fingerprint,
            });
        }

        debug!("{}: loaded {} persisted rows", table, state.len());
        Ok(state)
    }

    async fn row_count(&self, table: &str) -> Result<i64> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(closed)?;

        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table));
        let count: Option<i64> = conn.query_first(&sql).await?;
        Ok(count.unwrap_or(0))
    }

    async fn set_constraint_checks(&self, enabled: bool) -> Result<()> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(closed)?;

        let flag = if enabled { 1 } else { 0 };
        conn.query_drop(format!("SET FOREIGN_KEY_CHECKS={}", flag)).await?;
        conn.query_drop(format!("SET UNIQUE_CHECKS={}", flag)).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(closed)?;
        conn.query_drop("SELECT 1").await?;
        Ok(())
    }

    fn store_type(&self) -> &'static str {
        "mysql"
    }

    async fn close(&self) {
        if let Some(conn) = self.conn.lock().await.take() {
            if let Err(e) = conn.disconnect().await {
                debug!("Error while disconnecting from MySQL: {}", e);
            }
        }
    }
}

/// Convert a typed value to a MySQL parameter.
fn sql_value_to_mysql(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::NULL,
        SqlValue::Int(i) => Value::Int(*i),
        SqlValue::Decimal(d) => Value::Bytes(d.to_string().into_bytes()),
        SqlValue::DateTime(dt) => Value::Date(
            u16::try_from(dt.year()).unwrap_or(0),
            dt.month() as u8,
            dt.day() as u8,
            dt.hour() as u8,
            dt.minute() as u8,
            dt.second() as u8,
            dt.nanosecond() / 1_000,
        ),
        SqlValue::Text(s) => Value::Bytes(s.clone().into_bytes()),
    }
}

/// Render a fetched value as text; `None` for NULL.
fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::NULL => None,
        Value::Bytes(b) => Some(String::from_utf8_lossy(b).into_owned()),
        Value::Int(i) => Some(i.to_string()),
        Value::UInt(u) => Some(u.to_string()),
        Value::Float(f) => Some(f.to_string()),
        Value::Double(d) => Some(d.to_string()),
        Value::Date(y, mo, d, h, mi, s, _) => Some(format!(
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            y, mo, d, h, mi, s
        )),
        Value::Time(neg, days, h, mi, s, _) => {
            let hours = u32::from(*h) + *days * 24;
            let sign = if *neg { "-" } else { "" };
            Some(format!("{}{:02}:{:02}:{:02}", sign, hours, mi, s))
        }
    }
}
