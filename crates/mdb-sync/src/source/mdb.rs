//! Access database source driven by the mdbtools command-line utilities.
//!
//! `mdb-export <file> <table>` produces CSV with a header row; `mdb-schema
//! <file> mysql` produces a DDL dump from which declared column types are read.

use std::process::Output;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::config::SourceConfig;
use crate::core::{DeclaredType, Field, Record, TableSchema};
use crate::error::{Result, SyncError};

use super::{Extractor, SchemaSource};

/// Backend argument for the schema utility.
const SCHEMA_BACKEND: &str = "mysql";

/// Source backed by the mdbtools utilities.
pub struct MdbTools {
    mdb_path: String,
    export_command: String,
    schema_command: String,
    schema_dump: OnceCell<Option<String>>,
}

impl MdbTools {
    pub fn new(config: &SourceConfig) -> Self {
        Self {
            mdb_path: config.mdb_path.clone(),
            export_command: config.export_command.clone(),
            schema_command: config.schema_command.clone(),
            schema_dump: OnceCell::new(),
        }
    }

    /// Path of the database file.
    pub fn mdb_path(&self) -> &str {
        &self.mdb_path
    }

    /// Check that the database file exists and the export utility can be started.
    pub async fn probe(&self) -> Result<()> {
        let meta = tokio::fs::metadata(&self.mdb_path).await.map_err(|e| {
            SyncError::Config(format!("Cannot access {}: {}", self.mdb_path, e))
        })?;
        if !meta.is_file() {
            return Err(SyncError::Config(format!("{} is not a file", self.mdb_path)));
        }

        // Only spawning matters here; the utility's exit status for --version varies.
        Command::new(&self.export_command)
            .arg("--version")
            .output()
            .await
            .map_err(|e| {
                SyncError::Config(format!("Cannot run {}: {}", self.export_command, e))
            })?;
        Ok(())
    }

    async fn run(&self, program: &str, args: &[&str]) -> std::io::Result<Output> {
        debug!("Running {} {}", program, args.join(" "));
        Command::new(program).args(args).output().await
    }

    /// Full schema dump, read once per run.
    async fn schema_dump(&self) -> Option<&str> {
        self.schema_dump
            .get_or_init(|| async {
                match self.load_schema_dump().await {
                    Ok(dump) => Some(dump),
                    Err(e) => {
                        warn!("{}; falling back to name-based typing", e);
                        None
                    }
                }
            })
            .await
            .as_deref()
    }

    async fn load_schema_dump(&self) -> Result<String> {
        let out = self
            .run(&self.schema_command, &[self.mdb_path.as_str(), SCHEMA_BACKEND])
            .await
            .map_err(|e| {
                SyncError::SchemaDiscovery(format!("cannot run {}: {}", self.schema_command, e))
            })?;
        if !out.status.success() {
            return Err(SyncError::SchemaDiscovery(format!(
                "{} exited with {}: {}",
                self.schema_command,
                out.status,
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&out.stdout).into_owned())
    }
}

#[async_trait]
impl Extractor for MdbTools {
    async fn extract(&self, table: &str) -> Result<Vec<Record>> {
        let out = self
            .run(&self.export_command, &[self.mdb_path.as_str(), table])
            .await
            .map_err(|e| {
                SyncError::extraction(table, format!("cannot run {}: {}", self.export_command, e))
            })?;

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return Err(SyncError::extraction(
                table,
                format!("{} exited with {}: {}", self.export_command, out.status, stderr.trim()),
            ));
        }

        let records = parse_export(table, &out.stdout)?;
        info!("{}: extracted {} records", table, records.len());
        Ok(records)
    }

    fn source_type(&self) -> &'static str {
        "mdbtools"
    }
}

#[async_trait]
impl SchemaSource for MdbTools {
    async fn table_schema(&self, table: &str) -> Option<TableSchema> {
        let dump = self.schema_dump().await?;
        let schema = parse_schema_dump(dump, table);
        if schema.is_none() {
            debug!("{}: not found in schema dump", table);
        }
        schema
    }
}

/// Parse CSV export output into records.
///
/// The first row names the columns. A short row simply lacks the trailing
/// columns; extra cells beyond the header are ignored.
pub fn parse_export(table: &str, bytes: &[u8]) -> Result<Vec<Record>> {
    let text = String::from_utf8_lossy(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| SyncError::extraction(table, format!("invalid header row: {}", e)))?
        .clone();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| SyncError::extraction(table, format!("invalid CSV: {}", e)))?;
        let mut record = Record::new();
        for (column, value) in headers.iter().zip(row.iter()) {
            record.set(column, Field::from_raw(value));
        }
        records.push(record);
    }
    Ok(records)
}

fn create_table_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)CREATE\s+TABLE\s+`([^`]+)`\s*\((.*?)\)\s*;").ok())
        .as_ref()
}

fn column_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^`([^`]+)`\s+(.+)$").ok())
        .as_ref()
}

/// Extract one table's declared columns from a `mdb-schema ... mysql` dump.
pub fn parse_schema_dump(dump: &str, table: &str) -> Option<TableSchema> {
    let column_re = column_regex()?;
    let body = create_table_regex()?
        .captures_iter(dump)
        .find(|c| c[1].eq_ignore_ascii_case(table))?
        .get(2)?
        .as_str();

    let mut schema = TableSchema::new(table);
    for line in body.lines() {
        let line = line.trim().trim_end_matches(',').trim();
        if line.is_empty() || line.starts_with("--") {
            continue;
        }
        if let Some(caps) = column_re.captures(line) {
            schema.insert(&caps[1], DeclaredType::parse(&caps[2]));
        }
    }
    Some(schema)
}
