//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Legacy database file and the utilities used to read it.
    pub source: SourceConfig,

    /// Destination database configuration (MySQL).
    pub target: TargetConfig,

    /// Sync behavior and per-table configuration.
    #[serde(default)]
    pub sync: SyncConfig,

    /// Name-based type inference rules.
    #[serde(default)]
    pub typing: TypingConfig,
}

/// Source (legacy desktop database) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Path to the database file.
    pub mdb_path: String,

    /// Export utility invoked as `<export_command> <mdb_path> <table>` (default: "mdb-export").
    #[serde(default = "default_export_command")]
    pub export_command: String,

    /// Schema utility invoked as `<schema_command> <mdb_path> mysql` (default: "mdb-schema").
    #[serde(default = "default_schema_command")]
    pub schema_command: String,

    /// Consult the schema utility for declared column types (default: true).
    #[serde(default = "default_true")]
    pub use_schema: bool,
}

/// Destination database (MySQL) configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Database host.
    pub host: String,

    /// Database port (default: 3306).
    #[serde(default = "default_mysql_port")]
    pub port: u16,

    /// Database name.
    pub database: String,

    /// Username.
    pub user: String,

    /// Password. Overridden by `MDB_SYNC_TARGET_PASSWORD` when set.
    #[serde(default)]
    pub password: String,

    /// SSL mode (default: "prefer").
    #[serde(default = "default_prefer")]
    pub ssl_mode: String,
}

impl fmt::Debug for TargetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("ssl_mode", &self.ssl_mode)
            .finish()
    }
}

/// Sync behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Records per multi-row INSERT (default: 1000).
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Destination column holding the row fingerprint (default: "row_hash").
    #[serde(default = "default_row_hash_column")]
    pub row_hash_column: String,

    /// Destination surrogate id column (default: "id").
    #[serde(default = "default_id_column")]
    pub id_column: String,

    /// Tables to sync, processed in this order.
    #[serde(default)]
    pub tables: Vec<TableConfig>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            row_hash_column: default_row_hash_column(),
            id_column: default_id_column(),
            tables: Vec::new(),
        }
    }
}

impl SyncConfig {
    /// Look up a table's configuration by name.
    pub fn table(&self, name: &str) -> Option<&TableConfig> {
        self.tables.iter().find(|t| t.name == name)
    }
}

/// Per-table sync configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    /// Table name, identical in source and destination.
    pub name: String,

    /// Natural key columns, in order. Empty means no trustworthy key.
    #[serde(default)]
    pub key: Vec<String>,

    /// Refresh strategy (default: incremental).
    #[serde(default)]
    pub strategy: RefreshStrategy,

    /// Record filters applied to raw values right after extraction.
    #[serde(default)]
    pub filters: Vec<FilterRule>,
}

impl TableConfig {
    /// Create an incremental table config with the given key.
    pub fn incremental(name: &str, key: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            key: key.iter().map(|k| k.to_string()).collect(),
            strategy: RefreshStrategy::Incremental,
            filters: Vec::new(),
        }
    }

    /// Create a full-refresh table config.
    pub fn full_refresh(name: &str) -> Self {
        Self {
            name: name.to_string(),
            key: Vec::new(),
            strategy: RefreshStrategy::FullRefresh,
            filters: Vec::new(),
        }
    }

    /// Add a filter rule.
    pub fn with_filter(mut self, rule: FilterRule) -> Self {
        self.filters.push(rule);
        self
    }
}

/// How a table is brought up to date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshStrategy {
    /// Insert new records and update changed ones; never delete.
    #[default]
    Incremental,

    /// Drop, recreate and reload the destination table.
    FullRefresh,
}

impl fmt::Display for RefreshStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshStrategy::Incremental => write!(f, "incremental"),
            RefreshStrategy::FullRefresh => write!(f, "full_refresh"),
        }
    }
}

/// Record inclusion/exclusion rule on raw values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterRule {
    /// Keep records whose `column` equals `value`.
    Equals { column: String, value: String },

    /// Drop records whose `column` equals `value`.
    NotEquals { column: String, value: String },

    /// Keep records whose `column` value appears in `table_column` of an
    /// earlier table in the same run.
    InTable {
        column: String,
        table: String,
        table_column: String,
    },
}

/// Name-based type inference rules, used when no declared schema is available.
///
/// All matching is case-insensitive; lists are compared upper-cased.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TypingConfig {
    /// Substrings marking a date column.
    pub date_tokens: Vec<String>,
    /// Columns known to hold dates regardless of name.
    pub date_columns: Vec<String>,
    /// Prefixes marking a monetary column.
    pub decimal_prefixes: Vec<String>,
    /// Suffixes marking a monetary column.
    pub decimal_suffixes: Vec<String>,
    /// Substrings marking a monetary column.
    pub decimal_tokens: Vec<String>,
    /// Columns known to be monetary.
    pub decimal_columns: Vec<String>,
    /// Prefixes marking an identifier/code/count column.
    pub integer_prefixes: Vec<String>,
    /// Suffixes marking an identifier/code/count column.
    pub integer_suffixes: Vec<String>,
    /// Columns known to be integers.
    pub integer_columns: Vec<String>,
    /// Identifier-looking columns that actually hold text.
    pub text_columns: Vec<String>,
    /// Length of the default bounded text type.
    pub text_length: u32,
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            date_tokens: strings(&["FEC", "FECHA", "DATE"]),
            date_columns: strings(&[
                "ALTCOB",
                "ALTSOCIO",
                "BAJAFECHA",
                "PERLIQUIDANRO",
                "F1CSOCIO",
                "FBUSCAHR",
            ]),
            decimal_prefixes: strings(&["IMP", "MONTO", "PRECIO", "TOTAL"]),
            decimal_suffixes: strings(&["IMP", "MONTO", "PRECIO"]),
            decimal_tokens: strings(&["IMPORTE", "COMISION"]),
            decimal_columns: strings(&["ABOLIQUIDA", "COMCOB", "IMPSOCIO", "SUBFACTURA"]),
            integer_prefixes: strings(&["NUM", "COD", "ID", "CANT", "POS", "PRO", "ZON", "ULT"]),
            integer_suffixes: strings(&["COB", "SOCIO", "ZONA", "LIQUIDA"]),
            integer_columns: strings(&[
                "BAJA",
                "POSCOB",
                "PROCOB",
                "ULTCOB",
                "ZONCOB",
                "COBSOCIO",
                "PLASOCIO",
                "ZONSOCIO",
                "POSSOCIO",
                "SUBSOCIO",
                "ZONLIQUIDA",
                "COBLIQUIDA",
            ]),
            text_columns: strings(&[
                "NUMSOCIO",
                "NUMPROMOTOR",
                "NUMFACTURA",
                "CUPLIQUIDA",
                "SOCLIQUIDA",
                "OBSCOB",
                "OBISOCIO",
                "NOMCOB",
                "DOMCOB",
                "LOCCOB",
                "TELCOB",
                "CELCOB",
                "IVACOB",
                "CUICOB",
                "NOMSOCIO",
                "FANSOCIO",
                "DOMSOCIO",
                "LOCSOCIO",
                "PROSOCIO",
                "TELSOCIO",
                "IVASOCIO",
                "CUISOCIO",
                "COMSOCIO",
                "DESZONA",
                "ESTLIQUIDA",
                "PERLIQUIDA",
                "OBSLIQUIDA",
                "PAGLIQUIDA",
                "COMLIQUIDA",
            ]),
            text_length: default_text_length(),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// Default value functions for serde
fn default_export_command() -> String {
    "mdb-export".to_string()
}

fn default_schema_command() -> String {
    "mdb-schema".to_string()
}

fn default_mysql_port() -> u16 {
    3306
}

fn default_prefer() -> String {
    "prefer".to_string()
}

fn default_batch_size() -> usize {
    1_000
}

fn default_row_hash_column() -> String {
    "row_hash".to_string()
}

fn default_id_column() -> String {
    "id".to_string()
}

fn default_text_length() -> u32 {
    255
}

fn default_true() -> bool {
    true
}
