//! # mdb-sync
//!
//! Incremental synchronization of a legacy Access database into MySQL.
//!
//! The source has no change tracking and no reliable keys, so each run
//! re-extracts every configured table and reconciles it against what the
//! destination already holds:
//!
//! - **Identity** from a configured natural key, normalized across the text
//!   export and the typed destination columns
//! - **Fingerprints** (SHA-256 over column-sorted raw values) to detect changes
//! - **Insert / update / unchanged** classification in a single pass; rows are
//!   never deleted
//! - **Full refresh** for tables whose key cannot be trusted
//! - **Per-table containment**: one failing table never stops the run
//!
//! ## Example
//!
//! ```rust,no_run
//! use mdb_sync::{Config, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> mdb_sync::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let orchestrator = Orchestrator::connect(config).await?;
//!     let result = orchestrator.run(None).await?;
//!     println!("{}", result.render());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod filter;
pub mod orchestrator;
pub mod reconcile;
pub mod source;
pub mod store;
pub mod typemap;

// Re-exports for convenient access
pub use config::{Config, FilterRule, RefreshStrategy, SourceConfig, SyncConfig, TableConfig, TargetConfig};
pub use core::{ColumnSet, Field, Record, SqlValue};
pub use error::{Result, SyncError};
pub use orchestrator::{health_check, HealthCheckResult, Orchestrator, SyncResult, TableReport, TableStatus};
pub use source::{Extractor, MdbTools, SchemaSource, StaticSource};
pub use store::{DestinationStore, MemoryStore, MysqlStore};
