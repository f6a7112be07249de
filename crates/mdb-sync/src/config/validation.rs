//! Configuration validation.

use super::{Config, FilterRule};
use crate::error::{Result, SyncError};
use std::collections::HashSet;

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    // Source validation
    if config.source.mdb_path.is_empty() {
        return Err(SyncError::Config("source.mdb_path is required".into()));
    }
    if config.source.export_command.is_empty() {
        return Err(SyncError::Config(
            "source.export_command cannot be empty".into(),
        ));
    }

    // Target validation
    if config.target.host.is_empty() {
        return Err(SyncError::Config("target.host is required".into()));
    }
    if config.target.database.is_empty() {
        return Err(SyncError::Config("target.database is required".into()));
    }
    if config.target.user.is_empty() {
        return Err(SyncError::Config("target.user is required".into()));
    }

    // Sync validation
    if config.sync.batch_size == 0 {
        return Err(SyncError::Config(
            "sync.batch_size must be at least 1".into(),
        ));
    }
    check_identifier("sync.row_hash_column", &config.sync.row_hash_column)?;
    check_identifier("sync.id_column", &config.sync.id_column)?;
    if config.sync.row_hash_column == config.sync.id_column {
        return Err(SyncError::Config(
            "sync.row_hash_column and sync.id_column must differ".into(),
        ));
    }

    let mut seen = HashSet::new();
    for table in &config.sync.tables {
        check_identifier("table name", &table.name)?;
        for key in &table.key {
            check_identifier(&format!("{} key column", table.name), key)?;
        }

        for rule in &table.filters {
            match rule {
                FilterRule::Equals { column, .. } | FilterRule::NotEquals { column, .. } => {
                    check_identifier(&format!("{} filter column", table.name), column)?;
                }
                FilterRule::InTable {
                    column,
                    table: other,
                    table_column,
                } => {
                    check_identifier(&format!("{} filter column", table.name), column)?;
                    check_identifier(&format!("{} filter column", other), table_column)?;
                    // The referenced set is captured while syncing `other`, so it must run first.
                    if !seen.contains(other.as_str()) {
                        return Err(SyncError::Config(format!(
                            "table {}: in_table filter references '{}', which must be listed earlier",
                            table.name, other
                        )));
                    }
                }
            }
        }

        if !seen.insert(table.name.as_str()) {
            return Err(SyncError::Config(format!(
                "table {} is listed more than once",
                table.name
            )));
        }
    }

    Ok(())
}

fn check_identifier(what: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(SyncError::Config(format!("{} cannot be empty", what)));
    }
    if name.contains('`') {
        return Err(SyncError::Config(format!(
            "{} '{}' cannot contain a backtick",
            what, name
        )));
    }
    Ok(())
}
