//! Error types for the sync library.

use thiserror::Error;

/// Main error type for sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The export utility failed or produced unreadable output for a table.
    #[error("Extraction failed for table {table}: {message}")]
    Extraction { table: String, message: String },

    /// Schema discovery failed. Never fatal; callers fall back to heuristics.
    #[error("Schema discovery failed: {0}")]
    SchemaDiscovery(String),

    /// Destination database connection or query error
    #[error("Target database error: {0}")]
    Target(#[from] mysql_async::Error),

    /// A write against the destination failed for a specific table
    #[error("Write failed for table {table}: {message}")]
    Write { table: String, message: String },

    /// IO error (file operations, spawning the export utility)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Sync was cancelled (SIGINT, etc.)
    #[error("Sync cancelled")]
    Cancelled,
}

impl SyncError {
    /// Create an Extraction error
    pub fn extraction(table: impl Into<String>, message: impl Into<String>) -> Self {
        SyncError::Extraction {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create a Write error
    pub fn write(table: impl Into<String>, message: impl Into<String>) -> Self {
        SyncError::Write {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            SyncError::Config(_) | SyncError::Yaml(_) => 1,
            SyncError::Extraction { .. } => 3,
            SyncError::Target(_) | SyncError::Write { .. } => 4,
            SyncError::Cancelled => 5,
            SyncError::Io(_) => 7,
            SyncError::SchemaDiscovery(_) | SyncError::Json(_) => 2,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(SyncError::Config("bad".into()).exit_code(), 1);
        assert_eq!(SyncError::extraction("Socios", "boom").exit_code(), 3);
        assert_eq!(SyncError::write("Socios", "boom").exit_code(), 4);
        assert_eq!(SyncError::Cancelled.exit_code(), 5);
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert_eq!(SyncError::from(io).exit_code(), 7);
    }

    #[test]
    fn test_extraction_message_names_table() {
        let err = SyncError::extraction("Liquidaciones", "exit status 1");
        assert_eq!(
            err.to_string(),
            "Extraction failed for table Liquidaciones: exit status 1"
        );
    }
}
