//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::Result;
use std::path::Path;

/// Environment variable that overrides `target.password`.
pub const TARGET_PASSWORD_ENV: &str = "MDB_SYNC_TARGET_PASSWORD";

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    ///
    /// The target password is taken from `MDB_SYNC_TARGET_PASSWORD` when set.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let mut config: Config = serde_yaml::from_str(yaml)?;
        if let Ok(password) = std::env::var(TARGET_PASSWORD_ENV) {
            config.target.password = password;
        }
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }

    /// Restrict the configured tables to the given names, keeping configured order.
    pub fn retain_tables(&mut self, names: &[String]) {
        if names.is_empty() {
            return;
        }
        self.sync.tables.retain(|t| names.contains(&t.name));
    }

    /// Force every table onto the full-refresh strategy.
    pub fn force_full_refresh(&mut self) {
        for table in &mut self.sync.tables {
            table.strategy = RefreshStrategy::FullRefresh;
        }
    }
}
