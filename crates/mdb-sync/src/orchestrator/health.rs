//! Connectivity checks for the source utilities and the destination.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;
use crate::source::MdbTools;
use crate::store::{DestinationStore, MysqlStore};

/// Result of a health check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub healthy: bool,
    pub source_connected: bool,
    pub source_latency_ms: u64,
    pub source_error: Option<String>,
    pub target_connected: bool,
    pub target_latency_ms: u64,
    pub target_error: Option<String>,
}

/// Check that the export utility runs against the database file and that the
/// destination accepts a connection. Failures are reported, not returned.
pub async fn health_check(config: &Config) -> HealthCheckResult {
    let start = Instant::now();
    let source = MdbTools::new(&config.source).probe().await;
    let source_latency_ms = start.elapsed().as_millis() as u64;

    let start = Instant::now();
    let target = match MysqlStore::connect(&config.target).await {
        Ok(store) => {
            let ping = store.ping().await;
            store.close().await;
            ping
        }
        Err(e) => Err(e),
    };
    let target_latency_ms = start.elapsed().as_millis() as u64;

    debug!("Health check: source {:?}, target {:?}", source, target);

    HealthCheckResult {
        healthy: source.is_ok() && target.is_ok(),
        source_connected: source.is_ok(),
        source_latency_ms,
        source_error: source.err().map(|e| e.to_string()),
        target_connected: target.is_ok(),
        target_latency_ms,
        target_error: target.err().map(|e| e.to_string()),
    }
}
