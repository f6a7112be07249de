//! mdb-sync CLI - incremental sync of a legacy Access database into MySQL.

use clap::{Parser, Subcommand};
use mdb_sync::{health_check, Config, Orchestrator, SyncError};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

/// Exit code when the run finished but some tables failed.
const EXIT_TABLES_FAILED: u8 = 6;

#[derive(Parser)]
#[command(name = "mdb-sync")]
#[command(about = "Hash-based incremental sync of Access tables into MySQL")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync all configured tables
    Run {
        /// Extract and compare, but write nothing
        #[arg(long)]
        dry_run: bool,

        /// Drop and reload every table regardless of its configured strategy
        #[arg(long)]
        full_refresh: bool,

        /// Only sync these tables (repeatable)
        #[arg(long = "table", value_name = "NAME")]
        tables: Vec<String>,

        /// Override rows per insert batch
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Check the export utility and the destination connection
    HealthCheck,

    /// Load and validate the configuration, then exit
    CheckConfig,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<ExitCode, SyncError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format);

    let mut config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    match cli.command {
        Commands::Run {
            dry_run,
            full_refresh,
            tables,
            batch_size,
        } => {
            if let Some(unknown) = tables.iter().find(|t| config.sync.table(t).is_none()) {
                return Err(SyncError::Config(format!(
                    "Table '{}' is not in the configuration",
                    unknown
                )));
            }
            config.retain_tables(&tables);
            if full_refresh {
                config.force_full_refresh();
            }
            if let Some(size) = batch_size {
                config.sync.batch_size = size;
            }
            config.validate()?;

            let cancel_token = setup_signal_handler();

            let result = Orchestrator::connect(config)
                .await?
                .with_dry_run(dry_run)
                .run(Some(cancel_token))
                .await?;

            if cli.output_json {
                println!("{}", result.to_json()?);
            } else {
                println!("{}", result.render());
            }

            if result.is_cancelled() {
                return Err(SyncError::Cancelled);
            }
            if result.has_failures() {
                eprintln!("Failed tables: {}", result.failed_tables.join(", "));
                return Ok(ExitCode::from(EXIT_TABLES_FAILED));
            }
        }

        Commands::HealthCheck => {
            let result = health_check(&config).await;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("Health Check Results:");
                println!(
                    "  Source ({}): {} ({}ms)",
                    config.source.mdb_path,
                    if result.source_connected { "OK" } else { "FAILED" },
                    result.source_latency_ms
                );
                if let Some(ref err) = result.source_error {
                    println!("    Error: {}", err);
                }
                println!(
                    "  Target (MySQL): {} ({}ms)",
                    if result.target_connected { "OK" } else { "FAILED" },
                    result.target_latency_ms
                );
                if let Some(ref err) = result.target_error {
                    println!("    Error: {}", err);
                }
                println!(
                    "\n  Overall: {}",
                    if result.healthy { "HEALTHY" } else { "UNHEALTHY" }
                );
            }

            if !result.healthy {
                return Err(SyncError::Config("Health check failed".to_string()));
            }
        }

        Commands::CheckConfig => {
            println!(
                "Configuration OK: {} tables, target {}:{}/{}",
                config.sync.tables.len(),
                config.target.host,
                config.target.port,
                config.target.database
            );
            for table in &config.sync.tables {
                println!(
                    "  {} ({}, key: [{}], {} filters)",
                    table.name,
                    table.strategy,
                    table.key.join(", "),
                    table.filters.len()
                );
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => "debug",
        "warn" => "warn",
        "error" => "error",
        _ => "info",
    };

    // RUST_LOG wins over --verbosity when set.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Cancel the run between tables on SIGINT or SIGTERM.
#[cfg(unix)]
fn setup_signal_handler() -> CancellationToken {
    let cancel_token = CancellationToken::new();

    for (kind, name) in [
        (SignalKind::interrupt(), "SIGINT"),
        (SignalKind::terminate(), "SIGTERM"),
    ] {
        let token = cancel_token.clone();
        tokio::spawn(async move {
            let mut stream = match signal(kind) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("Cannot install {} handler: {}", name, e);
                    return;
                }
            };
            stream.recv().await;
            eprintln!(
                "\nReceived {}. Finishing the current table, then stopping...",
                name
            );
            token.cancel();
        });
    }

    cancel_token
}

/// Cancel the run between tables on Ctrl-C.
#[cfg(not(unix))]
fn setup_signal_handler() -> CancellationToken {
    let cancel_token = CancellationToken::new();
    let token = cancel_token.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nReceived Ctrl-C. Finishing the current table, then stopping...");
            token.cancel();
        }
    });

    cancel_token
}
