//! End-to-end sync runs against an in-memory source and destination.

use std::sync::Arc;

use mdb_sync::config::FilterRule;
use mdb_sync::core::{DeclaredType, TableSchema};
use mdb_sync::{
    Config, DestinationStore, Extractor, MemoryStore, Orchestrator, Record, RefreshStrategy,
    SchemaSource, StaticSource, SyncResult, TableConfig, TableStatus,
};
use tokio_util::sync::CancellationToken;

const BASE_YAML: &str = r#"
source:
  mdb_path: /data/test.mdb
target:
  host: localhost
  database: test
  user: test
"#;

fn config(tables: Vec<TableConfig>) -> Config {
    let mut config = Config::from_yaml(BASE_YAML).unwrap();
    config.sync.tables = tables;
    config
}

fn zona(num: &str, desc: &str) -> Record {
    Record::from_pairs([("NUMZONA", num), ("DESZONA", desc)])
}

async fn run_with(
    config: &Config,
    source: &Arc<StaticSource>,
    store: &Arc<MemoryStore>,
    dry_run: bool,
) -> SyncResult {
    Orchestrator::new(
        config.clone(),
        source.clone() as Arc<dyn Extractor>,
        Some(source.clone() as Arc<dyn SchemaSource>),
        store.clone() as Arc<dyn DestinationStore>,
    )
    .with_dry_run(dry_run)
    .run(None)
    .await
    .unwrap()
}

async fn run(config: &Config, source: &Arc<StaticSource>, store: &Arc<MemoryStore>) -> SyncResult {
    run_with(config, source, store, false).await
}

// =============================================================================
// Incremental reconciliation
// =============================================================================

#[tokio::test]
async fn test_insert_update_unchanged_scenario() {
    let cfg = config(vec![TableConfig::incremental("Zonas", &["NUMZONA"])]);
    let source = Arc::new(StaticSource::new().with_table(
        "Zonas",
        vec![zona("1", "Centro"), zona("2", "Norte"), zona("3", "Sur")],
    ));
    let store = Arc::new(MemoryStore::new());

    let first = run(&cfg, &source, &store).await;
    let t = first.table("Zonas").unwrap();
    assert_eq!((t.inserted, t.updated, t.unchanged), (3, 0, 0));
    assert_eq!(t.final_count, 3);

    source
        .set_table(
            "Zonas",
            vec![zona("1", "Centro"), zona("2", "Norte Grande"), zona("3", "Sur")],
        )
        .await;
    let second = run(&cfg, &source, &store).await;
    let t = second.table("Zonas").unwrap();
    assert_eq!((t.inserted, t.updated, t.unchanged), (0, 1, 2));
    let row = store.find("Zonas", "NUMZONA", "2").await.unwrap();
    assert_eq!(row.text("DESZONA").as_deref(), Some("Norte Grande"));
    assert_eq!(row.updates, 1);

    source
        .set_table(
            "Zonas",
            vec![zona("1", "Centro"), zona("2", "Norte Grande"), zona("4", "Oeste")],
        )
        .await;
    let third = run(&cfg, &source, &store).await;
    let t = third.table("Zonas").unwrap();
    assert_eq!((t.inserted, t.updated, t.unchanged), (1, 0, 2));
    assert_eq!(t.final_count, 4);
    // Records missing from the source are never deleted.
    assert!(store.find("Zonas", "NUMZONA", "3").await.is_some());
}

#[tokio::test]
async fn test_second_run_on_unchanged_source_writes_nothing() {
    let cfg = config(vec![TableConfig::incremental("Zonas", &["NUMZONA"])]);
    let source = Arc::new(
        StaticSource::new().with_table("Zonas", vec![zona("1", "Centro"), zona("2", "Norte")]),
    );
    let store = Arc::new(MemoryStore::new());

    run(&cfg, &source, &store).await;
    let before = store.rows("Zonas").await;

    let second = run(&cfg, &source, &store).await;
    let t = second.table("Zonas").unwrap();
    assert_eq!((t.inserted, t.updated, t.unchanged), (0, 0, 2));
    assert_eq!(store.rows("Zonas").await, before);
}

#[tokio::test]
async fn test_key_normalization_across_runs() {
    let cfg = config(vec![TableConfig::incremental("Codigos", &["CODIGO"])]);
    let source = Arc::new(StaticSource::new().with_table(
        "Codigos",
        vec![Record::from_pairs([("CODIGO", "30.0"), ("DETALLE", "x")])],
    ));
    let store = Arc::new(MemoryStore::new());
    run(&cfg, &source, &store).await;

    // Same key, different representation: matched, not inserted again.
    source
        .set_table(
            "Codigos",
            vec![Record::from_pairs([("CODIGO", " 30 "), ("DETALLE", "x")])],
        )
        .await;
    let second = run(&cfg, &source, &store).await;
    let t = second.table("Codigos").unwrap();
    assert_eq!(t.inserted, 0);
    assert_eq!(t.updated, 1);
    assert_eq!(t.final_count, 1);

    let third = run(&cfg, &source, &store).await;
    assert_eq!(third.table("Codigos").unwrap().unchanged, 1);
}

#[tokio::test]
async fn test_text_keys_are_case_sensitive() {
    let cfg = config(vec![TableConfig::incremental("Referencias", &["REF"])]);
    let source = Arc::new(StaticSource::new().with_table(
        "Referencias",
        vec![
            Record::from_pairs([("REF", "ABC"), ("OBS", "upper")]),
            Record::from_pairs([("REF", "abc"), ("OBS", "lower")]),
        ],
    ));
    let store = Arc::new(MemoryStore::new());

    let result = run(&cfg, &source, &store).await;
    let t = result.table("Referencias").unwrap();
    assert_eq!(t.inserted, 2);
    assert_eq!(t.fresh_collisions, 0);
}

#[tokio::test]
async fn test_duplicate_keys_in_snapshot_last_wins() {
    let cfg = config(vec![TableConfig::incremental("Zonas", &["NUMZONA"])]);
    let source = Arc::new(StaticSource::new().with_table(
        "Zonas",
        vec![zona("1", "Primera"), zona("2", "Norte"), zona("1", "Ultima")],
    ));
    let store = Arc::new(MemoryStore::new());

    let first = run(&cfg, &source, &store).await;
    let t = first.table("Zonas").unwrap();
    assert_eq!(t.inserted, 2);
    assert_eq!(t.fresh_collisions, 1);
    let row = store.find("Zonas", "NUMZONA", "1").await.unwrap();
    assert_eq!(row.text("DESZONA").as_deref(), Some("Ultima"));

    let second = run(&cfg, &source, &store).await;
    let t = second.table("Zonas").unwrap();
    assert_eq!((t.inserted, t.updated, t.unchanged), (0, 0, 2));
}

#[tokio::test]
async fn test_composite_key() {
    let cfg = config(vec![TableConfig::incremental("Liquidaciones", &["PERIODO", "CUPLIQUIDA"])]);
    let liq = |periodo: &str, cupon: &str, importe: &str| {
        Record::from_pairs([("PERIODO", periodo), ("CUPLIQUIDA", cupon), ("IMPORTE", importe)])
    };
    let source = Arc::new(StaticSource::new().with_table(
        "Liquidaciones",
        vec![liq("2024-01", "A1", "100.50"), liq("2024-02", "A1", "100.50")],
    ));
    let store = Arc::new(MemoryStore::new());
    assert_eq!(run(&cfg, &source, &store).await.table("Liquidaciones").unwrap().inserted, 2);

    source
        .set_table(
            "Liquidaciones",
            vec![liq("2024-01", "A1", "100.50"), liq("2024-02", "A1", "99.00")],
        )
        .await;
    let t = run(&cfg, &source, &store).await;
    let t = t.table("Liquidaciones").unwrap();
    assert_eq!((t.inserted, t.updated, t.unchanged), (0, 1, 1));
}

#[tokio::test]
async fn test_incomplete_keys_are_reported() {
    let cfg = config(vec![TableConfig::incremental("Zonas", &["NUMZONA"])]);
    let source = Arc::new(
        StaticSource::new().with_table("Zonas", vec![zona("1", "Centro"), zona("", "Sin numero")]),
    );
    let store = Arc::new(MemoryStore::new());

    let result = run(&cfg, &source, &store).await;
    assert_eq!(result.table("Zonas").unwrap().incomplete_keys, 1);
}

#[tokio::test]
async fn test_new_source_column_is_added() {
    let cfg = config(vec![TableConfig::incremental("Zonas", &["NUMZONA"])]);
    let source = Arc::new(
        StaticSource::new().with_table("Zonas", vec![zona("1", "Centro"), zona("2", "Norte")]),
    );
    let store = Arc::new(MemoryStore::new());
    run(&cfg, &source, &store).await;

    source
        .set_table(
            "Zonas",
            vec![
                Record::from_pairs([("NUMZONA", "1"), ("DESZONA", "Centro"), ("OBS", "nueva")]),
                zona("2", "Norte"),
            ],
        )
        .await;
    let result = run(&cfg, &source, &store).await;
    let t = result.table("Zonas").unwrap();
    // The column set changed, so every fingerprint changed.
    assert_eq!(t.updated, 2);
    assert!(store
        .existing_columns("Zonas")
        .await
        .unwrap()
        .contains(&"OBS".to_string()));
    let row = store.find("Zonas", "NUMZONA", "1").await.unwrap();
    assert_eq!(row.text("OBS").as_deref(), Some("nueva"));
}

#[tokio::test]
async fn test_typed_keys_match_their_stored_form() {
    // Keys are stored converted: dates reformatted, decimals rounded to scale.
    let cfg = config(vec![
        TableConfig::incremental("Vencimientos", &["FECHA"]),
        TableConfig::incremental("Tarifas", &["IMPORTE"]),
    ]);
    let source = Arc::new(
        StaticSource::new()
            .with_table(
                "Vencimientos",
                vec![Record::from_pairs([("FECHA", "01/27/22 00:00:00"), ("DETALLE", "enero")])],
            )
            .with_table(
                "Tarifas",
                vec![Record::from_pairs([("IMPORTE", "1.23456"), ("DETALLE", "basica")])],
            ),
    );
    let store = Arc::new(MemoryStore::new());

    let first = run(&cfg, &source, &store).await;
    assert_eq!(first.table("Vencimientos").unwrap().inserted, 1);
    assert_eq!(first.table("Tarifas").unwrap().inserted, 1);
    assert!(store
        .find("Vencimientos", "FECHA", "2022-01-27 00:00:00")
        .await
        .is_some());
    assert!(store.find("Tarifas", "IMPORTE", "1.2346").await.is_some());

    for _ in 0..2 {
        let again = run(&cfg, &source, &store).await;
        for table in ["Vencimientos", "Tarifas"] {
            let t = again.table(table).unwrap();
            assert_eq!((t.inserted, t.updated, t.unchanged), (0, 0, 1), "{}", table);
            assert_eq!(t.final_count, 1, "{}", table);
        }
    }
}

#[tokio::test]
async fn test_malformed_key_is_incomplete_not_reinserted() {
    let cfg = config(vec![TableConfig::incremental("Cobradores", &["NUMCOB"])]);
    let source = Arc::new(StaticSource::new().with_table(
        "Cobradores",
        vec![Record::from_pairs([("NUMCOB", "A30"), ("NOMCOB", "Ana")])],
    ));
    let store = Arc::new(MemoryStore::new());

    let first = run(&cfg, &source, &store).await;
    let t = first.table("Cobradores").unwrap();
    assert_eq!(t.inserted, 1);
    assert_eq!(t.incomplete_keys, 1);
    assert_eq!(t.malformed_values, 1);

    let second = run(&cfg, &source, &store).await;
    let t = second.table("Cobradores").unwrap();
    assert_eq!((t.inserted, t.updated, t.unchanged), (0, 0, 1));
    assert_eq!(t.incomplete_keys, 1);
    assert_eq!(t.final_count, 1);
}

#[tokio::test]
async fn test_source_columns_named_like_bookkeeping_columns_are_renamed() {
    let cfg = config(vec![TableConfig::incremental("Pagos", &["ID"])]);
    let source = Arc::new(StaticSource::new().with_table(
        "Pagos",
        vec![
            Record::from_pairs([("ID", "500"), ("row_hash", "abc"), ("DETALLE", "cuota")]),
            Record::from_pairs([("ID", "501"), ("row_hash", "def"), ("DETALLE", "saldo")]),
        ],
    ));
    let store = Arc::new(MemoryStore::new());

    let first = run(&cfg, &source, &store).await;
    let t = first.table("Pagos").unwrap();
    assert_eq!(t.status, TableStatus::Completed);
    assert_eq!(t.inserted, 2);

    let columns = store.existing_columns("Pagos").await.unwrap();
    assert!(columns.contains(&"src_ID".to_string()));
    assert!(columns.contains(&"src_row_hash".to_string()));

    // Source values survive next to the surrogate id and the fingerprint.
    let row = store.find("Pagos", "src_ID", "500").await.unwrap();
    assert_eq!(row.id, 1);
    assert_eq!(row.text("src_row_hash").as_deref(), Some("abc"));
    assert_ne!(row.text("row_hash").as_deref(), Some("abc"));

    let second = run(&cfg, &source, &store).await;
    let t = second.table("Pagos").unwrap();
    assert_eq!((t.inserted, t.updated, t.unchanged), (0, 0, 2));
}

// =============================================================================
// Full refresh
// =============================================================================

#[tokio::test]
async fn test_full_refresh_recreates_table() {
    let cfg = config(vec![TableConfig::full_refresh("Zonas")]);
    let source = Arc::new(StaticSource::new().with_table(
        "Zonas",
        vec![zona("1", "Centro"), zona("2", "Norte"), zona("3", "Sur")],
    ));
    let store = Arc::new(MemoryStore::new());

    run(&cfg, &source, &store).await;
    source.set_table("Zonas", vec![zona("1", "Centro"), zona("2", "Norte")]).await;
    let result = run(&cfg, &source, &store).await;

    let t = result.table("Zonas").unwrap();
    assert_eq!(t.strategy, RefreshStrategy::FullRefresh);
    assert_eq!(t.inserted, 2);
    assert_eq!(t.final_count, 2);
    assert!(store.constraint_checks_enabled());
}

#[tokio::test]
async fn test_unresolvable_key_falls_back_to_full_refresh() {
    let cfg = config(vec![TableConfig::incremental("Zonas", &["NO_SUCH_COLUMN"])]);
    let source = Arc::new(StaticSource::new().with_table("Zonas", vec![zona("1", "Centro")]));
    let store = Arc::new(MemoryStore::new());

    run(&cfg, &source, &store).await;
    let result = run(&cfg, &source, &store).await;
    let t = result.table("Zonas").unwrap();
    assert_eq!(t.strategy, RefreshStrategy::FullRefresh);
    assert_eq!(t.final_count, 1);
}

#[tokio::test]
async fn test_forced_full_refresh() {
    let mut cfg = config(vec![TableConfig::incremental("Zonas", &["NUMZONA"])]);
    cfg.force_full_refresh();
    let source = Arc::new(StaticSource::new().with_table("Zonas", vec![zona("1", "Centro")]));
    let store = Arc::new(MemoryStore::new());

    run(&cfg, &source, &store).await;
    let result = run(&cfg, &source, &store).await;
    assert_eq!(result.table("Zonas").unwrap().inserted, 1);
    assert_eq!(store.rows("Zonas").await[0].id, 1);
}

// =============================================================================
// Failure containment
// =============================================================================

#[tokio::test]
async fn test_failed_table_does_not_stop_the_run() {
    let cfg = config(vec![
        TableConfig::incremental("T1", &["NUMZONA"]),
        TableConfig::incremental("T2", &["NUMZONA"]),
        TableConfig::incremental("T3", &["NUMZONA"]),
    ]);
    let source = Arc::new(
        StaticSource::new()
            .with_table("T1", vec![zona("1", "a")])
            .with_table("T2", vec![zona("1", "b"), zona("2", "c")])
            .with_table("T3", vec![zona("1", "d")]),
    );
    let store = Arc::new(MemoryStore::new());
    run(&cfg, &source, &store).await;

    source.set_failing("T2", true).await;
    let result = run(&cfg, &source, &store).await;

    assert_eq!(result.table("T1").unwrap().status, TableStatus::Completed);
    assert_eq!(result.table("T3").unwrap().status, TableStatus::Completed);
    let t2 = result.table("T2").unwrap();
    assert_eq!(t2.status, TableStatus::Failed);
    assert!(t2.error.as_deref().unwrap_or_default().contains("T2"));
    // Stale count from the previous run.
    assert_eq!(t2.final_count, 2);
    assert_eq!(result.failed_tables, vec!["T2".to_string()]);
    assert_eq!(result.status, "completed_with_errors");
    assert_eq!(result.grand_total, 4);
}

#[tokio::test]
async fn test_missing_source_table_reports_zero() {
    let cfg = config(vec![TableConfig::incremental("Fantasma", &["ID"])]);
    let source = Arc::new(StaticSource::new());
    let store = Arc::new(MemoryStore::new());

    let result = run(&cfg, &source, &store).await;
    let t = result.table("Fantasma").unwrap();
    assert_eq!(t.status, TableStatus::Failed);
    assert_eq!(t.final_count, 0);
}

#[tokio::test]
async fn test_bad_rows_fall_back_to_single_inserts() {
    let mut cfg = config(vec![TableConfig::incremental("Zonas", &["NUMZONA"])]);
    cfg.sync.batch_size = 2;
    let source = Arc::new(StaticSource::new().with_table(
        "Zonas",
        vec![
            zona("1", "a"),
            zona("2", "CORRUPT"),
            zona("3", "c"),
            zona("4", "d"),
            zona("5", "e"),
        ],
    ));
    let store = Arc::new(MemoryStore::new().with_reject_marker("CORRUPT"));

    let result = run(&cfg, &source, &store).await;
    let t = result.table("Zonas").unwrap();
    assert_eq!(t.status, TableStatus::Completed);
    assert_eq!(t.inserted, 4);
    assert_eq!(t.failed_rows, 1);
    assert_eq!(t.final_count, 4);
    assert!(store.constraint_checks_enabled());
}

#[tokio::test]
async fn test_malformed_values_become_null() {
    let cfg = config(vec![TableConfig::incremental("Socios", &["NUMSOCIO"])]);
    let source = Arc::new(StaticSource::new().with_table(
        "Socios",
        vec![
            Record::from_pairs([("NUMSOCIO", "A1"), ("FECALTA", "01/27/22 00:00:00")]),
            Record::from_pairs([("NUMSOCIO", "A2"), ("FECALTA", "ayer")]),
        ],
    ));
    let store = Arc::new(MemoryStore::new());

    let result = run(&cfg, &source, &store).await;
    let t = result.table("Socios").unwrap();
    assert_eq!(t.malformed_values, 1);
    assert_eq!(t.inserted, 2);

    let good = store.find("Socios", "NUMSOCIO", "A1").await.unwrap();
    assert_eq!(good.text("FECALTA").as_deref(), Some("2022-01-27 00:00:00"));
    let bad = store.find("Socios", "NUMSOCIO", "A2").await.unwrap();
    assert_eq!(bad.text("FECALTA"), None);
}

// =============================================================================
// Filters
// =============================================================================

fn members_config() -> Config {
    config(vec![
        TableConfig::incremental("Socios", &["NUMSOCIO"]).with_filter(FilterRule::Equals {
            column: "COBSOCIO".into(),
            value: "30".into(),
        }),
        TableConfig::incremental("Comentarios", &["IdComment"]).with_filter(FilterRule::InTable {
            column: "NumSocio".into(),
            table: "Socios".into(),
            table_column: "NUMSOCIO".into(),
        }),
    ])
}

fn members_source() -> StaticSource {
    StaticSource::new()
        .with_table(
            "Socios",
            vec![
                Record::from_pairs([("NUMSOCIO", "A1"), ("COBSOCIO", "30")]),
                Record::from_pairs([("NUMSOCIO", "B2"), ("COBSOCIO", "12")]),
            ],
        )
        .with_table(
            "Comentarios",
            vec![
                Record::from_pairs([("IdComment", "1"), ("NumSocio", "A1"), ("Texto", "ok")]),
                Record::from_pairs([("IdComment", "2"), ("NumSocio", "B2"), ("Texto", "no")]),
                Record::from_pairs([("IdComment", "3"), ("NumSocio", "A1"), ("Texto", "si")]),
            ],
        )
}

#[tokio::test]
async fn test_filters_restrict_records() {
    let cfg = members_config();
    let source = Arc::new(members_source());
    let store = Arc::new(MemoryStore::new());

    let result = run(&cfg, &source, &store).await;
    let socios = result.table("Socios").unwrap();
    assert_eq!(socios.rows_extracted, 2);
    assert_eq!(socios.rows_after_filters, 1);
    let comentarios = result.table("Comentarios").unwrap();
    assert_eq!(comentarios.rows_after_filters, 2);
    assert_eq!(comentarios.final_count, 2);
    assert!(store.find("Comentarios", "IdComment", "2").await.is_none());
}

#[tokio::test]
async fn test_in_table_filter_after_failed_table_passes_nothing() {
    let cfg = members_config();
    let source = Arc::new(members_source());
    source.set_failing("Socios", true).await;
    let store = Arc::new(MemoryStore::new());

    let result = run(&cfg, &source, &store).await;
    let comentarios = result.table("Comentarios").unwrap();
    assert_eq!(comentarios.status, TableStatus::Completed);
    assert_eq!(comentarios.rows_after_filters, 0);
    assert!(!store.table_exists("Comentarios").await.unwrap());
}

// =============================================================================
// Run options
// =============================================================================

#[tokio::test]
async fn test_dry_run_writes_nothing() {
    let cfg = config(vec![TableConfig::incremental("Zonas", &["NUMZONA"])]);
    let source = Arc::new(
        StaticSource::new().with_table("Zonas", vec![zona("1", "Centro"), zona("2", "Norte")]),
    );
    let store = Arc::new(MemoryStore::new());

    let result = run_with(&cfg, &source, &store, true).await;
    assert!(result.dry_run);
    assert_eq!(result.table("Zonas").unwrap().inserted, 2);
    assert!(!store.table_exists("Zonas").await.unwrap());
}

#[tokio::test]
async fn test_dry_run_with_new_key_column() {
    let store = Arc::new(MemoryStore::new());
    let source = Arc::new(
        StaticSource::new().with_table("Zonas", vec![zona("1", "Centro"), zona("2", "Norte")]),
    );
    run(
        &config(vec![TableConfig::incremental("Zonas", &["NUMZONA"])]),
        &source,
        &store,
    )
    .await;

    // The key gains a column the destination table does not have yet.
    let cfg = config(vec![TableConfig::incremental("Zonas", &["NUMZONA", "SECTOR"])]);
    source
        .set_table(
            "Zonas",
            vec![
                Record::from_pairs([("NUMZONA", "1"), ("DESZONA", "Centro"), ("SECTOR", "A")]),
                Record::from_pairs([("NUMZONA", "2"), ("DESZONA", "Norte"), ("SECTOR", "B")]),
            ],
        )
        .await;

    let dry = run_with(&cfg, &source, &store, true).await;
    let t = dry.table("Zonas").unwrap();
    assert_eq!(t.status, TableStatus::Completed);
    assert_eq!(t.inserted, 2);
    assert!(!store
        .existing_columns("Zonas")
        .await
        .unwrap()
        .contains(&"SECTOR".to_string()));

    let real = run(&cfg, &source, &store).await;
    assert_eq!(real.table("Zonas").unwrap().inserted, t.inserted);
}

#[tokio::test]
async fn test_cancelled_run_skips_tables() {
    let cfg = config(vec![
        TableConfig::incremental("Zonas", &["NUMZONA"]),
        TableConfig::full_refresh("Otras"),
    ]);
    let source = Arc::new(StaticSource::new().with_table("Zonas", vec![zona("1", "Centro")]));
    let store = Arc::new(MemoryStore::new());

    let token = CancellationToken::new();
    token.cancel();
    let result = Orchestrator::new(
        cfg,
        source.clone() as Arc<dyn Extractor>,
        None,
        store.clone() as Arc<dyn DestinationStore>,
    )
    .run(Some(token))
    .await
    .unwrap();

    assert!(result.is_cancelled());
    assert!(result.tables.iter().all(|t| t.status == TableStatus::Skipped));
    assert!(!store.table_exists("Zonas").await.unwrap());
}

#[tokio::test]
async fn test_empty_table_writes_nothing() {
    let cfg = config(vec![TableConfig::incremental("Zonas", &["NUMZONA"])]);
    let source = Arc::new(StaticSource::new().with_table("Zonas", Vec::new()));
    let store = Arc::new(MemoryStore::new());

    let result = run(&cfg, &source, &store).await;
    let t = result.table("Zonas").unwrap();
    assert_eq!(t.status, TableStatus::Completed);
    assert_eq!(t.final_count, 0);
    assert!(!store.table_exists("Zonas").await.unwrap());
}

#[tokio::test]
async fn test_declared_schema_drives_typing() {
    let cfg = config(vec![TableConfig::incremental("Socios", &["NUMSOCIO"])]);
    let source = Arc::new(
        StaticSource::new()
            .with_table("Socios", vec![Record::from_pairs([("NUMSOCIO", "007")])])
            .with_schema(TableSchema::new("Socios").with_column("NUMSOCIO", DeclaredType::Integer)),
    );
    let store = Arc::new(MemoryStore::new());

    run(&cfg, &source, &store).await;
    // Declared as an integer, so the leading zeros are gone.
    assert!(store.find("Socios", "NUMSOCIO", "7").await.is_some());

    let second = run(&cfg, &source, &store).await;
    assert_eq!(second.table("Socios").unwrap().unchanged, 1);
}
