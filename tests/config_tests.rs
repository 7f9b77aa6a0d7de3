// Config loading and validation tests

use retention_migration::config::AppConfig;
use retention_migration::rollup::Method;

const MINIMAL_CONFIG: &str = r#"
[database]
path = "data/migration.db"
"#;

const FULL_CONFIG: &str = r#"
[database]
path = "data/migration.db"
max_pool_size = 8

[source]
table = "metric_1024"
days_back = 30
month_secs = 2419200
chunk_span_secs = 1800

[retention]
ttls = [86400, 5184000, 94608000]
table_name_format = "metric_{}"
raw_retention_secs = 86400
rollup_retention_secs = 5184000
coarse_interval_secs = 1800
rollup_below_interval_secs = 60

[rollup]
interval_secs = 60
chunk_span_secs = 21600
methods = ["avg", "lst", "max", "min"]

[pipeline]
queue_capacity = 50
"#;

#[test]
fn test_config_minimal_uses_defaults() {
    let config = AppConfig::load_from_str(MINIMAL_CONFIG).expect("load_from_str");
    assert_eq!(config.database.path, "data/migration.db");
    assert_eq!(config.database.max_pool_size, 4);
    assert_eq!(config.source.table, "metric_1024");
    assert_eq!(config.source.days_back, 68);
    assert_eq!(config.source.month_secs, 2_419_200);
    assert_eq!(config.retention.ttls, vec![86_400, 5_184_000, 94_608_000]);
    assert_eq!(config.retention.coarse_interval_secs, 1800);
    assert_eq!(config.retention.rollup_below_interval_secs, 60);
    assert_eq!(config.rollup.interval_secs, 60);
    assert_eq!(config.rollup.chunk_span_secs, 21_600);
    assert_eq!(
        config.rollup.methods,
        vec![Method::Avg, Method::Lst, Method::Max, Method::Min]
    );
    assert_eq!(config.pipeline.queue_capacity, 1000);
}

#[test]
fn test_config_full_loads_from_str() {
    let config = AppConfig::load_from_str(FULL_CONFIG).expect("load_from_str");
    assert_eq!(config.database.max_pool_size, 8);
    assert_eq!(config.source.days_back, 30);
    assert_eq!(config.source.chunk_span_secs, 1800);
    assert_eq!(config.pipeline.queue_capacity, 50);
}

#[test]
fn test_config_validation_rejects_empty_db_path() {
    let bad = MINIMAL_CONFIG.replace("path = \"data/migration.db\"", "path = \"\"");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("database.path"));
}

#[test]
fn test_config_validation_rejects_non_identifier_source_table() {
    let bad = FULL_CONFIG.replace("table = \"metric_1024\"", "table = \"metric; DROP\"");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("source.table"));
}

#[test]
fn test_config_validation_rejects_month_not_whole_days() {
    let bad = FULL_CONFIG.replace("month_secs = 2419200", "month_secs = 3600");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("source.month_secs"));
}

#[test]
fn test_config_validation_rejects_wrong_ttl_count() {
    let bad = FULL_CONFIG.replace(
        "ttls = [86400, 5184000, 94608000]",
        "ttls = [86400, 5184000]",
    );
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("retention.ttls"));
}

#[test]
fn test_config_validation_rejects_unordered_ttls() {
    let bad = FULL_CONFIG.replace(
        "ttls = [86400, 5184000, 94608000]",
        "ttls = [5184000, 86400, 94608000]",
    );
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("strictly increasing"));
}

#[test]
fn test_config_validation_rejects_format_without_placeholder() {
    let bad = FULL_CONFIG.replace("table_name_format = \"metric_{}\"", "table_name_format = \"metric\"");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("retention.table_name_format"));
}

#[test]
fn test_config_validation_rejects_span_not_multiple_of_interval() {
    let bad = FULL_CONFIG.replace("chunk_span_secs = 21600", "chunk_span_secs = 21601");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("rollup.chunk_span_secs"));
}

#[test]
fn test_config_validation_rejects_duplicate_methods() {
    let bad = FULL_CONFIG.replace(
        "methods = [\"avg\", \"lst\", \"max\", \"min\"]",
        "methods = [\"avg\", \"avg\"]",
    );
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("rollup.methods"));
}

#[test]
fn test_config_rejects_unknown_method() {
    let bad = FULL_CONFIG.replace(
        "methods = [\"avg\", \"lst\", \"max\", \"min\"]",
        "methods = [\"median\"]",
    );
    assert!(AppConfig::load_from_str(&bad).is_err());
}

#[test]
fn test_config_validation_rejects_queue_capacity_zero() {
    let bad = FULL_CONFIG.replace("queue_capacity = 50", "queue_capacity = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("pipeline.queue_capacity"));
}

#[test]
fn test_config_load_from_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("migration.toml");
    std::fs::write(&path, MINIMAL_CONFIG).unwrap();
    unsafe {
        std::env::set_var("CONFIG_FILE", path.to_str().unwrap());
    }
    let config = AppConfig::load().expect("load");
    assert_eq!(config.database.path, "data/migration.db");
}
