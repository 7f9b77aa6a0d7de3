// Shared test helpers: throwaway SQLite schema, fixtures, row readers.
#![allow(dead_code)]

use retention_migration::chunk::{Chunk, format};
use retention_migration::models::{RawChunk, SeriesDefinition};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tempfile::TempDir;

pub const MONTH: u32 = 60 * 60 * 24 * 28;
pub const DAY: u32 = 60 * 60 * 24;
/// Day- and 6h-aligned, 20 days into month bucket 702.
pub const NOW: u32 = 1_700_006_400;

pub const TIER_TABLES: [&str; 3] = ["metric_16", "metric_1024", "metric_16384"];

pub fn config_toml(db_path: &str) -> String {
    format!(
        r#"
[database]
path = "{}"
max_pool_size = 2
"#,
        db_path
    )
}

/// Creates the catalog and chunk tables in a fresh database under `dir`.
pub async fn test_db(dir: &TempDir) -> (SqlitePool, String) {
    let path = dir.path().join("migration.db");
    let path_str = path.to_str().unwrap().to_string();
    let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path_str))
        .unwrap()
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);
    let pool = SqlitePoolOptions::new()
        .max_connections(2)
        .connect_with(opts)
        .await
        .unwrap();

    sqlx::query(
        "CREATE TABLE metric_idx (id TEXT PRIMARY KEY, org_id INTEGER NOT NULL, name TEXT NOT NULL, interval INTEGER NOT NULL, last_update INTEGER NOT NULL)",
    )
    .execute(&pool)
    .await
    .unwrap();
    for table in TIER_TABLES {
        sqlx::query(&format!(
            "CREATE TABLE {} (key TEXT NOT NULL, ts INTEGER NOT NULL, data BLOB NOT NULL, ttl INTEGER, PRIMARY KEY (key, ts))",
            table
        ))
        .execute(&pool)
        .await
        .unwrap();
    }
    (pool, path_str)
}

pub async fn insert_series(pool: &SqlitePool, id: &str, interval: u32) {
    sqlx::query(
        "INSERT INTO metric_idx (id, org_id, name, interval, last_update) VALUES ($1, 1, $2, $3, 0)",
    )
    .bind(id)
    .bind(format!("name.{}", id))
    .bind(i64::from(interval))
    .execute(pool)
    .await
    .unwrap();
}

pub async fn insert_row(pool: &SqlitePool, table: &str, key: &str, ts: u32, data: &[u8]) {
    sqlx::query(&format!(
        "INSERT INTO {} (key, ts, data) VALUES ($1, $2, $3)",
        table
    ))
    .bind(key)
    .bind(i64::from(ts))
    .bind(data)
    .execute(pool)
    .await
    .unwrap();
}

pub fn encode(t0: u32, samples: &[(u32, f64)]) -> Vec<u8> {
    let mut c = Chunk::new(t0);
    for &(ts, v) in samples {
        c.push(ts, v).unwrap();
    }
    c.finish();
    c.into_bytes().to_vec()
}

/// Source-format row (no span header).
pub fn source_row(t0: u32, samples: &[(u32, f64)]) -> Vec<u8> {
    format::with_format_prefix(&encode(t0, samples))
}

/// Samples every `step` seconds in `[t0, t0 + span)`, valued by `value(ts)`.
pub fn regular_samples(t0: u32, span: u32, step: u32, value: impl Fn(u32) -> f64) -> Vec<(u32, f64)> {
    (t0..t0 + span).step_by(step as usize).map(|ts| (ts, value(ts))).collect()
}

pub fn raw_chunk(t0: u32, span: u32, samples: &[(u32, f64)]) -> RawChunk {
    RawChunk::from_row(t0, &source_row(t0, samples), span).unwrap()
}

pub fn def(id: &str, interval: u32) -> SeriesDefinition {
    SeriesDefinition {
        id: id.into(),
        org_id: 1,
        name: format!("name.{}", id),
        interval,
        last_update: 0,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredRow {
    pub key: String,
    pub ts: i64,
    pub data: Vec<u8>,
    pub ttl: Option<i64>,
}

pub async fn rows(pool: &SqlitePool, table: &str) -> Vec<StoredRow> {
    sqlx::query(&format!(
        "SELECT key, ts, data, ttl FROM {} ORDER BY key, ts",
        table
    ))
    .fetch_all(pool)
    .await
    .unwrap()
    .into_iter()
    .map(|r| StoredRow {
        key: r.try_get("key").unwrap(),
        ts: r.try_get("ts").unwrap(),
        data: r.try_get("data").unwrap(),
        ttl: r.try_get("ttl").unwrap(),
    })
    .collect()
}

pub async fn rows_for_key(pool: &SqlitePool, table: &str, key: &str) -> Vec<StoredRow> {
    rows(pool, table)
        .await
        .into_iter()
        .filter(|r| r.key == key)
        .collect()
}
