// Chunk tables over SQLite. Source rows are read by windowed range scans;
// tier rows are written with INSERT OR REPLACE so re-runs overwrite by (key, ts).
// Tables are expected to exist: key TEXT, ts INTEGER, data BLOB, ttl INTEGER, PRIMARY KEY (key, ts).

use crate::chunk::format;
use crate::error::MigrationError;
use crate::models::{RawChunk, WriteTask, row_key};
use futures_util::TryStreamExt;
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::instrument;

pub struct ChunkStore {
    pool: SqlitePool,
    /// Span given to source rows that carry no span header.
    default_span: u32,
}

impl ChunkStore {
    /// Open an existing database. Tables are not created here.
    pub async fn connect(
        path: &str,
        max_pool_size: u32,
        default_span: u32,
    ) -> anyhow::Result<Self> {
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(false)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_pool_size)
            .connect_with(opts)
            .await?;
        Ok(Self::from_pool(pool, default_span))
    }

    pub fn from_pool(pool: SqlitePool, default_span: u32) -> Self {
        Self { pool, default_span }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Rows of `key` with `from < ts <= to`, ascending, decoded into chunks.
    #[instrument(skip(self), fields(repo = "chunks", operation = "read_range"))]
    pub async fn read_range(
        &self,
        table: &str,
        key: &str,
        from: u32,
        to: u32,
    ) -> Result<Vec<RawChunk>, MigrationError> {
        let sql = format!(
            "SELECT ts, data FROM {} WHERE key = $1 AND ts > $2 AND ts <= $3 ORDER BY ts ASC",
            table
        );
        let mut rows = sqlx::query(&sql)
            .bind(key)
            .bind(i64::from(from))
            .bind(i64::from(to))
            .fetch(&self.pool);

        let mut out = Vec::new();
        while let Some(row) = rows.try_next().await? {
            let ts: i64 = row.try_get("ts")?;
            let data: Vec<u8> = row.try_get("data")?;
            let decode_err = |reason: String| MigrationError::Decode {
                key: key.to_string(),
                ts,
                reason,
            };
            let ts32 = u32::try_from(ts).map_err(|e| decode_err(e.to_string()))?;
            let chunk = RawChunk::from_row(ts32, &data, self.default_span)
                .map_err(|e| decode_err(e.to_string()))?;
            out.push(chunk);
        }
        Ok(out)
    }

    /// Insert every chunk of `task` in one transaction. Returns the number of rows written.
    #[instrument(
        skip(self, task),
        fields(repo = "chunks", operation = "write_task", table = %task.table, id = %task.id, chunks = task.chunks.len())
    )]
    pub async fn write_task(
        &self,
        task: &WriteTask,
        month_secs: u32,
    ) -> Result<usize, MigrationError> {
        if task.chunks.is_empty() {
            return Ok(0);
        }
        let sql = format!(
            "INSERT OR REPLACE INTO {} (key, ts, data, ttl) VALUES ($1, $2, $3, $4)",
            task.table
        );
        let mut tx = self.pool.begin().await?;
        for c in &task.chunks {
            let key = row_key(&task.id, c.ts, month_secs);
            let data = format::with_span_header(c.span, &c.payload);
            sqlx::query(&sql)
                .bind(&key)
                .bind(i64::from(c.ts))
                .bind(&data)
                .bind(i64::from(task.ttl))
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(task.chunks.len())
    }
}
