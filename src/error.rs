// Run-level errors. Every variant is fatal: the run stops at the first one.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrationError {
    /// Catalog could not be loaded; nothing has been migrated yet.
    #[error("catalog load failed: {0}")]
    Catalog(#[source] sqlx::Error),

    /// Corrupt source payload.
    #[error("corrupt chunk {key} at ts {ts}: {reason}")]
    Decode {
        key: String,
        ts: i64,
        reason: String,
    },

    #[error("rollup encoding for {key} failed: {source}")]
    Rollup {
        key: String,
        #[source]
        source: crate::chunk::CodecError,
    },

    /// Read or write statement failed.
    #[error("query error: {0}")]
    Query(#[from] sqlx::Error),

    #[error("no retention tier configured for ttl {ttl}")]
    UnknownTier { ttl: u32 },

    /// The other side of the task queue went away.
    #[error("task queue closed before the run finished")]
    QueueClosed,

    #[error("writer task panicked or was cancelled: {0}")]
    WriterPanicked(String),
}
