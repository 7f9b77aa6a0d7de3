// Unit of work crossing the queue: everything written under one id/table/ttl.

use super::ChunkRecord;

#[derive(Debug, Clone, PartialEq)]
pub struct WriteTask {
    pub table: String,
    /// Row-key base: series id or derived rollup id.
    pub id: String,
    pub ttl: u32,
    pub chunks: Vec<ChunkRecord>,
}

/// Partition bucket for a timestamp.
pub fn month_bucket(ts: u32, month_secs: u32) -> u32 {
    ts / month_secs
}

/// `<id>_<bucket>`; recomputed per chunk so a task spanning a boundary splits correctly.
pub fn row_key(id: &str, ts: u32, month_secs: u32) -> String {
    format!("{}_{}", id, month_bucket(ts, month_secs))
}
