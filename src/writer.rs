// Consumer side: pops write tasks until the queue is closed and drained.
// Any failed insert ends the task, which drops the receiver and stops the producer.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::MigrationError;
use crate::models::WriteTask;
use crate::store::ChunkStore;
use crate::tier::TierTable;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteStats {
    pub tasks: usize,
    pub chunks: usize,
}

pub fn spawn_writer(
    mut rx: mpsc::Receiver<WriteTask>,
    store: Arc<ChunkStore>,
    tiers: TierTable,
    month_secs: u32,
) -> JoinHandle<Result<WriteStats, MigrationError>> {
    tokio::spawn(async move {
        let mut stats = WriteStats::default();
        while let Some(task) = rx.recv().await {
            if tiers.lookup(task.ttl).is_none() {
                return Err(MigrationError::UnknownTier { ttl: task.ttl });
            }
            stats.chunks += store.write_task(&task, month_secs).await?;
            stats.tasks += 1;
        }
        tracing::debug!(
            tasks = stats.tasks,
            chunks = stats.chunks,
            "Writer drained queue"
        );
        Ok(stats)
    })
}
