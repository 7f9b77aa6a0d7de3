// Producer side: catalog -> month buckets -> day windows -> classify -> queue.
// Classification runs inline and keeps per-series state across windows; only the queue
// push crosses to the writer.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, instrument};

use crate::catalog::MetricCatalog;
use crate::classifier::Classifier;
use crate::error::MigrationError;
use crate::models::{SeriesDefinition, WriteTask};
use crate::store::ChunkStore;

pub const DAY_SECS: u32 = 60 * 60 * 24;

/// Day windows `(from, to]` queried for one month bucket's row key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthWindows {
    pub month: u32,
    pub windows: Vec<(u32, u32)>,
}

/// Month buckets covering `[now - days_back, now - 1]`. Every bucket's windows start at the
/// first bucket's boundary and run through the end of that bucket, so chunks crossing a
/// boundary are still picked up.
pub fn month_windows(now: u32, days_back: u32, month_secs: u32) -> Vec<MonthWindows> {
    let start = now.saturating_sub(days_back.saturating_mul(DAY_SECS));
    let start_month = start / month_secs;
    let end_month = now.saturating_sub(1) / month_secs;

    (start_month..=end_month)
        .map(|month| {
            let end = (month + 1).saturating_mul(month_secs);
            let windows = (start_month * month_secs..=end)
                .step_by(DAY_SECS as usize)
                .map(|from| (from, from.saturating_add(DAY_SECS)))
                .collect();
            MonthWindows { month, windows }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadStats {
    pub series: usize,
    pub chunks_read: usize,
    pub tasks_queued: usize,
}

#[derive(Debug, Clone)]
pub struct ReaderConfig {
    pub source_table: String,
    pub days_back: u32,
    pub month_secs: u32,
}

pub struct Reader {
    catalog: MetricCatalog,
    store: Arc<ChunkStore>,
    classifier: Classifier,
    config: ReaderConfig,
}

impl Reader {
    pub fn new(
        catalog: MetricCatalog,
        store: Arc<ChunkStore>,
        classifier: Classifier,
        config: ReaderConfig,
    ) -> Self {
        Self {
            catalog,
            store,
            classifier,
            config,
        }
    }

    /// Runs the producer to completion. Dropping `tx` on return closes the queue.
    pub async fn run(
        &self,
        tx: mpsc::Sender<WriteTask>,
        now: u32,
    ) -> Result<ReadStats, MigrationError> {
        let defs = self.catalog.load().await?;
        info!(metrics = defs.len(), "received metrics");

        let mut stats = ReadStats::default();
        for def in &defs {
            self.process_series(def, &tx, now, &mut stats).await?;
            stats.series += 1;
        }
        info!(
            series = stats.series,
            chunks_read = stats.chunks_read,
            tasks_queued = stats.tasks_queued,
            "reader finished"
        );
        Ok(stats)
    }

    #[instrument(skip(self, def, tx, stats), fields(id = %def.id, interval = def.interval))]
    async fn process_series(
        &self,
        def: &SeriesDefinition,
        tx: &mpsc::Sender<WriteTask>,
        now: u32,
        stats: &mut ReadStats,
    ) -> Result<(), MigrationError> {
        let mut series = self.classifier.series(def, now);

        for bucket in month_windows(now, self.config.days_back, self.config.month_secs) {
            let row_key = def.row_key(bucket.month);
            debug!(row_key = %row_key, "select for row_key");
            let mut chunks = 0usize;

            for (from, to) in bucket.windows {
                let batch = self
                    .store
                    .read_range(&self.config.source_table, &row_key, from, to)
                    .await?;
                chunks += batch.len();
                send_all(tx, series.classify(batch)?, stats).await?;
            }

            stats.chunks_read += chunks;
            info!(row_key = %row_key, chunks, "chunks for row_key");
        }

        send_all(tx, series.finish()?, stats).await
    }
}

async fn send_all(
    tx: &mpsc::Sender<WriteTask>,
    tasks: Vec<WriteTask>,
    stats: &mut ReadStats,
) -> Result<(), MigrationError> {
    for task in tasks {
        tx.send(task)
            .await
            .map_err(|_| MigrationError::QueueClosed)?;
        stats.tasks_queued += 1;
    }
    Ok(())
}
