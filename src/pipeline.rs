// Run coordinator: one producer (reader + classifier) and one writer over a bounded queue.
// Fail-fast: the first error on either side ends the run. Counters come back as return
// values and are merged here once both sides have stopped.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::catalog::MetricCatalog;
use crate::classifier::{Classifier, ClassifierConfig};
use crate::config::AppConfig;
use crate::error::MigrationError;
use crate::models::WriteTask;
use crate::reader::{ReadStats, Reader, ReaderConfig};
use crate::store::ChunkStore;
use crate::tier::TierTable;
use crate::writer::{self, WriteStats};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub series: usize,
    pub chunks_read: usize,
    pub tasks_written: usize,
    pub chunks_written: usize,
}

impl RunSummary {
    fn merge(read: ReadStats, written: WriteStats) -> Self {
        Self {
            series: read.series,
            chunks_read: read.chunks_read,
            tasks_written: written.tasks,
            chunks_written: written.chunks,
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Finished. Metrics: {}, Read chunks: {}, Wrote tasks: {}, Wrote chunks: {}",
            self.series, self.chunks_read, self.tasks_written, self.chunks_written
        )
    }
}

pub struct Migrator {
    reader: Reader,
    store: Arc<ChunkStore>,
    tiers: TierTable,
    month_secs: u32,
    queue_capacity: usize,
}

impl Migrator {
    pub fn from_config(config: &AppConfig, store: Arc<ChunkStore>) -> anyhow::Result<Self> {
        let classifier = Classifier::new(ClassifierConfig::from_config(config)?);
        let tiers = classifier.tiers().clone();
        let reader = Reader::new(
            MetricCatalog::new(store.pool().clone()),
            store.clone(),
            classifier,
            ReaderConfig {
                source_table: config.source.table.clone(),
                days_back: config.source.days_back,
                month_secs: config.source.month_secs,
            },
        );
        Ok(Self {
            reader,
            store,
            tiers,
            month_secs: config.source.month_secs,
            queue_capacity: config.pipeline.queue_capacity,
        })
    }

    /// Migrates everything relative to `now` (unix seconds) and returns the merged counters.
    pub async fn run(&self, now: u32) -> Result<RunSummary, MigrationError> {
        for tier in self.tiers.tiers() {
            info!(ttl = tier.ttl, table = %tier.table, "retention tier");
        }

        let (tx, rx) = mpsc::channel::<WriteTask>(self.queue_capacity);
        let writer = writer::spawn_writer(
            rx,
            self.store.clone(),
            self.tiers.clone(),
            self.month_secs,
        );

        // tx is moved in; the queue closes when the producer returns
        let read = self.reader.run(tx, now).await;
        let written = writer
            .await
            .map_err(|e| MigrationError::WriterPanicked(e.to_string()))?;

        match (read, written) {
            (Ok(read), Ok(written)) => Ok(RunSummary::merge(read, written)),
            // a writer failure surfaces in the producer as QueueClosed; report the cause
            (_, Err(e)) => Err(e),
            (Err(e), Ok(written)) => {
                warn!(
                    tasks_written = written.tasks,
                    chunks_written = written.chunks,
                    "producer failed; writer drained queued tasks"
                );
                Err(e)
            }
        }
    }
}
