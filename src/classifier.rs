// Routes the read batches of one series to their retention tiers.
//
// interval > coarse            -> long tier, chunks unchanged
// otherwise                    -> raw tier for chunks whose span ends at or after now - raw_retention
// interval < rollup threshold  -> additionally medium-tier rollup tasks per method, built from
//                                 samples at or after now - rollup_retention
//
// One rollup engine lives for the whole series, so rollup chunks that straddle two read
// windows are written once, complete.

use crate::chunk::CodecError;
use crate::config::AppConfig;
use crate::error::MigrationError;
use crate::models::{ChunkRecord, RawChunk, SeriesDefinition, WriteTask};
use crate::rollup::{Method, RollupEngine, RollupSeries};
use crate::tier::{RetentionTier, TierTable};

#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub tiers: TierTable,
    pub coarse_interval: u32,
    pub rollup_below_interval: u32,
    pub raw_retention: u32,
    pub rollup_retention: u32,
    pub rollup_interval: u32,
    pub rollup_chunk_span: u32,
    pub methods: Vec<Method>,
}

impl ClassifierConfig {
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        Ok(Self {
            tiers: TierTable::new(
                &config.retention.ttls,
                &config.retention.table_name_format,
            )?,
            coarse_interval: config.retention.coarse_interval_secs,
            rollup_below_interval: config.retention.rollup_below_interval_secs,
            raw_retention: config.retention.raw_retention_secs,
            rollup_retention: config.retention.rollup_retention_secs,
            rollup_interval: config.rollup.interval_secs,
            rollup_chunk_span: config.rollup.chunk_span_secs,
            methods: config.rollup.methods.clone(),
        })
    }
}

pub struct Classifier {
    config: ClassifierConfig,
}

fn task(tier: &RetentionTier, id: String, chunks: Vec<ChunkRecord>) -> WriteTask {
    WriteTask {
        table: tier.table.clone(),
        id,
        ttl: tier.ttl,
        chunks,
    }
}

impl Classifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn tiers(&self) -> &TierTable {
        &self.config.tiers
    }

    /// Starts classifying `def`. Feed its batches in ts order, then call `finish`.
    pub fn series<'a>(&'a self, def: &'a SeriesDefinition, now: u32) -> SeriesClassifier<'a> {
        let fine = def.interval <= self.config.coarse_interval
            && def.interval < self.config.rollup_below_interval;
        let rollup = fine.then(|| {
            RollupEngine::new(
                &def.id,
                self.config.rollup_interval,
                self.config.rollup_chunk_span,
                &self.config.methods,
            )
        });
        SeriesClassifier {
            config: &self.config,
            def,
            raw_cutoff: now.saturating_sub(self.config.raw_retention),
            rollup_cutoff: now.saturating_sub(self.config.rollup_retention),
            rollup,
        }
    }
}

pub struct SeriesClassifier<'a> {
    config: &'a ClassifierConfig,
    def: &'a SeriesDefinition,
    raw_cutoff: u32,
    rollup_cutoff: u32,
    rollup: Option<RollupEngine>,
}

impl SeriesClassifier<'_> {
    /// Tasks for one batch: the raw-tier task first, then any rollup chunks sealed by it.
    /// Never returns a task without chunks.
    pub fn classify(&mut self, batch: Vec<RawChunk>) -> Result<Vec<WriteTask>, MigrationError> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        if self.def.interval > self.config.coarse_interval {
            let chunks = batch.into_iter().map(ChunkRecord::from).collect();
            return Ok(vec![task(
                self.config.tiers.long(),
                self.def.id.clone(),
                chunks,
            )]);
        }

        let rollups = self.feed_rollup(&batch)?;

        // a chunk ending exactly at the cutoff is kept
        let raw_cutoff = self.raw_cutoff;
        let raw: Vec<ChunkRecord> = batch
            .into_iter()
            .filter(|c| c.span_end() >= raw_cutoff)
            .map(ChunkRecord::from)
            .collect();

        let mut tasks = Vec::with_capacity(1 + rollups.len());
        if !raw.is_empty() {
            tasks.push(task(self.config.tiers.raw(), self.def.id.clone(), raw));
        }
        tasks.extend(rollups);
        Ok(tasks)
    }

    /// Seals the open rollup chunks and returns their tasks.
    pub fn finish(self) -> Result<Vec<WriteTask>, MigrationError> {
        let Some(engine) = self.rollup else {
            return Ok(Vec::new());
        };
        let series = engine.finish().map_err(|source| MigrationError::Rollup {
            key: self.def.id.clone(),
            source,
        })?;
        Ok(rollup_tasks(self.config.tiers.medium(), series))
    }

    fn feed_rollup(&mut self, batch: &[RawChunk]) -> Result<Vec<WriteTask>, MigrationError> {
        let Some(engine) = self.rollup.as_mut() else {
            return Ok(Vec::new());
        };
        let cutoff = self.rollup_cutoff;
        let id = &self.def.id;

        for c in batch.iter().filter(|c| c.span_end() >= cutoff) {
            let corrupt = |e: CodecError| MigrationError::Decode {
                key: id.clone(),
                ts: i64::from(c.ts),
                reason: e.to_string(),
            };
            for sample in c.samples().map_err(corrupt)? {
                let (ts, value) = sample.map_err(corrupt)?;
                if ts < cutoff {
                    continue;
                }
                engine
                    .add(ts, value)
                    .map_err(|source| MigrationError::Rollup {
                        key: id.clone(),
                        source,
                    })?;
            }
        }

        Ok(rollup_tasks(self.config.tiers.medium(), engine.take_sealed()))
    }
}

fn rollup_tasks(medium: &RetentionTier, series: Vec<RollupSeries>) -> Vec<WriteTask> {
    series
        .into_iter()
        .filter(|s| !s.chunks.is_empty())
        .map(|s| task(medium, s.key, s.chunks))
        .collect()
}
