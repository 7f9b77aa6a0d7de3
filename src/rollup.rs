// Rollup engine: raw samples -> one aggregated series per method, chunked at a fixed span.
// Buckets are (b - interval, b], labelled by their end boundary b.

use serde::Deserialize;

use crate::chunk::{Chunk, CodecError};
use crate::models::ChunkRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Avg,
    Lst,
    Max,
    Min,
    Sum,
    Cnt,
}

impl Method {
    pub fn name(self) -> &'static str {
        match self {
            Method::Avg => "avg",
            Method::Lst => "lst",
            Method::Max => "max",
            Method::Min => "min",
            Method::Sum => "sum",
            Method::Cnt => "cnt",
        }
    }
}

pub const DEFAULT_METHODS: [Method; 4] = [Method::Avg, Method::Lst, Method::Max, Method::Min];

/// Derived id of a rollup series, e.g. `abc_avg_60`.
pub fn rollup_key(base: &str, method: Method, interval: u32) -> String {
    format!("{}_{}_{}", base, method.name(), interval)
}

/// End boundary of the bucket holding `ts`.
pub fn bucket_boundary(ts: u32, interval: u32) -> u32 {
    ts.div_ceil(interval).saturating_mul(interval)
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    boundary: u32,
    count: u32,
    sum: f64,
    min: f64,
    max: f64,
    last: f64,
}

impl Bucket {
    fn new(boundary: u32, value: f64) -> Self {
        Self {
            boundary,
            count: 1,
            sum: value,
            min: value,
            max: value,
            last: value,
        }
    }

    fn add(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.last = value;
    }

    fn value(&self, method: Method) -> f64 {
        match method {
            Method::Avg => self.sum / f64::from(self.count),
            Method::Lst => self.last,
            Method::Max => self.max,
            Method::Min => self.min,
            Method::Sum => self.sum,
            Method::Cnt => f64::from(self.count),
        }
    }
}

struct MethodSeries {
    method: Method,
    key: String,
    sealed: Vec<ChunkRecord>,
    open: Option<Chunk>,
}

fn seal(mut chunk: Chunk, chunk_span: u32) -> ChunkRecord {
    chunk.finish();
    ChunkRecord {
        ts: chunk.t0(),
        span: chunk_span,
        payload: chunk.into_bytes(),
    }
}

impl MethodSeries {
    fn append(&mut self, ts: u32, value: f64, chunk_span: u32) -> Result<(), CodecError> {
        let t0 = ts - ts % chunk_span;
        if let Some(open) = &mut self.open
            && open.t0() == t0
        {
            return open.push(ts, value);
        }
        if let Some(done) = self.open.take() {
            self.sealed.push(seal(done, chunk_span));
        }
        let mut chunk = Chunk::new(t0);
        chunk.push(ts, value)?;
        self.open = Some(chunk);
        Ok(())
    }

    fn take_sealed(&mut self) -> RollupSeries {
        RollupSeries {
            key: self.key.clone(),
            method: self.method,
            chunks: std::mem::take(&mut self.sealed),
        }
    }
}

/// Output of one method: derived key plus its sealed chunks.
#[derive(Debug, Clone)]
pub struct RollupSeries {
    pub key: String,
    pub method: Method,
    pub chunks: Vec<ChunkRecord>,
}

/// Accumulates one series' samples across all of its read batches. Chunks are handed out
/// as soon as they are sealed; the open one stays until `finish`.
pub struct RollupEngine {
    interval: u32,
    chunk_span: u32,
    current: Option<Bucket>,
    series: Vec<MethodSeries>,
}

impl RollupEngine {
    pub fn new(base_key: &str, interval: u32, chunk_span: u32, methods: &[Method]) -> Self {
        let series = methods
            .iter()
            .map(|&method| MethodSeries {
                method,
                key: rollup_key(base_key, method, interval),
                sealed: Vec::new(),
                open: None,
            })
            .collect();
        Self {
            interval,
            chunk_span,
            current: None,
            series,
        }
    }

    /// Feed one sample. Samples older than the current bucket are dropped.
    pub fn add(&mut self, ts: u32, value: f64) -> Result<(), CodecError> {
        let boundary = bucket_boundary(ts, self.interval);
        match &mut self.current {
            Some(bucket) if boundary == bucket.boundary => {
                bucket.add(value);
                return Ok(());
            }
            Some(bucket) if boundary < bucket.boundary => return Ok(()),
            _ => {}
        }
        self.flush()?;
        self.current = Some(Bucket::new(boundary, value));
        Ok(())
    }

    fn flush(&mut self) -> Result<(), CodecError> {
        let Some(bucket) = self.current.take() else {
            return Ok(());
        };
        for s in &mut self.series {
            s.append(bucket.boundary, bucket.value(s.method), self.chunk_span)?;
        }
        Ok(())
    }

    /// Chunks sealed since the last call, in method order. Later samples can no longer
    /// reach them.
    pub fn take_sealed(&mut self) -> Vec<RollupSeries> {
        self.series.iter_mut().map(MethodSeries::take_sealed).collect()
    }

    /// Flush the pending bucket, seal every open chunk, and hand out what is left in method order.
    pub fn finish(mut self) -> Result<Vec<RollupSeries>, CodecError> {
        self.flush()?;
        let chunk_span = self.chunk_span;
        Ok(self
            .series
            .into_iter()
            .map(|mut s| {
                if let Some(open) = s.open.take() {
                    s.sealed.push(seal(open, chunk_span));
                }
                s.take_sealed()
            })
            .collect())
    }
}
