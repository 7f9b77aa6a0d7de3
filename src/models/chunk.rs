// Source chunks as read from one driver row, and the records queued for writing.

use bytes::Bytes;

use crate::chunk::{self, CodecError, format};

/// One source row: start ts, span, payload without the format prefix.
#[derive(Debug, Clone, PartialEq)]
pub struct RawChunk {
    pub ts: u32,
    pub span: u32,
    pub payload: Bytes,
}

impl RawChunk {
    /// Decode one stored row. Rows without a span header get `default_span`.
    pub fn from_row(ts: u32, data: &[u8], default_span: u32) -> Result<Self, CodecError> {
        let (span, payload) = format::split_row(data)?;
        // validates the payload header up front so corrupt rows fail at read time
        chunk::ChunkIter::new(payload)?;
        Ok(Self {
            ts,
            span: span.unwrap_or(default_span),
            payload: Bytes::copy_from_slice(payload),
        })
    }

    /// Timestamp at which this chunk's span ends.
    pub fn span_end(&self) -> u32 {
        self.ts.saturating_add(self.span)
    }

    pub fn samples(&self) -> Result<chunk::ChunkIter<'_>, CodecError> {
        chunk::ChunkIter::new(&self.payload)
    }
}

/// One chunk inside a write task.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkRecord {
    pub ts: u32,
    pub span: u32,
    pub payload: Bytes,
}

impl From<RawChunk> for ChunkRecord {
    fn from(c: RawChunk) -> Self {
        Self {
            ts: c.ts,
            span: c.span,
            payload: c.payload,
        }
    }
}
