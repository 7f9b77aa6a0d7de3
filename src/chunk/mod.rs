// Chunk payload codec: t0 then per-sample (ts delta, value xor) as LEB128 varints.
// Row-level framing (format byte, span header) lives in `format`.

pub mod format;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("empty chunk row")]
    Empty,
    #[error("unknown chunk format {0}")]
    UnknownFormat(u8),
    #[error("truncated chunk payload")]
    Truncated,
    #[error("varint overflow")]
    Overflow,
    #[error("timestamp overflow after {prev}")]
    TimestampOverflow { prev: u32 },
    #[error("sample ts {ts} is not after previous ts {last}")]
    OutOfOrder { ts: u32, last: u32 },
    #[error("sample ts {ts} is before chunk start {t0}")]
    BeforeStart { ts: u32, t0: u32 },
    #[error("chunk starting at {t0} is sealed")]
    Sealed { t0: u32 },
}

/// In-progress chunk. Samples are appended in ts order; `finish` seals it.
#[derive(Debug, Clone)]
pub struct Chunk {
    t0: u32,
    last_ts: Option<u32>,
    last_bits: u64,
    buf: BytesMut,
    sealed: bool,
}

impl Chunk {
    pub fn new(t0: u32) -> Self {
        let mut buf = BytesMut::with_capacity(64);
        buf.put_u32_le(t0);
        Self {
            t0,
            last_ts: None,
            last_bits: 0,
            buf,
            sealed: false,
        }
    }

    pub fn t0(&self) -> u32 {
        self.t0
    }

    pub fn push(&mut self, ts: u32, value: f64) -> Result<(), CodecError> {
        if self.sealed {
            return Err(CodecError::Sealed { t0: self.t0 });
        }
        let prev = match self.last_ts {
            Some(last) if ts <= last => return Err(CodecError::OutOfOrder { ts, last }),
            Some(last) => last,
            None if ts < self.t0 => return Err(CodecError::BeforeStart { ts, t0: self.t0 }),
            None => self.t0,
        };
        let bits = value.to_bits();
        put_uvarint(&mut self.buf, u64::from(ts - prev));
        put_uvarint(&mut self.buf, bits ^ self.last_bits);
        self.last_ts = Some(ts);
        self.last_bits = bits;
        Ok(())
    }

    pub fn finish(&mut self) {
        self.sealed = true;
    }

    /// Encoded payload (without any row format prefix).
    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }
}

/// Decoding iterator over a payload. Yields one error and then stops on corrupt input.
pub struct ChunkIter<'a> {
    buf: &'a [u8],
    prev_ts: u32,
    prev_bits: u64,
    failed: bool,
}

impl<'a> ChunkIter<'a> {
    pub fn new(payload: &'a [u8]) -> Result<Self, CodecError> {
        let mut buf = payload;
        if buf.remaining() < 4 {
            return Err(CodecError::Truncated);
        }
        let t0 = buf.get_u32_le();
        Ok(Self {
            buf,
            prev_ts: t0,
            prev_bits: 0,
            failed: false,
        })
    }

    fn next_sample(&mut self) -> Result<(u32, f64), CodecError> {
        let delta = get_uvarint(&mut self.buf)?;
        let xor = get_uvarint(&mut self.buf)?;
        let ts = u32::try_from(delta)
            .ok()
            .and_then(|d| self.prev_ts.checked_add(d))
            .ok_or(CodecError::TimestampOverflow { prev: self.prev_ts })?;
        let bits = self.prev_bits ^ xor;
        self.prev_ts = ts;
        self.prev_bits = bits;
        Ok((ts, f64::from_bits(bits)))
    }
}

impl Iterator for ChunkIter<'_> {
    type Item = Result<(u32, f64), CodecError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || !self.buf.has_remaining() {
            return None;
        }
        let out = self.next_sample();
        self.failed = out.is_err();
        Some(out)
    }
}

/// Decode a whole payload.
pub fn decode(payload: &[u8]) -> Result<Vec<(u32, f64)>, CodecError> {
    ChunkIter::new(payload)?.collect()
}

fn put_uvarint(buf: &mut BytesMut, mut v: u64) {
    while v >= 0x80 {
        buf.put_u8((v as u8) | 0x80);
        v >>= 7;
    }
    buf.put_u8(v as u8);
}

fn get_uvarint(buf: &mut &[u8]) -> Result<u64, CodecError> {
    let mut v: u64 = 0;
    let mut shift = 0u32;
    loop {
        if !buf.has_remaining() {
            return Err(CodecError::Truncated);
        }
        if shift > 63 {
            return Err(CodecError::Overflow);
        }
        let b = buf.get_u8();
        v |= u64::from(b & 0x7f) << shift;
        if b & 0x80 == 0 {
            return Ok(v);
        }
        shift += 7;
    }
}
