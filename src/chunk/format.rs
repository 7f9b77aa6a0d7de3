// Row framing. [format: u8][payload] in the source table,
// [format: u8][span: u32 LE][payload] in the tier tables.

use bytes::{Buf, BufMut};

use super::CodecError;

/// Source rows: no span header.
pub const FORMAT_STANDARD: u8 = 1;
/// Tier rows: span header follows the format byte.
pub const FORMAT_WITH_SPAN: u8 = 2;

/// Source-format row for a payload.
pub fn with_format_prefix(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + payload.len());
    out.put_u8(FORMAT_STANDARD);
    out.extend_from_slice(payload);
    out
}

/// Destination-format row: format byte, span, payload.
pub fn with_span_header(span: u32, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(5 + payload.len());
    out.put_u8(FORMAT_WITH_SPAN);
    out.put_u32_le(span);
    out.extend_from_slice(payload);
    out
}

/// Split a stored row into its optional span and payload. Accepts both formats.
pub fn split_row(data: &[u8]) -> Result<(Option<u32>, &[u8]), CodecError> {
    let mut buf = data;
    if !buf.has_remaining() {
        return Err(CodecError::Empty);
    }
    match buf.get_u8() {
        FORMAT_STANDARD => Ok((None, buf)),
        FORMAT_WITH_SPAN => {
            if buf.remaining() < 4 {
                return Err(CodecError::Truncated);
            }
            let span = buf.get_u32_le();
            Ok((Some(span), buf))
        }
        other => Err(CodecError::UnknownFormat(other)),
    }
}
