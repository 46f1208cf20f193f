use std::io::Write;

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};

use super::varint::{varint_write, zig_zag_encode};
use super::{EncodeError, Encoder, V2_COOKIE, V2_HEADER_SIZE, V2_MAX_WORD_BYTES};
use crate::counter::Counter;
use crate::Histogram;

/// Encoder for the V2 binary frame: a 40-byte big-endian header followed by
/// the relevant counts prefix as zig-zag LEB128 varints with zero runs
/// collapsed.
///
/// Reusable across histograms; the internal buffer is retained between
/// calls.
pub struct V2Encoder {
    buf: Vec<u8>,
}

impl Default for V2Encoder {
    fn default() -> Self {
        Self::new()
    }
}

impl V2Encoder {
    /// Create a new encoder.
    pub fn new() -> V2Encoder {
        V2Encoder { buf: Vec::new() }
    }

    /// A conservative upper bound on the size of `h`'s encoded frame: the
    /// header plus nine bytes per relevant count slot.
    pub fn encoded_size_bound<C: Counter>(h: &Histogram<C>) -> usize {
        // Relevant length tops out around 6e6 slots, so this cannot overflow.
        (h.index_of_max() + 1) * V2_MAX_WORD_BYTES + V2_HEADER_SIZE
    }

    /// Encode `h` into the front of `buf`, returning the number of bytes
    /// written.
    ///
    /// Fails with [`EncodeError::BufferTooSmall`] when `buf` is shorter than
    /// [`encoded_size_bound`](V2Encoder::encoded_size_bound).
    pub fn encode_to_slice<C: Counter>(
        &mut self,
        h: &Histogram<C>,
        buf: &mut [u8],
    ) -> Result<usize, EncodeError> {
        if buf.len() < Self::encoded_size_bound(h) {
            return Err(EncodeError::BufferTooSmall);
        }
        let len = self.encode_to_buf(h)?;
        buf[..len].copy_from_slice(&self.buf[..len]);
        Ok(len)
    }

    /// Fill the internal buffer with `h`'s frame; returns the frame length.
    pub(crate) fn encode_to_buf<C: Counter>(&mut self, h: &Histogram<C>) -> Result<usize, EncodeError> {
        let max_size = Self::encoded_size_bound(h);
        self.buf.clear();
        self.buf.reserve(max_size);

        self.buf.write_u32::<BigEndian>(V2_COOKIE)?;
        // payload length, patched once the counts are encoded
        self.buf.write_u32::<BigEndian>(0)?;
        // normalizing index offset; value shifting is not supported
        self.buf.write_u32::<BigEndian>(0)?;
        self.buf
            .write_u32::<BigEndian>(u32::from(h.significant_digits()))?;
        self.buf
            .write_u64::<BigEndian>(h.lowest_discernible_value())?;
        self.buf.write_u64::<BigEndian>(h.highest_trackable_value())?;
        // integer-to-double conversion ratio
        self.buf.write_f64::<BigEndian>(1.0)?;

        debug_assert_eq!(V2_HEADER_SIZE, self.buf.len());

        self.buf.resize(max_size, 0);
        let counts_len = encode_counts(h, &mut self.buf[V2_HEADER_SIZE..])?;
        BigEndian::write_u32(&mut self.buf[4..8], counts_len as u32);

        Ok(V2_HEADER_SIZE + counts_len)
    }

    pub(crate) fn frame(&self) -> &[u8] {
        &self.buf
    }
}

impl Encoder for V2Encoder {
    fn encode<C: Counter, W: Write>(
        &mut self,
        h: &Histogram<C>,
        writer: &mut W,
    ) -> Result<usize, EncodeError> {
        let len = self.encode_to_buf(h)?;
        writer.write_all(&self.buf[..len])?;
        Ok(len)
    }
}

/// Encode the relevant counts prefix of `h` into `buf`, which must hold at
/// least nine bytes per relevant slot. Returns the bytes written.
///
/// Each emitted varint is either a slot's count (non-negative) or, for runs
/// of two or more empty slots, the negated run length.
fn encode_counts<C: Counter>(h: &Histogram<C>, buf: &mut [u8]) -> Result<usize, EncodeError> {
    let limit = h.index_of_max();
    let mut index = 0;
    let mut written = 0;

    while index <= limit {
        let count = h
            .count_at_index(index)
            .expect("relevant prefix is inside the counts array");
        index += 1;

        let token = if count == C::zero() {
            let mut zeros: i64 = 1;
            while index <= limit
                && h.count_at_index(index)
                    .expect("relevant prefix is inside the counts array")
                    == C::zero()
            {
                zeros += 1;
                index += 1;
            }
            if zeros > 1 {
                // a run of empty slots collapses into one negative token
                -zeros
            } else {
                0
            }
        } else {
            count.to_i64().ok_or(EncodeError::CountNotSerializable)?
        };

        written += varint_write(zig_zag_encode(token), &mut buf[written..]);
    }

    Ok(written)
}
