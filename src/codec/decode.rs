use std::cmp;
use std::io::Read;

use byteorder::{BigEndian, ByteOrder, ReadBytesExt};
use flate2::read::{DeflateDecoder, ZlibDecoder};
use num_traits::ToPrimitive;

use super::varint::{varint_read, zig_zag_decode};
use super::{
    cookie_base, word_size_nibble, DecodeError, V0_COMPRESSED_COOKIE_BASE, V0_COOKIE_BASE,
    V1_COMPRESSED_COOKIE_BASE, V1_COOKIE_BASE, V2_COMPRESSED_COOKIE_BASE, V2_COOKIE_BASE,
    V2_HEADER_SIZE,
};
use crate::counter::Counter;
use crate::Histogram;

/// Decoder for every supported frame variant.
///
/// The frame version is inferred from the leading cookie: V2 (varint
/// counts), V1 and V0 (fixed-width counts), each plain or DEFLATE
/// compressed. The two-byte zlib wrapper some producers prepend to the
/// compressed body is detected and handled; a bare DEFLATE stream works too.
///
/// The counter type parameter of the target histogram is the caller's
/// choice: a `u64` target accepts any valid frame, while narrower targets
/// reject frames holding counts beyond their width with
/// [`DecodeError::CountExceedsWidth`].
///
/// Decoders are intended to be reused; internal buffers are retained
/// between calls.
pub struct Decoder {
    payload: Vec<u8>,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder {
    /// Create a new decoder.
    pub fn new() -> Decoder {
        Decoder {
            payload: Vec::new(),
        }
    }

    /// Decode one histogram frame from `reader`.
    pub fn decode<C: Counter, R: Read>(
        &mut self,
        reader: &mut R,
    ) -> Result<Histogram<C>, DecodeError> {
        self.decode_with_floor(reader, 0)
    }

    /// Decode one histogram frame from `reader`, giving the target histogram
    /// a highest trackable value of at least `floor` even if the encoded
    /// range is smaller. Useful when decoded intervals will be merged into
    /// an aggregate covering a wider range.
    pub fn decode_with_floor<C: Counter, R: Read>(
        &mut self,
        reader: &mut R,
        floor: u64,
    ) -> Result<Histogram<C>, DecodeError> {
        let cookie = reader.read_u32::<BigEndian>()?;
        match cookie_base(cookie) {
            base if base == V2_COMPRESSED_COOKIE_BASE
                || base == V1_COMPRESSED_COOKIE_BASE
                || base == V0_COMPRESSED_COOKIE_BASE =>
            {
                let compressed_len = reader.read_u32::<BigEndian>()?.to_usize().ok_or(
                    DecodeError::PayloadLengthMismatch,
                )?;
                let mut compressed = vec![0_u8; compressed_len];
                reader.read_exact(&mut compressed)?;
                let inflated = inflate(&compressed)?;

                let mut body = &inflated[..];
                let inner_cookie = body.read_u32::<BigEndian>()?;
                if cookie_base(inner_cookie) == V2_COOKIE_BASE {
                    // The inner payload length must account for exactly the
                    // decompressed bytes past the header.
                    if inflated.len() < V2_HEADER_SIZE {
                        return Err(DecodeError::PayloadLengthMismatch);
                    }
                    let stated = BigEndian::read_u32(&inflated[4..8]) as usize;
                    if stated != inflated.len() - V2_HEADER_SIZE {
                        return Err(DecodeError::PayloadLengthMismatch);
                    }
                }
                self.decode_plain(inner_cookie, &mut body, floor)
            }
            _ => self.decode_plain(cookie, reader, floor),
        }
    }

    /// Decode the body of a non-compressed frame whose cookie has already
    /// been consumed.
    fn decode_plain<C: Counter, R: Read>(
        &mut self,
        cookie: u32,
        reader: &mut R,
        floor: u64,
    ) -> Result<Histogram<C>, DecodeError> {
        match cookie_base(cookie) {
            base if base == V2_COOKIE_BASE => {
                // V2 counts are varints; the cookie carries a fixed marker
                // where the legacy formats put their word size.
                if (cookie & 0xF0) >> 4 != 1 {
                    return Err(DecodeError::InvalidWordSize);
                }
                self.decode_v2(reader, floor)
            }
            base if base == V1_COOKIE_BASE => {
                let word = legacy_word_size(cookie)?;
                self.decode_v1(reader, word, floor)
            }
            base if base == V0_COOKIE_BASE => {
                let word = legacy_word_size(cookie)?;
                self.decode_v0(reader, word, floor)
            }
            _ => Err(DecodeError::InvalidCookie),
        }
    }

    fn decode_v2<C: Counter, R: Read>(
        &mut self,
        reader: &mut R,
        floor: u64,
    ) -> Result<Histogram<C>, DecodeError> {
        let payload_len = reader
            .read_u32::<BigEndian>()?
            .to_usize()
            .ok_or(DecodeError::PayloadLengthMismatch)?;
        let mut h = read_config(reader, floor)?;

        self.payload.resize(payload_len, 0);
        reader.read_exact(&mut self.payload[..payload_len])?;

        let mut body = &self.payload[..payload_len];
        let mut index: usize = 0;
        while !body.is_empty() {
            let token = zig_zag_decode(varint_read(&mut body)?);
            if token < 0 {
                // a negative token is a run of that many empty slots
                let zeros = (-token)
                    .to_usize()
                    .ok_or(DecodeError::EncodedArrayTooLong)?;
                index = index
                    .checked_add(zeros)
                    .ok_or(DecodeError::EncodedArrayTooLong)?;
            } else {
                let count = C::from_i64(token).ok_or(DecodeError::CountExceedsWidth)?;
                h.set_count_at_index(index, count)
                    .map_err(|_| DecodeError::EncodedArrayTooLong)?;
                index = index
                    .checked_add(1)
                    .ok_or(DecodeError::EncodedArrayTooLong)?;
            }
        }
        if index > h.distinct_values() {
            return Err(DecodeError::EncodedArrayTooLong);
        }

        h.restat(index);
        Ok(h)
    }

    fn decode_v1<C: Counter, R: Read>(
        &mut self,
        reader: &mut R,
        word: usize,
        floor: u64,
    ) -> Result<Histogram<C>, DecodeError> {
        let payload_len = reader
            .read_u32::<BigEndian>()?
            .to_usize()
            .ok_or(DecodeError::PayloadLengthMismatch)?;
        if payload_len % word != 0 {
            return Err(DecodeError::PayloadLengthMismatch);
        }
        let mut h = read_config(reader, floor)?;

        self.payload.resize(payload_len, 0);
        reader.read_exact(&mut self.payload[..payload_len])?;

        let words = payload_len / word;
        fill_fixed_width(&mut h, &self.payload[..payload_len], word, words)?;
        h.restat(words);
        Ok(h)
    }

    fn decode_v0<C: Counter, R: Read>(
        &mut self,
        reader: &mut R,
        word: usize,
        floor: u64,
    ) -> Result<Histogram<C>, DecodeError> {
        let digits = reader
            .read_u32::<BigEndian>()?
            .to_u8()
            .ok_or(DecodeError::InvalidParameters)?;
        let low = reader.read_u64::<BigEndian>()?;
        let high = reader.read_u64::<BigEndian>()?;
        // The V0 header carries a total count, but totals are recomputed
        // from the decoded slots.
        let _encoded_total = reader.read_u64::<BigEndian>()?;

        let mut h = Histogram::new_with_bounds(low, cmp::max(high, floor), digits)
            .map_err(|_| DecodeError::InvalidParameters)?;

        // No payload length in V0: fixed-width counts run to end of stream.
        self.payload.clear();
        let _read = reader.read_to_end(&mut self.payload)?;
        if self.payload.len() % word != 0 {
            return Err(DecodeError::PayloadLengthMismatch);
        }

        let words = self.payload.len() / word;
        fill_fixed_width(&mut h, &self.payload[..], word, words)?;
        h.restat(words);
        Ok(h)
    }
}

/// Read the shared V1/V2 header tail (normalizing offset through conversion
/// ratio) and build the target histogram.
fn read_config<C: Counter, R: Read>(
    reader: &mut R,
    floor: u64,
) -> Result<Histogram<C>, DecodeError> {
    let normalizing_offset = reader.read_u32::<BigEndian>()?;
    if normalizing_offset != 0 {
        return Err(DecodeError::UnsupportedFeature);
    }
    let digits = reader
        .read_u32::<BigEndian>()?
        .to_u8()
        .ok_or(DecodeError::InvalidParameters)?;
    let low = reader.read_u64::<BigEndian>()?;
    let high = reader.read_u64::<BigEndian>()?;
    let ratio = reader.read_f64::<BigEndian>()?;
    if ratio != 1.0 {
        return Err(DecodeError::UnsupportedFeature);
    }

    Histogram::new_with_bounds(low, cmp::max(high, floor), digits)
        .map_err(|_| DecodeError::InvalidParameters)
}

/// Copy `words` big-endian signed counts of `word` bytes each out of `body`
/// into the front of the histogram's counts array.
fn fill_fixed_width<C: Counter>(
    h: &mut Histogram<C>,
    body: &[u8],
    word: usize,
    words: usize,
) -> Result<(), DecodeError> {
    for (index, chunk) in body.chunks_exact(word).take(words).enumerate() {
        let count = match word {
            2 => i64::from(BigEndian::read_i16(chunk)),
            4 => i64::from(BigEndian::read_i32(chunk)),
            8 => BigEndian::read_i64(chunk),
            _ => unreachable!("word size was validated from the cookie"),
        };
        if count < 0 {
            return Err(DecodeError::InvalidCount);
        }
        if count == 0 {
            continue;
        }
        let count = C::from_i64(count).ok_or(DecodeError::CountExceedsWidth)?;
        h.set_count_at_index(index, count)
            .map_err(|_| DecodeError::EncodedArrayTooLong)?;
    }
    Ok(())
}

fn legacy_word_size(cookie: u32) -> Result<usize, DecodeError> {
    match word_size_nibble(cookie) {
        2 => Ok(2),
        4 => Ok(4),
        8 => Ok(8),
        _ => Err(DecodeError::InvalidWordSize),
    }
}

/// Decompress a frame body, accepting both the zlib wrapper and a raw
/// DEFLATE stream.
fn inflate(compressed: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut out = Vec::new();
    let zlib_wrapped = compressed.len() >= 2
        && compressed[0] & 0x0F == 8
        && (u32::from(compressed[0]) << 8 | u32::from(compressed[1])) % 31 == 0;
    let result = if zlib_wrapped {
        ZlibDecoder::new(compressed).read_to_end(&mut out)
    } else {
        DeflateDecoder::new(compressed).read_to_end(&mut out)
    };
    match result {
        Ok(_) => Ok(out),
        Err(_) => Err(DecodeError::CorruptCompressedBody),
    }
}
