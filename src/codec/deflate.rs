use std::io::Write;

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use flate2::write::ZlibEncoder;
use flate2::Compression;

use super::v2::V2Encoder;
use super::{EncodeError, Encoder, V2_COMPRESSED_COOKIE};
use crate::counter::Counter;
use crate::Histogram;

/// Encoder for the compressed V2 frame: a compressed-frame cookie, a 4-byte
/// length, and the plain V2 frame as a zlib-wrapped DEFLATE stream.
///
/// Compression trades a substantially slower encode for smaller frames;
/// decoding cost is close to the plain format. Frames can also be encoded
/// plain first and recompressed later on another system.
pub struct V2DeflateEncoder {
    v2: V2Encoder,
    compressed: Vec<u8>,
}

impl Default for V2DeflateEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl V2DeflateEncoder {
    /// Create a new encoder.
    pub fn new() -> V2DeflateEncoder {
        V2DeflateEncoder {
            v2: V2Encoder::new(),
            compressed: Vec::new(),
        }
    }

    /// Encode `h`'s compressed frame into the front of `buf`, returning the
    /// number of bytes written, or [`EncodeError::BufferTooSmall`] if the
    /// finished frame does not fit.
    pub fn encode_to_slice<C: Counter>(
        &mut self,
        h: &Histogram<C>,
        buf: &mut [u8],
    ) -> Result<usize, EncodeError> {
        let len = self.encode_to_buf(h)?;
        if buf.len() < len {
            return Err(EncodeError::BufferTooSmall);
        }
        buf[..len].copy_from_slice(&self.compressed[..len]);
        Ok(len)
    }

    fn encode_to_buf<C: Counter>(&mut self, h: &Histogram<C>) -> Result<usize, EncodeError> {
        let uncompressed_len = self.v2.encode_to_buf(h)?;

        self.compressed.clear();
        // Histogram frames usually compress well; half is a fair first guess
        // for the reservation.
        self.compressed.reserve(uncompressed_len / 2 + 8);

        self.compressed.write_u32::<BigEndian>(V2_COMPRESSED_COOKIE)?;
        // compressed length, patched below
        self.compressed.write_u32::<BigEndian>(0)?;

        {
            let mut compressor = ZlibEncoder::new(&mut self.compressed, Compression::default());
            compressor.write_all(&self.v2.frame()[..uncompressed_len])?;
            let _ = compressor.finish()?;
        }

        let total_len = self.compressed.len();
        // The length field excludes the cookie and itself. Frames top out
        // around 54 MiB, far inside u32.
        BigEndian::write_u32(&mut self.compressed[4..8], (total_len as u32) - 8);
        Ok(total_len)
    }
}

impl Encoder for V2DeflateEncoder {
    fn encode<C: Counter, W: Write>(
        &mut self,
        h: &Histogram<C>,
        writer: &mut W,
    ) -> Result<usize, EncodeError> {
        let len = self.encode_to_buf(h)?;
        writer.write_all(&self.compressed[..len])?;
        Ok(len)
    }
}
