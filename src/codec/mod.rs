//! Binary encoding and decoding of histograms, plus the interval log format.
//!
//! These are the HDR histogram interchange formats: compact binary snapshots
//! of a histogram's configuration and counts, suitable for archival or for
//! shipping to another system for aggregation. A typical pattern is to
//! serialize an interval histogram once a minute and reset it; the stored
//! frames can later be decoded and [added](crate::Histogram::add) together
//! to compute correct percentiles over any larger window, which per-interval
//! percentile numbers alone can never give you.
//!
//! Three frame versions exist. The current **V2** packs counts as
//! zig-zag-encoded LEB128 varints with zero runs collapsed, so the size
//! depends on how many distinct slots are occupied rather than on the value
//! range. The legacy **V1** and **V0** frames store fixed-width counts.
//! [`V2Encoder`] and [`V2DeflateEncoder`] produce V2 frames (plain and
//! DEFLATE-compressed); [`Decoder`] reads all six frame variants.
//!
//! Encoders and the decoder are intended to be reused across many
//! histograms so their internal buffers amortize. They work against any
//! `io::Write` / `io::Read`; a `Vec<u8>` and a `&[u8]` slice are the common
//! in-memory choices.
//!
//! ```
//! use centile::Histogram;
//! use centile::codec::{Decoder, Encoder, V2Encoder};
//!
//! let mut h = Histogram::<u64>::new_with_max(3_600_000_000, 3).unwrap();
//! h.record(42).unwrap();
//!
//! let mut frame = Vec::new();
//! let _len = V2Encoder::new().encode(&h, &mut frame).unwrap();
//!
//! let back: Histogram<u64> = Decoder::new().decode(&mut frame.as_slice()).unwrap();
//! assert_eq!(back, h);
//! ```
//!
//! The [`interval_log`] module layers a line-oriented textual log of
//! base64-encoded frames with timestamps on top of these encodings.

use std::io::{self, ErrorKind};
use std::{error, fmt};

use crate::counter::Counter;
use crate::Histogram;

mod decode;
mod deflate;
pub mod interval_log;
mod v2;
mod varint;

pub use self::decode::Decoder;
pub use self::deflate::V2DeflateEncoder;
pub use self::v2::V2Encoder;

// Cookie bases identify the frame version; bits 4-7 carry the count word
// size on the legacy formats and a fixed marker of 1 on V2.
pub(crate) const V2_COOKIE_BASE: u32 = 0x1c84_9303;
pub(crate) const V2_COMPRESSED_COOKIE_BASE: u32 = 0x1c84_9304;
pub(crate) const V1_COOKIE_BASE: u32 = 0x1c84_9301;
pub(crate) const V1_COMPRESSED_COOKIE_BASE: u32 = 0x1c84_9302;
pub(crate) const V0_COOKIE_BASE: u32 = 0x1c84_9308;
pub(crate) const V0_COMPRESSED_COOKIE_BASE: u32 = 0x1c84_9309;

pub(crate) const V2_COOKIE: u32 = V2_COOKIE_BASE | 0x10;
pub(crate) const V2_COMPRESSED_COOKIE: u32 = V2_COMPRESSED_COOKIE_BASE | 0x10;

pub(crate) const V2_HEADER_SIZE: usize = 40;

// A count word in the V2 varint payload is at most 9 bytes.
pub(crate) const V2_MAX_WORD_BYTES: usize = 9;

#[inline]
pub(crate) fn cookie_base(cookie: u32) -> u32 {
    cookie & !0xF0
}

#[inline]
pub(crate) fn word_size_nibble(cookie: u32) -> u32 {
    (cookie & 0xF0) >> 4 & 0xE
}

/// Histogram frame encoder.
///
/// Implementations differ in the frame format they produce; all of them can
/// drive the [`interval_log`] writer.
pub trait Encoder {
    /// Encode `h` into `writer`. Returns the number of bytes written.
    fn encode<C: Counter, W: io::Write>(
        &mut self,
        h: &Histogram<C>,
        writer: &mut W,
    ) -> Result<usize, EncodeError>;
}

/// Errors that can occur while encoding a histogram.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum EncodeError {
    /// A count above `i64::max_value()` cannot be zig-zag encoded, so the
    /// histogram cannot be represented on the wire.
    CountNotSerializable,
    /// The target buffer cannot hold the encoder's worst-case frame size.
    BufferTooSmall,
    /// An i/o operation failed.
    Io(ErrorKind),
}

impl From<io::Error> for EncodeError {
    fn from(e: io::Error) -> Self {
        EncodeError::Io(e.kind())
    }
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EncodeError::CountNotSerializable => {
                write!(f, "a count above i64::max_value() cannot be encoded")
            }
            EncodeError::BufferTooSmall => {
                write!(f, "the target buffer cannot hold the worst-case frame")
            }
            EncodeError::Io(kind) => write!(f, "an i/o operation failed: {:?}", kind),
        }
    }
}

impl error::Error for EncodeError {}

/// Errors that can occur while decoding a histogram frame.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum DecodeError {
    /// An i/o operation failed (including truncated frames).
    Io(ErrorKind),
    /// The first four bytes match no supported frame version.
    InvalidCookie,
    /// The cookie's word-size bits are invalid for the frame version.
    InvalidWordSize,
    /// The frame uses a feature this implementation does not support (a
    /// nonzero normalizing offset or a non-unit value conversion ratio).
    UnsupportedFeature,
    /// The header's configuration parameters cannot construct a histogram.
    InvalidParameters,
    /// The stated payload length disagrees with the bytes actually present.
    PayloadLengthMismatch,
    /// The counts payload describes more slots than the header's value range
    /// allows.
    EncodedArrayTooLong,
    /// A decoded count does not fit the target histogram's counter width.
    CountExceedsWidth,
    /// A fixed-width count was negative.
    InvalidCount,
    /// The compressed body is not a valid DEFLATE stream.
    CorruptCompressedBody,
}

impl From<io::Error> for DecodeError {
    fn from(e: io::Error) -> Self {
        DecodeError::Io(e.kind())
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DecodeError::Io(kind) => write!(f, "an i/o operation failed: {:?}", kind),
            DecodeError::InvalidCookie => write!(f, "unrecognized frame cookie"),
            DecodeError::InvalidWordSize => {
                write!(f, "invalid count word size for the frame version")
            }
            DecodeError::UnsupportedFeature => {
                write!(f, "the frame uses an unsupported feature")
            }
            DecodeError::InvalidParameters => {
                write!(f, "the header's histogram parameters are invalid")
            }
            DecodeError::PayloadLengthMismatch => {
                write!(f, "stated payload length disagrees with the bytes present")
            }
            DecodeError::EncodedArrayTooLong => {
                write!(f, "counts payload is longer than the value range allows")
            }
            DecodeError::CountExceedsWidth => {
                write!(f, "a count does not fit the target counter width")
            }
            DecodeError::InvalidCount => write!(f, "a fixed-width count was negative"),
            DecodeError::CorruptCompressedBody => {
                write!(f, "the compressed body is not a valid DEFLATE stream")
            }
        }
    }
}

impl error::Error for DecodeError {}
