//! Zig-zag and LEB128-64b9B variable-length integer primitives.
//!
//! This is little-endian base-128 with one twist: a 64-bit value is encoded
//! in at most nine bytes rather than ten, because the ninth byte is written
//! raw (all eight remaining bits, no continuation flag).

use std::io::{self, Read};

use byteorder::ReadBytesExt;

/// Map signed to unsigned so small magnitudes of either sign stay small:
/// 0 -> 0, -1 -> 1, 1 -> 2, -2 -> 3, ...
#[inline]
pub(crate) fn zig_zag_encode(value: i64) -> u64 {
    // value >> 63 is all ones exactly when value is negative
    ((value << 1) ^ (value >> 63)) as u64
}

/// Inverse of [`zig_zag_encode`].
#[inline]
pub(crate) fn zig_zag_decode(encoded: u64) -> i64 {
    ((encoded >> 1) as i64) ^ -((encoded & 1) as i64)
}

/// Write `value` as a LEB128-64b9B varint into the front of `buf`, which
/// must have room for 9 bytes. Returns the number of bytes written.
#[inline]
pub(crate) fn varint_write(mut value: u64, buf: &mut [u8]) -> usize {
    for i in 0..8 {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            buf[i] = byte;
            return i + 1;
        }
        buf[i] = byte | 0x80;
    }
    // ninth byte carries the remaining 8 bits as-is
    buf[8] = value as u8;
    9
}

/// Read a LEB128-64b9B varint from `reader`.
pub(crate) fn varint_read<R: Read>(reader: &mut R) -> io::Result<u64> {
    let mut value = 0_u64;
    for shift in 0..8 {
        let byte = reader.read_u8()?;
        value |= u64::from(byte & 0x7F) << (7 * shift);
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    // ninth byte is raw
    let byte = reader.read_u8()?;
    value |= u64::from(byte) << 56;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn zig_zag_encode_small_magnitudes() {
        assert_eq!(0, zig_zag_encode(0));
        assert_eq!(1, zig_zag_encode(-1));
        assert_eq!(2, zig_zag_encode(1));
        assert_eq!(3, zig_zag_encode(-2));
        assert_eq!(4, zig_zag_encode(2));
    }

    #[test]
    fn zig_zag_encode_extremes() {
        assert_eq!(u64::max_value() - 1, zig_zag_encode(i64::max_value()));
        assert_eq!(u64::max_value(), zig_zag_encode(i64::min_value()));
    }

    #[test]
    fn zig_zag_decode_extremes() {
        assert_eq!(i64::max_value(), zig_zag_decode(u64::max_value() - 1));
        assert_eq!(i64::min_value(), zig_zag_decode(u64::max_value()));
    }

    #[test]
    fn zig_zag_roundtrip_random() {
        let mut rng = SmallRng::seed_from_u64(0x5eed);
        for _ in 0..100_000 {
            let value = rng.gen::<i64>();
            assert_eq!(value, zig_zag_decode(zig_zag_encode(value)));
        }
    }

    #[test]
    fn varint_write_lengths() {
        let mut buf = [0_u8; 9];
        assert_eq!(1, varint_write(0, &mut buf));
        assert_eq!(1, varint_write(127, &mut buf));
        assert_eq!(2, varint_write(128, &mut buf));
        assert_eq!(2, varint_write((1 << 14) - 1, &mut buf));
        assert_eq!(3, varint_write(1 << 14, &mut buf));
        assert_eq!(8, varint_write((1 << 56) - 1, &mut buf));
        assert_eq!(9, varint_write(1 << 56, &mut buf));
        assert_eq!(9, varint_write(u64::max_value(), &mut buf));
    }

    #[test]
    fn varint_read_single_byte() {
        let buf = [0x25_u8];
        assert_eq!(0x25, varint_read(&mut &buf[..]).unwrap());
    }

    #[test]
    fn varint_nine_byte_roundtrip() {
        let mut buf = [0_u8; 9];
        let len = varint_write(u64::max_value(), &mut buf);
        assert_eq!(9, len);
        assert_eq!(u64::max_value(), varint_read(&mut &buf[..]).unwrap());
    }

    #[test]
    fn varint_roundtrip_random() {
        let mut rng = SmallRng::seed_from_u64(0xdead_beef);
        let mut buf = [0_u8; 9];
        for _ in 0..100_000 {
            // bias toward small values so all lengths get exercised
            let shift = rng.gen_range(0..64);
            let value = rng.gen::<u64>() >> shift;
            let len = varint_write(value, &mut buf);
            assert_eq!(value, varint_read(&mut &buf[..len]).unwrap());
        }
    }
}
