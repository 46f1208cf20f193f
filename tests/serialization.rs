//! Binary frame round trips and legacy format decoding.

#![cfg(feature = "serialization")]

use byteorder::{BigEndian, WriteBytesExt};
use centile::codec::{DecodeError, Decoder, EncodeError, Encoder, V2DeflateEncoder, V2Encoder};
use centile::Histogram;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::io::Write;

const TRACKABLE_MAX: u64 = 3600 * 1000 * 1000;

fn randomized_histogram(seed: u64) -> Histogram<u64> {
    let mut h = Histogram::<u64>::new_with_max(TRACKABLE_MAX, 3).unwrap();
    let mut rng = SmallRng::seed_from_u64(seed);
    for _ in 0..10_000 {
        // skew values low so zero runs and dense regions both appear
        let magnitude = rng.gen_range(0..10);
        let value = rng.gen_range(0..=TRACKABLE_MAX) >> (magnitude * 3);
        h.record(value).unwrap();
    }
    h
}

#[test]
fn v2_round_trip_empty() {
    let h = Histogram::<u64>::new_with_max(TRACKABLE_MAX, 3).unwrap();
    let mut frame = Vec::new();
    let len = V2Encoder::new().encode(&h, &mut frame).unwrap();
    assert_eq!(len, frame.len());

    let back: Histogram<u64> = Decoder::new().decode(&mut frame.as_slice()).unwrap();
    assert_eq!(h, back);
}

#[test]
fn v2_round_trip_randomized() {
    let h = randomized_histogram(42);
    let mut frame = Vec::new();
    let _ = V2Encoder::new().encode(&h, &mut frame).unwrap();

    let back: Histogram<u64> = Decoder::new().decode(&mut frame.as_slice()).unwrap();
    assert_eq!(h, back);
    assert_eq!(h.len(), back.len());
    assert_eq!(h.max(), back.max());
    assert_eq!(h.min_nz(), back.min_nz());
}

#[test]
fn v2_compressed_round_trip_randomized() {
    let h = randomized_histogram(43);
    let mut frame = Vec::new();
    let _ = V2DeflateEncoder::new().encode(&h, &mut frame).unwrap();

    let back: Histogram<u64> = Decoder::new().decode(&mut frame.as_slice()).unwrap();
    assert_eq!(h, back);
}

#[test]
fn v2_round_trip_narrow_counters() {
    let mut h16 = Histogram::<u16>::new_with_max(100_000, 2).unwrap();
    let mut h32 = Histogram::<u32>::new_with_max(100_000, 2).unwrap();
    let mut rng = SmallRng::seed_from_u64(44);
    for _ in 0..5000 {
        let v = rng.gen_range(0..=100_000);
        h16.record(v).unwrap();
        h32.record(v).unwrap();
    }

    let mut frame = Vec::new();
    let _ = V2Encoder::new().encode(&h16, &mut frame).unwrap();
    let back16: Histogram<u16> = Decoder::new().decode(&mut frame.as_slice()).unwrap();
    assert_eq!(h16, back16);

    frame.clear();
    let _ = V2Encoder::new().encode(&h32, &mut frame).unwrap();
    let back32: Histogram<u32> = Decoder::new().decode(&mut frame.as_slice()).unwrap();
    assert_eq!(h32, back32);
}

#[test]
fn v2_round_trip_dense_full_range() {
    let mut h = Histogram::<u64>::new_with_max(TRACKABLE_MAX, 3).unwrap();
    let mut v = 0_u64;
    while v < TRACKABLE_MAX {
        h.record(v).unwrap();
        v += 100;
    }
    h.record(TRACKABLE_MAX).unwrap();

    let mut frame = Vec::new();
    let _ = V2Encoder::new().encode(&h, &mut frame).unwrap();
    let back: Histogram<u64> = Decoder::new().decode(&mut frame.as_slice()).unwrap();
    assert_eq!(h, back);

    // compress the decoded copy and decode again
    frame.clear();
    let _ = V2DeflateEncoder::new().encode(&back, &mut frame).unwrap();
    let again: Histogram<u64> = Decoder::new().decode(&mut frame.as_slice()).unwrap();
    assert_eq!(h, again);
}

#[test]
fn encode_to_slice_respects_bounds() {
    let h = randomized_histogram(45);
    let bound = V2Encoder::encoded_size_bound(&h);

    let mut small = vec![0_u8; 16];
    assert_eq!(
        Err(EncodeError::BufferTooSmall),
        V2Encoder::new().encode_to_slice(&h, &mut small)
    );

    let mut big = vec![0_u8; bound];
    let len = V2Encoder::new().encode_to_slice(&h, &mut big).unwrap();
    assert!(len <= bound);

    let back: Histogram<u64> = Decoder::new().decode(&mut &big[..len]).unwrap();
    assert_eq!(h, back);
}

#[test]
fn decode_with_floor_widens_the_range() {
    let mut h = Histogram::<u64>::new_with_max(2000, 3).unwrap();
    h.record_n(1500, 3).unwrap();

    let mut frame = Vec::new();
    let _ = V2Encoder::new().encode(&h, &mut frame).unwrap();

    let back: Histogram<u64> = Decoder::new()
        .decode_with_floor(&mut frame.as_slice(), TRACKABLE_MAX)
        .unwrap();
    assert_eq!(TRACKABLE_MAX, back.highest_trackable_value());
    assert_eq!(3, back.count_at(1500));
    assert_eq!(3, back.len());
}

#[test]
fn unknown_cookie_is_rejected() {
    let mut frame = Vec::new();
    frame.write_u32::<BigEndian>(0xdead_beef).unwrap();
    frame.extend_from_slice(&[0_u8; 64]);
    let result: Result<Histogram<u64>, _> = Decoder::new().decode(&mut frame.as_slice());
    assert_eq!(Err(DecodeError::InvalidCookie), result.map(|_| ()));
}

#[test]
fn truncated_frame_is_an_io_error() {
    let h = randomized_histogram(46);
    let mut frame = Vec::new();
    let _ = V2Encoder::new().encode(&h, &mut frame).unwrap();
    frame.truncate(frame.len() / 2);

    let result: Result<Histogram<u64>, _> = Decoder::new().decode(&mut frame.as_slice());
    match result {
        Err(DecodeError::Io(_)) => {}
        other => panic!("expected an i/o error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn count_beyond_target_width_is_rejected() {
    let mut h = Histogram::<u32>::new_with_max(1000, 2).unwrap();
    h.record_n(500, 100_000).unwrap();

    let mut frame = Vec::new();
    let _ = V2Encoder::new().encode(&h, &mut frame).unwrap();

    let result: Result<Histogram<u16>, _> = Decoder::new().decode(&mut frame.as_slice());
    assert_eq!(Err(DecodeError::CountExceedsWidth), result.map(|_| ()));

    // a u64 target accepts the same frame
    let wide: Histogram<u64> = Decoder::new().decode(&mut frame.as_slice()).unwrap();
    assert_eq!(100_000, wide.count_at(500));
}

// ****************************************************************
// Legacy fixed-width formats
// ****************************************************************

const V1_COOKIE_BASE: u32 = 0x1c84_9301;
const V0_COOKIE_BASE: u32 = 0x1c84_9308;
const V0_COMPRESSED_COOKIE_BASE: u32 = 0x1c84_9309;

/// Hand-build a V1 frame with 8-byte counts.
fn v1_frame(counts: &[i64], low: u64, high: u64, digits: u32) -> Vec<u8> {
    let mut frame = Vec::new();
    frame
        .write_u32::<BigEndian>(V1_COOKIE_BASE | (8 << 4))
        .unwrap();
    frame
        .write_u32::<BigEndian>((counts.len() * 8) as u32)
        .unwrap();
    frame.write_u32::<BigEndian>(0).unwrap(); // normalizing offset
    frame.write_u32::<BigEndian>(digits).unwrap();
    frame.write_u64::<BigEndian>(low).unwrap();
    frame.write_u64::<BigEndian>(high).unwrap();
    frame.write_f64::<BigEndian>(1.0).unwrap();
    for &c in counts {
        frame.write_i64::<BigEndian>(c).unwrap();
    }
    frame
}

/// Hand-build a V0 frame with 2-byte counts.
fn v0_frame(counts: &[i16], low: u64, high: u64, digits: u32) -> Vec<u8> {
    let mut frame = Vec::new();
    frame
        .write_u32::<BigEndian>(V0_COOKIE_BASE | (2 << 4))
        .unwrap();
    frame.write_u32::<BigEndian>(digits).unwrap();
    frame.write_u64::<BigEndian>(low).unwrap();
    frame.write_u64::<BigEndian>(high).unwrap();
    frame
        .write_u64::<BigEndian>(counts.iter().map(|&c| c as u64).sum())
        .unwrap();
    for &c in counts {
        frame.write_i16::<BigEndian>(c).unwrap();
    }
    frame
}

#[test]
fn v1_fixed_width_frame_decodes() {
    let frame = v1_frame(&[0, 3, 0, 0, 7, 0, 1], 1, 100_000, 3);
    let h: Histogram<u64> = Decoder::new().decode(&mut frame.as_slice()).unwrap();

    assert_eq!(11, h.len());
    assert_eq!(3, h.count_at(1));
    assert_eq!(7, h.count_at(4));
    assert_eq!(1, h.count_at(6));
    assert_eq!(1, h.lowest_discernible_value());
    assert_eq!(100_000, h.highest_trackable_value());
    assert_eq!(6, h.max());
    assert_eq!(1, h.min_nz());
}

#[test]
fn v0_fixed_width_frame_decodes() {
    let frame = v0_frame(&[1, 0, 0, 2, 0, 5], 1, 3_600_000_000, 2);
    let h: Histogram<u64> = Decoder::new().decode(&mut frame.as_slice()).unwrap();

    assert_eq!(8, h.len());
    assert_eq!(1, h.count_at(0));
    assert_eq!(2, h.count_at(3));
    assert_eq!(5, h.count_at(5));
    assert_eq!(5, h.max());
}

#[test]
fn v0_compressed_frame_decodes() {
    let inner = v0_frame(&[0, 4, 0, 9], 1, 1_000_000, 3);
    let mut compressed_body = Vec::new();
    {
        let mut z = ZlibEncoder::new(&mut compressed_body, Compression::default());
        z.write_all(&inner).unwrap();
        let _ = z.finish().unwrap();
    }

    let mut frame = Vec::new();
    frame
        .write_u32::<BigEndian>(V0_COMPRESSED_COOKIE_BASE)
        .unwrap();
    frame
        .write_u32::<BigEndian>(compressed_body.len() as u32)
        .unwrap();
    frame.extend_from_slice(&compressed_body);

    let h: Histogram<u64> = Decoder::new().decode(&mut frame.as_slice()).unwrap();
    assert_eq!(13, h.len());
    assert_eq!(4, h.count_at(1));
    assert_eq!(9, h.count_at(3));
}

#[test]
fn negative_fixed_width_count_is_rejected() {
    let frame = v1_frame(&[0, -3], 1, 100_000, 3);
    let result: Result<Histogram<u64>, _> = Decoder::new().decode(&mut frame.as_slice());
    assert_eq!(Err(DecodeError::InvalidCount), result.map(|_| ()));
}

#[test]
fn legacy_word_size_must_be_valid() {
    let mut frame = Vec::new();
    // word-size bits claim 6 bytes, which no legacy format uses
    frame
        .write_u32::<BigEndian>(V1_COOKIE_BASE | (6 << 4))
        .unwrap();
    frame.extend_from_slice(&[0_u8; 64]);
    let result: Result<Histogram<u64>, _> = Decoder::new().decode(&mut frame.as_slice());
    assert_eq!(Err(DecodeError::InvalidWordSize), result.map(|_| ()));
}

#[test]
fn interval_frames_merge_into_an_aggregate() {
    // the archetypal use: decode a run of interval frames and sum them
    let mut encoder = V2DeflateEncoder::new();
    let mut decoder = Decoder::new();
    let mut buf = Vec::new();
    let mut expected_total = 0_u64;

    for seed in 0..4 {
        let h = randomized_histogram(seed);
        expected_total += h.len();
        let _ = encoder.encode(&h, &mut buf).unwrap();
    }

    let mut aggregate = Histogram::<u64>::new_with_max(TRACKABLE_MAX, 3).unwrap();
    let mut cursor = buf.as_slice();
    for _ in 0..4 {
        let h: Histogram<u64> = decoder.decode(&mut cursor).unwrap();
        aggregate.add(&h).unwrap();
    }
    assert_eq!(expected_total, aggregate.len());
}
