//! Shared-histogram behavior under threads.

#![cfg(feature = "sync")]

use centile::{Histogram, SynchronizedHistogram};
use std::sync::Arc;
use std::thread;

#[test]
fn identities_are_unique_and_increasing() {
    let a = SynchronizedHistogram::<u64>::new_with_max(1000, 3).unwrap();
    let b = SynchronizedHistogram::<u64>::new_with_max(1000, 3).unwrap();
    assert!(a.identity() < b.identity());
}

#[test]
fn concurrent_recording_loses_nothing() {
    let h = Arc::new(SynchronizedHistogram::<u64>::new_with_max(3_600_000_000, 3).unwrap());
    let threads = 8_u64;
    let per_thread = 10_000_u64;

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let h = Arc::clone(&h);
            thread::spawn(move || {
                for i in 0..per_thread {
                    h.record((t * per_thread + i) % 1_000_000 + 1).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(threads * per_thread, h.len());
    assert!(h.with(|inner| !inner.has_overflowed()));
}

#[test]
fn cross_merges_cannot_deadlock() {
    let a = Arc::new(SynchronizedHistogram::<u64>::new_with_max(1_000_000, 3).unwrap());
    let b = Arc::new(SynchronizedHistogram::<u64>::new_with_max(1_000_000, 3).unwrap());
    a.record(100).unwrap();
    b.record(200).unwrap();

    // merge in opposite directions from two threads; identity-ordered
    // locking keeps this from deadlocking
    let t1 = {
        let a = Arc::clone(&a);
        let b = Arc::clone(&b);
        thread::spawn(move || {
            for _ in 0..1000 {
                a.add(&b).unwrap();
            }
        })
    };
    let t2 = {
        let a = Arc::clone(&a);
        let b = Arc::clone(&b);
        thread::spawn(move || {
            for _ in 0..1000 {
                b.add(&a).unwrap();
            }
        })
    };
    t1.join().unwrap();
    t2.join().unwrap();

    assert!(a.len() > 0);
    assert!(b.len() > 0);
}

#[test]
fn self_merge_doubles_without_deadlock() {
    let h = SynchronizedHistogram::<u64>::new_with_max(1000, 3).unwrap();
    h.record_n(100, 3).unwrap();
    h.add(&h).unwrap();
    assert_eq!(6, h.len());
}

#[test]
fn merging_plain_histograms_under_the_monitor() {
    let sync = SynchronizedHistogram::<u64>::new_with_max(1_000_000, 3).unwrap();
    let mut plain = Histogram::<u64>::new_with_max(1_000_000, 3).unwrap();
    plain.record_n(5_000, 7).unwrap();

    sync.add_histogram(&plain).unwrap();
    assert_eq!(7, sync.len());
    assert_eq!(7, sync.with(|h| h.count_at(5_000)));
}

#[test]
fn corrected_recording_through_the_monitor() {
    let sync = SynchronizedHistogram::<u64>::new_with_max(3_600_000_000, 3).unwrap();
    sync.record_correct(100_000, 10_000).unwrap();
    // the stall synthesizes 9 additional samples
    assert_eq!(10, sync.len());
}

#[test]
fn snapshot_and_into_inner_expose_the_plain_histogram() {
    let sync = SynchronizedHistogram::<u64>::new_with_max(1000, 3).unwrap();
    sync.record(42).unwrap();

    let snapshot = sync.snapshot();
    assert_eq!(1, snapshot.len());

    let inner = sync.into_inner();
    assert_eq!(snapshot, inner);
}

#[test]
fn wrapping_an_existing_histogram() {
    let mut plain = Histogram::<u64>::new_with_max(1000, 3).unwrap();
    plain.record(7).unwrap();
    let sync = plain.into_sync();
    assert_eq!(1, sync.len());
    assert_eq!(7, sync.max());
}

#[cfg(feature = "serialization")]
mod serialization {
    use centile::codec::{Decoder, V2Encoder};
    use centile::{Histogram, SynchronizedHistogram};

    #[test]
    fn encode_under_the_monitor() {
        let sync = SynchronizedHistogram::<u64>::new_with_max(1000, 3).unwrap();
        sync.record_n(50, 9).unwrap();

        let mut frame = Vec::new();
        let _ = sync.encode(&mut V2Encoder::new(), &mut frame).unwrap();

        let back: Histogram<u64> = Decoder::new().decode(&mut frame.as_slice()).unwrap();
        assert_eq!(back, sync.into_inner());
    }
}
