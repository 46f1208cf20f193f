//! Centile records integer samples across a wide, configurable dynamic range
//! while holding a chosen number of significant digits of precision, all in a
//! fixed amount of memory. It is built for latency telemetry and similar
//! workloads: recording a sample is a constant-time, allocation-free index
//! computation plus a counter increment, cheap enough to leave enabled in
//! production, while the recorded distribution stays fully queryable after
//! the fact (percentiles, means, several iteration orders) and can be
//! persisted or shipped in a compact, versioned binary format.
//!
//! # How values are stored
//!
//! A histogram covers `[lowest_discernible_value, highest_trackable_value]`
//! with a relative error bounded by the configured number of significant
//! decimal digits. Counts live in a flat array addressed like a
//! floating-point number: the *bucket* index is an exponent and the
//! *sub-bucket* index a mantissa. For example, with three significant digits
//! and a lowest discernible value of 1:
//!
//! <pre>
//! bucket 0 covers      0..2047 in steps of 1, using all 2048 sub-buckets
//! bucket 1 covers   2048..4095 in steps of 2, using the top 1024
//! bucket 2 covers   4096..8191 in steps of 4, using the top 1024
//! ...
//! </pre>
//!
//! Only the top half of each bucket past the first is stored, because the
//! bottom half is already covered at finer resolution by the buckets before
//! it. Tracking one hour in microseconds at three significant digits costs a
//! few hundred kilobytes with `u64` counters, and recording never allocates.
//!
//! # Recording and querying
//!
//! ```
//! use centile::Histogram;
//!
//! // one hour in microseconds, three significant digits
//! let mut h = Histogram::<u64>::new_with_max(3_600_000_000, 3).unwrap();
//!
//! h.record(54_321).expect("value in range");
//! h += 54_321; // panics if out of range
//!
//! // if sampling can stall, correct for coordinated omission while
//! // recording by supplying the expected sampling interval:
//! h.record_correct(54_321, 10_000).expect("value in range");
//!
//! println!("samples: {}", h.len());
//! println!("p99.9: {}", h.value_at_percentile(99.9).unwrap());
//! for p in h.iter_recorded() {
//!     println!("{}'th percentile at {}", p.percentile(), p.value_iterated_to());
//! }
//! ```
//!
//! The counter type parameter picks the per-slot width: `u16`, `u32`, or
//! `u64`. Narrow counters shrink the footprint but can saturate; a saturated
//! histogram is detectable with [`Histogram::has_overflowed`] and repairable
//! with [`Histogram::reestablish_total_count`], so saturation is a latent
//! inconsistency rather than a hard failure.
//!
//! # Coordinated omission
//!
//! When a measuring thread stalls, the samples it failed to take were
//! precisely the slow ones, which skews the recorded distribution toward
//! optimism. Given the expected interval between samples, the correction
//! synthesizes the missing samples (`value - interval`, `value - 2*interval`,
//! ... down to the interval) either while recording ([`Histogram::record_correct`])
//! or after the fact ([`Histogram::add_correct`], [`Histogram::copy_correct`]).
//! The two approaches are mutually exclusive on one data set and agree up to
//! bucket quantization.
//!
//! # Persistence
//!
//! With the `serialization` feature (on by default), the [`codec`] module
//! reads and writes the HDR histogram interchange formats: the current
//! varint-packed V2 encoding, its DEFLATE-compressed framing, the legacy
//! fixed-width V0/V1 encodings (read side), and the textual interval log.
//! [`report`] renders percentile distribution tables for humans.
//!
//! # Concurrency
//!
//! A plain `Histogram` relies on `&mut` for exclusion and takes no locks.
//! With the `sync` feature, [`SynchronizedHistogram`] serializes every
//! mutation on an internal monitor and can be shared between threads.

#![deny(
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_results,
    variant_size_differences
)]

use std::ops::AddAssign;

use crate::counts::Counts;
use crate::layout::BucketLayout;

mod counter;
mod counts;
pub mod errors;
pub mod iter;
mod layout;

#[cfg(feature = "serialization")]
pub mod codec;
pub mod report;
#[cfg(feature = "sync")]
pub mod sync;

pub use crate::counter::Counter;
pub use crate::errors::*;
pub use crate::iter::IterationPoint;
#[cfg(feature = "sync")]
pub use crate::sync::SynchronizedHistogram;

/// Sentinel for the tracked minimum of a histogram with no non-zero samples.
const MIN_SENTINEL: u64 = u64::max_value();
/// Tracked maximum of an empty histogram.
const MAX_SENTINEL: u64 = 0;

/// A fixed-memory histogram of integer values with configurable range and
/// precision.
///
/// `C` selects the per-slot counter width (`u16`, `u32`, or `u64`). The
/// configuration — lowest discernible value, highest trackable value,
/// significant digits — is fixed at construction; the histogram never
/// resizes.
#[derive(Debug)]
pub struct Histogram<C: Counter> {
    layout: BucketLayout,

    max_value: u64,
    min_non_zero_value: u64,

    total_count: u64,
    counts: Counts<C>,

    start_timestamp: Option<u64>,
    end_timestamp: Option<u64>,
}

impl<C: Counter> Histogram<C> {
    // ********************************************************************
    // Construction
    // ********************************************************************

    /// Construct a histogram covering `[1, high]` with `digits` significant
    /// decimal digits of precision.
    ///
    /// See [`new_with_bounds`](Histogram::new_with_bounds).
    pub fn new_with_max(high: u64, digits: u8) -> Result<Histogram<C>, CreationError> {
        Self::new_with_bounds(1, high, digits)
    }

    /// Construct a histogram with known bounds for recorded values.
    ///
    /// `low` is the smallest value that can be distinguished from 0, at
    /// least 1. Raising it shrinks the counts array when the value units are
    /// much finer than the needed accuracy, e.g. `low = 1000` for values in
    /// nanoseconds with microsecond accuracy.
    ///
    /// `high` is the largest trackable value, at least `2 * low`. Recording
    /// anything larger fails with
    /// [`RecordError::ValueOutOfRange`](errors::RecordError).
    ///
    /// `digits` is the number of significant decimal digits of resolution to
    /// maintain, in `[0, 5]`; the relative error of any recorded value is at
    /// most `2 * 10^-digits`. Memory grows exponentially with this
    /// parameter, so 3 is the common choice for latency work.
    pub fn new_with_bounds(low: u64, high: u64, digits: u8) -> Result<Histogram<C>, CreationError> {
        let layout = BucketLayout::new(low, high, digits)?;
        let len = layout.counts_len();
        Ok(Histogram {
            layout,
            max_value: MAX_SENTINEL,
            min_non_zero_value: MIN_SENTINEL,
            total_count: 0,
            counts: Counts::new(len),
            start_timestamp: None,
            end_timestamp: None,
        })
    }

    /// Construct an empty histogram with the same configuration as `source`
    /// (possibly with a different counter width). Timestamps and contents
    /// are not copied.
    pub fn new_from<F: Counter>(source: &Histogram<F>) -> Histogram<C> {
        Self::new_with_bounds(
            source.layout.low(),
            source.layout.high(),
            source.layout.digits(),
        )
        .expect("source histogram's configuration was already validated")
    }

    // ********************************************************************
    // Configuration read-outs
    // ********************************************************************

    /// The lowest value this histogram can distinguish from 0.
    pub fn lowest_discernible_value(&self) -> u64 {
        self.layout.low()
    }

    /// The highest value this histogram can record.
    pub fn highest_trackable_value(&self) -> u64 {
        self.layout.high()
    }

    /// The configured number of significant decimal digits.
    pub fn significant_digits(&self) -> u8 {
        self.layout.digits()
    }

    /// Number of exponent buckets needed to cover the trackable range.
    pub fn bucket_count(&self) -> u8 {
        self.layout.buckets()
    }

    /// Number of mantissa sub-buckets per bucket.
    pub fn sub_bucket_count(&self) -> u32 {
        self.layout.sub_buckets()
    }

    /// Number of distinct value slots in the histogram's counts array.
    pub fn distinct_values(&self) -> usize {
        self.counts.len()
    }

    // ********************************************************************
    // Recording
    // ********************************************************************

    /// Record a single occurrence of `value`.
    pub fn record(&mut self, value: u64) -> Result<(), RecordError> {
        self.record_n(value, C::one())
    }

    /// Record `count` occurrences of `value`.
    pub fn record_n(&mut self, value: u64, count: C) -> Result<(), RecordError> {
        if value > self.layout.high() {
            return Err(RecordError::ValueOutOfRange);
        }
        let index = self.layout.index_of(value);
        self.counts.add_to(index, count);
        self.update_min_max(value);
        self.total_count = self.total_count.saturating_add(count.as_u64());
        Ok(())
    }

    /// Record `value` while correcting for coordinated omission at recording
    /// time.
    ///
    /// See [`record_n_correct`](Histogram::record_n_correct).
    pub fn record_correct(&mut self, value: u64, interval: u64) -> Result<(), RecordError> {
        self.record_n_correct(value, C::one(), interval)
    }

    /// Record `count` occurrences of `value`, then compensate for the
    /// samples a stalled measurement loop would have missed: as long as the
    /// remaining gap is at least `interval`, an additional `count`
    /// occurrences are recorded at `value - interval`, `value - 2*interval`,
    /// and so on. An `interval` of 0 disables the correction.
    ///
    /// This is the at-recording correction; [`add_correct`](Histogram::add_correct)
    /// and [`copy_correct`](Histogram::copy_correct) apply the same rule
    /// after the fact. Use one or the other on a given data set, never both.
    pub fn record_n_correct(
        &mut self,
        value: u64,
        count: C,
        interval: u64,
    ) -> Result<(), RecordError> {
        self.record_n(value, count)?;
        if interval == 0 {
            return Ok(());
        }
        if value > interval {
            // stays non-negative from here on
            let mut missing = value - interval;
            while missing >= interval {
                self.record_n(missing, count)?;
                missing -= interval;
            }
        }
        Ok(())
    }

    // ********************************************************************
    // Merging, copying, resetting
    // ********************************************************************

    /// Add all of `other`'s recorded values to this histogram.
    ///
    /// When the two layouts slot values identically the counts arrays are
    /// merged index by index; otherwise every non-empty slot of `other` is
    /// replayed through [`record_n`](Histogram::record_n). Counters saturate
    /// rather than wrap, leaving any shortfall observable through
    /// [`has_overflowed`](Histogram::has_overflowed).
    ///
    /// Fails with [`AdditionError::RangeExceeded`](errors::AdditionError)
    /// when `other` is configured to track values beyond this histogram's
    /// highest trackable value.
    pub fn add(&mut self, other: &Histogram<C>) -> Result<(), AdditionError> {
        if other.layout.high() > self.layout.high() {
            return Err(AdditionError::RangeExceeded);
        }

        if self.layout.matches(&other.layout) {
            let mut observed = 0_u64;
            for index in 0..other.counts.len() {
                let count = other
                    .counts
                    .get(index)
                    .expect("iterating inside other's counts length");
                if count != C::zero() {
                    self.counts.add_to(index, count);
                    observed = observed.saturating_add(count.as_u64());
                }
            }
            self.total_count = self.total_count.saturating_add(observed);

            let mx = other.max();
            if mx > self.max() {
                self.update_max(mx);
            }
            let mn = other.min_nz();
            if mn < self.min_nz() {
                self.update_min(mn);
            }
        } else {
            for index in 0..other.counts.len() {
                let count = other
                    .counts
                    .get(index)
                    .expect("iterating inside other's counts length");
                if count != C::zero() {
                    self.record_n(other.layout.value_at_index(index), count)
                        .expect("other's trackable range fits inside this histogram's");
                }
            }
        }
        Ok(())
    }

    /// Add all of `other`'s recorded values while applying the coordinated
    /// omission correction with the given expected `interval`.
    ///
    /// This is the post-recording correction path; see
    /// [`record_n_correct`](Histogram::record_n_correct) for the recording-time
    /// equivalent and the rule itself.
    pub fn add_correct(&mut self, other: &Histogram<C>, interval: u64) -> Result<(), RecordError> {
        for point in other.iter_recorded() {
            let count = C::from_u64(point.count_at_value())
                .expect("count was read out of a counter of this width");
            self.record_n_correct(point.value_iterated_to(), count, interval)?;
        }
        Ok(())
    }

    /// An independent copy of this histogram: same configuration, same
    /// counts, same timestamps.
    pub fn copy(&self) -> Histogram<C> {
        let mut h = Histogram::new_from(self);
        h.add(self)
            .expect("identical configuration; all values fit");
        h.start_timestamp = self.start_timestamp;
        h.end_timestamp = self.end_timestamp;
        h
    }

    /// A copy of this histogram with the coordinated omission correction
    /// applied while copying; see [`add_correct`](Histogram::add_correct).
    pub fn copy_correct(&self, interval: u64) -> Histogram<C> {
        let mut h = Histogram::new_from(self);
        h.add_correct(self, interval)
            .expect("identical configuration; all values fit");
        h.start_timestamp = self.start_timestamp;
        h.end_timestamp = self.end_timestamp;
        h
    }

    /// Overwrite `target` with this histogram's contents, statistics, and
    /// timestamps. `target` must be able to track this histogram's range.
    pub fn copy_into(&self, target: &mut Histogram<C>) -> Result<(), AdditionError> {
        target.reset();
        target.add(self)?;
        target.start_timestamp = self.start_timestamp;
        target.end_timestamp = self.end_timestamp;
        Ok(())
    }

    /// Clear all counts and statistics, keeping only the configuration.
    /// Timestamps are cleared as well.
    pub fn reset(&mut self) {
        self.counts.clear();
        self.total_count = 0;
        self.max_value = MAX_SENTINEL;
        self.min_non_zero_value = MIN_SENTINEL;
        self.start_timestamp = None;
        self.end_timestamp = None;
    }

    // ********************************************************************
    // Overflow bookkeeping
    // ********************************************************************

    /// True when the sum of the count slots no longer matches the running
    /// total, which happens once any slot has saturated its counter width.
    ///
    /// Scans the counts array.
    pub fn has_overflowed(&self) -> bool {
        self.counts.total() != self.total_count
    }

    /// Re-derive the running total from the count slots, clearing the
    /// discrepancy that [`has_overflowed`](Histogram::has_overflowed)
    /// reports. The saturated slots themselves keep their clamped values.
    pub fn reestablish_total_count(&mut self) {
        self.total_count = self.counts.total();
    }

    // ********************************************************************
    // Timestamps
    // ********************************************************************

    /// Start of the interval this histogram covers, in milliseconds since
    /// the epoch, if one was set. The library never reads a clock; producers
    /// and the interval-log reader set this.
    pub fn start_timestamp(&self) -> Option<u64> {
        self.start_timestamp
    }

    /// Set the start-of-interval timestamp, in milliseconds since the epoch.
    pub fn set_start_timestamp(&mut self, millis: u64) {
        self.start_timestamp = Some(millis);
    }

    /// End of the interval this histogram covers, in milliseconds since the
    /// epoch, if one was set.
    pub fn end_timestamp(&self) -> Option<u64> {
        self.end_timestamp
    }

    /// Set the end-of-interval timestamp, in milliseconds since the epoch.
    pub fn set_end_timestamp(&mut self, millis: u64) {
        self.end_timestamp = Some(millis);
    }

    // ********************************************************************
    // Statistics
    // ********************************************************************

    /// Total number of samples recorded.
    pub fn len(&self) -> u64 {
        self.total_count
    }

    /// True when no samples have been recorded.
    pub fn is_empty(&self) -> bool {
        self.total_count == 0
    }

    /// The lowest recorded value, or 0 if none were recorded.
    pub fn min(&self) -> u64 {
        if self.total_count == 0
            || self.counts.get(0).expect("counts array is never empty") != C::zero()
        {
            0
        } else {
            self.min_nz()
        }
    }

    /// The lowest recorded non-zero value, or `u64::MAX` if none were
    /// recorded.
    pub fn min_nz(&self) -> u64 {
        if self.min_non_zero_value == MIN_SENTINEL {
            MIN_SENTINEL
        } else {
            self.layout.lowest_equivalent(self.min_non_zero_value)
        }
    }

    /// The highest recorded value, or 0 if none were recorded.
    pub fn max(&self) -> u64 {
        if self.max_value == MAX_SENTINEL {
            MAX_SENTINEL
        } else {
            self.layout.highest_equivalent(self.max_value)
        }
    }

    /// Arithmetic mean of all recorded values, computed from the middle of
    /// each occupied slot. 0 for an empty histogram.
    pub fn mean(&self) -> f64 {
        if self.total_count == 0 {
            return 0.0;
        }
        self.iter_recorded().fold(0.0_f64, |total, p| {
            total
                + self.median_equivalent(p.value_iterated_to()) as f64 * p.count_at_value() as f64
                    / self.total_count as f64
        })
    }

    /// Standard deviation of all recorded values. 0 for an empty histogram.
    pub fn stdev(&self) -> f64 {
        if self.total_count == 0 {
            return 0.0;
        }
        let mean = self.mean();
        let sum_sq = self.iter_recorded().fold(0.0_f64, |sum, p| {
            let dev = self.median_equivalent(p.value_iterated_to()) as f64 - mean;
            sum + dev * dev * p.count_at_value() as f64
        });
        (sum_sq / self.total_count as f64).sqrt()
    }

    /// The value at the given percentile of the recorded distribution.
    ///
    /// `percentile` is clamped to 100. The target rank is
    /// `round(percentile/100 * len())`, with a minimum rank of 1; the value
    /// returned is the highest value equivalent to the value at that rank,
    /// so that the stated percentage of samples is at or below it. Returns
    /// 0 for an empty histogram.
    ///
    /// The error is only reachable if the count invariants are broken (for
    /// example by a counter mutation racing this query) and should be
    /// treated as a bug.
    pub fn value_at_percentile(&self, percentile: f64) -> Result<u64, PercentileError> {
        if self.total_count == 0 {
            return Ok(0);
        }
        let percentile = if percentile > 100.0 { 100.0 } else { percentile };
        let mut target = ((percentile / 100.0) * self.total_count as f64).round() as u64;
        if target == 0 {
            target = 1;
        }

        let mut total = 0_u64;
        for index in 0..self.counts.len() {
            let count = self
                .counts
                .get(index)
                .expect("iterating inside counts length");
            total = total.saturating_add(count.as_u64());
            if total >= target {
                let value = self.layout.value_at_index(index);
                return Ok(self.layout.highest_equivalent(value));
            }
        }
        Err(PercentileError::CountsExhausted)
    }

    /// Percentage of recorded samples at or below `value` (to within the
    /// histogram's resolution). 100 for an empty histogram or when `value`
    /// exceeds the trackable range.
    pub fn percentile_below(&self, value: u64) -> f64 {
        if self.total_count == 0 {
            return 100.0;
        }
        let index = self.layout.index_of_or_last(value);
        100.0 * self.counts.total_to(index) as f64 / self.total_count as f64
    }

    /// Number of samples recorded in `[lowest_equivalent(low),
    /// highest_equivalent(high)]`. Bounds beyond the trackable range clamp
    /// to it; an inverted range counts as empty.
    pub fn count_between(&self, low: u64, high: u64) -> u64 {
        let low_index = self.layout.index_of_or_last(low);
        let high_index = self.layout.index_of_or_last(high);
        if low_index > high_index {
            return 0;
        }
        (low_index..=high_index)
            .map(|i| {
                self.counts
                    .get(i)
                    .expect("range is clamped inside counts length")
            })
            .fold(0_u64, |sum, c| sum.saturating_add(c.as_u64()))
    }

    /// Number of samples recorded in the single slot containing `value`.
    /// Values beyond the trackable range clamp to the last slot.
    pub fn count_at(&self, value: u64) -> C {
        self.counts
            .get(self.layout.index_of_or_last(value))
            .expect("clamped index is inside counts length")
    }

    // ********************************************************************
    // Equivalence
    // ********************************************************************

    /// True when the two values land in the same count slot at this
    /// histogram's resolution.
    pub fn equivalent(&self, a: u64, b: u64) -> bool {
        self.layout.lowest_equivalent(a) == self.layout.lowest_equivalent(b)
    }

    /// Size, in value units, of the range of values equivalent to `value`.
    pub fn equivalent_range(&self, value: u64) -> u64 {
        self.layout.equivalent_range(value)
    }

    /// The lowest value equivalent to `value`.
    pub fn lowest_equivalent(&self, value: u64) -> u64 {
        self.layout.lowest_equivalent(value)
    }

    /// The highest value equivalent to `value`, capped at `u64::MAX`.
    pub fn highest_equivalent(&self, value: u64) -> u64 {
        self.layout.highest_equivalent(value)
    }

    /// A value in the middle of the range equivalent to `value`.
    pub fn median_equivalent(&self, value: u64) -> u64 {
        self.layout.median_equivalent(value)
    }

    /// The first value above `value` that is not equivalent to it.
    pub fn next_non_equivalent(&self, value: u64) -> u64 {
        self.layout.next_non_equivalent(value)
    }

    // ********************************************************************
    // Iteration
    // ********************************************************************

    /// Iterate over every slot with a non-zero count, one step per occupied
    /// slot.
    pub fn iter_recorded(&self) -> iter::PointIter<'_, C, iter::Recorded> {
        iter::PointIter::new(self, iter::Recorded::new())
    }

    /// Iterate over every representable slot, occupied or not, at the
    /// finest granularity of the underlying storage.
    pub fn iter_all(&self) -> iter::PointIter<'_, C, iter::AllValues> {
        iter::PointIter::new(self, iter::AllValues::new())
    }

    /// Iterate in fixed steps of `step` value units, yielding the counts
    /// accumulated in each step. Iteration ends at the end of the sub-bucket
    /// quantum containing the last recorded value, so at coarse resolutions
    /// the final steps may cover slots wider than `step`.
    pub fn iter_linear(&self, step: u64) -> iter::PointIter<'_, C, iter::Linear> {
        iter::PointIter::new(self, iter::Linear::new(self, step))
    }

    /// Iterate in steps that start at `first` value units and grow by
    /// `base` each step.
    pub fn iter_log(&self, first: u64, base: f64) -> iter::PointIter<'_, C, iter::Logarithmic> {
        iter::PointIter::new(self, iter::Logarithmic::new(self, first, base))
    }

    /// Iterate by percentile levels, halving the remaining distance to 100%
    /// every `ticks_per_half_distance` steps. Percentiles are strictly
    /// non-decreasing across steps and the final step lands on 100%.
    pub fn iter_percentiles(
        &self,
        ticks_per_half_distance: u32,
    ) -> iter::PointIter<'_, C, iter::Percentiles> {
        iter::PointIter::new(self, iter::Percentiles::new(ticks_per_half_distance))
    }

    // ********************************************************************
    // Internal helpers
    // ********************************************************************

    #[inline]
    pub(crate) fn layout(&self) -> &BucketLayout {
        &self.layout
    }

    #[inline]
    pub(crate) fn count_at_index(&self, index: usize) -> Option<C> {
        self.counts.get(index)
    }

    /// Slot index of the highest recorded value; 0 when empty. The counts
    /// prefix ending here is the "relevant" part worth serializing. The
    /// tracked max carries unit-magnitude mask bits, so it is clamped back
    /// into the trackable range before indexing.
    #[cfg(feature = "serialization")]
    pub(crate) fn index_of_max(&self) -> usize {
        self.layout
            .index_of_or_last(self.max_value.min(self.layout.high()))
    }

    #[cfg(feature = "serialization")]
    pub(crate) fn set_count_at_index(&mut self, index: usize, count: C) -> Result<(), ()> {
        self.counts.set(index, count)
    }

    /// Recompute total count, max, and min from the first `scan_len` slots.
    /// Used after bulk count writes (decoding).
    #[cfg(feature = "serialization")]
    pub(crate) fn restat(&mut self, scan_len: usize) {
        self.max_value = MAX_SENTINEL;
        self.min_non_zero_value = MIN_SENTINEL;

        let mut max_index = None;
        let mut min_index = None;
        let mut total = 0_u64;
        for index in 0..scan_len.min(self.counts.len()) {
            let count = self
                .counts
                .get(index)
                .expect("scan is clamped inside counts length");
            if count != C::zero() {
                total = total.saturating_add(count.as_u64());
                max_index = Some(index);
                if min_index.is_none() && index != 0 {
                    min_index = Some(index);
                }
            }
        }

        if let Some(index) = max_index {
            let max = self
                .layout
                .highest_equivalent(self.layout.value_at_index(index));
            self.update_max(max);
        }
        if let Some(index) = min_index {
            self.update_min(self.layout.value_at_index(index));
        }
        self.total_count = total;
    }

    fn update_min_max(&mut self, value: u64) {
        if value > self.max_value {
            self.update_max(value);
        }
        if value < self.min_non_zero_value && value != 0 {
            self.update_min(value);
        }
    }

    fn update_max(&mut self, value: u64) {
        // track the highest unit-equivalent value
        let internal = value | self.layout.unit_magnitude_mask();
        if internal > self.max_value {
            self.max_value = internal;
        }
    }

    fn update_min(&mut self, value: u64) {
        if value <= self.layout.unit_magnitude_mask() {
            return; // unit-equivalent to 0
        }
        // track the lowest unit-equivalent value
        let internal = value & !self.layout.unit_magnitude_mask();
        if internal < self.min_non_zero_value {
            self.min_non_zero_value = internal;
        }
    }
}

// ********************************************************************
// Trait implementations
// ********************************************************************

impl<C: Counter> Clone for Histogram<C> {
    fn clone(&self) -> Self {
        self.copy()
    }
}

impl<C: Counter> PartialEq for Histogram<C> {
    fn eq(&self, other: &Histogram<C>) -> bool {
        if self.layout.low() != other.layout.low()
            || self.layout.high() != other.layout.high()
            || self.layout.digits() != other.layout.digits()
        {
            return false;
        }
        if self.total_count != other.total_count
            || self.max() != other.max()
            || self.min_nz() != other.min_nz()
        {
            return false;
        }
        (0..self.counts.len()).all(|i| self.counts.get(i) == other.counts.get(i))
    }
}

/// Record a value, panicking if it is out of range. Equivalent to
/// `record(value).unwrap()`.
impl<C: Counter> AddAssign<u64> for Histogram<C> {
    fn add_assign(&mut self, value: u64) {
        self.record(value).unwrap();
    }
}

/// Merge another histogram, panicking if its range exceeds this one's.
/// Equivalent to `add(other).unwrap()`.
impl<'a, C: Counter> AddAssign<&'a Histogram<C>> for Histogram<C> {
    fn add_assign(&mut self, other: &'a Histogram<C>) {
        self.add(other).unwrap();
    }
}

#[path = "tests/tests.rs"]
#[cfg(test)]
mod tests;
