//! The bucketed value geometry: mapping sample values to count slots and back.
//!
//! Values are decomposed like floating-point numbers: the bucket index is an
//! exponent, the sub-bucket index a mantissa. Bucket `k` covers values in
//! units of `2^(k + unit_magnitude)`, and only the top half of each bucket
//! past the first is stored, since the bottom half aliases the finer-grained
//! buckets before it.

use crate::errors::CreationError;

/// Precomputed geometry for a `(lowest, highest, digits)` configuration.
///
/// All index math lives here so the recording path, the queries, and the
/// codecs agree on one algebra. The layout is immutable once built.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BucketLayout {
    // >= 1
    lowest_discernible_value: u64,
    // >= 2 * lowest_discernible_value
    highest_trackable_value: u64,
    // in [0, 5]
    significant_digits: u8,

    // in [1, 64]
    bucket_count: u8,
    // power of two in [2, 2^18]
    sub_bucket_count: u32,
    sub_bucket_half_count: u32,
    // log2(sub_bucket_half_count)
    sub_bucket_half_count_magnitude: u8,
    // bits of the largest bucket-0 value, shifted by unit magnitude
    sub_bucket_mask: u64,

    // leading zeros of the largest value in bucket 0
    leading_zero_count_base: u8,

    // largest power of two <= lowest_discernible_value
    unit_magnitude: u8,
    // low unit_magnitude bits set
    unit_magnitude_mask: u64,

    // (bucket_count + 1) * sub_bucket_half_count
    counts_len: usize,
}

impl BucketLayout {
    pub(crate) fn new(low: u64, high: u64, digits: u8) -> Result<BucketLayout, CreationError> {
        if low < 1 {
            return Err(CreationError::LowIsZero);
        }
        if low > u64::max_value() / 2 {
            // avoid overflow in the 2 * low check below
            return Err(CreationError::LowExceedsMax);
        }
        if high < 2 * low {
            return Err(CreationError::HighLessThanTwiceLow);
        }
        if digits > 5 {
            return Err(CreationError::DigitsExceedMax);
        }

        // A precision of d significant digits promises at most one unit of
        // error at 10^d, which only becomes two units at 2 * 10^d. Single
        // unit resolution must therefore stretch to 2 * 10^d.
        let largest_single_unit_value = 2 * 10_u32.pow(u32::from(digits));

        let unit_magnitude = (low as f64).log2().floor() as u8;
        let unit_magnitude_mask = (1_u64 << unit_magnitude) - 1;

        // Round the sub-bucket count up to a power of two so indexing is a
        // shift-and-mask. In [1, 18] since 2^18 > 2 * 10^5.
        let sub_bucket_count_magnitude =
            (f64::from(largest_single_unit_value)).log2().ceil() as u8;
        let sub_bucket_half_count_magnitude = sub_bucket_count_magnitude - 1;
        let sub_bucket_count = 1_u32 << u32::from(sub_bucket_count_magnitude);

        if unit_magnitude + sub_bucket_count_magnitude > 63 {
            // The full sub-bucket range, shifted by the unit magnitude, must
            // stay expressible in a u64.
            return Err(CreationError::PrecisionTooFineForLow);
        }

        let sub_bucket_half_count = sub_bucket_count / 2;
        let sub_bucket_mask = (u64::from(sub_bucket_count) - 1) << unit_magnitude;

        let mut layout = BucketLayout {
            lowest_discernible_value: low,
            highest_trackable_value: high,
            significant_digits: digits,
            bucket_count: 0,
            sub_bucket_count,
            sub_bucket_half_count,
            sub_bucket_half_count_magnitude,
            sub_bucket_mask,
            leading_zero_count_base: 64 - unit_magnitude - sub_bucket_count_magnitude,
            unit_magnitude,
            unit_magnitude_mask,
            counts_len: 0,
        };

        layout.bucket_count = layout.buckets_to_cover(high);
        layout.counts_len =
            (usize::from(layout.bucket_count) + 1) * (layout.sub_bucket_half_count as usize);
        Ok(layout)
    }

    /// Number of buckets needed for `value` to be representable.
    fn buckets_to_cover(&self, value: u64) -> u8 {
        // Bucket k tops out just below sub_bucket_count << (k + unit_magnitude).
        let mut smallest_untrackable = u64::from(self.sub_bucket_count) << self.unit_magnitude;
        let mut buckets_needed = 1;
        while smallest_untrackable <= value {
            if smallest_untrackable > u64::max_value() / 2 {
                // One more shift would overflow, so that bucket reaches past
                // the largest representable value and must be the last.
                return buckets_needed + 1;
            }
            smallest_untrackable <<= 1;
            buckets_needed += 1;
        }
        buckets_needed
    }

    // ****************************************************************
    // Configuration read-outs
    // ****************************************************************

    #[inline]
    pub(crate) fn low(&self) -> u64 {
        self.lowest_discernible_value
    }

    #[inline]
    pub(crate) fn high(&self) -> u64 {
        self.highest_trackable_value
    }

    #[inline]
    pub(crate) fn digits(&self) -> u8 {
        self.significant_digits
    }

    #[inline]
    pub(crate) fn buckets(&self) -> u8 {
        self.bucket_count
    }

    #[inline]
    pub(crate) fn sub_buckets(&self) -> u32 {
        self.sub_bucket_count
    }

    #[inline]
    pub(crate) fn counts_len(&self) -> usize {
        self.counts_len
    }

    #[inline]
    pub(crate) fn unit_magnitude(&self) -> u8 {
        self.unit_magnitude
    }

    #[inline]
    pub(crate) fn unit_magnitude_mask(&self) -> u64 {
        self.unit_magnitude_mask
    }

    /// True when `other` slots values identically, so counts arrays can be
    /// merged index-by-index.
    pub(crate) fn matches(&self, other: &BucketLayout) -> bool {
        self.bucket_count == other.bucket_count
            && self.sub_bucket_count == other.sub_bucket_count
            && self.unit_magnitude == other.unit_magnitude
    }

    // ****************************************************************
    // Value -> index
    // ****************************************************************

    /// The exponent: how many powers of two `value` sits above what bucket 0
    /// can hold. The mask maps small values to bucket 0.
    #[inline]
    pub(crate) fn bucket_index_of(&self, value: u64) -> u8 {
        // Cannot underflow: the mask bounds the leading zeros by
        // leading_zero_count_base.
        self.leading_zero_count_base - (value | self.sub_bucket_mask).leading_zeros() as u8
    }

    /// The mantissa: position within the bucket, in `[0, sub_bucket_count)`.
    /// For any bucket past the first, the result lands in the top half;
    /// otherwise the value would have fit in the previous bucket.
    #[inline]
    pub(crate) fn sub_bucket_index_of(&self, value: u64, bucket_index: u8) -> u32 {
        (value >> (bucket_index + self.unit_magnitude)) as u32
    }

    /// The flat counts-array slot for `value`.
    ///
    /// Callers are expected to have range-checked `value` against the
    /// trackable range; any in-range value maps inside the array.
    #[inline]
    pub(crate) fn index_of(&self, value: u64) -> usize {
        let bucket_index = self.bucket_index_of(value);
        let sub_bucket_index = self.sub_bucket_index_of(value, bucket_index);

        debug_assert!(sub_bucket_index < self.sub_bucket_count);
        debug_assert!(bucket_index == 0 || sub_bucket_index >= self.sub_bucket_half_count);

        // Each bucket owns sub_bucket_half_count slots starting halfway into
        // its nominal range; bucket 0 additionally owns the lower half, which
        // is why the offset below may be negative only for bucket 0, where
        // the base is one half-count in.
        let base = (usize::from(bucket_index) + 1) << self.sub_bucket_half_count_magnitude;
        let offset = sub_bucket_index as isize - self.sub_bucket_half_count as isize;

        let index = base as isize + offset;
        debug_assert!(index >= 0);
        debug_assert!((index as usize) < self.counts_len);
        index as usize
    }

    /// Like `index_of`, but clamps values beyond the trackable range to the
    /// last slot.
    #[inline]
    pub(crate) fn index_of_or_last(&self, value: u64) -> usize {
        if value > self.highest_trackable_value {
            self.counts_len - 1
        } else {
            self.index_of(value).min(self.counts_len - 1)
        }
    }

    // ****************************************************************
    // Index -> value
    // ****************************************************************

    /// The lowest value that maps to the given counts-array slot.
    pub(crate) fn value_at_index(&self, index: usize) -> u64 {
        // Dividing by the half count yields 1 in the upper half of bucket 0,
        // 2 in bucket 1's (only) stored half, and so on; shift down by one to
        // zero-index, which leaves -1 for the lower half of bucket 0.
        let mut bucket_index = (index >> self.sub_bucket_half_count_magnitude) as isize - 1;
        let mut sub_bucket_index =
            (index as u32 & (self.sub_bucket_half_count - 1)) + self.sub_bucket_half_count;
        if bucket_index < 0 {
            sub_bucket_index -= self.sub_bucket_half_count;
            bucket_index = 0;
        }
        self.value_from_parts(bucket_index as u8, sub_bucket_index)
    }

    /// Saturates for one-past-the-end probes whose shift would leave u64.
    #[inline]
    pub(crate) fn value_from_parts(&self, bucket_index: u8, sub_bucket_index: u32) -> u64 {
        let shift = u32::from(bucket_index) + u32::from(self.unit_magnitude);
        u64::from(sub_bucket_index)
            .checked_shl(shift)
            .unwrap_or(u64::max_value())
    }

    // ****************************************************************
    // Equivalent-value ranges
    // ****************************************************************

    /// Size in value units of the range of values that share `value`'s slot.
    #[inline]
    pub(crate) fn equivalent_range(&self, value: u64) -> u64 {
        1_u64 << (self.unit_magnitude + self.bucket_index_of(value))
    }

    /// Lowest value that shares `value`'s slot.
    #[inline]
    pub(crate) fn lowest_equivalent(&self, value: u64) -> u64 {
        let bucket_index = self.bucket_index_of(value);
        let sub_bucket_index = self.sub_bucket_index_of(value, bucket_index);
        self.value_from_parts(bucket_index, sub_bucket_index)
    }

    /// Highest value that shares `value`'s slot, capped at `u64::MAX`.
    #[inline]
    pub(crate) fn highest_equivalent(&self, value: u64) -> u64 {
        if value == u64::max_value() {
            u64::max_value()
        } else {
            self.next_non_equivalent(value) - 1
        }
    }

    /// Value in the middle (rounded down) of `value`'s slot range.
    #[inline]
    pub(crate) fn median_equivalent(&self, value: u64) -> u64 {
        // Half the range added to the bottom of the range cannot overflow.
        self.lowest_equivalent(value) + (self.equivalent_range(value) >> 1)
    }

    /// First value above `value` that maps to a different slot.
    #[inline]
    pub(crate) fn next_non_equivalent(&self, value: u64) -> u64 {
        self.lowest_equivalent(value)
            .saturating_add(self.equivalent_range(value))
    }
}
