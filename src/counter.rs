//! The counter-width abstraction over the histogram's count slots.

use num_traits as num;

/// Operations a histogram needs from its underlying counter type.
///
/// The arithmetic bounds come from `num-traits`: saturating addition is what
/// lets a narrow counter absorb more increments than it can represent (the
/// resulting shortfall is observable through `Histogram::has_overflowed`),
/// and the primitive conversions are used for percentile math and for the
/// wire formats, which express counts as signed 64-bit integers.
///
/// Implemented for `u16`, `u32`, and `u64`, matching the 2-, 4-, and 8-byte
/// count words of the binary encodings.
pub trait Counter:
    num::Num + num::ToPrimitive + num::FromPrimitive + num::Saturating + Copy + PartialOrd<Self>
{
    /// Width of this counter on the legacy fixed-width wire formats, in bytes.
    fn width_bytes() -> u32;

    /// The largest count this counter can hold, as a `u64`.
    fn max_allowable() -> u64;

    /// Counter as an `f64`.
    fn as_f64(&self) -> f64;

    /// Counter as a `u64`.
    fn as_u64(&self) -> u64;
}

impl Counter for u16 {
    #[inline]
    fn width_bytes() -> u32 {
        2
    }
    #[inline]
    fn max_allowable() -> u64 {
        u64::from(u16::max_value())
    }
    #[inline]
    fn as_f64(&self) -> f64 {
        f64::from(*self)
    }
    #[inline]
    fn as_u64(&self) -> u64 {
        u64::from(*self)
    }
}

impl Counter for u32 {
    #[inline]
    fn width_bytes() -> u32 {
        4
    }
    #[inline]
    fn max_allowable() -> u64 {
        u64::from(u32::max_value())
    }
    #[inline]
    fn as_f64(&self) -> f64 {
        f64::from(*self)
    }
    #[inline]
    fn as_u64(&self) -> u64 {
        u64::from(*self)
    }
}

impl Counter for u64 {
    #[inline]
    fn width_bytes() -> u32 {
        8
    }
    #[inline]
    fn max_allowable() -> u64 {
        u64::max_value()
    }
    #[inline]
    fn as_f64(&self) -> f64 {
        *self as f64
    }
    #[inline]
    fn as_u64(&self) -> u64 {
        *self
    }
}
