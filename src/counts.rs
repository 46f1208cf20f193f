//! The fixed-length array of count slots behind a histogram.

use crate::counter::Counter;

/// Count storage. Allocated once at construction, never resized.
///
/// Mutations saturate at the counter's maximum rather than wrapping; a
/// saturated slot leaves the histogram's running total ahead of the slot
/// sum, which is exactly the discrepancy `Histogram::has_overflowed`
/// reports.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Counts<C: Counter> {
    slots: Vec<C>,
}

impl<C: Counter> Counts<C> {
    pub(crate) fn new(len: usize) -> Counts<C> {
        Counts {
            slots: vec![C::zero(); len],
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    /// Count at `index`, or `None` past the end of the array.
    #[inline]
    pub(crate) fn get(&self, index: usize) -> Option<C> {
        self.slots.get(index).copied()
    }

    #[inline]
    pub(crate) fn add_to(&mut self, index: usize, delta: C) {
        let slot = &mut self.slots[index];
        *slot = slot.saturating_add(delta);
    }

    #[cfg(feature = "serialization")]
    pub(crate) fn set(&mut self, index: usize, count: C) -> Result<(), ()> {
        let slot = self.slots.get_mut(index).ok_or(())?;
        *slot = count;
        Ok(())
    }

    pub(crate) fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = C::zero();
        }
    }

    /// Sum of every slot, saturating at `u64::MAX`.
    pub(crate) fn total(&self) -> u64 {
        self.slots
            .iter()
            .fold(0_u64, |sum, c| sum.saturating_add(c.as_u64()))
    }

    /// Sum of the slots in `[0, index]`, saturating at `u64::MAX`.
    pub(crate) fn total_to(&self, index: usize) -> u64 {
        self.slots[..=index.min(self.slots.len() - 1)]
            .iter()
            .fold(0_u64, |sum, c| sum.saturating_add(c.as_u64()))
    }
}
