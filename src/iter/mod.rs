//! Iteration over a histogram's recorded distribution.
//!
//! All iteration orders share one cursor that walks the counts array slot by
//! slot, accumulating running totals; a [`StepRule`] decides when a step is
//! emitted, which representative value it reports, and how the rule's
//! internal level advances afterwards. The five rules:
//!
//! - [`Recorded`] — one step per occupied slot.
//! - [`AllValues`] — one step per slot, occupied or not.
//! - [`Linear`] — steps at fixed value intervals.
//! - [`Logarithmic`] — steps at exponentially growing value intervals.
//! - [`Percentiles`] — steps at percentile levels closing in on 100%.
//!
//! Iterators snapshot the histogram's total count when created and stop once
//! the accumulated count reaches that snapshot (the value-spaced rules may
//! tack on trailing steps to finish the quantum containing the last recorded
//! value; the percentile rule adds a final step at 100%).

use crate::counter::Counter;
use crate::Histogram;

mod all;
mod linear;
mod log;
mod percentile;
mod recorded;

pub use self::all::AllValues;
pub use self::linear::Linear;
pub use self::log::Logarithmic;
pub use self::percentile::Percentiles;
pub use self::recorded::Recorded;

/// One emitted iteration step.
///
/// A step describes the slice of the distribution between the previous
/// step's value and this one's: the representative value iterated to, the
/// counts added since the last step, and the running totals and percentile
/// at this point.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationPoint {
    value_iterated_to: u64,
    value_iterated_from: u64,
    count_at_value: u64,
    count_added_in_step: u64,
    total_count_to_value: u64,
    total_value_to_value: u64,
    percentile: f64,
    percentile_level_iterated_to: f64,
}

impl IterationPoint {
    /// The representative value this step iterated to.
    pub fn value_iterated_to(&self) -> u64 {
        self.value_iterated_to
    }

    /// The previous step's `value_iterated_to`, or 0 for the first step.
    pub fn value_iterated_from(&self) -> u64 {
        self.value_iterated_from
    }

    /// Count recorded in the single slot at `value_iterated_to`.
    pub fn count_at_value(&self) -> u64 {
        self.count_at_value
    }

    /// Counts accumulated between the previous step and this one.
    pub fn count_added_in_step(&self) -> u64 {
        self.count_added_in_step
    }

    /// Running count of samples at or below this step's value.
    pub fn total_count_to_value(&self) -> u64 {
        self.total_count_to_value
    }

    /// Running sum of slot values weighted by their counts up to this step.
    pub fn total_value_to_value(&self) -> u64 {
        self.total_value_to_value
    }

    /// Percentage of the snapshot total at or below this step's value.
    pub fn percentile(&self) -> f64 {
        self.percentile
    }

    /// The percentile level the iteration had targeted when this step was
    /// emitted. Differs from [`percentile`](IterationPoint::percentile) when
    /// a single slot holds enough counts to jump past several levels.
    pub fn percentile_level_iterated_to(&self) -> f64 {
        self.percentile_level_iterated_to
    }
}

/// The shared cursor state a [`StepRule`] consults.
#[derive(Debug)]
pub struct Cursor {
    current_index: usize,
    current_value: u64,
    next_value: u64,
    count_at_this_value: u64,
    prev_value_iterated_to: u64,
    total_count_to_current: u64,
    total_count_to_prev: u64,
    total_value_to_current: u64,
    saved_total: u64,
}

impl Cursor {
    /// The counts-array slot the cursor is on.
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// The lowest value mapping to the current slot.
    pub fn current_value(&self) -> u64 {
        self.current_value
    }

    /// The lowest value mapping to the slot after the current one.
    pub fn next_value(&self) -> u64 {
        self.next_value
    }

    /// Count in the current slot.
    pub fn count_at_this_value(&self) -> u64 {
        self.count_at_this_value
    }

    /// Counts accumulated through the current slot.
    pub fn total_count_to_current(&self) -> u64 {
        self.total_count_to_current
    }

    /// The histogram's total count, snapshotted when iteration began.
    pub fn saved_total(&self) -> u64 {
        self.saved_total
    }

    /// Percentage of the snapshot total accumulated through the current
    /// slot. 0 when the snapshot was empty.
    pub fn percentile(&self) -> f64 {
        if self.saved_total == 0 {
            0.0
        } else {
            100.0 * self.total_count_to_current as f64 / self.saved_total as f64
        }
    }
}

/// An iteration strategy: decides when the cursor's position becomes an
/// emitted step, what value the step reports, and how the strategy's level
/// advances after each emission.
pub trait StepRule<C: Counter> {
    /// Should a step be emitted at the cursor's current position?
    fn reached_step(&mut self, hist: &Histogram<C>, cursor: &Cursor) -> bool;

    /// Advance the strategy's internal level after a step was emitted.
    fn advance_step(&mut self, hist: &Histogram<C>, cursor: &Cursor);

    /// The representative value reported for a step emitted at the cursor's
    /// position. Defaults to the highest value equivalent to the current
    /// slot.
    fn step_value(&self, hist: &Histogram<C>, cursor: &Cursor) -> u64 {
        hist.highest_equivalent(cursor.current_value())
    }

    /// The percentile level reported as iterated-to for an emitted step.
    /// Defaults to the cursor's actual percentile.
    fn percentile_iterated_to(&self, cursor: &Cursor) -> f64 {
        cursor.percentile()
    }

    /// Whether iteration should continue. The default stops once the
    /// accumulated count reaches the snapshot total; rules override this to
    /// append trailing steps.
    fn has_more(&mut self, hist: &Histogram<C>, cursor: &Cursor) -> bool {
        let _ = hist;
        cursor.total_count_to_current < cursor.saved_total
    }
}

/// Iterator over a histogram driven by a [`StepRule`]. Single-pass; created
/// by the `Histogram::iter_*` methods.
pub struct PointIter<'a, C: Counter, R: StepRule<C>> {
    hist: &'a Histogram<C>,
    cursor: Cursor,
    rule: R,
    fresh: bool,
    ended: bool,
}

impl<'a, C: Counter, R: StepRule<C>> PointIter<'a, C, R> {
    pub(crate) fn new(hist: &'a Histogram<C>, rule: R) -> PointIter<'a, C, R> {
        PointIter {
            hist,
            cursor: Cursor {
                current_index: 0,
                current_value: 0,
                next_value: hist.layout().value_at_index(1),
                count_at_this_value: 0,
                prev_value_iterated_to: 0,
                total_count_to_current: 0,
                total_count_to_prev: 0,
                total_value_to_current: 0,
                saved_total: hist.len(),
            },
            rule,
            fresh: true,
            ended: false,
        }
    }

    fn advance_index(&mut self) {
        self.cursor.current_index += 1;
        self.cursor.current_value = self.hist.layout().value_at_index(self.cursor.current_index);
        self.cursor.next_value = self
            .hist
            .layout()
            .value_at_index(self.cursor.current_index + 1);
        self.fresh = true;
    }
}

impl<'a, C: Counter, R: StepRule<C>> Iterator for PointIter<'a, C, R> {
    type Item = IterationPoint;

    fn next(&mut self) -> Option<IterationPoint> {
        if self.ended {
            return None;
        }
        if !self.rule.has_more(self.hist, &self.cursor) {
            self.ended = true;
            return None;
        }

        while self.cursor.current_index < self.hist.distinct_values() {
            if self.fresh {
                let count = self
                    .hist
                    .count_at_index(self.cursor.current_index)
                    .expect("loop is bounded by the counts length")
                    .as_u64();
                self.cursor.count_at_this_value = count;
                self.cursor.total_count_to_current =
                    self.cursor.total_count_to_current.saturating_add(count);
                self.cursor.total_value_to_current =
                    self.cursor.total_value_to_current.saturating_add(
                        count.saturating_mul(
                            self.hist.highest_equivalent(self.cursor.current_value),
                        ),
                    );
                self.fresh = false;
            }

            if self.rule.reached_step(self.hist, &self.cursor) {
                let value_iterated_to = self.rule.step_value(self.hist, &self.cursor);
                let point = IterationPoint {
                    value_iterated_to,
                    value_iterated_from: self.cursor.prev_value_iterated_to,
                    count_at_value: self.cursor.count_at_this_value,
                    count_added_in_step: self.cursor.total_count_to_current
                        - self.cursor.total_count_to_prev,
                    total_count_to_value: self.cursor.total_count_to_current,
                    total_value_to_value: self.cursor.total_value_to_current,
                    percentile: self.cursor.percentile(),
                    percentile_level_iterated_to: self.rule.percentile_iterated_to(&self.cursor),
                };

                // The cursor stays on this slot; the rule sees it again on
                // the next call, with the step level already advanced.
                self.cursor.prev_value_iterated_to = value_iterated_to;
                self.cursor.total_count_to_prev = self.cursor.total_count_to_current;
                self.rule.advance_step(self.hist, &self.cursor);
                return Some(point);
            }

            self.advance_index();
        }

        self.ended = true;
        None
    }
}
