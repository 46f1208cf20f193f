use crate::counter::Counter;
use crate::iter::{Cursor, StepRule};
use crate::Histogram;

/// Step rule whose step boundaries start at a fixed first bucket size and
/// grow by a constant factor, giving logarithmically spaced output.
#[derive(Debug)]
pub struct Logarithmic {
    // > 1.0
    next_level: f64,
    // > 1.0
    base: f64,
    current_step_highest: u64,
    current_step_lowest: u64,
}

impl Logarithmic {
    pub(crate) fn new<C: Counter>(hist: &Histogram<C>, first: u64, base: f64) -> Logarithmic {
        assert!(first > 0, "first step size must be > 0");
        assert!(base > 1.0, "base must be > 1.0");
        Logarithmic {
            next_level: first as f64,
            base,
            current_step_highest: first - 1,
            current_step_lowest: hist.lowest_equivalent(first - 1),
        }
    }
}

impl<C: Counter> StepRule<C> for Logarithmic {
    fn reached_step(&mut self, hist: &Histogram<C>, cursor: &Cursor) -> bool {
        // As with the linear rule, the last slot is always picked so a step
        // wider than the remaining range still reports its counts.
        cursor.current_value() >= self.current_step_lowest
            || cursor.current_index() == hist.distinct_values() - 1
    }

    fn advance_step(&mut self, hist: &Histogram<C>, _cursor: &Cursor) {
        self.next_level *= self.base;
        // next_level only grows, so the u64 cast is at least 1
        self.current_step_highest = self.next_level as u64 - 1;
        self.current_step_lowest = hist.lowest_equivalent(self.current_step_highest);
    }

    fn step_value(&self, _hist: &Histogram<C>, _cursor: &Cursor) -> u64 {
        self.current_step_highest
    }

    fn has_more(&mut self, hist: &Histogram<C>, cursor: &Cursor) -> bool {
        if cursor.total_count_to_current() < cursor.saved_total() {
            return true;
        }
        hist.lowest_equivalent(self.next_level as u64) < cursor.next_value()
    }
}
