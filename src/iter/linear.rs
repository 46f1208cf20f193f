use crate::counter::Counter;
use crate::iter::{Cursor, StepRule};
use crate::Histogram;

/// Step rule that emits a step each time the iteration crosses the next
/// multiple of a fixed step size.
///
/// When the histogram's resolution at some value is coarser than the step
/// size, several nominal steps collapse into the one slot that covers them,
/// and each still gets emitted. Iteration continues until the end of the
/// sub-bucket quantum containing the last recorded value, so the final step
/// may reach past the last recorded value itself.
#[derive(Debug)]
pub struct Linear {
    step: u64,
    current_step_highest: u64,
    current_step_lowest: u64,
}

impl Linear {
    pub(crate) fn new<C: Counter>(hist: &Histogram<C>, step: u64) -> Linear {
        assert!(step > 0, "step must be > 0");
        Linear {
            step,
            current_step_highest: step - 1,
            current_step_lowest: hist.lowest_equivalent(step - 1),
        }
    }
}

impl<C: Counter> StepRule<C> for Linear {
    fn reached_step(&mut self, hist: &Histogram<C>, cursor: &Cursor) -> bool {
        // The last slot is always picked: a step wider than the remaining
        // range would otherwise never cross its reporting level and the
        // counts there would go unreported.
        cursor.current_value() >= self.current_step_lowest
            || cursor.current_index() == hist.distinct_values() - 1
    }

    fn advance_step(&mut self, hist: &Histogram<C>, _cursor: &Cursor) {
        self.current_step_highest = self.current_step_highest.saturating_add(self.step);
        self.current_step_lowest = hist.lowest_equivalent(self.current_step_highest);
    }

    fn step_value(&self, _hist: &Histogram<C>, _cursor: &Cursor) -> u64 {
        self.current_step_highest
    }

    fn has_more(&mut self, _hist: &Histogram<C>, cursor: &Cursor) -> bool {
        if cursor.total_count_to_current() < cursor.saved_total() {
            return true;
        }
        // Keep stepping while the next step would still fall inside the slot
        // the cursor is on; this finishes out the quantum holding the last
        // recorded value instead of stopping at the value itself.
        self.current_step_highest.saturating_add(1) < cursor.next_value()
    }
}
