use crate::counter::Counter;
use crate::iter::{Cursor, StepRule};
use crate::Histogram;

/// Step rule that emits exactly one step per slot with a non-zero count.
///
/// The number of steps equals the number of distinct occupied slots, and the
/// sum of `count_added_in_step` over all steps equals the snapshot total.
#[derive(Debug)]
pub struct Recorded {
    visited: Option<usize>,
}

impl Recorded {
    pub(crate) fn new() -> Recorded {
        Recorded { visited: None }
    }
}

impl<C: Counter> StepRule<C> for Recorded {
    fn reached_step(&mut self, _hist: &Histogram<C>, cursor: &Cursor) -> bool {
        cursor.count_at_this_value() != 0 && self.visited != Some(cursor.current_index())
    }

    fn advance_step(&mut self, _hist: &Histogram<C>, cursor: &Cursor) {
        self.visited = Some(cursor.current_index());
    }
}
