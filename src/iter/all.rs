use crate::counter::Counter;
use crate::iter::{Cursor, StepRule};
use crate::Histogram;

/// Step rule that emits one step for every representable slot, occupied or
/// not, until the whole counts array has been visited.
///
/// `count_added_in_step` is 0 for the unoccupied slots.
#[derive(Debug)]
pub struct AllValues {
    visited: Option<usize>,
}

impl AllValues {
    pub(crate) fn new() -> AllValues {
        AllValues { visited: None }
    }
}

impl<C: Counter> StepRule<C> for AllValues {
    fn reached_step(&mut self, _hist: &Histogram<C>, cursor: &Cursor) -> bool {
        self.visited != Some(cursor.current_index())
    }

    fn advance_step(&mut self, _hist: &Histogram<C>, cursor: &Cursor) {
        self.visited = Some(cursor.current_index());
    }

    fn has_more(&mut self, hist: &Histogram<C>, cursor: &Cursor) -> bool {
        // every slot is visited, not just the ones holding counts
        cursor.current_index() < hist.distinct_values() - 1
    }
}
