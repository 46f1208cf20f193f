use crate::counter::Counter;
use crate::iter::{Cursor, StepRule};
use crate::Histogram;

/// Step rule that emits at percentile levels closing in on 100%.
///
/// The 0–100% range is divided into ticks whose size halves every time the
/// remaining distance to 100% halves, with `ticks_per_half_distance` ticks
/// in each half-distance segment. The fixed tick size within a segment keeps
/// the emitted levels easy to scan in a percentile distribution table. Once
/// all recorded values are consumed, one final step is emitted at the 100%
/// level.
#[derive(Debug)]
pub struct Percentiles {
    ticks_per_half_distance: u32,
    level_to_iterate_to: f64,
    reached_last_recorded_value: bool,
}

impl Percentiles {
    pub(crate) fn new(ticks_per_half_distance: u32) -> Percentiles {
        assert!(
            ticks_per_half_distance > 0,
            "ticks per half distance must be > 0"
        );
        Percentiles {
            ticks_per_half_distance,
            level_to_iterate_to: 0.0,
            reached_last_recorded_value: false,
        }
    }
}

impl<C: Counter> StepRule<C> for Percentiles {
    fn reached_step(&mut self, _hist: &Histogram<C>, cursor: &Cursor) -> bool {
        if cursor.count_at_this_value() == 0 {
            return false;
        }
        cursor.percentile() >= self.level_to_iterate_to
    }

    fn advance_step(&mut self, _hist: &Histogram<C>, _cursor: &Cursor) {
        // Number of times the distance to 100% has been halved so far; the
        // tick count doubles with each halving so tick size stays fixed
        // within a segment. At the 100% level the ratio below is infinite
        // and the increment collapses to 0, which is what ends the walk.
        let halvings = (100.0 / (100.0 - self.level_to_iterate_to)).log2() as i32;
        let total_ticks =
            f64::from(self.ticks_per_half_distance) * 2_f64.powi(halvings.saturating_add(1));
        self.level_to_iterate_to += 100.0 / total_ticks;
    }

    fn percentile_iterated_to(&self, _cursor: &Cursor) -> f64 {
        self.level_to_iterate_to
    }

    fn has_more(&mut self, _hist: &Histogram<C>, cursor: &Cursor) -> bool {
        if cursor.total_count_to_current() < cursor.saved_total() {
            return true;
        }
        // one additional last step to 100%
        if !self.reached_last_recorded_value && cursor.saved_total() > 0 {
            self.level_to_iterate_to = 100.0;
            self.reached_last_recorded_value = true;
            return true;
        }
        false
    }
}
