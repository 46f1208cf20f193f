//! Behavior of the five iteration orders.

use centile::Histogram;

const TRACKABLE_MAX: u64 = 3600 * 1000 * 1000;
const SIGFIG: u8 = 3;
const INTERVAL: u64 = 10_000;

fn corrected_stall_histogram() -> Histogram<u64> {
    let mut h = Histogram::new_with_max(TRACKABLE_MAX, SIGFIG).unwrap();
    for _ in 0..10_000 {
        h.record_correct(1000, INTERVAL).unwrap();
    }
    h.record_correct(100_000_000, INTERVAL).unwrap();
    h
}

fn raw_stall_histogram() -> Histogram<u64> {
    let mut h = Histogram::new_with_max(TRACKABLE_MAX, SIGFIG).unwrap();
    for _ in 0..10_000 {
        h.record(1000).unwrap();
    }
    h.record(100_000_000).unwrap();
    h
}

#[test]
fn recorded_visits_each_occupied_slot_once() {
    let mut h = Histogram::<u64>::new_with_max(1000, 3).unwrap();
    h += 100;
    h += 500;
    h += 800;
    h += 850;

    let points: Vec<_> = h.iter_recorded().collect();
    assert_eq!(4, points.len());
    assert_eq!(
        vec![100, 500, 800, 850],
        points.iter().map(|p| p.value_iterated_to()).collect::<Vec<_>>()
    );
    // each step chains from the previous step's value
    assert_eq!(0, points[0].value_iterated_from());
    assert_eq!(100, points[1].value_iterated_from());
    assert_eq!(500, points[2].value_iterated_from());
    assert!(points.iter().all(|p| p.count_at_value() == 1));
    assert!(points.iter().all(|p| p.count_added_in_step() == 1));
}

#[test]
fn recorded_step_counts_sum_to_total() {
    let h = corrected_stall_histogram();
    let sum: u64 = h.iter_recorded().map(|p| p.count_added_in_step()).sum();
    assert_eq!(h.len(), sum);
}

#[test]
fn all_values_walks_every_slot() {
    let mut h = Histogram::<u64>::new_with_max(10, 1).unwrap();
    h += 1;
    h += 5;
    h += 8;

    let points: Vec<_> = h.iter_all().collect();
    assert_eq!(h.distinct_values(), points.len());
    let sum: u64 = points.iter().map(|p| p.count_added_in_step()).sum();
    assert_eq!(h.len(), sum);
    // counts show up exactly where the values were recorded
    assert_eq!(
        vec![1, 5, 8],
        points
            .iter()
            .filter(|p| p.count_at_value() > 0)
            .map(|p| p.value_iterated_from() + 1)
            .collect::<Vec<_>>()
    );
}

#[test]
fn all_values_covers_empty_histogram() {
    let h = Histogram::<u64>::new_with_max(10_000, 2).unwrap();
    let points: Vec<_> = h.iter_all().collect();
    assert_eq!(h.distinct_values(), points.len());
    assert!(points.iter().all(|p| p.count_added_in_step() == 0));
}

#[test]
fn linear_steps_cover_each_bucket() {
    let mut h = Histogram::<u64>::new_with_max(1000, 3).unwrap();
    h += 100;
    h += 500;
    h += 800;
    h += 850;

    let points: Vec<_> = h.iter_linear(100).collect();
    assert_eq!(
        vec![99, 199, 299, 399, 499, 599, 699, 799, 899],
        points.iter().map(|p| p.value_iterated_to()).collect::<Vec<_>>()
    );
    assert_eq!(
        vec![0, 1, 0, 0, 0, 1, 0, 0, 2],
        points
            .iter()
            .map(|p| p.count_added_in_step())
            .collect::<Vec<_>>()
    );
}

#[test]
fn linear_millisecond_walk_step_count_pin() {
    // 1 msec steps across a distribution reaching 100 seconds: the walk runs
    // to the end of the quantum holding the final value, giving 100_007
    // steps rather than a round 100_000.
    let h = corrected_stall_histogram();
    assert_eq!(100_007, h.iter_linear(1000).count());
}

#[test]
fn linear_coarse_walks() {
    assert_eq!(1000, raw_stall_histogram().iter_linear(100_000).count());
    assert_eq!(10_000, corrected_stall_histogram().iter_linear(10_000).count());
}

#[test]
fn linear_step_wider_than_the_range_still_emits() {
    let mut h = Histogram::<u64>::new_with_max(2, 0).unwrap();
    h.record(1).unwrap();

    let points: Vec<_> = h.iter_linear(1000).collect();
    assert_eq!(1, points.len());
    assert_eq!(1, points[0].count_added_in_step());
    assert_eq!(999, points[0].value_iterated_to());
}

#[test]
fn linear_step_counts_sum_to_total() {
    let h = corrected_stall_histogram();
    let sum: u64 = h.iter_linear(1000).map(|p| p.count_added_in_step()).sum();
    assert_eq!(h.len(), sum);
}

#[test]
fn logarithmic_steps() {
    let mut h = Histogram::<u64>::new_with_max(1000, 3).unwrap();
    h += 100;
    h += 500;
    h += 800;
    h += 850;

    let points: Vec<_> = h.iter_log(1, 10.0).collect();
    assert_eq!(
        vec![0, 9, 99, 999],
        points.iter().map(|p| p.value_iterated_to()).collect::<Vec<_>>()
    );
    assert_eq!(
        vec![0, 0, 0, 4],
        points
            .iter()
            .map(|p| p.count_added_in_step())
            .collect::<Vec<_>>()
    );
}

#[test]
fn logarithmic_walk_over_stall() {
    let h = raw_stall_histogram();
    // doubling from 10 msec: 14 boundaries below the stall slot, plus the
    // step that finally covers it
    assert_eq!(15, h.iter_log(10_000, 2.0).count());
    let sum: u64 = h.iter_log(10_000, 2.0).map(|p| p.count_added_in_step()).sum();
    assert_eq!(h.len(), sum);
}

#[test]
fn log_step_wider_than_the_range_still_emits() {
    let mut h = Histogram::<u64>::new_with_max(2, 0).unwrap();
    h.record(1).unwrap();

    let points: Vec<_> = h.iter_log(1000, 10.0).collect();
    assert_eq!(1, points.len());
    assert_eq!(1, points[0].count_added_in_step());
    assert_eq!(999, points[0].value_iterated_to());
}

#[test]
fn percentile_levels_are_monotonic_and_end_at_100() {
    let h = corrected_stall_histogram();
    let points: Vec<_> = h.iter_percentiles(5).collect();

    let mut prev_level = -1.0_f64;
    let mut prev_value = 0_u64;
    for p in &points {
        assert!(p.percentile_level_iterated_to() >= prev_level);
        assert!(p.value_iterated_to() >= prev_value);
        assert!(p.percentile() >= p.percentile_level_iterated_to() - 1e-9);
        prev_level = p.percentile_level_iterated_to();
        prev_value = p.value_iterated_to();
    }
    let last = points.last().unwrap();
    assert_eq!(100.0, last.percentile_level_iterated_to());
    assert_eq!(h.len(), last.total_count_to_value());
}

#[test]
fn percentile_tick_spacing_halves() {
    let mut h = Histogram::<u64>::new_with_max(10_000, 3).unwrap();
    for v in 1..=10_000 {
        h.record(v).unwrap();
    }

    let levels: Vec<f64> = h
        .iter_percentiles(1)
        .map(|p| p.percentile_level_iterated_to())
        .collect();
    // one tick per half distance: 0, 50, 75, 87.5, ...
    assert_eq!(0.0, levels[0]);
    assert!((levels[1] - 50.0).abs() < 1e-9);
    assert!((levels[2] - 75.0).abs() < 1e-9);
    assert!((levels[3] - 87.5).abs() < 1e-9);
    assert!((levels[4] - 93.75).abs() < 1e-9);
}

#[test]
fn percentile_iteration_of_empty_histogram_is_empty() {
    let h = Histogram::<u64>::new_with_max(10_000, 3).unwrap();
    assert_eq!(0, h.iter_percentiles(5).count());
    assert_eq!(0, h.iter_recorded().count());
    assert_eq!(0, h.iter_linear(100).count());
}

#[test]
fn iterators_are_single_pass() {
    let mut h = Histogram::<u64>::new_with_max(1000, 3).unwrap();
    h += 500;
    let mut iter = h.iter_recorded();
    assert!(iter.next().is_some());
    assert!(iter.next().is_none());
    // once exhausted, stays exhausted
    assert!(iter.next().is_none());
}

#[test]
fn recorded_totals_accumulate() {
    let mut h = Histogram::<u64>::new_with_max(1000, 3).unwrap();
    h.record_n(100, 3).unwrap();
    h.record_n(600, 2).unwrap();

    let points: Vec<_> = h.iter_recorded().collect();
    assert_eq!(3, points[0].total_count_to_value());
    assert_eq!(5, points[1].total_count_to_value());
    assert_eq!(60.0, points[0].percentile());
    assert_eq!(100.0, points[1].percentile());
    // total value accumulates highest-equivalent weighted counts
    assert_eq!(3 * 100, points[0].total_value_to_value());
    assert_eq!(3 * 100 + 2 * 600, points[1].total_value_to_value());
}
