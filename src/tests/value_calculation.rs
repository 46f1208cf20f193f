use crate::tests::helpers::histo64;

#[test]
fn equivalent_ranges_at_unit_magnitude_0() {
    let h = histo64(1, 3_600_000_000, 3);
    assert_eq!(1, h.equivalent_range(1));
    assert_eq!(1, h.equivalent_range(2047));
    assert_eq!(2, h.equivalent_range(2048));
    assert_eq!(2, h.equivalent_range(2500));
    assert_eq!(4, h.equivalent_range(8191));
    assert_eq!(8, h.equivalent_range(8192));
    assert_eq!(8, h.equivalent_range(10000));
}

#[test]
fn lowest_equivalent_values() {
    let h = histo64(1, 3_600_000_000, 3);
    assert_eq!(10000, h.lowest_equivalent(10007));
    assert_eq!(10008, h.lowest_equivalent(10009));
}

#[test]
fn highest_equivalent_values() {
    let h = histo64(1024, 3_600_000_000 * 1024, 3);
    assert_eq!(8183 * 1024 + 1023, h.highest_equivalent(8180 * 1024));
    assert_eq!(8191 * 1024 + 1023, h.highest_equivalent(8191 * 1024));
    assert_eq!(8199 * 1024 + 1023, h.highest_equivalent(8193 * 1024));
    assert_eq!(9999 * 1024 + 1023, h.highest_equivalent(9995 * 1024));
    assert_eq!(10007 * 1024 + 1023, h.highest_equivalent(10007 * 1024));
    assert_eq!(10015 * 1024 + 1023, h.highest_equivalent(10008 * 1024));
}

#[test]
fn median_equivalent_values() {
    let h = histo64(1, 3_600_000_000, 3);
    assert_eq!(4, h.median_equivalent(4));
    assert_eq!(5, h.median_equivalent(5));
    assert_eq!(4001, h.median_equivalent(4000));
    assert_eq!(8002, h.median_equivalent(8000));
    assert_eq!(10004, h.median_equivalent(10007));
}

#[test]
fn median_equivalent_values_scaled() {
    let h = histo64(1024, 3_600_000_000 * 1024, 3);
    assert_eq!(4 * 1024 + 512, h.median_equivalent(4 * 1024));
}

#[test]
fn scaled_equivalent_ranges() {
    let h = histo64(1024, 3_600_000_000, 3);
    assert_eq!(8 * 1024, h.equivalent_range(10000 * 1024));
    assert_eq!(10000 * 1024, h.lowest_equivalent(10007 * 1024));
}

#[test]
fn equivalence_is_transitive() {
    let h = histo64(1, 3_600_000_000, 3);
    for &(a, b, c) in &[(10000_u64, 10003_u64, 10007_u64), (2048, 2049, 2049), (4, 4, 4)] {
        if h.equivalent(a, b) && h.equivalent(b, c) {
            assert!(h.equivalent(a, c));
        }
    }
}

#[test]
fn relative_error_bound_holds() {
    let h = histo64(1, 3_600_000_000, 3);
    let mut value = 1_u64;
    while value <= 3_600_000_000 {
        let range = h.equivalent_range(value) as f64;
        assert!(
            range <= value as f64 * 2.0 * 10_f64.powi(-3) + 1.0,
            "range {} too wide at {}",
            range,
            value
        );
        value = value.saturating_mul(7) / 2 + 1;
    }
}
