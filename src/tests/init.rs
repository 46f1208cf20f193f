use crate::tests::helpers::histo64;

#[test]
fn layout_for_three_digits_unit_range() {
    let h = histo64(1, 1_u64 << 32, 3);
    // 2 * 10^3 rounds up to 2^11 sub-buckets
    assert_eq!(2048, h.sub_bucket_count());
    assert_eq!(23, h.bucket_count());
    assert_eq!(24 * 1024, h.distinct_values());
}

#[test]
fn layout_for_scaled_unit() {
    let h = histo64(1 << 12, 1_u64 << 32, 3);
    assert_eq!(2048, h.sub_bucket_count());
    assert_eq!(0, h.layout().bucket_index_of(3 << 12));
    // bucket 0 tops out below 2048 << 12 = 2^23; reaching 2^32 takes 11 buckets
    assert_eq!(11, h.bucket_count());
}

#[test]
fn layout_for_zero_digits() {
    let h = histo64(1, 1000, 0);
    // single-unit resolution to 2, rounded to the minimum of 2 sub-buckets
    assert_eq!(2, h.sub_bucket_count());
}

#[test]
fn configuration_read_outs() {
    let h = histo64(1000, 3_600_000_000, 3);
    assert_eq!(1000, h.lowest_discernible_value());
    assert_eq!(3_600_000_000, h.highest_trackable_value());
    assert_eq!(3, h.significant_digits());
}
