// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{format_duration, runtime_stamp};

#[yare::parameterized(
    zero        = { 0,      "0:00:00" },
    five_secs   = { 5,      "0:00:05" },
    one_minute  = { 60,     "0:01:00" },
    one_hour    = { 3600,   "1:00:00" },
    mixed       = { 3661,   "1:01:01" },
    almost_day  = { 86399,  "23:59:59" },
    one_day     = { 90061,  "1 day, 1:01:01" },
    two_days    = { 172800, "2 days, 0:00:00" },
)]
fn duration(secs: u64, expected: &str) {
    assert_eq!(format_duration(secs), expected);
}

#[test]
fn runtime_stamp_is_wall_clock_plus_sequence() {
    let stamp = runtime_stamp(1_000_123, 7);
    // 1_000_123 ms after the epoch, 123 ms into the second, seq 7
    assert_eq!(stamp, "1970-01-01 00:16:40.123007");
}

#[test]
fn runtime_stamps_in_same_millisecond_differ() {
    let a = runtime_stamp(1_000_000, 1);
    let b = runtime_stamp(1_000_000, 2);
    assert_ne!(a, b);
    assert!(a < b);
}
