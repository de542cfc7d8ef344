// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime timestamp strings and duration formatting

use chrono::DateTime;

/// Build the human-readable runtime identifier for a run activation.
///
/// The wall-clock part comes from `epoch_ms`; the final three digits of the
/// microsecond field carry `seq` so that runs started within the same
/// millisecond still get distinct, monotonically increasing runtimes.
pub fn runtime_stamp(epoch_ms: u64, seq: u64) -> String {
    let secs = (epoch_ms / 1000) as i64;
    let micros = (epoch_ms % 1000) * 1000 + seq % 1000;
    let base = DateTime::from_timestamp(secs, 0).unwrap_or_default();
    format!("{}.{:06}", base.format("%Y-%m-%d %H:%M:%S"), micros)
}

/// Format a duration in whole seconds as `H:MM:SS`, with a day prefix once
/// it exceeds 24 hours (`1 day, 0:00:00`).
pub fn format_duration(total_secs: u64) -> String {
    let days = total_secs / 86_400;
    let rem = total_secs % 86_400;
    let (hours, minutes, seconds) = (rem / 3600, rem % 3600 / 60, rem % 60);
    let clock = format!("{}:{:02}:{:02}", hours, minutes, seconds);
    match days {
        0 => clock,
        1 => format!("1 day, {}", clock),
        n => format!("{} days, {}", n, clock),
    }
}

#[cfg(test)]
#[path = "time_fmt_tests.rs"]
mod tests;
