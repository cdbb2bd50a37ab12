// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting and day boundaries.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Format a UTC timestamp as RFC3339 with millisecond precision.
pub fn format_utc_rfc3339_millis(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse an IANA zone name such as `Europe/Berlin`.
pub fn parse_time_zone(name: &str) -> Option<Tz> {
    name.parse::<Tz>().ok()
}

/// First and last millisecond of `date` in `tz`, as UTC instants.
///
/// The window is `[00:00:00.000, 23:59:59.999]` local time. When local
/// midnight falls in a DST gap the day starts at the first instant after it.
pub fn day_bounds(date: NaiveDate, tz: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let start_local = date.and_time(NaiveTime::MIN);
    let end_local = date.and_time(NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN));

    let start = resolve_local(tz, start_local, true);
    let end = resolve_local(tz, end_local, false);
    (start, end)
}

fn resolve_local(tz: Tz, local: NaiveDateTime, earliest: bool) -> DateTime<Utc> {
    let mapped = tz.from_local_datetime(&local);
    let resolved = if earliest {
        mapped.earliest()
    } else {
        mapped.latest()
    };

    match resolved {
        Some(dt) => dt.with_timezone(&Utc),
        // Skipped local time: step forward out of the gap (gaps are at most
        // a few hours).
        None => (1..=24)
            .find_map(|step| {
                tz.from_local_datetime(&(local + Duration::minutes(15 * step)))
                    .earliest()
            })
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| local.and_utc()),
    }
}
