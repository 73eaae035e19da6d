//! Millisecond timestamps and local calendar-day helpers.
//!
//! Everything persisted is Unix milliseconds; day boundaries and the
//! afternoon-dip hour are evaluated in the machine's local time zone.

use chrono::{DateTime, Days, Local, NaiveDate, TimeZone, Timelike, Utc};

/// Current UTC time as Unix milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Local calendar day containing `ms`.
pub fn local_day(ms: i64) -> NaiveDate {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .unwrap_or_default()
        .with_timezone(&Local)
        .date_naive()
}

/// Local hour of day (0..=23) for `ms`.
pub fn local_hour(ms: i64) -> u32 {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .unwrap_or_default()
        .with_timezone(&Local)
        .hour()
}

/// `day` shifted back by `n` days, saturating at the earliest representable date.
pub fn days_before(day: NaiveDate, n: u32) -> NaiveDate {
    day.checked_sub_days(Days::new(u64::from(n)))
        .unwrap_or(NaiveDate::MIN)
}

/// Inclusive millisecond bounds `[start, end]` of a local calendar day.
///
/// DST gaps at midnight resolve to the earliest valid instant.
pub fn day_bounds(day: NaiveDate) -> (i64, i64) {
    let start = local_midnight(day);
    let next = day.succ_opt().map(local_midnight).unwrap_or(i64::MAX);
    (start, next.saturating_sub(1))
}

fn local_midnight(day: NaiveDate) -> i64 {
    let naive = day.and_hms_opt(0, 0, 0).unwrap_or_default();
    match Local.from_local_datetime(&naive).earliest() {
        Some(dt) => dt.timestamp_millis(),
        // Midnight skipped by a DST jump: fall back to the UTC reading.
        None => naive.and_utc().timestamp_millis(),
    }
}
