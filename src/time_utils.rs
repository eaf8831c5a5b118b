// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time handling.
//!
//! Every "what calendar day is this" decision in the crate goes through this
//! module. Days are always computed in the reader's IANA timezone, never in
//! UTC or server-local time.

use chrono::{DateTime, Days, NaiveDate, NaiveTime, SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;

/// Zone used when a stored or configured timezone name cannot be parsed.
pub const BASELINE_TIMEZONE: Tz = chrono_tz::UTC;

/// Step used to search for the first valid local instant of a day whose
/// midnight was skipped by a DST jump.
const MIDNIGHT_GAP_STEP_MINUTES: i64 = 15;
const MIDNIGHT_GAP_MAX_STEPS: i64 = 24 * 60 / MIDNIGHT_GAP_STEP_MINUTES;

/// Error returned for an unknown IANA timezone identifier.
#[derive(Debug, thiserror::Error)]
#[error("Unknown timezone: {0}")]
pub struct TimezoneError(pub String);

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse an IANA timezone identifier such as `America/Los_Angeles`.
pub fn parse_timezone(name: &str) -> Result<Tz, TimezoneError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| TimezoneError(name.to_string()))
}

/// Parse a timezone, falling back to `fallback` if the name is invalid.
pub fn resolve_timezone(name: &str, fallback: Tz) -> Tz {
    parse_timezone(name).unwrap_or_else(|e| {
        tracing::warn!(
            timezone = name,
            fallback = %fallback,
            error = %e,
            "Invalid timezone, using fallback"
        );
        fallback
    })
}

/// Calendar day of a UTC instant, as seen in `tz`.
pub fn calendar_day(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

/// The current calendar day in `tz`.
pub fn today_in(tz: Tz, now: DateTime<Utc>) -> NaiveDate {
    calendar_day(now, tz)
}

/// Half-open UTC interval `[start, end)` covering `day` in `tz`.
///
/// The interval is 23 or 25 hours long across DST transitions.
pub fn day_bounds_utc(day: NaiveDate, tz: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    (start_of_day(day, tz), start_of_day(next_day(day), tz))
}

/// Signed number of calendar days from `earlier` to `later`.
pub fn days_between(earlier: NaiveDate, later: NaiveDate) -> i64 {
    (later - earlier).num_days()
}

/// Whole hours left before the next local midnight in `tz`.
pub fn hours_remaining_today(now: DateTime<Utc>, tz: Tz) -> i64 {
    let (_, end) = day_bounds_utc(today_in(tz, now), tz);
    (end - now).num_hours()
}

fn next_day(day: NaiveDate) -> NaiveDate {
    day.checked_add_days(Days::new(1)).unwrap_or(NaiveDate::MAX)
}

/// First instant of `day` in `tz`.
///
/// Some zones (e.g. America/Santiago) jump from 23:59 straight to 01:00, so
/// local midnight may not exist; the first valid local time is used instead.
fn start_of_day(day: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let midnight = day.and_time(NaiveTime::MIN);

    (0..=MIDNIGHT_GAP_MAX_STEPS)
        .find_map(|step| {
            let local = midnight + chrono::Duration::minutes(step * MIDNIGHT_GAP_STEP_MINUTES);
            tz.from_local_datetime(&local).earliest()
        })
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| {
            tracing::warn!(
                %day,
                timezone = tz.name(),
                "No valid local time near midnight, using UTC midnight"
            );
            Utc.from_utc_datetime(&midnight)
        })
}
