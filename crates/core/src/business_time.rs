//! Business-timezone time arithmetic.
//!
//! Every appointment-facing and ERP-facing computation is anchored to the
//! fixed business timezone, never server-local time or naive UTC. All
//! functions here are pure: they take and return UTC instants and do the
//! local-calendar reasoning internally.

use chrono::{DateTime, Datelike, Duration, LocalResult, Months, NaiveDate, TimeZone, Timelike, Utc, Weekday};
use chrono_tz::Tz;

/// The fixed business timezone for all human-facing scheduling.
pub const BUSINESS_TZ: Tz = chrono_tz::America::Denver;

/// Local wall-clock hour at which outbound notifications stop for the night.
pub const QUIET_HOURS_START: u32 = 21;
/// Local wall-clock hour at which outbound notifications resume.
pub const QUIET_HOURS_END: u32 = 7;

/// Default local hour used as the ERP delta-sync watermark.
pub const DEFAULT_WINDOW_START_HOUR: u32 = 3;

fn to_local(instant: DateTime<Utc>) -> DateTime<Tz> {
    instant.with_timezone(&BUSINESS_TZ)
}

/// Resolve a local wall-clock time to a UTC instant. Ambiguous local times
/// (DST fall-back) take the earlier instant; times inside a DST spring-forward
/// gap resolve to the first valid instant after the gap.
fn local_to_utc(date: NaiveDate, hour: u32, minute: u32) -> DateTime<Utc> {
    let mut naive = date
        .and_hms_opt(hour, minute, 0)
        .unwrap_or_else(|| panic!("invalid wall clock literal {hour:02}:{minute:02}"));
    loop {
        match BUSINESS_TZ.from_local_datetime(&naive) {
            LocalResult::Single(dt) => return dt.with_timezone(&Utc),
            LocalResult::Ambiguous(earlier, _) => return earlier.with_timezone(&Utc),
            LocalResult::None => {
                // Inside a DST gap; step forward until the wall clock exists.
                naive += Duration::minutes(15);
            }
        }
    }
}

/// 00:00:00 local business time on the calendar day containing `instant`.
pub fn start_of_business_day(instant: DateTime<Utc>) -> DateTime<Utc> {
    local_to_utc(to_local(instant).date_naive(), 0, 0)
}

/// `start_of_business_day(instant)` minus exactly one calendar year.
/// Feb-29 clamps to Feb-28 via calendar subtraction, not day counting.
pub fn one_business_year_ago(instant: DateTime<Utc>) -> DateTime<Utc> {
    let today = to_local(instant).date_naive();
    let cutoff_date = today
        .checked_sub_months(Months::new(12))
        .unwrap_or(today);
    local_to_utc(cutoff_date, 0, 0)
}

/// The most recent past occurrence of `hour`:00 local time on-or-before
/// `instant`. If the local hour is earlier than `hour`, rolls back to the
/// previous calendar day. Used as the ERP delta-sync watermark.
pub fn business_day_window_start(instant: DateTime<Utc>, hour: u32) -> DateTime<Utc> {
    let local = to_local(instant);
    let mut date = local.date_naive();
    if local.hour() < hour {
        date -= Duration::days(1);
    }
    local_to_utc(date, hour, 0)
}

/// Same local wall-clock time on the previous local calendar day. Across a
/// DST transition this is 23 or 25 real hours, which is what "one day
/// before" means to a customer reading the reminder.
pub fn same_local_time_previous_day(instant: DateTime<Utc>) -> DateTime<Utc> {
    let local = to_local(instant);
    local_to_utc(
        local.date_naive() - Duration::days(1),
        local.hour(),
        local.minute(),
    )
}

/// True when `instant` falls inside the nightly quiet window
/// (local hour >= 21 or < 7).
pub fn is_quiet_hours(instant: DateTime<Utc>) -> bool {
    let hour = to_local(instant).hour();
    hour >= QUIET_HOURS_START || hour < QUIET_HOURS_END
}

/// Identity outside quiet hours; otherwise the next 07:00 local time.
/// Late-evening instants advance to the next calendar day, post-midnight
/// instants resolve to 07:00 the same day.
pub fn next_allowed_instant(instant: DateTime<Utc>) -> DateTime<Utc> {
    let local = to_local(instant);
    if !is_quiet_hours(instant) {
        return instant;
    }
    let date = if local.hour() >= QUIET_HOURS_START {
        local.date_naive() + Duration::days(1)
    } else {
        local.date_naive()
    };
    local_to_utc(date, QUIET_HOURS_END, 0)
}

/// Walk backward one calendar day at a time, skipping Saturday and Sunday
/// (business-timezone weekdays), landing on 09:00 local time.
pub fn previous_business_day_at_9am(instant: DateTime<Utc>) -> DateTime<Utc> {
    let mut date = to_local(instant).date_naive() - Duration::days(1);
    while matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
        date -= Duration::days(1);
    }
    local_to_utc(date, 9, 0)
}
