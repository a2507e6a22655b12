/// Calendar-day boundaries in the configured local zone
use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;

/// Start of `date` in `tz`, as UTC. Usually local midnight; when a DST jump
/// skips midnight the day starts at the transition instead.
pub fn start_of_day(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);

    match tz.from_local_datetime(&midnight) {
        LocalResult::Single(t) | LocalResult::Ambiguous(t, _) => t.with_timezone(&Utc),
        LocalResult::None => {
            // Midnight read with the offset in force before the jump is the transition instant
            let before = tz.offset_from_utc_datetime(&(midnight - Duration::hours(12))).fix();
            Utc.from_utc_datetime(&(midnight - Duration::seconds(before.local_minus_utc() as i64)))
        }
    }
}

/// Exclusive close of the local day `days_ahead` days after `now`
fn close_of_day(now: DateTime<Utc>, tz: &Tz, days_ahead: i64) -> DateTime<Utc> {
    let local_date = now.with_timezone(tz).date_naive();
    start_of_day(tz, local_date + Duration::days(days_ahead + 1))
}

/// Close of today: production figures only exist up to the current day
pub fn end_of_today(now: DateTime<Utc>, tz: &Tz) -> DateTime<Utc> {
    close_of_day(now, tz, 0)
}

/// Close of tomorrow: day-ahead prices are published in advance
pub fn end_of_tomorrow(now: DateTime<Utc>, tz: &Tz) -> DateTime<Utc> {
    close_of_day(now, tz, 1)
}
