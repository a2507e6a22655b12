/// Fetch window planning per series
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::time::{end_of_today, end_of_tomorrow};
use crate::types::{FetchWindow, Series};

/// Window `[resume, end)` where `end` is the close of tomorrow for prices
/// and the close of today for production, in the local zone `tz`.
pub fn plan_window(series: Series, resume: DateTime<Utc>, now: DateTime<Utc>, tz: &Tz) -> FetchWindow {
    let end = match series {
        Series::MarketPrice => end_of_tomorrow(now, tz),
        Series::Production => end_of_today(now, tz),
    };
    FetchWindow::new(resume, end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use chrono_tz::Europe::Berlin;

    #[test]
    fn test_price_window_ends_tomorrow() {
        let now = Utc.with_ymd_and_hms(2025, 1, 15, 10, 30, 0).unwrap();
        let resume = now - Duration::days(1);

        let window = plan_window(Series::MarketPrice, resume, now, &Berlin);
        assert_eq!(window.start, resume);
        assert_eq!(window.end, Utc.with_ymd_and_hms(2025, 1, 16, 23, 0, 0).unwrap());
    }

    #[test]
    fn test_production_window_ends_today() {
        let now = Utc.with_ymd_and_hms(2025, 1, 15, 10, 30, 0).unwrap();
        let resume = now - Duration::days(1);

        let window = plan_window(Series::Production, resume, now, &Berlin);
        assert_eq!(window.end, Utc.with_ymd_and_hms(2025, 1, 15, 23, 0, 0).unwrap());
        assert!(!window.is_empty());
    }

    #[test]
    fn test_resume_past_end_gives_empty_window() {
        let now = Utc.with_ymd_and_hms(2025, 1, 15, 10, 30, 0).unwrap();
        let resume = Utc.with_ymd_and_hms(2025, 1, 15, 23, 0, 0).unwrap() + Duration::nanoseconds(1);

        assert!(plan_window(Series::Production, resume, now, &Berlin).is_empty());
        assert!(!plan_window(Series::MarketPrice, resume, now, &Berlin).is_empty());
    }
}
