//! Local calendar helpers. The poem of the day changes with the local date of
//! the configured timezone, not with UTC.

use chrono::{DateTime, NaiveDate, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

pub fn date_in(now: DateTime<Utc>, tz: Tz) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

pub fn today_in(tz: Tz) -> NaiveDate {
    date_in(Utc::now(), tz)
}

/// `YYYY-MM-DD`
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Whether the local hour at `now` is one of `hours`.
///
/// Two hours are usually configured so that a single fixed UTC trigger lands
/// in the window both in winter and in summer time.
pub fn in_publish_window(now: DateTime<Utc>, tz: Tz, hours: &[u32]) -> bool {
    hours.contains(&now.with_timezone(&tz).hour())
}

/// Start of the earliest publish hour of `date`, local time. `None` when no
/// hour is configured or that local time does not exist.
pub fn window_start(date: NaiveDate, tz: Tz, hours: &[u32]) -> Option<DateTime<Utc>> {
    let hour = hours.iter().copied().min()?;
    let local = date.and_hms_opt(hour, 0, 0)?;
    tz.from_local_datetime(&local)
        .earliest()
        .map(|at| at.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Europe::Paris;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_local_date_crosses_midnight() {
        let now = utc(2024, 12, 31, 23, 30);
        assert_eq!(
            date_in(now, Paris),
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
        );
        assert_eq!(format_date(date_in(now, Paris)), "2025-01-01");
        assert_eq!(format_date(date_in(now, chrono_tz::UTC)), "2024-12-31");
    }

    #[test]
    fn test_fixed_utc_trigger_hits_window_all_year() {
        let hours = [15, 16];
        // 14:00 UTC is 15h in winter and 16h in summer
        assert!(in_publish_window(utc(2025, 1, 15, 14, 0), Paris, &hours));
        assert!(in_publish_window(utc(2025, 7, 15, 14, 0), Paris, &hours));
    }

    #[test]
    fn test_outside_window() {
        let hours = [15, 16];
        assert!(!in_publish_window(utc(2025, 1, 15, 13, 0), Paris, &hours));
        assert!(!in_publish_window(utc(2025, 7, 15, 15, 0), Paris, &hours));
        assert!(!in_publish_window(utc(2025, 7, 15, 14, 0), Paris, &[]));
    }

    #[test]
    fn test_window_start_follows_daylight_saving() {
        let winter = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        let summer = NaiveDate::from_ymd_opt(2025, 7, 15).unwrap();

        assert_eq!(window_start(winter, Paris, &[16, 15]), Some(utc(2025, 1, 15, 14, 0)));
        assert_eq!(window_start(summer, Paris, &[15, 16]), Some(utc(2025, 7, 15, 13, 0)));
        assert_eq!(window_start(winter, Paris, &[]), None);
    }
}
