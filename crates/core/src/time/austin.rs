use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Utc};

// Cedar season falls entirely inside US Central standard time (UTC-6).
const CENTRAL_OFFSET_SECS: i32 = -6 * 3600;

const SEASON_START_MONTH: u32 = 12;
const SEASON_START_DAY: u32 = 1;
// Days after the season opens when mountain cedar typically peaks (mid January).
const SEASON_PEAK_OFFSET_DAYS: i64 = 45;

/// Calendar date of `at` in the report's local time.
pub fn local_date(at: DateTime<Utc>) -> NaiveDate {
    match FixedOffset::east_opt(CENTRAL_OFFSET_SECS) {
        Some(central) => at.with_timezone(&central).date_naive(),
        None => at.date_naive(),
    }
}

/// Cedar season (Dec 1 through the last day of February) containing `date`, or the most
/// recent one before it when `date` is off-season.
pub fn season_window(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start_year = if date.month() == SEASON_START_MONTH {
        date.year()
    } else {
        date.year() - 1
    };
    let start =
        NaiveDate::from_ymd_opt(start_year, SEASON_START_MONTH, SEASON_START_DAY).unwrap_or(date);
    let end = NaiveDate::from_ymd_opt(start_year + 1, 3, 1)
        .and_then(|d| d.pred_opt())
        .unwrap_or(date);
    (start, end)
}

/// Expected peak day of the season returned by [`season_window`].
pub fn season_peak(date: NaiveDate) -> NaiveDate {
    let (start, _) = season_window(date);
    start + Duration::days(SEASON_PEAK_OFFSET_DAYS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn local_date_lags_utc_in_the_evening() {
        // 2026-01-08 03:00 UTC = 2026-01-07 21:00 CST
        let at = Utc.with_ymd_and_hms(2026, 1, 8, 3, 0, 0).unwrap();
        assert_eq!(local_date(at), d(2026, 1, 7));

        let noon = Utc.with_ymd_and_hms(2026, 1, 8, 18, 0, 0).unwrap();
        assert_eq!(local_date(noon), d(2026, 1, 8));
    }

    #[test]
    fn season_window_spans_new_year() {
        assert_eq!(season_window(d(2026, 1, 15)), (d(2025, 12, 1), d(2026, 2, 28)));
        assert_eq!(season_window(d(2025, 12, 20)), (d(2025, 12, 1), d(2026, 2, 28)));
        // Leap year February.
        assert_eq!(season_window(d(2028, 2, 10)), (d(2027, 12, 1), d(2028, 2, 29)));
        assert_eq!(season_window(d(2025, 12, 1)), (d(2025, 12, 1), d(2026, 2, 28)));
    }

    #[test]
    fn off_season_uses_preceding_season() {
        for date in [d(2026, 3, 1), d(2026, 7, 4), d(2026, 10, 17), d(2026, 11, 30)] {
            let (start, end) = season_window(date);
            assert_eq!((start, end), (d(2025, 12, 1), d(2026, 2, 28)), "{date}");
            assert!(start <= date);
        }
    }

    #[test]
    fn peak_is_mid_january() {
        assert_eq!(season_peak(d(2026, 2, 1)), d(2026, 1, 15));
        assert_eq!(season_peak(d(2026, 12, 2)), d(2027, 1, 15));
    }
}
