//! Deterministic synthetic dataset used when the live report is unavailable.
//!
//! Counts are a pure function of the calendar date: a bell curve around the mid-January
//! cedar peak, shaped by the same oscillating day factor the forecast uses. The result goes
//! through [`Normalizer`] so season statistics and forecast are computed exactly as for live
//! data.

use crate::domain::pollen::{PollenData, SourceKind};
use crate::domain::severity::PollenThresholds;
use crate::ingest::types::{PublishedLevels, RawReport, RawSeriesEntry};
use crate::time::austin;
use crate::transform::forecast::day_factor;
use crate::transform::Normalizer;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

pub const SYNTHETIC_SOURCE_NAME: &str = "Synthetic seasonal model";

/// Days of history ending today (inclusive).
pub const HISTORY_DAYS: i64 = 30;

const CEDAR_PEAK: f64 = 4200.0;
const CEDAR_SPREAD_DAYS: f64 = 20.0;
const CEDAR_FLOOR: f64 = 15.0;

// Elm follows cedar by a few weeks and stays much lower.
const ELM_LAG_DAYS: i64 = 26;
const ELM_PEAK: f64 = 350.0;
const ELM_SPREAD_DAYS: f64 = 12.0;
const ELM_FLOOR: f64 = 2.0;

const MOLD_BASE: f64 = 900.0;
const MOLD_SWING: f64 = 500.0;

pub fn generate(thresholds: &PollenThresholds) -> PollenData {
    generate_at(Utc::now(), thresholds)
}

/// Synthetic dataset as of `now`. Same date in, same series out.
pub fn generate_at(now: DateTime<Utc>, thresholds: &PollenThresholds) -> PollenData {
    let normalizer = Normalizer {
        thresholds: *thresholds,
        source_name: SYNTHETIC_SOURCE_NAME.to_string(),
        source_url: String::new(),
        kind: SourceKind::Synthetic,
    };
    normalizer.normalize(synthetic_report(now))
}

fn synthetic_report(now: DateTime<Utc>) -> RawReport {
    let today = austin::local_date(now);
    let dates: Vec<NaiveDate> = (0..HISTORY_DAYS)
        .rev()
        .map(|back| today - Duration::days(back))
        .collect();

    let series = |count: fn(NaiveDate) -> u32| {
        dates
            .iter()
            .map(|&date| RawSeriesEntry {
                date,
                count: count(date),
            })
            .collect::<Vec<_>>()
    };

    RawReport {
        cedar: series(cedar_count),
        elm: series(elm_count),
        mold: series(mold_count),
        levels: PublishedLevels::default(),
        report_date: today,
        fetched_at: now,
        skipped_rows: 0,
    }
}

fn bell(date: NaiveDate, peak: NaiveDate, height: f64, spread_days: f64, floor: f64) -> f64 {
    let offset = (date - peak).num_days() as f64 / spread_days;
    floor + height * (-offset * offset / 2.0).exp()
}

fn shaped(value: f64, date: NaiveDate) -> u32 {
    (value * day_factor(f64::from(date.num_days_from_ce())))
        .round()
        .max(0.0) as u32
}

/// Peak of the season before or after `date`, whichever is closer, so the curve has no
/// jump where one season window hands over to the next.
fn nearest_peak(date: NaiveDate) -> NaiveDate {
    let last = austin::season_peak(date);
    let next = last.with_year(last.year() + 1).unwrap_or(last);
    if (next - date).num_days().abs() < (date - last).num_days().abs() {
        next
    } else {
        last
    }
}

fn cedar_count(date: NaiveDate) -> u32 {
    let peak = nearest_peak(date);
    shaped(bell(date, peak, CEDAR_PEAK, CEDAR_SPREAD_DAYS, CEDAR_FLOOR), date)
}

fn elm_count(date: NaiveDate) -> u32 {
    let peak = nearest_peak(date) + Duration::days(ELM_LAG_DAYS);
    shaped(bell(date, peak, ELM_PEAK, ELM_SPREAD_DAYS, ELM_FLOOR), date)
}

fn mold_count(date: NaiveDate) -> u32 {
    let wave = (f64::from(date.ordinal()) / 9.0).sin();
    shaped(MOLD_BASE + MOLD_SWING * wave, date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::forecast::FORECAST_DAYS;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 16, 0, 0).unwrap()
    }

    #[test]
    fn same_day_is_bit_identical() {
        let t = PollenThresholds::default();
        let a = generate_at(at(2026, 1, 12), &t);
        let b = generate_at(at(2026, 1, 12), &t);
        assert_eq!(a, b);
    }

    #[test]
    fn full_dataset_shape() {
        let t = PollenThresholds::default();
        let data = generate_at(at(2026, 1, 12), &t);

        assert_eq!(data.history.len(), HISTORY_DAYS as usize);
        assert_eq!(data.forecast.len(), FORECAST_DAYS as usize);
        assert_eq!(data.source.kind, SourceKind::Synthetic);
        assert_eq!(data.source.name, SYNTHETIC_SOURCE_NAME);
        assert_eq!(data.source.report_date, NaiveDate::from_ymd_opt(2026, 1, 12).unwrap());
        assert_eq!(data.history.last().map(|h| h.count), Some(data.current.count));
        assert!(data.history.windows(2).all(|w| w[0].date < w[1].date));
        for entry in &data.history {
            assert_eq!(entry.level, t.severity.classify(entry.count));
        }
    }

    #[test]
    fn peak_season_is_heavier_than_shoulder() {
        let t = PollenThresholds::default();
        let peak = generate_at(at(2026, 1, 20), &t);
        let shoulder = generate_at(at(2026, 4, 20), &t);
        assert!(peak.season.avg_count > shoulder.season.avg_count * 10);
        assert!(peak.season.high_days > 0);
        assert_eq!(shoulder.season.high_days, 0);
    }

    #[test]
    fn never_fails_across_a_whole_year() {
        let t = PollenThresholds::default();
        let start = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
        for offset in 0..366 {
            let date = start + Duration::days(offset);
            let now = Utc.from_utc_datetime(&date.and_hms_opt(18, 0, 0).unwrap());
            let data = generate_at(now, &t);
            assert_eq!(data.history.len(), HISTORY_DAYS as usize);
            assert_eq!(data.forecast.len(), FORECAST_DAYS as usize);
        }
    }

    #[test]
    fn cedar_curve_aims_at_the_nearest_peak() {
        let upcoming = NaiveDate::from_ymd_opt(2027, 1, 15).unwrap();
        assert_eq!(nearest_peak(NaiveDate::from_ymd_opt(2026, 11, 30).unwrap()), upcoming);
        assert_eq!(nearest_peak(NaiveDate::from_ymd_opt(2026, 12, 1).unwrap()), upcoming);
        assert_eq!(
            nearest_peak(NaiveDate::from_ymd_opt(2026, 11, 20).unwrap()),
            NaiveDate::from_ymd_opt(2027, 1, 15).unwrap()
        );
        assert_eq!(
            nearest_peak(NaiveDate::from_ymd_opt(2026, 4, 20).unwrap()),
            NaiveDate::from_ymd_opt(2026, 1, 15).unwrap()
        );
    }

    #[test]
    fn normalizing_mock_series_reproduces_derivations() {
        let t = PollenThresholds::default();
        let data = generate_at(at(2026, 1, 12), &t);

        let raw = RawReport {
            cedar: data
                .history
                .iter()
                .map(|h| RawSeriesEntry {
                    date: h.date,
                    count: h.count,
                })
                .collect(),
            elm: data.secondary.elm.history.clone(),
            mold: data.secondary.mold.history.clone(),
            levels: PublishedLevels::default(),
            report_date: data.source.report_date,
            fetched_at: data.last_updated,
            skipped_rows: 0,
        };
        let again = Normalizer::live(t, "Round trip", "https://example.test").normalize(raw);

        assert_eq!(again.season, data.season);
        assert_eq!(again.forecast, data.forecast);
        assert_eq!(again.current, data.current);
    }
}
