//! Five-day look-ahead extrapolated from recent history.
//!
//! This is a smoothed, bounded extrapolation meant to look plausible, not a statistical
//! forecast: the last count is blended with the recent mean and shaped by a sinusoidal day
//! factor. Weather fields use fixed shaping as well.

use crate::domain::pollen::ForecastDay;
use crate::domain::severity::SeverityThresholds;
use crate::ingest::types::RawSeriesEntry;
use chrono::{Duration, NaiveDate};

pub const FORECAST_DAYS: u32 = 5;

const MIN_HISTORY: usize = 3;
const RECENT_WINDOW: usize = 5;
const LAST_WEIGHT: f64 = 0.6;
const RECENT_WEIGHT: f64 = 0.4;

/// Oscillating multiplier centred near 1.0, bounded to `[0.4, 1.2]`.
pub fn day_factor(x: f64) -> f64 {
    0.8 + (x * 1.3).sin() * 0.4
}

/// Days `start + 1 ..= start + 5`. Empty when fewer than three history entries exist.
pub fn synthesize(
    history: &[RawSeriesEntry],
    start: NaiveDate,
    thresholds: &SeverityThresholds,
) -> Vec<ForecastDay> {
    if history.len() < MIN_HISTORY {
        return Vec::new();
    }

    let recent = &history[history.len().saturating_sub(RECENT_WINDOW)..];
    let avg_recent =
        recent.iter().map(|e| f64::from(e.count)).sum::<f64>() / recent.len() as f64;
    let last_count = history.last().map_or(0.0, |e| f64::from(e.count));
    let baseline = last_count * LAST_WEIGHT + avg_recent * RECENT_WEIGHT;

    (1..=FORECAST_DAYS)
        .map(|i| {
            let x = f64::from(i);
            let date = start + Duration::days(i64::from(i));
            let count = (baseline * day_factor(x)).round().max(0.0) as u32;

            ForecastDay {
                date,
                day_name: date.format("%a").to_string(),
                level: thresholds.classify(count),
                count,
                high_temp: 55 + (x.sin() * 10.0).round() as i32,
                low_temp: 35 + (x.cos() * 8.0).round() as i32,
                condition: "Partly Cloudy".to_string(),
                humidity: 50,
                wind_speed: 10,
            }
        })
        .collect()
}
