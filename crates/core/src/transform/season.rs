use crate::domain::pollen::SeasonStats;
use crate::domain::severity::PollenThresholds;
use crate::ingest::types::RawSeriesEntry;
use crate::time::austin;
use chrono::NaiveDate;

/// Season statistics over the primary series. `reference` picks the season window.
pub fn season_stats(
    series: &[RawSeriesEntry],
    thresholds: &PollenThresholds,
    reference: NaiveDate,
) -> SeasonStats {
    let (season_start, season_end) = austin::season_window(reference);

    let peak_count = series.iter().map(|e| e.count).max().unwrap_or(0);
    let avg_count = if series.is_empty() {
        0
    } else {
        let total: u64 = series.iter().map(|e| u64::from(e.count)).sum();
        (total as f64 / series.len() as f64).round() as u32
    };
    let high_days = series.iter().filter(|e| e.count >= thresholds.high).count() as u32;

    SeasonStats {
        peak_count,
        avg_count,
        high_days,
        current_streak: current_streak(series, thresholds.moderate),
        season_start,
        season_end,
    }
}

/// Trailing run of days at or above `threshold`, counted back from the latest day.
pub fn current_streak(series: &[RawSeriesEntry], threshold: u32) -> u32 {
    series
        .iter()
        .rev()
        .take_while(|e| e.count >= threshold)
        .count() as u32
}
