pub mod forecast;
pub mod season;

use crate::config::Settings;
use crate::domain::pollen::{
    AllergenCounts, AllergenSeries, CurrentReading, HistoryEntry, PollenData, SecondaryAllergens,
    SourceInfo, SourceKind,
};
use crate::domain::severity::{PollenThresholds, SeverityLevel};
use crate::ingest::types::{RawReport, RawSeriesEntry};
use crate::time::austin;

/// Turns a scraped report into the canonical [`PollenData`].
#[derive(Debug, Clone)]
pub struct Normalizer {
    pub thresholds: PollenThresholds,
    pub source_name: String,
    pub source_url: String,
    pub kind: SourceKind,
}

impl Normalizer {
    pub fn live(thresholds: PollenThresholds, source_name: &str, source_url: &str) -> Self {
        Self {
            thresholds,
            source_name: source_name.to_string(),
            source_url: source_url.to_string(),
            kind: SourceKind::Live,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::live(
            settings.thresholds,
            &settings.source_name,
            &settings.source_url,
        )
    }

    /// Never fails. A report with an empty cedar series (which the scraper does not produce)
    /// normalizes to a zero reading on the report date.
    pub fn normalize(&self, raw: RawReport) -> PollenData {
        let severity = &self.thresholds.severity;

        let latest = raw.cedar.last().copied().unwrap_or(RawSeriesEntry {
            date: raw.report_date,
            count: 0,
        });

        // The report's own label wins over the computed band for the current reading.
        let level = SeverityLevel::from_published(&raw.levels.cedar)
            .unwrap_or_else(|| severity.classify(latest.count));

        let history = raw
            .cedar
            .iter()
            .map(|e| HistoryEntry {
                date: e.date,
                count: e.count,
                level: severity.classify(e.count),
            })
            .collect();

        let latest_count = |series: &[RawSeriesEntry]| series.last().map_or(0, |e| e.count);
        let allergens = AllergenCounts {
            cedar: latest.count,
            elm: latest_count(&raw.elm),
            mold: latest_count(&raw.mold),
            ..AllergenCounts::default()
        };

        let season = season::season_stats(&raw.cedar, &self.thresholds, raw.report_date);
        let forecast = forecast::synthesize(&raw.cedar, austin::local_date(raw.fetched_at), severity);

        PollenData {
            current: CurrentReading {
                count: latest.count,
                level,
                description: level.description().to_string(),
            },
            forecast,
            history,
            allergens,
            secondary: SecondaryAllergens {
                elm: AllergenSeries {
                    history: raw.elm,
                    level: raw.levels.elm,
                },
                mold: AllergenSeries {
                    history: raw.mold,
                    level: raw.levels.mold,
                },
            },
            last_updated: raw.fetched_at,
            season,
            source: SourceInfo {
                name: self.source_name.clone(),
                url: self.source_url.clone(),
                report_date: raw.report_date,
                kind: self.kind,
            },
        }
    }
}
