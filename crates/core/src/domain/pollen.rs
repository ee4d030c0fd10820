use crate::domain::severity::SeverityLevel;
use crate::ingest::types::RawSeriesEntry;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Number of trailing history days carried by [`PollenSummary::trend`].
pub const SUMMARY_TREND_DAYS: usize = 7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollenData {
    pub current: CurrentReading,
    pub forecast: Vec<ForecastDay>,
    pub history: Vec<HistoryEntry>,
    pub allergens: AllergenCounts,
    pub secondary: SecondaryAllergens,
    pub last_updated: DateTime<Utc>,
    pub season: SeasonStats,
    pub source: SourceInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentReading {
    pub count: u32,
    pub level: SeverityLevel,
    pub description: String,
}

/// Synthesized look-ahead day. Weather fields are fixed shaping, not a provider forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastDay {
    pub date: NaiveDate,
    pub day_name: String,
    pub level: SeverityLevel,
    pub count: u32,
    pub high_temp: i32,
    pub low_temp: i32,
    pub condition: String,
    pub humidity: u32,
    pub wind_speed: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub date: NaiveDate,
    pub count: u32,
    pub level: SeverityLevel,
}

/// Latest count per allergen. The report does not track oak, grass or ragweed; those stay 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllergenCounts {
    pub cedar: u32,
    pub elm: u32,
    pub mold: u32,
    pub oak: u32,
    pub grass: u32,
    pub ragweed: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryAllergens {
    pub elm: AllergenSeries,
    pub mold: AllergenSeries,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllergenSeries {
    pub history: Vec<RawSeriesEntry>,
    /// Level label as published; empty when the report gave none.
    pub level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonStats {
    pub peak_count: u32,
    pub avg_count: u32,
    pub high_days: u32,
    pub current_streak: u32,
    pub season_start: NaiveDate,
    pub season_end: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Live,
    Synthetic,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Live => "live",
            SourceKind::Synthetic => "synthetic",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceInfo {
    pub name: String,
    pub url: String,
    pub report_date: NaiveDate,
    pub kind: SourceKind,
}

/// Compact view for the social-preview renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollenSummary {
    pub count: u32,
    pub level: SeverityLevel,
    pub description: String,
    pub color: String,
    pub trend: Vec<RawSeriesEntry>,
    pub kind: SourceKind,
}

impl PollenData {
    pub fn summary(&self) -> PollenSummary {
        let start = self.history.len().saturating_sub(SUMMARY_TREND_DAYS);
        PollenSummary {
            count: self.current.count,
            level: self.current.level,
            description: self.current.description.clone(),
            color: self.current.level.color().to_string(),
            trend: self.history[start..]
                .iter()
                .map(|h| RawSeriesEntry {
                    date: h.date,
                    count: h.count,
                })
                .collect(),
            kind: self.source.kind,
        }
    }
}
