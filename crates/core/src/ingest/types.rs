use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSeriesEntry {
    pub date: NaiveDate,
    pub count: u32,
}

/// Level labels exactly as the report publishes them. Empty when absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedLevels {
    pub cedar: String,
    pub elm: String,
    pub mold: String,
}

/// One scrape of the upstream report. Each series is sorted by date with unique dates;
/// `cedar` is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawReport {
    pub cedar: Vec<RawSeriesEntry>,
    pub elm: Vec<RawSeriesEntry>,
    pub mold: Vec<RawSeriesEntry>,
    pub levels: PublishedLevels,
    pub report_date: NaiveDate,
    pub fetched_at: DateTime<Utc>,
    /// Data rows dropped because their date or a count could not be parsed.
    pub skipped_rows: usize,
}
