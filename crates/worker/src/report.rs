use anyhow::Context;
use chrono::Utc;
use pollen_core::config::Settings;
use pollen_core::domain::pollen::PollenData;
use pollen_core::ingest::parse::parse_report;
use pollen_core::transform::Normalizer;
use std::path::Path;

/// Runs a saved copy of the report page through the live parse and normalize path.
pub fn from_html_file(settings: &Settings, path: &Path) -> anyhow::Result<PollenData> {
    let bytes =
        std::fs::read(path).with_context(|| format!("read report html failed: {}", path.display()))?;
    let html = pollen_core::ingest::provider::decode_utf8(&bytes)
        .with_context(|| format!("decode report html failed: {}", path.display()))?;

    let fetched_at = Utc::now();
    let raw = parse_report(&html, fetched_at)
        .with_context(|| format!("parse report html failed: {}", path.display()))?;

    tracing::info!(
        path = %path.display(),
        cedar_rows = raw.cedar.len(),
        skipped_rows = raw.skipped_rows,
        report_date = %raw.report_date,
        "parsed report from file"
    );

    Ok(Normalizer::from_settings(settings).normalize(raw))
}

pub fn render(data: &PollenData, compact: bool) -> anyhow::Result<String> {
    let out = if compact {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    out.context("serialize pollen data failed")
}
