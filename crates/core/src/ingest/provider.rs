use crate::config::Settings;
use crate::ingest::error::ScrapeError;
use crate::ingest::parse::parse_report;
use crate::ingest::types::RawReport;
use anyhow::{Context, Result};
use chrono::Utc;
use encoding_rs::UTF_8;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use std::time::Duration;

/// Something that can produce one raw report per call. No retries: retry policy lives with
/// the caller.
#[async_trait::async_trait]
pub trait ReportSource: Send + Sync {
    fn source_name(&self) -> &str;

    fn source_url(&self) -> &str;

    async fn fetch_report(&self) -> Result<RawReport>;
}

/// Scrapes the published HTML report with a single GET.
#[derive(Debug, Clone)]
pub struct HttpReportSource {
    http: reqwest::Client,
    url: String,
    name: String,
}

impl HttpReportSource {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&settings.user_agent).context("invalid POLLEN_USER_AGENT")?,
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml"),
        );

        let http = reqwest::Client::builder()
            .timeout(settings.fetch_timeout)
            .connect_timeout(settings.fetch_timeout.min(Duration::from_secs(5)))
            .default_headers(headers)
            .build()
            .context("failed to build report http client")?;

        Ok(Self {
            http,
            url: settings.source_url.clone(),
            name: settings.source_name.clone(),
        })
    }

    async fn fetch_html(&self) -> Result<String, ScrapeError> {
        let res = self.http.get(&self.url).send().await.map_err(|err| {
            let detail = if err.is_timeout() {
                format!("timed out: {err}")
            } else {
                err.to_string()
            };
            ScrapeError::fetch(&self.url, detail)
        })?;

        let status = res.status();
        if !status.is_success() {
            return Err(ScrapeError::fetch(&self.url, format!("HTTP {status}")));
        }

        let bytes = res
            .bytes()
            .await
            .map_err(|err| ScrapeError::fetch(&self.url, format!("failed to read body: {err}")))?;

        decode_utf8(&bytes)
    }
}

#[async_trait::async_trait]
impl ReportSource for HttpReportSource {
    fn source_name(&self) -> &str {
        &self.name
    }

    fn source_url(&self) -> &str {
        &self.url
    }

    async fn fetch_report(&self) -> Result<RawReport> {
        let fetched_at = Utc::now();
        let html = self.fetch_html().await?;
        let report = parse_report(&html, fetched_at)?;

        tracing::info!(
            url = %self.url,
            report_date = %report.report_date,
            cedar_days = report.cedar.len(),
            elm_days = report.elm.len(),
            mold_days = report.mold.len(),
            skipped_rows = report.skipped_rows,
            "pollen report scraped"
        );
        Ok(report)
    }
}

/// The report must be UTF-8; anything else is treated as an unrecognised document.
pub fn decode_utf8(bytes: &[u8]) -> Result<String, ScrapeError> {
    let body = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    UTF_8
        .decode_without_bom_handling_and_without_replacement(body)
        .map(|text| text.into_owned())
        .ok_or_else(|| ScrapeError::parse("decode", "response body is not valid UTF-8"))
}
