use std::fmt;

/// Why a scrape produced no report. Travels inside `anyhow::Error`; classify with
/// `err.downcast_ref::<ScrapeError>()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeError {
    /// Upstream unreachable, timed out, or answered with a non-success status.
    Fetch { url: String, detail: String },
    /// The document did not match the expected report structure.
    Parse { stage: &'static str, detail: String },
}

impl ScrapeError {
    pub fn fetch(url: &str, detail: impl Into<String>) -> Self {
        ScrapeError::Fetch {
            url: url.to_string(),
            detail: detail.into(),
        }
    }

    pub fn parse(stage: &'static str, detail: impl Into<String>) -> Self {
        ScrapeError::Parse {
            stage,
            detail: detail.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ScrapeError::Fetch { .. } => "fetch",
            ScrapeError::Parse { .. } => "parse",
        }
    }
}

impl fmt::Display for ScrapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScrapeError::Fetch { url, detail } => {
                write!(f, "report fetch failed (url={url}): {detail}")
            }
            ScrapeError::Parse { stage, detail } => {
                write!(f, "report parse failed (stage={stage}): {detail}")
            }
        }
    }
}

impl std::error::Error for ScrapeError {}

/// Short failure label for logs: `fetch`, `parse`, or `other`.
pub fn failure_kind(err: &anyhow::Error) -> &'static str {
    err.downcast_ref::<ScrapeError>()
        .map(ScrapeError::kind)
        .unwrap_or("other")
}
