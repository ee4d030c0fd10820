pub mod cache;
pub mod domain;
pub mod ingest;
pub mod mock;
pub mod time;
pub mod transform;

pub mod config {
    use crate::domain::severity::{PollenThresholds, SeverityThresholds};
    use std::time::Duration;

    pub const DEFAULT_SOURCE_URL: &str = "https://www.kxan.com/weather/allergy-forecast/";
    pub const DEFAULT_SOURCE_NAME: &str = "KXAN / Allergy & Asthma Center of Georgetown";

    const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;
    const DEFAULT_DATA_TTL_SECS: u64 = 2 * 60 * 60;
    const DEFAULT_SUMMARY_TTL_SECS: u64 = 4 * 60 * 60;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub sentry_dsn: Option<String>,
        pub source_url: String,
        pub source_name: String,
        pub user_agent: String,
        pub fetch_timeout: Duration,
        pub data_ttl: Duration,
        pub summary_ttl: Duration,
        pub thresholds: PollenThresholds,
    }

    impl Default for Settings {
        fn default() -> Self {
            Self {
                sentry_dsn: None,
                source_url: DEFAULT_SOURCE_URL.to_string(),
                source_name: DEFAULT_SOURCE_NAME.to_string(),
                user_agent: default_user_agent(),
                fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
                data_ttl: Duration::from_secs(DEFAULT_DATA_TTL_SECS),
                summary_ttl: Duration::from_secs(DEFAULT_SUMMARY_TTL_SECS),
                thresholds: PollenThresholds::default(),
            }
        }
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Self::from_lookup(|key| std::env::var(key).ok())
        }

        /// Builds settings from an arbitrary variable lookup. Unset or malformed values keep
        /// their defaults.
        pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
            let mut out = Self::default();
            let non_empty = |key: &str| lookup(key).filter(|s| !s.trim().is_empty());

            out.sentry_dsn = non_empty("SENTRY_DSN");
            if let Some(url) = non_empty("POLLEN_SOURCE_URL") {
                out.source_url = url;
            }
            if let Some(name) = non_empty("POLLEN_SOURCE_NAME") {
                out.source_name = name;
            }
            if let Some(ua) = non_empty("POLLEN_USER_AGENT") {
                out.user_agent = ua;
            }

            let secs = |key: &str| {
                non_empty(key)
                    .and_then(|s| s.trim().parse::<u64>().ok())
                    .filter(|n| *n > 0)
                    .map(Duration::from_secs)
            };
            if let Some(d) = secs("POLLEN_FETCH_TIMEOUT_SECS") {
                out.fetch_timeout = d;
            }
            if let Some(d) = secs("POLLEN_DATA_TTL_SECS") {
                out.data_ttl = d;
            }
            if let Some(d) = secs("POLLEN_SUMMARY_TTL_SECS") {
                out.summary_ttl = d;
            }

            if let Some(table) = non_empty("SEVERITY_THRESHOLDS") {
                match SeverityThresholds::parse(&table) {
                    Ok(t) => out.thresholds.severity = t,
                    Err(err) => {
                        tracing::warn!(error = %err, value = %table, "invalid SEVERITY_THRESHOLDS; using defaults")
                    }
                }
            }

            let count = |key: &str| non_empty(key).and_then(|s| s.trim().parse::<u32>().ok());
            if let Some(n) = count("SEASON_MODERATE_THRESHOLD") {
                out.thresholds.moderate = n;
            }
            if let Some(n) = count("SEASON_HIGH_THRESHOLD") {
                out.thresholds.high = n;
            }

            Ok(out)
        }
    }

    fn default_user_agent() -> String {
        format!("pollen-tracker/{}", env!("CARGO_PKG_VERSION"))
    }

}
