use crate::cache::{CacheEntry, CacheKey, CacheStore};
use crate::config::Settings;
use crate::domain::pollen::{PollenData, SourceKind};
use crate::domain::severity::{severity_level, SeverityLevel};
use crate::ingest::error::{failure_kind, ScrapeError};
use crate::ingest::provider::{HttpReportSource, ReportSource};
use crate::mock;
use crate::transform::Normalizer;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheStatus::Hit => "hit",
            CacheStatus::Miss => "miss",
        }
    }
}

/// A served dataset plus how it was obtained.
#[derive(Debug, Clone)]
pub struct Served {
    pub data: Arc<PollenData>,
    pub cache: CacheStatus,
}

impl Served {
    pub fn kind(&self) -> SourceKind {
        self.data.source.kind
    }
}

/// Scrape -> normalize behind a TTL cache, with the synthetic dataset as the catch-all
/// fallback. `get` always resolves to a dataset.
pub struct PollenService {
    store: Arc<CacheStore>,
    source: Arc<dyn ReportSource>,
    normalizer: Normalizer,
    fetch_timeout: Duration,
    data_key: CacheKey,
    preview_key: CacheKey,
}

impl PollenService {
    pub fn new(store: Arc<CacheStore>, source: Arc<dyn ReportSource>, settings: &Settings) -> Self {
        let normalizer = Normalizer::live(
            settings.thresholds,
            source.source_name(),
            source.source_url(),
        );
        Self {
            store,
            source,
            normalizer,
            fetch_timeout: settings.fetch_timeout,
            data_key: CacheKey::pollen_data(settings),
            preview_key: CacheKey::preview(settings),
        }
    }

    pub fn from_settings(settings: &Settings, store: Arc<CacheStore>) -> Result<Self> {
        let source = HttpReportSource::from_settings(settings)?;
        Ok(Self::new(store, Arc::new(source), settings))
    }

    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    pub fn data_key(&self) -> CacheKey {
        self.data_key
    }

    pub fn preview_key(&self) -> CacheKey {
        self.preview_key
    }

    pub async fn pollen_data(&self) -> Served {
        self.get(self.data_key).await
    }

    pub async fn preview_data(&self) -> Served {
        self.get(self.preview_key).await
    }

    pub fn mock_data(&self) -> PollenData {
        mock::generate(&self.normalizer.thresholds)
    }

    /// Classifies `count` with the same table used for history and forecast levels.
    pub fn severity_level(&self, count: u32) -> SeverityLevel {
        severity_level(&self.normalizer.thresholds.severity, count)
    }

    /// Fresh entries are returned as-is. Otherwise the slot lock is held for the whole
    /// refresh, so concurrent callers on the same key wait for one upstream fetch.
    pub async fn get(&self, key: CacheKey) -> Served {
        let slot = self.store.slot(key.name);
        let mut guard = slot.entry.lock().await;

        if let Some(entry) = guard.as_ref() {
            if entry.is_fresh(key.ttl) {
                tracing::debug!(key = key.name, kind = entry.kind().as_str(), "pollen cache hit");
                return Served {
                    data: Arc::clone(&entry.value),
                    cache: CacheStatus::Hit,
                };
            }
        }

        let value = {
            let _fetch = slot.begin_fetch();
            Arc::new(self.load().await)
        };
        *guard = Some(CacheEntry {
            value: Arc::clone(&value),
            stored_at: Instant::now(),
        });
        tracing::debug!(
            key = key.name,
            ttl = ?key.ttl,
            kind = value.source.kind.as_str(),
            "pollen cache refreshed"
        );

        Served {
            data: value,
            cache: CacheStatus::Miss,
        }
    }

    async fn load(&self) -> PollenData {
        let started = Instant::now();
        let attempt = tokio::time::timeout(self.fetch_timeout, self.source.fetch_report());
        let fetched = match attempt.await {
            Ok(res) => res,
            Err(_) => Err(ScrapeError::fetch(
                self.source.source_url(),
                format!("no response within {:?}", self.fetch_timeout),
            )
            .into()),
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match fetched {
            Ok(raw) => {
                let data = self.normalizer.normalize(raw);
                tracing::info!(
                    elapsed_ms,
                    report_date = %data.source.report_date,
                    current = data.current.count,
                    level = %data.current.level,
                    "live pollen data refreshed"
                );
                data
            }
            Err(err) => {
                tracing::warn!(
                    elapsed_ms,
                    failure = failure_kind(&err),
                    error = %format!("{err:#}"),
                    "pollen scrape failed; serving synthetic data"
                );
                mock::generate(&self.normalizer.thresholds)
            }
        }
    }
}
