pub mod coordinator;

use crate::config::Settings;
use crate::domain::pollen::{PollenData, SourceKind};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// One logical dataset and how long a stored value stays fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheKey {
    pub name: &'static str,
    pub ttl: Duration,
}

impl CacheKey {
    pub const POLLEN_DATA: &'static str = "austin-pollen";
    pub const PREVIEW: &'static str = "og-pollen";

    /// Primary data endpoint.
    pub fn pollen_data(settings: &Settings) -> Self {
        Self {
            name: Self::POLLEN_DATA,
            ttl: settings.data_ttl,
        }
    }

    /// Derived preview rendering; refreshed less urgently.
    pub fn preview(settings: &Settings) -> Self {
        Self {
            name: Self::PREVIEW,
            ttl: settings.summary_ttl,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: Arc<PollenData>,
    pub stored_at: Instant,
}

impl CacheEntry {
    pub fn kind(&self) -> SourceKind {
        self.value.source.kind
    }

    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() < ttl
    }
}

/// Observable state of one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Empty,
    Fetching,
    Fresh,
    Stale,
}

/// One key's storage. `fetching` is raised only while an upstream refresh runs, so a
/// reader briefly holding `entry` is not mistaken for a fetch.
#[derive(Debug, Default)]
pub(crate) struct Slot {
    pub(crate) entry: tokio::sync::Mutex<Option<CacheEntry>>,
    fetching: AtomicBool,
}

impl Slot {
    pub(crate) fn begin_fetch(&self) -> FetchGuard<'_> {
        self.fetching.store(true, Ordering::Release);
        FetchGuard(&self.fetching)
    }
}

/// Lowers the in-flight flag on drop, including when the refreshing future is cancelled.
pub(crate) struct FetchGuard<'a>(&'a AtomicBool);

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// In-process store, one slot per key. Each slot is replaced as a whole while its lock is
/// held, so readers never see a half-written entry.
#[derive(Debug, Default)]
pub struct CacheStore {
    slots: Mutex<HashMap<&'static str, Arc<Slot>>>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn slot(&self, name: &'static str) -> Arc<Slot> {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.entry(name).or_default().clone()
    }

    pub async fn state(&self, key: &CacheKey) -> EntryState {
        let slot = self.slot(key.name);
        if slot.fetching.load(Ordering::Acquire) {
            return EntryState::Fetching;
        }
        let guard = slot.entry.lock().await;
        match guard.as_ref() {
            None => EntryState::Empty,
            Some(entry) if entry.is_fresh(key.ttl) => EntryState::Fresh,
            Some(_) => EntryState::Stale,
        }
    }

    pub async fn invalidate(&self, name: &'static str) {
        *self.slot(name).entry.lock().await = None;
    }
}
