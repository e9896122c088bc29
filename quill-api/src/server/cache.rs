//! Process-wide cache of rendered pages with a fixed time to live.
//!
//! Entries are never invalidated by writes; they only expire or get cleared.

use axum::{
    body::Bytes,
    response::{Html, IntoResponse, Response},
};
use std::{collections::HashMap, sync::Mutex, time::Duration};
use tokio::time::Instant;
use tracing::debug;

pub const INDEX_PAGE_PREFIX: &str = "index_page";

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct CachedPage {
    pub body: Bytes,
}

impl From<String> for CachedPage {
    fn from(body: String) -> Self {
        Self { body: body.into() }
    }
}

impl IntoResponse for CachedPage {
    fn into_response(self) -> Response {
        Html(self.body).into_response()
    }
}

#[derive(Clone, Debug)]
struct Entry {
    page: CachedPage,
    expires_at: Instant,
}

#[derive(Debug, Default)]
pub struct PageCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl PageCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<CachedPage> {
        let mut entries = self.lock();
        let entry = entries.get(key)?;

        if entry.expires_at <= Instant::now() {
            debug!(key, "Cached page expired");
            entries.remove(key);
            return None;
        }

        Some(entry.page.clone())
    }

    /// Stores a page, dropping every entry that has already expired.
    pub fn put(&self, key: impl Into<String>, page: CachedPage, ttl: Duration) {
        let now = Instant::now();
        let key = key.into();

        let mut entries = self.lock();
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(
            key.clone(),
            Entry {
                page,
                expires_at: now + ttl,
            },
        );
        debug!(key, entries = entries.len(), "Cached page");
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
        // A panic while holding the lock cannot leave the map half-written.
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
