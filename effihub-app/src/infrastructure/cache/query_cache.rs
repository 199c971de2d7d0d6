use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

const DEFAULT_TTL_SECS: u64 = 60;

/// Every cached view family whose displayed data depends on vote aggregates.
/// Vote count affects sort order across listings, so a toggle fans out to all
/// of these rather than patching a single record.
const VOTE_DERIVED_VIEWS: &[&str] = &[
    "all-apps-featured",
    "top-ranked-page",
    "category-apps",
    "new-apps-page",
    "apps-by-category-home",
    "search",
];

struct CachedEntry {
    value: serde_json::Value,
    stored_at: Instant,
}

/// Keyed cache of serialized query results, shared across request handlers.
///
/// Keys are `family` plus an optional argument suffix ("search:notes",
/// "app-detail:<uuid>"). Invalidation is prefix-based so a whole family can
/// be dropped at once.
#[derive(Clone)]
pub struct QueryCache {
    entries: Arc<DashMap<String, CachedEntry>>,
    ttl: Duration,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::with_ttl(Duration::from_secs(DEFAULT_TTL_SECS))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
        }
    }

    pub fn key(family: &str, arg: &str) -> String {
        format!("{family}:{arg}")
    }

    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        let entry = self.entries.get(key)?;
        if entry.stored_at.elapsed() > self.ttl {
            drop(entry);
            self.entries.remove(key);
            return None;
        }
        Some(entry.value.clone())
    }

    pub fn put(&self, key: String, value: serde_json::Value) {
        self.entries.insert(
            key,
            CachedEntry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    pub fn invalidate_family(&self, family: &str) {
        let prefix = format!("{family}:");
        self.entries
            .retain(|key, _| key != family && !key.starts_with(&prefix));
    }

    /// Fan-out invalidation after a vote toggle: drop the app's detail entry
    /// and every listing family that sorts or filters by vote count.
    pub fn invalidate_vote_views(&self, app_id: Uuid) {
        self.entries.remove(&Self::key("app-detail", &app_id.to_string()));
        for family in VOTE_DERIVED_VIEWS {
            self.invalidate_family(family);
        }
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}
