//! Persistent on-disk cache for pricing suggestions with a TTL.

use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::PriceSuggestion;

const CACHE_FILENAME: &str = "pricing_suggestions.json";

/// Cache TTL: 7 days. HPP changes invalidate entries through the key anyway.
pub const SUGGESTION_CACHE_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// One cached suggestion with the time it was stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedSuggestion {
    /// Unix timestamp (seconds) when this entry was created.
    pub cached_at: u64,
    pub suggestion: PriceSuggestion,
}

impl CachedSuggestion {
    pub fn new(suggestion: PriceSuggestion) -> Self {
        Self {
            cached_at: now_secs(),
            suggestion,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.age() > SUGGESTION_CACHE_TTL
    }

    pub fn age(&self) -> Duration {
        Duration::from_secs(now_secs().saturating_sub(self.cached_at))
    }

    /// Human-readable age string.
    pub fn age_string(&self) -> String {
        let secs = self.age().as_secs();
        if secs < 60 {
            format!("{secs}s")
        } else if secs < 3600 {
            format!("{}m", secs / 60)
        } else if secs < 86400 {
            format!("{}h", secs / 3600)
        } else {
            format!("{}d", secs / 86400)
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuggestionCache {
    #[serde(default)]
    pub entries: HashMap<String, CachedSuggestion>,
}

/// File-backed store for [`SuggestionCache`].
#[derive(Debug, Clone)]
pub struct SuggestionCacheStore {
    path: PathBuf,
}

impl SuggestionCacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data_local_dir>/omsetku/pricing_suggestions.json`.
    pub fn default_location() -> Self {
        let base = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("omsetku");
        Self::new(base.join(CACHE_FILENAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or unreadable files load as an empty cache.
    pub fn load(&self) -> SuggestionCache {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) => {
                debug!("no suggestion cache at {}: {err}", self.path.display());
                return SuggestionCache::default();
            }
        };
        match serde_json::from_str(&content) {
            Ok(cache) => cache,
            Err(err) => {
                warn!("failed to parse suggestion cache: {err}");
                SuggestionCache::default()
            }
        }
    }

    pub fn save(&self, cache: &SuggestionCache) -> Result<(), io::Error> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string(cache)?;
        fs::write(&self.path, content)?;
        debug!(
            "saved {} suggestions to {}",
            cache.entries.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Returns the entry even when expired; callers decide via [`CachedSuggestion::is_expired`].
    pub fn get(&self, key: &str) -> Option<CachedSuggestion> {
        self.load().entries.remove(key)
    }

    /// Stores one suggestion and drops expired entries.
    pub fn put(&self, key: &str, suggestion: PriceSuggestion) -> Result<(), io::Error> {
        let mut cache = self.load();
        cache.entries.retain(|_, entry| !entry.is_expired());
        cache
            .entries
            .insert(key.to_string(), CachedSuggestion::new(suggestion));
        self.save(&cache)
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
