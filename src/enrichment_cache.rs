//! Persisted RAWG lookup results keyed by exact game name.
//!
//! The cache is loaded once per build, mutated in memory by the enrichment
//! manager, then saved once. A name present in the cache is never fetched
//! again unless the file is deleted or its format version changes.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use chrono::{SecondsFormat, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::game_data::{EnrichmentLookup, GameEnrichment, LookupOutcome};

/// Cache files with any other version are discarded on load.
pub const CACHE_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheFileEntry {
    game_name: String,
    #[serde(default)]
    genres: Vec<String>,
    #[serde(default)]
    release_year: Option<i32>,
    #[serde(default)]
    is_multiplayer: bool,
    #[serde(default)]
    fetched_at: String,
    #[serde(default)]
    outcome: LookupOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheFile {
    version: String,
    entries: Vec<CacheFileEntry>,
}

/// In-memory view of one cached lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedEnrichment {
    pub enrichment: GameEnrichment,
    pub outcome: LookupOutcome,
}

/// Game name to enrichment map, ordered by name for stable file output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentCache {
    entries: BTreeMap<String, CachedEnrichment>,
}

impl EnrichmentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the cache file, treating absent, stale, or corrupt files as empty.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            info!("Cache: no cache file found, starting fresh");
            return Self::new();
        }

        match Self::read_cache_file(path) {
            Ok(cache) => {
                info!("Cache: loaded {} entries from cache", cache.len());
                cache
            }
            Err(reason) => {
                warn!("Cache: {reason}, ignoring cache");
                Self::new()
            }
        }
    }

    fn read_cache_file(path: &Path) -> Result<Self, String> {
        let content = fs::read_to_string(path)
            .map_err(|error| format!("failed to read {}: {error}", path.display()))?;
        let document: Value = serde_json::from_str(&content)
            .map_err(|error| format!("failed to parse {}: {error}", path.display()))?;

        let version = document
            .get("version")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if version != CACHE_VERSION {
            return Err(format!(
                "version mismatch (found {version:?}, expected {CACHE_VERSION:?})"
            ));
        }

        let file: CacheFile = serde_json::from_value(document)
            .map_err(|error| format!("invalid cache entries in {}: {error}", path.display()))?;
        let entries = file
            .entries
            .into_iter()
            .map(|entry| {
                (
                    entry.game_name,
                    CachedEnrichment {
                        enrichment: GameEnrichment {
                            genres: entry.genres,
                            release_year: entry.release_year,
                            is_multiplayer: entry.is_multiplayer,
                        },
                        outcome: entry.outcome,
                    },
                )
            })
            .collect();
        Ok(Self { entries })
    }

    /// Overwrites `path` with every entry, stamped with the current time.
    pub fn save(&self, path: &Path) -> io::Result<()> {
        let fetched_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let file = CacheFile {
            version: CACHE_VERSION.to_string(),
            entries: self
                .entries
                .iter()
                .map(|(game_name, cached)| CacheFileEntry {
                    game_name: game_name.clone(),
                    genres: cached.enrichment.genres.clone(),
                    release_year: cached.enrichment.release_year,
                    is_multiplayer: cached.enrichment.is_multiplayer,
                    fetched_at: fetched_at.clone(),
                    outcome: cached.outcome,
                })
                .collect(),
        };

        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(&file)?;
        fs::write(path, text)?;
        info!("Cache: saved {} entries to cache", self.entries.len());
        Ok(())
    }

    pub fn get(&self, game_name: &str) -> Option<&CachedEnrichment> {
        self.entries.get(game_name)
    }

    #[cfg(test)]
    pub fn contains(&self, game_name: &str) -> bool {
        self.entries.contains_key(game_name)
    }

    /// Stores `lookup` under `game_name`, replacing any previous entry.
    pub fn insert(&mut self, game_name: &str, lookup: EnrichmentLookup) {
        self.entries.insert(
            game_name.to_string(),
            CachedEnrichment {
                enrichment: lookup.enrichment,
                outcome: lookup.outcome,
            },
        );
    }

    /// Removes entries whose lookup failed so the next build retries them.
    pub fn drop_failed(&mut self) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, cached| cached.outcome != LookupOutcome::Failed);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
