//! Cache-first enrichment of parsed game records.
//!
//! Each record is resolved in input order: a cache hit is merged directly,
//! a miss is looked up through the configured metadata source and written
//! back into the cache, including empty results, so a name is only ever
//! queried once. Persisting the cache is left to the caller, which does it
//! once after the whole batch.

use log::{info, warn};

use crate::config::EnrichmentConfig;
use crate::enrichment_cache::EnrichmentCache;
use crate::game_data::{EnrichmentLookup, GameEnrichment, GameRecord, LookupOutcome};
use crate::metadata_sources::GameMetadataSource;

/// Counters reported in the build summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichmentStats {
    pub cache_hits: usize,
    pub api_calls: usize,
    pub not_found: usize,
    pub failed: usize,
    /// Misses left unenriched because no source was available.
    pub skipped: usize,
}

/// Merges cached or freshly fetched enrichment onto a batch of records.
pub struct EnrichmentManager<'a, 's> {
    cache: &'a mut EnrichmentCache,
    source: Option<&'a mut (dyn GameMetadataSource + 's)>,
    cache_progress_interval: usize,
    api_progress_interval: usize,
    stats: EnrichmentStats,
}

impl<'a, 's> EnrichmentManager<'a, 's> {
    /// Creates a manager; `source = None` runs offline against the cache only.
    pub fn new(
        cache: &'a mut EnrichmentCache,
        source: Option<&'a mut (dyn GameMetadataSource + 's)>,
        settings: &EnrichmentConfig,
    ) -> Self {
        Self {
            cache,
            source,
            cache_progress_interval: settings.cache_progress_interval.max(1),
            api_progress_interval: settings.api_progress_interval.max(1),
            stats: EnrichmentStats::default(),
        }
    }

    /// Enriches `games` in order and returns them with the run counters.
    pub fn enrich_games(mut self, games: Vec<GameRecord>) -> (Vec<GameRecord>, EnrichmentStats) {
        let total = games.len();
        match self.source.as_ref() {
            Some(source) => info!(
                "Enrich: starting enrichment for {total} games via {}",
                source.source_name()
            ),
            None => info!("Enrich: starting offline enrichment for {total} games (cache only)"),
        }

        let enriched = games
            .into_iter()
            .enumerate()
            .map(|(index, game)| self.enrich_game(index, total, game))
            .collect::<Vec<_>>();

        let with_genres = enriched
            .iter()
            .filter(|game| !game.genres.is_empty())
            .count();
        info!("Enrich: enrichment complete");
        info!("Enrich:   - Cache hits: {}", self.stats.cache_hits);
        info!("Enrich:   - API calls: {}", self.stats.api_calls);
        info!("Enrich:   - Not found: {}", self.stats.not_found);
        info!("Enrich:   - Failed: {}", self.stats.failed);
        if self.stats.skipped > 0 {
            info!("Enrich:   - Skipped (offline): {}", self.stats.skipped);
        }
        info!("Enrich:   - Total with genres: {with_genres}");
        (enriched, self.stats)
    }

    fn enrich_game(&mut self, index: usize, total: usize, game: GameRecord) -> GameRecord {
        let progress = format!("({}/{total})", index + 1);

        if let Some(cached) = self.cache.get(&game.name) {
            let game = game.with_enrichment(&cached.enrichment);
            self.stats.cache_hits += 1;
            if (index + 1) % self.cache_progress_interval == 0 {
                info!(
                    "Enrich: {progress} processed ({} from cache, {} API calls)",
                    self.stats.cache_hits, self.stats.api_calls
                );
            }
            return game;
        }

        let Some(source) = self.source.as_mut() else {
            self.stats.skipped += 1;
            return game.with_enrichment(&GameEnrichment::default());
        };

        let lookup = match source.lookup(&game.name) {
            Ok(lookup) => lookup,
            Err(error) => {
                warn!("Enrich: failed to enrich {:?}: {error}", game.name);
                EnrichmentLookup::failed()
            }
        };
        self.stats.api_calls += 1;
        match lookup.outcome {
            LookupOutcome::Matched => {}
            LookupOutcome::NotFound => self.stats.not_found += 1,
            LookupOutcome::Failed => self.stats.failed += 1,
        }

        let game = game.with_enrichment(&lookup.enrichment);
        self.cache.insert(&game.name, lookup);

        if self.stats.api_calls % self.api_progress_interval == 0 {
            info!(
                "Enrich: {progress} fetched from API ({} calls, {} not found, {} failed)",
                self.stats.api_calls, self.stats.not_found, self.stats.failed
            );
        }
        game
    }
}
