//! Top-level games data build: regeneration check, parse, enrich, write.

use std::path::Path;

use log::info;

use crate::build_error::BuildError;
use crate::config::Config;
use crate::dataset_writer::{hash_source_file, read_previous_build, today_utc, write_artifact};
use crate::enrichment_cache::EnrichmentCache;
use crate::enrichment_manager::{EnrichmentManager, EnrichmentStats};
use crate::metadata_sources::GameMetadataSource;
use crate::source_reader::read_source;

/// Counters for a build that regenerated the artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    pub games_parsed: usize,
    pub parse_errors: usize,
    pub games_with_genres: usize,
    pub enrichment: EnrichmentStats,
    pub artifact_bytes: u64,
    pub csv_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    /// Source hash matched the existing artifact; nothing was touched.
    Skipped { csv_hash: String },
    Built(BuildSummary),
}

/// Runs the build described by `config`.
///
/// An unchanged source (same hash as the existing artifact) short-circuits
/// before the cache or output are read or written, unless `force` is set,
/// `retry_failed` is configured, or the previous artifact came from an
/// offline build with unenriched games and a source is now available.
/// `source = None` enriches from the cache only.
pub fn run_build(
    config: &Config,
    force: bool,
    source: Option<&mut dyn GameMetadataSource>,
) -> Result<BuildOutcome, BuildError> {
    let paths = &config.paths;
    info!("Build: starting games data build");

    let csv_hash = hash_source_file(&paths.source_csv)?;
    info!("Build: CSV hash {csv_hash}");

    match read_previous_build(&paths.dataset_output) {
        None => info!("Build: no existing games data, generating"),
        Some(previous) if previous.csv_hash != csv_hash => {
            info!("Build: CSV changed, regenerating games data")
        }
        Some(_) if force => info!("Build: CSV unchanged, regenerating because of --force"),
        Some(_) if config.enrichment.retry_failed => {
            info!("Build: CSV unchanged, regenerating to retry failed lookups")
        }
        Some(previous) if previous.unenriched > 0 && source.is_some() => info!(
            "Build: CSV unchanged, regenerating to enrich {} games left by an offline build",
            previous.unenriched
        ),
        Some(_) => {
            info!("Build: CSV unchanged, skipping regeneration");
            info!(
                "Build:   - Use existing data: {}",
                paths.dataset_output.display()
            );
            return Ok(BuildOutcome::Skipped { csv_hash });
        }
    }

    let parsed = read_source(&paths.source_csv)?;
    if parsed.records.is_empty() {
        return Err(BuildError::NoRecords);
    }

    let mut cache = EnrichmentCache::load(&paths.cache_file);
    if config.enrichment.retry_failed {
        let dropped = cache.drop_failed();
        if dropped > 0 {
            info!("Cache: dropped {dropped} failed entries for retry");
        }
    }

    let (games, enrichment) =
        EnrichmentManager::new(&mut cache, source, &config.enrichment).enrich_games(parsed.records);
    save_cache(&cache, &paths.cache_file)?;

    let artifact_bytes = write_artifact(
        &games,
        &paths.dataset_output,
        &csv_hash,
        &today_utc(),
        enrichment.skipped,
    )?;
    let summary = BuildSummary {
        games_parsed: games.len(),
        parse_errors: parsed.errors.len(),
        games_with_genres: games.iter().filter(|game| !game.genres.is_empty()).count(),
        enrichment,
        artifact_bytes,
        csv_hash,
    };
    log_summary(&summary, &paths.dataset_output);
    Ok(BuildOutcome::Built(summary))
}

fn save_cache(cache: &EnrichmentCache, path: &Path) -> Result<(), BuildError> {
    cache.save(path).map_err(|source| BuildError::CacheWrite {
        path: path.to_path_buf(),
        source,
    })
}

fn log_summary(summary: &BuildSummary, output: &Path) {
    info!("Build: build complete");
    info!("Build:   - Games parsed: {}", summary.games_parsed);
    info!("Build:   - Games with genres: {}", summary.games_with_genres);
    info!("Build:   - Parse errors: {}", summary.parse_errors);
    info!("Build:   - Cache hits: {}", summary.enrichment.cache_hits);
    info!("Build:   - API calls: {}", summary.enrichment.api_calls);
    info!("Build:   - Not found: {}", summary.enrichment.not_found);
    info!("Build:   - Failed lookups: {}", summary.enrichment.failed);
    if summary.enrichment.skipped > 0 {
        info!(
            "Build:   - Unenriched (offline): {}, the next online build fetches them",
            summary.enrichment.skipped
        );
    }
    info!("Build:   - Games output: {}", output.display());
    info!(
        "Build:   - Games size: {:.2} KB",
        summary.artifact_bytes as f64 / 1024.0
    );
}
