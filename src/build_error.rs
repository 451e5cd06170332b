//! Fatal error taxonomy for build, curate, and search commands.

use std::path::PathBuf;

/// Errors that abort a command and map to exit code 1.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("CSV file not found: {}", .0.display())]
    SourceMissing(PathBuf),
    #[error("Failed to read CSV {}: {source}", .path.display())]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("No games parsed from CSV. Check CSV format and content.")]
    NoRecords,
    #[error("Failed to save enrichment cache {}: {source}", .path.display())]
    CacheWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to save games data {}: {source}", .path.display())]
    ArtifactWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to load games data {}: {reason}", .path.display())]
    ArtifactRead { path: PathBuf, reason: String },
    #[error("Failed to back up CSV to {}: {source}", .path.display())]
    Backup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to rewrite CSV {}: {reason}", .path.display())]
    CsvWrite { path: PathBuf, reason: String },
    #[error("Invalid config {}: {reason}", .path.display())]
    Config { path: PathBuf, reason: String },
    #[error("No RAWG API key configured; set RAWG_API_KEY, pass --api-key, or build with --offline")]
    MissingApiKey,
}
