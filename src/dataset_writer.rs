//! Dataset artifact serialization, source hashing, and previous-run metadata.

use std::fs;
use std::path::Path;

use chrono::Utc;
use log::info;
use serde::Serialize;
use serde_json::Value;

use crate::build_error::BuildError;
use crate::game_data::{DatasetArtifact, DatasetMetadata, GameRecord, DATASET_SCHEMA_VERSION};

#[derive(Serialize)]
struct ArtifactView<'a> {
    games: &'a [GameRecord],
    metadata: DatasetMetadata,
}

/// Lowercase hex MD5 digest of `content`.
pub fn content_hash(content: &[u8]) -> String {
    format!("{:x}", md5::compute(content))
}

/// Hashes the source file at `path`.
pub fn hash_source_file(path: &Path) -> Result<String, BuildError> {
    if !path.exists() {
        return Err(BuildError::SourceMissing(path.to_path_buf()));
    }
    let content = fs::read(path).map_err(|source| BuildError::SourceRead {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(content_hash(&content))
}

/// Current UTC date as `YYYY-MM-DD`.
pub fn today_utc() -> String {
    Utc::now().date_naive().format("%Y-%m-%d").to_string()
}

/// Metadata of the artifact left by the previous build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviousBuild {
    pub csv_hash: String,
    /// Games left unenriched because that build ran offline.
    pub unenriched: usize,
}

/// Reads the previous artifact's metadata; `None` if absent or unreadable.
pub fn read_previous_build(path: &Path) -> Option<PreviousBuild> {
    let content = fs::read_to_string(path).ok()?;
    let document: Value = serde_json::from_str(&content).ok()?;
    let metadata = document.get("metadata")?;
    let csv_hash = metadata.get("csvHash")?.as_str()?.to_string();
    let unenriched = metadata
        .get("unenriched")
        .and_then(Value::as_u64)
        .unwrap_or_default() as usize;
    Some(PreviousBuild {
        csv_hash,
        unenriched,
    })
}

/// Loads a full artifact for read-only consumers.
pub fn read_artifact(path: &Path) -> Result<DatasetArtifact, BuildError> {
    let content = fs::read_to_string(path).map_err(|error| BuildError::ArtifactRead {
        path: path.to_path_buf(),
        reason: error.to_string(),
    })?;
    serde_json::from_str(&content).map_err(|error| BuildError::ArtifactRead {
        path: path.to_path_buf(),
        reason: error.to_string(),
    })
}

/// Writes `games` and their metadata to `path`, returning the file size.
///
/// `unenriched` counts games an offline build had to leave without lookups.
pub fn write_artifact(
    games: &[GameRecord],
    path: &Path,
    csv_hash: &str,
    generated_at: &str,
    unenriched: usize,
) -> Result<u64, BuildError> {
    info!("Build: saving games data to {}", path.display());
    let write_error = |source: std::io::Error| BuildError::ArtifactWrite {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        if !parent.exists() {
            info!("Build: creating output directory {}", parent.display());
            fs::create_dir_all(parent).map_err(write_error)?;
        }
    }

    let artifact = ArtifactView {
        games,
        metadata: DatasetMetadata {
            count: games.len(),
            generated_at: generated_at.to_string(),
            version: DATASET_SCHEMA_VERSION.to_string(),
            csv_hash: csv_hash.to_string(),
            unenriched,
        },
    };
    let text = serde_json::to_string_pretty(&artifact)
        .map_err(|error| write_error(std::io::Error::from(error)))?;
    fs::write(path, &text).map_err(write_error)?;
    info!("Build: saved {} games", games.len());
    Ok(text.len() as u64)
}
