//! Shared game list records, enrichment payloads, and dataset artifact types.

use serde::{Deserialize, Deserializer, Serialize};

/// Schema version stamped into every written dataset artifact.
pub const DATASET_SCHEMA_VERSION: &str = "1.0.0";

/// One game or tool from the source list, plus enrichment fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GameRecord {
    /// Display name and cache key.
    #[serde(rename = "Game")]
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub platform: String,
    /// Empty for native PC games.
    #[serde(default)]
    pub emulator: String,
    /// Archipelago-specific tool rather than a standalone game.
    #[serde(
        rename = "IsArchipelagoTool",
        default,
        deserialize_with = "deserialize_tool_flag"
    )]
    pub is_tool: bool,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub release_year: Option<i32>,
    #[serde(default)]
    pub is_multiplayer: bool,
}

impl GameRecord {
    /// Builds a base record with empty enrichment fields.
    pub fn new(
        name: impl Into<String>,
        status: impl Into<String>,
        platform: impl Into<String>,
        emulator: impl Into<String>,
        is_tool: bool,
    ) -> Self {
        Self {
            name: name.into(),
            status: status.into(),
            platform: platform.into(),
            emulator: emulator.into(),
            is_tool,
            genres: Vec::new(),
            release_year: None,
            is_multiplayer: false,
        }
    }

    /// Overwrites the enrichment fields with `enrichment`.
    pub fn with_enrichment(mut self, enrichment: &GameEnrichment) -> Self {
        self.genres = enrichment.genres.clone();
        self.release_year = enrichment.release_year;
        self.is_multiplayer = enrichment.is_multiplayer;
        self
    }
}

/// Accepts the JSON bool written now and the `"true"`/`"false"` strings of
/// older artifacts.
fn deserialize_tool_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ToolFlag {
        Bool(bool),
        Text(String),
    }

    Ok(match ToolFlag::deserialize(deserializer)? {
        ToolFlag::Bool(value) => value,
        ToolFlag::Text(text) => text.trim().eq_ignore_ascii_case("true"),
    })
}

/// Supplementary fields fetched for one game name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameEnrichment {
    pub genres: Vec<String>,
    pub release_year: Option<i32>,
    pub is_multiplayer: bool,
}

impl GameEnrichment {
    pub fn is_empty(&self) -> bool {
        self.genres.is_empty() && self.release_year.is_none() && !self.is_multiplayer
    }
}

/// How an enrichment result was produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupOutcome {
    /// The search returned a result.
    #[default]
    Matched,
    /// The search succeeded with zero results.
    NotFound,
    /// The lookup did not complete (HTTP, API, body, or network failure).
    Failed,
}

/// Enrichment payload plus the outcome that produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentLookup {
    pub enrichment: GameEnrichment,
    pub outcome: LookupOutcome,
}

impl EnrichmentLookup {
    pub fn matched(enrichment: GameEnrichment) -> Self {
        Self {
            enrichment,
            outcome: LookupOutcome::Matched,
        }
    }

    pub fn not_found() -> Self {
        Self {
            enrichment: GameEnrichment::default(),
            outcome: LookupOutcome::NotFound,
        }
    }

    pub fn failed() -> Self {
        Self {
            enrichment: GameEnrichment::default(),
            outcome: LookupOutcome::Failed,
        }
    }
}

/// Metadata block written next to the game list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetMetadata {
    pub count: usize,
    /// UTC date only (`YYYY-MM-DD`).
    pub generated_at: String,
    pub version: String,
    pub csv_hash: String,
    /// Games an offline build could not enrich; omitted when zero.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub unenriched: usize,
}

fn is_zero(value: &usize) -> bool {
    *value == 0
}

/// Final JSON artifact consumed by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetArtifact {
    pub games: Vec<GameRecord>,
    pub metadata: DatasetMetadata,
}

#[cfg(test)]
mod tests {
    use super::{DatasetArtifact, DatasetMetadata, GameEnrichment, GameRecord};

    #[test]
    fn test_game_record_serializes_with_source_column_names() {
        let record = GameRecord::new("Celeste", "Stable", "PC", "", false).with_enrichment(
            &GameEnrichment {
                genres: vec!["Platformer".to_string()],
                release_year: Some(2018),
                is_multiplayer: false,
            },
        );
        let value = serde_json::to_value(&record).expect("record should serialize");

        assert_eq!(value["Game"], "Celeste");
        assert_eq!(value["Status"], "Stable");
        assert_eq!(value["Platform"], "PC");
        assert_eq!(value["Emulator"], "");
        assert_eq!(value["IsArchipelagoTool"], false);
        assert_eq!(value["Genres"][0], "Platformer");
        assert_eq!(value["ReleaseYear"], 2018);
        assert_eq!(value["IsMultiplayer"], false);
    }

    #[test]
    fn test_unenriched_record_serializes_null_release_year() {
        let record = GameRecord::new("Paint", "Official", "PC", "", true);
        let value = serde_json::to_value(&record).expect("record should serialize");

        assert!(value["ReleaseYear"].is_null());
        assert_eq!(value["Genres"].as_array().map(Vec::len), Some(0));
        assert_eq!(value["IsArchipelagoTool"], true);
    }

    #[test]
    fn test_artifact_parses_with_metadata_keys() {
        let text = r#"{
  "games": [{"Game": "Plok!", "Status": "Stable", "Platform": "SNES", "Emulator": "BizHawk"}],
  "metadata": {"count": 1, "generatedAt": "2024-05-01", "version": "1.0.0", "csvHash": "abc"}
}"#;
        let artifact: DatasetArtifact = serde_json::from_str(text).expect("artifact should parse");

        assert_eq!(artifact.games.len(), 1);
        assert_eq!(artifact.games[0].emulator, "BizHawk");
        assert!(!artifact.games[0].is_tool);
        assert_eq!(artifact.metadata.csv_hash, "abc");
        assert_eq!(artifact.metadata.generated_at, "2024-05-01");
        assert_eq!(artifact.metadata.unenriched, 0);
    }

    #[test]
    fn test_artifact_accepts_string_tool_flags() {
        let text = r#"{
  "games": [
    {"Game": "Yacht Dice", "Status": "Official", "Platform": "PC", "Emulator": "", "IsArchipelagoTool": "true"},
    {"Game": "Celeste", "Status": "Stable", "Platform": "PC", "Emulator": "", "IsArchipelagoTool": "false"},
    {"Game": "Paint", "Status": "Official", "Platform": "PC", "Emulator": "", "IsArchipelagoTool": true}
  ],
  "metadata": {"count": 3, "generatedAt": "2024-05-01", "version": "1.0.0", "csvHash": "abc"}
}"#;
        let artifact: DatasetArtifact =
            serde_json::from_str(text).expect("string tool flags should parse");

        let flags: Vec<bool> = artifact.games.iter().map(|game| game.is_tool).collect();
        assert_eq!(flags, vec![true, false, true]);
    }

    #[test]
    fn test_complete_metadata_omits_unenriched_count() {
        let metadata = DatasetMetadata {
            count: 1,
            generated_at: "2024-05-01".to_string(),
            version: "1.0.0".to_string(),
            csv_hash: "abc".to_string(),
            unenriched: 0,
        };
        let value = serde_json::to_value(&metadata).expect("metadata should serialize");

        assert!(value.get("unenriched").is_none());
        assert_eq!(value["csvHash"], "abc");
    }

    #[test]
    fn test_empty_enrichment_is_empty() {
        assert!(GameEnrichment::default().is_empty());
        assert!(!GameEnrichment {
            genres: Vec::new(),
            release_year: Some(1998),
            is_multiplayer: false,
        }
        .is_empty());
    }
}
