//! Master game list CSV parsing with row-level validation.

use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use log::{info, warn};

use crate::build_error::BuildError;
use crate::game_data::GameRecord;

const GAME_COLUMN: &str = "Game";
const STATUS_COLUMN: &str = "Status";
const PLATFORM_COLUMN: &str = "Platform";
const EMULATOR_COLUMN: &str = "Emulator";
const TOOL_COLUMN: &str = "IsArchipelagoTool";
const MAX_LOGGED_ERRORS: usize = 5;

/// A source row that was excluded from the dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    /// 1-based line where the row starts (header is line 1).
    pub line: u64,
    pub field: Option<String>,
    pub message: String,
}

/// Valid records in file order plus one error per rejected row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceParse {
    pub records: Vec<GameRecord>,
    pub errors: Vec<RowError>,
}

#[derive(Debug, Clone, Copy, Default)]
struct SourceColumns {
    game: Option<usize>,
    status: Option<usize>,
    platform: Option<usize>,
    emulator: Option<usize>,
    is_tool: Option<usize>,
}

impl SourceColumns {
    fn from_headers(headers: &StringRecord) -> Self {
        let position = |name: &str| headers.iter().position(|header| header == name);
        Self {
            game: position(GAME_COLUMN),
            status: position(STATUS_COLUMN),
            platform: position(PLATFORM_COLUMN),
            emulator: position(EMULATOR_COLUMN),
            is_tool: position(TOOL_COLUMN),
        }
    }

    fn value<'a>(record: &'a StringRecord, column: Option<usize>) -> &'a str {
        column
            .and_then(|index| record.get(index))
            .unwrap_or_default()
    }
}

fn parse_tool_flag(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

/// Parses CSV bytes; malformed rows are reported, never fatal.
pub fn parse_source(content: &[u8]) -> SourceParse {
    let mut parsed = SourceParse::default();
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(content);

    let columns = match reader.headers() {
        Ok(headers) => SourceColumns::from_headers(headers),
        Err(error) => {
            parsed.errors.push(RowError {
                line: 1,
                field: None,
                message: format!("Invalid header row: {error}"),
            });
            return parsed;
        }
    };

    for (index, result) in reader.records().enumerate() {
        let fallback_line = index as u64 + 2;
        let record = match result {
            Ok(record) => record,
            Err(error) => {
                let line = error
                    .position()
                    .map(|position| position.line())
                    .unwrap_or(fallback_line);
                parsed.errors.push(RowError {
                    line,
                    field: None,
                    message: format!("Invalid row structure: {error}"),
                });
                continue;
            }
        };
        let line = record
            .position()
            .map(|position| position.line())
            .unwrap_or(fallback_line);

        let name = SourceColumns::value(&record, columns.game);
        if name.is_empty() {
            parsed.errors.push(RowError {
                line,
                field: Some(GAME_COLUMN.to_string()),
                message: format!("Missing required field: {GAME_COLUMN}"),
            });
            continue;
        }

        parsed.records.push(GameRecord::new(
            name,
            SourceColumns::value(&record, columns.status),
            SourceColumns::value(&record, columns.platform),
            SourceColumns::value(&record, columns.emulator),
            parse_tool_flag(SourceColumns::value(&record, columns.is_tool)),
        ));
    }

    parsed
}

/// Reads and parses the source list at `path`.
pub fn read_source(path: &Path) -> Result<SourceParse, BuildError> {
    info!("Build: reading CSV from {}", path.display());
    if !path.exists() {
        return Err(BuildError::SourceMissing(path.to_path_buf()));
    }
    let content = std::fs::read(path).map_err(|source| BuildError::SourceRead {
        path: path.to_path_buf(),
        source,
    })?;

    let parsed = parse_source(&content);
    info!(
        "Build: parsed {} games with {} errors",
        parsed.records.len(),
        parsed.errors.len()
    );
    if parsed.errors.len() > MAX_LOGGED_ERRORS {
        warn!(
            "Build: {} parse errors (showing first {MAX_LOGGED_ERRORS})",
            parsed.errors.len()
        );
    }
    for error in parsed.errors.iter().take(MAX_LOGGED_ERRORS) {
        warn!("Build: line {}: {}", error.line, error.message);
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::{parse_source, read_source};
    use crate::build_error::BuildError;
    use std::path::PathBuf;

    const SAMPLE_CSV: &str = "\
Game,Status,Platform,Emulator,IsArchipelagoTool
Celeste,Stable,PC,,false
,Stable,SNES,BizHawk,false
Plok!,Unstable,SNES,BizHawk,false
Yacht Dice,Official,PC,,true
";

    #[test]
    fn test_missing_game_row_is_excluded_with_single_error() {
        let parsed = parse_source(SAMPLE_CSV.as_bytes());

        assert_eq!(parsed.records.len(), 3);
        assert_eq!(parsed.errors.len(), 1);
        assert_eq!(parsed.errors[0].field.as_deref(), Some("Game"));
        assert_eq!(parsed.errors[0].line, 3);
        assert_eq!(parsed.errors[0].message, "Missing required field: Game");
    }

    #[test]
    fn test_records_keep_source_order_and_columns() {
        let parsed = parse_source(SAMPLE_CSV.as_bytes());
        let names: Vec<&str> = parsed
            .records
            .iter()
            .map(|record| record.name.as_str())
            .collect();

        assert_eq!(names, vec!["Celeste", "Plok!", "Yacht Dice"]);
        assert_eq!(parsed.records[1].platform, "SNES");
        assert_eq!(parsed.records[1].emulator, "BizHawk");
        assert!(parsed.records[2].is_tool);
        assert!(!parsed.records[0].is_tool);
        assert!(parsed.records[0].genres.is_empty());
        assert_eq!(parsed.records[0].release_year, None);
    }

    #[test]
    fn test_parse_is_deterministic_for_same_content() {
        assert_eq!(
            parse_source(SAMPLE_CSV.as_bytes()),
            parse_source(SAMPLE_CSV.as_bytes())
        );
    }

    #[test]
    fn test_missing_optional_columns_default_to_empty() {
        let parsed = parse_source(b"Game\nOcarina of Time\n");

        assert_eq!(parsed.records.len(), 1);
        assert!(parsed.errors.is_empty());
        assert_eq!(parsed.records[0].status, "");
        assert_eq!(parsed.records[0].platform, "");
        assert!(!parsed.records[0].is_tool);
    }

    #[test]
    fn test_short_rows_and_padded_headers_are_trimmed() {
        let parsed = parse_source(b" Game , Status ,Platform\n  Hollow Knight  ,Stable\n");

        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].name, "Hollow Knight");
        assert_eq!(parsed.records[0].status, "Stable");
        assert_eq!(parsed.records[0].platform, "");
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let parsed = parse_source(b"Game,Status\n\nCeleste,Stable\n\n   ,Stable\n");

        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].name, "Celeste");
        assert_eq!(parsed.errors.len(), 1);
        assert_eq!(parsed.errors[0].field.as_deref(), Some("Game"));
    }

    #[test]
    fn test_quoted_fields_keep_commas() {
        let parsed = parse_source(b"Game,Platform\n\"Mario & Luigi: Superstar Saga, DX\",GBA\n");

        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].name, "Mario & Luigi: Superstar Saga, DX");
    }

    #[test]
    fn test_missing_game_header_rejects_every_row() {
        let parsed = parse_source(b"Title,Status\nCeleste,Stable\nPlok!,Stable\n");

        assert!(parsed.records.is_empty());
        assert_eq!(parsed.errors.len(), 2);
        assert!(parsed
            .errors
            .iter()
            .all(|error| error.field.as_deref() == Some("Game")));
    }

    #[test]
    fn test_invalid_utf8_row_is_reported_without_field() {
        let mut content = b"Game,Status\nCeleste,Stable\n".to_vec();
        content.extend_from_slice(&[0xff, 0xfe, b',', b'x', b'\n']);
        content.extend_from_slice(b"Plok!,Stable\n");
        let parsed = parse_source(&content);

        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.errors.len(), 1);
        assert_eq!(parsed.errors[0].field, None);
        assert_eq!(parsed.errors[0].line, 3);
    }

    #[test]
    fn test_read_source_missing_file_is_fatal() {
        let path = PathBuf::from("definitely/not/here/games.csv");
        assert!(matches!(
            read_source(&path),
            Err(BuildError::SourceMissing(missing)) if missing == path
        ));
    }
}
