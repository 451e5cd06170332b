//! One-off maintenance of the master list: name corrections and tool flags.

use std::fs;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use log::info;

use crate::build_error::BuildError;

const OUTPUT_COLUMNS: [&str; 5] = ["Game", "Status", "Platform", "Emulator", "IsArchipelagoTool"];

/// Archipelago-specific tools rather than standalone video games.
const ARCHIPELAGO_TOOLS: &[&str] = &[
    "APQuest",
    "Archipelacode",
    "Archipeladoku (Sudoku)",
    "Archipela-Go!",
    "Autopelago",
    "Blockupelago",
    "Bumper Stickers",
    "ChecksFinder",
    "ChecksMate (Chess)",
    "Clique",
    "CrosswordAP",
    "Elementipelago",
    "Jigsaw Puzzle for Archipelago",
    "Musipelago",
    "Nonograhmm",
    "Nonopelagram",
    "Paint",
    "Password Game",
    "Santa Needs YOU!",
    "Twisty Cube",
    "Unfair Flips",
    "Voltorb Flip (from Pokémon HG & SS)",
    "Watery Words",
    "Word Search",
    "Wordipelago",
    "Yacht Dice",
    "Yacht Dice Bliss",
];

/// Old name -> corrected name.
const NAME_CORRECTIONS: &[(&str, &str)] = &[
    ("A Dance Of Fire And Ice", "A Dance of Fire and Ice"),
    ("CornKidz64", "Corn Kidz 64"),
    ("Mario is Missing (SNES)", "Mario is Missing!"),
    ("Plok", "Plok!"),
    (
        "Super Mario Land 2: The Golden Coins",
        "Super Mario Land 2: 6 Golden Coins",
    ),
    ("Wario Land 1", "Wario Land: Super Mario Land 3"),
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurationSummary {
    pub names_corrected: usize,
    pub tools_marked: usize,
    pub total_rows: usize,
    pub output: PathBuf,
    pub backup: PathBuf,
}

pub fn corrected_name(name: &str) -> Option<&'static str> {
    NAME_CORRECTIONS
        .iter()
        .find(|(old, _)| *old == name)
        .map(|(_, new)| *new)
}

pub fn is_archipelago_tool(name: &str) -> bool {
    ARCHIPELAGO_TOOLS.contains(&name)
}

/// Backs up `csv_path` to `backup_path`, then rewrites it in place with
/// corrected names and an `IsArchipelagoTool` column.
pub fn curate(csv_path: &Path, backup_path: &Path) -> Result<CurationSummary, BuildError> {
    info!("Curate: starting CSV update");
    info!("Curate: reading from {}", csv_path.display());
    if !csv_path.exists() {
        return Err(BuildError::SourceMissing(csv_path.to_path_buf()));
    }

    fs::copy(csv_path, backup_path).map_err(|source| BuildError::Backup {
        path: backup_path.to_path_buf(),
        source,
    })?;
    info!("Curate: backup created at {}", backup_path.display());

    let content = fs::read(csv_path).map_err(|source| BuildError::SourceRead {
        path: csv_path.to_path_buf(),
        source,
    })?;
    let (rows, names_corrected, tools_marked) =
        curate_rows(&content).map_err(|error| BuildError::SourceRead {
            path: csv_path.to_path_buf(),
            source: error.into(),
        })?;

    let output = write_rows(&rows).map_err(|reason| BuildError::CsvWrite {
        path: csv_path.to_path_buf(),
        reason,
    })?;
    fs::write(csv_path, output).map_err(|error| BuildError::CsvWrite {
        path: csv_path.to_path_buf(),
        reason: error.to_string(),
    })?;

    let summary = CurationSummary {
        names_corrected,
        tools_marked,
        total_rows: rows.len(),
        output: csv_path.to_path_buf(),
        backup: backup_path.to_path_buf(),
    };
    info!("Curate: CSV update complete");
    info!("Curate:   - Games corrected: {}", summary.names_corrected);
    info!("Curate:   - Tools marked: {}", summary.tools_marked);
    info!("Curate:   - Total rows: {}", summary.total_rows);
    info!("Curate:   - Output: {}", summary.output.display());
    info!("Curate:   - Backup: {}", summary.backup.display());
    Ok(summary)
}

type CuratedRow = [String; 5];

fn curate_rows(content: &[u8]) -> Result<(Vec<CuratedRow>, usize, usize), csv::Error> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(content);
    let headers = reader.headers()?.clone();
    let column = |name: &str| headers.iter().position(|header| header == name);
    let indices = [
        column("Game"),
        column("Status"),
        column("Platform"),
        column("Emulator"),
    ];

    let mut rows = Vec::new();
    let mut names_corrected = 0;
    let mut tools_marked = 0;
    for record in reader.records() {
        let record = record?;
        if is_blank(&record) {
            continue;
        }
        let value = |index: Option<usize>| {
            index
                .and_then(|index| record.get(index))
                .unwrap_or_default()
                .to_string()
        };
        let mut name = value(indices[0]);
        if let Some(new_name) = corrected_name(&name) {
            info!("Curate: correcting {name:?} -> {new_name:?}");
            name = new_name.to_string();
            names_corrected += 1;
        }
        let is_tool = is_archipelago_tool(&name);
        if is_tool {
            tools_marked += 1;
        }
        rows.push([
            name,
            value(indices[1]),
            value(indices[2]),
            value(indices[3]),
            is_tool.to_string(),
        ]);
    }
    Ok((rows, names_corrected, tools_marked))
}

fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(str::is_empty)
}

fn write_rows(rows: &[CuratedRow]) -> Result<Vec<u8>, String> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    writer
        .write_record(OUTPUT_COLUMNS)
        .map_err(|error| error.to_string())?;
    for row in rows {
        writer
            .write_record(row)
            .map_err(|error| error.to_string())?;
    }
    writer.into_inner().map_err(|error| error.to_string())
}
