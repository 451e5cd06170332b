//! In-memory search and facet listing over a loaded games dataset.

use std::collections::BTreeSet;

use crate::game_data::GameRecord;

/// Search criteria; empty fields match every game.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogFilter {
    pub query: String,
    pub statuses: Vec<String>,
    pub platforms: Vec<String>,
    pub emulators: Vec<String>,
    pub genres: Vec<String>,
    pub letter: Option<char>,
}

impl CatalogFilter {
    pub fn matches(&self, game: &GameRecord) -> bool {
        self.matches_query(game)
            && selected(&self.statuses, &game.status)
            && selected(&self.platforms, &game.platform)
            && selected(&self.emulators, &game.emulator)
            && (self.genres.is_empty()
                || game.genres.iter().any(|genre| self.genres.contains(genre)))
            && self.matches_letter(game)
    }

    /// Matching games in their original order.
    pub fn apply<'a>(&self, games: &'a [GameRecord]) -> Vec<&'a GameRecord> {
        games.iter().filter(|game| self.matches(game)).collect()
    }

    fn matches_query(&self, game: &GameRecord) -> bool {
        let query = self.query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        [&game.name, &game.status, &game.platform, &game.emulator]
            .iter()
            .any(|field| field.to_lowercase().contains(&query))
    }

    fn matches_letter(&self, game: &GameRecord) -> bool {
        let Some(letter) = self.letter else {
            return true;
        };
        game.name
            .chars()
            .next()
            .is_some_and(|first| first.to_lowercase().eq(letter.to_lowercase()))
    }
}

fn selected(values: &[String], value: &str) -> bool {
    values.is_empty() || values.iter().any(|candidate| candidate == value)
}

/// Splits a comma-separated selection such as `Official,Stable`.
pub fn parse_selection(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}

/// Distinct, sorted, non-empty values offered by each filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacetOptions {
    pub statuses: Vec<String>,
    pub platforms: Vec<String>,
    pub emulators: Vec<String>,
    pub genres: Vec<String>,
}

impl FacetOptions {
    pub fn from_games(games: &[GameRecord]) -> Self {
        let mut statuses = BTreeSet::new();
        let mut platforms = BTreeSet::new();
        let mut emulators = BTreeSet::new();
        let mut genres = BTreeSet::new();
        for game in games {
            statuses.insert(game.status.as_str());
            platforms.insert(game.platform.as_str());
            emulators.insert(game.emulator.as_str());
            genres.extend(game.genres.iter().map(String::as_str));
        }
        Self {
            statuses: non_empty(statuses),
            platforms: non_empty(platforms),
            emulators: non_empty(emulators),
            genres: non_empty(genres),
        }
    }
}

fn non_empty(values: BTreeSet<&str>) -> Vec<String> {
    values
        .into_iter()
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}
