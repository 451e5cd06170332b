//! External game metadata source abstractions and concrete implementations.

pub mod rawg;

use crate::game_data::EnrichmentLookup;

/// Interface implemented by metadata sources the enrichment manager can query.
///
/// Implementations report ordinary lookup failures through
/// [`EnrichmentLookup::failed`]; `Err` is reserved for unexpected faults.
pub trait GameMetadataSource {
    fn source_name(&self) -> &'static str;
    fn lookup(&mut self, game_name: &str) -> Result<EnrichmentLookup, String>;
}
