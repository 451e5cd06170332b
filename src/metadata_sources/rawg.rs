//! RAWG video game database adapter backed by `ureq`.

use std::io::Read;
use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use log::{debug, warn};
use serde::Deserialize;
use serde_json::Value;

use crate::config::EnrichmentConfig;
use crate::game_data::{EnrichmentLookup, GameEnrichment};
use crate::metadata_sources::GameMetadataSource;
use crate::request_pacer::RequestPacer;

const RAWG_SOURCE_NAME: &str = "RAWG";
const RAWG_USER_AGENT: &str = "archipelago-directory/0.1.0 (games data build)";
const MULTIPLAYER_KEYWORDS: [&str; 5] = [
    "multiplayer",
    "co-op",
    "online",
    "local multiplayer",
    "split screen",
];

#[derive(Debug, Clone, Default, Deserialize)]
struct RawgNamed {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawgGame {
    #[serde(default)]
    genres: Option<Vec<RawgNamed>>,
    #[serde(default)]
    released: Option<String>,
    #[serde(default)]
    tags: Option<Vec<RawgNamed>>,
}

#[derive(Debug)]
enum SearchBody {
    ApiError(String),
    Results(Vec<Value>),
    InvalidFormat,
}

fn classify_search_body(body: Value) -> SearchBody {
    let Value::Object(mut object) = body else {
        return SearchBody::InvalidFormat;
    };
    if let Some(Value::String(message)) = object.get("error") {
        return SearchBody::ApiError(message.clone());
    }
    match object.remove("results") {
        Some(Value::Array(results)) => SearchBody::Results(results),
        _ => SearchBody::InvalidFormat,
    }
}

/// Returns `true` when any tag name mentions a multiplayer keyword.
pub fn has_multiplayer_support<'a>(tag_names: impl IntoIterator<Item = &'a str>) -> bool {
    tag_names.into_iter().any(|tag| {
        let tag = tag.to_lowercase();
        MULTIPLAYER_KEYWORDS
            .iter()
            .any(|keyword| tag.contains(keyword))
    })
}

/// Extracts the year from a `YYYY-MM-DD` (or bare `YYYY`) release date.
pub fn extract_release_year(released: Option<&str>) -> Option<i32> {
    let released = released?.trim();
    if released.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(released, "%Y-%m-%d") {
        return Some(date.year());
    }
    if released.len() == 4 && released.chars().all(|ch| ch.is_ascii_digit()) {
        return released.parse().ok();
    }
    None
}

fn enrichment_from_game(game: &RawgGame) -> GameEnrichment {
    let genres = game
        .genres
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(|genre| genre.name.clone())
        .filter(|name| !name.is_empty())
        .collect();
    let is_multiplayer = has_multiplayer_support(
        game.tags
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|tag| tag.name.as_str()),
    );
    GameEnrichment {
        genres,
        release_year: extract_release_year(game.released.as_deref()),
        is_multiplayer,
    }
}

/// Converts a decoded search response into a lookup result.
fn lookup_from_body(game_name: &str, body: Value) -> EnrichmentLookup {
    match classify_search_body(body) {
        SearchBody::ApiError(message) => {
            warn!("RAWG: API error for {game_name:?}: {message}");
            EnrichmentLookup::failed()
        }
        SearchBody::InvalidFormat => {
            warn!("RAWG: invalid response format for {game_name:?}");
            EnrichmentLookup::failed()
        }
        SearchBody::Results(results) => {
            let Some(first) = results.into_iter().next() else {
                debug!("RAWG: no results for {game_name:?}");
                return EnrichmentLookup::not_found();
            };
            match serde_json::from_value::<RawgGame>(first) {
                Ok(game) => {
                    let enrichment = enrichment_from_game(&game);
                    if enrichment.is_empty() {
                        debug!("RAWG: top result for {game_name:?} carries no usable metadata");
                    }
                    EnrichmentLookup::matched(enrichment)
                }
                Err(error) => {
                    warn!("RAWG: invalid result for {game_name:?}: {error}");
                    EnrichmentLookup::failed()
                }
            }
        }
    }
}

/// Paced RAWG search client; one instance owns its own request spacing.
pub struct RawgClient {
    http_client: ureq::Agent,
    api_base_url: String,
    api_key: String,
    pacer: RequestPacer,
}

impl RawgClient {
    pub fn new(settings: &EnrichmentConfig) -> Self {
        let http_client = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(settings.connect_timeout_secs))
            .timeout_read(Duration::from_secs(settings.read_timeout_secs))
            .timeout_write(Duration::from_secs(settings.read_timeout_secs))
            .build();
        let client = Self {
            http_client,
            api_base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            pacer: RequestPacer::new(Duration::from_millis(settings.request_interval_ms)),
        };
        debug!(
            "RAWG: using {} with {:?} between requests",
            client.api_base_url,
            client.pacer.interval()
        );
        client
    }

    fn search_url(&self, game_name: &str) -> String {
        format!(
            "{}/games?key={}&search={}&page_size=1",
            self.api_base_url,
            urlencoding::encode(&self.api_key),
            urlencoding::encode(game_name)
        )
    }

    fn fetch_search_body(&self, game_name: &str) -> Result<Value, String> {
        let response = self
            .http_client
            .get(&self.search_url(game_name))
            .set("User-Agent", RAWG_USER_AGENT)
            .set("Accept", "application/json")
            .call()
            .map_err(|error| match error {
                ureq::Error::Status(code, _) => format!("HTTP {code}"),
                ureq::Error::Transport(transport) => format!("Request failed: {transport}"),
            })?;
        let mut body = String::new();
        response
            .into_reader()
            .read_to_string(&mut body)
            .map_err(|error| format!("Failed to read response: {error}"))?;
        serde_json::from_str(&body).map_err(|error| format!("Invalid JSON response: {error}"))
    }

    /// Searches RAWG for `game_name`, waiting for the next request slot first.
    pub fn search_game(&self, game_name: &str) -> EnrichmentLookup {
        self.pacer.wait_turn();
        match self.fetch_search_body(game_name) {
            Ok(body) => lookup_from_body(game_name, body),
            Err(error) => {
                warn!("RAWG: {error} for {game_name:?}");
                EnrichmentLookup::failed()
            }
        }
    }
}

impl GameMetadataSource for RawgClient {
    fn source_name(&self) -> &'static str {
        RAWG_SOURCE_NAME
    }

    fn lookup(&mut self, game_name: &str) -> Result<EnrichmentLookup, String> {
        Ok(self.search_game(game_name))
    }
}

#[cfg(test)]
mod tests {
    use super::{
        classify_search_body, extract_release_year, has_multiplayer_support, lookup_from_body,
        RawgClient, SearchBody,
    };
    use crate::config::EnrichmentConfig;
    use crate::game_data::LookupOutcome;
    use serde_json::json;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread::JoinHandle;
    use std::time::{Duration, Instant};

    /// Serves one canned response per accepted connection, returning request lines.
    fn spawn_responder(responses: Vec<(u16, String)>) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("listener should bind");
        let address = listener.local_addr().expect("listener should have address");
        let handle = std::thread::spawn(move || {
            let mut request_lines = Vec::new();
            for (status, body) in responses {
                let (mut stream, _) = listener.accept().expect("client should connect");
                let mut request = Vec::new();
                let mut buffer = [0u8; 1024];
                while !request.windows(4).any(|window| window == b"\r\n\r\n") {
                    let read = stream.read(&mut buffer).expect("request should read");
                    if read == 0 {
                        break;
                    }
                    request.extend_from_slice(&buffer[..read]);
                }
                let text = String::from_utf8_lossy(&request);
                request_lines.push(text.lines().next().unwrap_or_default().to_string());
                let response = format!(
                    "HTTP/1.1 {status} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                stream
                    .write_all(response.as_bytes())
                    .expect("response should write");
            }
            request_lines
        });
        (format!("http://{address}/api"), handle)
    }

    fn test_settings(base_url: &str, interval_ms: u64) -> EnrichmentConfig {
        EnrichmentConfig {
            api_base_url: base_url.to_string(),
            api_key: "test-key".to_string(),
            request_interval_ms: interval_ms,
            ..EnrichmentConfig::default()
        }
    }

    fn celeste_body() -> String {
        json!({
            "count": 1,
            "results": [{
                "name": "Celeste",
                "released": "2018-01-25",
                "genres": [{"name": "Platformer"}, {"name": "Indie"}],
                "tags": [{"name": "Singleplayer"}, {"name": "Great Soundtrack"}]
            }]
        })
        .to_string()
    }

    #[test]
    fn test_multiplayer_detection_matches_keywords_case_insensitively() {
        assert!(has_multiplayer_support(["Co-op Campaign"]));
        assert!(has_multiplayer_support(["Atmospheric", "Online PvP"]));
        assert!(has_multiplayer_support(["Split Screen"]));
        assert!(!has_multiplayer_support(["Singleplayer"]));
        assert!(!has_multiplayer_support(Vec::<&str>::new()));
    }

    #[test]
    fn test_release_year_extraction() {
        assert_eq!(extract_release_year(Some("1998-11-21")), Some(1998));
        assert_eq!(extract_release_year(Some("2004")), Some(2004));
        assert_eq!(extract_release_year(None), None);
        assert_eq!(extract_release_year(Some("")), None);
        assert_eq!(extract_release_year(Some("TBA")), None);
        assert_eq!(extract_release_year(Some("1998-13-45")), None);
    }

    #[test]
    fn test_classify_search_body_distinguishes_envelopes() {
        assert!(matches!(
            classify_search_body(json!({"error": "The key is invalid"})),
            SearchBody::ApiError(message) if message == "The key is invalid"
        ));
        assert!(matches!(
            classify_search_body(json!({"results": []})),
            SearchBody::Results(results) if results.is_empty()
        ));
        assert!(matches!(
            classify_search_body(json!({"results": "nope"})),
            SearchBody::InvalidFormat
        ));
        assert!(matches!(
            classify_search_body(json!(["not", "an", "object"])),
            SearchBody::InvalidFormat
        ));
    }

    #[test]
    fn test_lookup_from_body_derives_enrichment_from_top_result() {
        let body = serde_json::from_str(&celeste_body()).expect("fixture should parse");
        let lookup = lookup_from_body("Celeste", body);

        assert_eq!(lookup.outcome, LookupOutcome::Matched);
        assert_eq!(
            lookup.enrichment.genres,
            vec!["Platformer".to_string(), "Indie".to_string()]
        );
        assert_eq!(lookup.enrichment.release_year, Some(2018));
        assert!(!lookup.enrichment.is_multiplayer);
    }

    #[test]
    fn test_lookup_from_body_handles_missing_optional_fields() {
        let lookup = lookup_from_body(
            "Obscure Hack",
            json!({"results": [{"name": "Obscure Hack", "released": null}]}),
        );

        assert_eq!(lookup.outcome, LookupOutcome::Matched);
        assert!(lookup.enrichment.genres.is_empty());
        assert_eq!(lookup.enrichment.release_year, None);
        assert!(!lookup.enrichment.is_multiplayer);
    }

    #[test]
    fn test_empty_results_and_errors_share_empty_shape() {
        let not_found = lookup_from_body("Nothing", json!({"results": []}));
        let api_error = lookup_from_body("Nothing", json!({"error": "quota exceeded"}));

        assert_eq!(not_found.outcome, LookupOutcome::NotFound);
        assert_eq!(api_error.outcome, LookupOutcome::Failed);
        assert_eq!(not_found.enrichment, api_error.enrichment);
        assert!(not_found.enrichment.is_empty());
    }

    #[test]
    fn test_search_game_sends_encoded_query_and_parses_response() {
        let (base_url, server) = spawn_responder(vec![(200, celeste_body())]);
        let client = RawgClient::new(&test_settings(&base_url, 0));

        let lookup = client.search_game("Super Metroid & Co");
        let request_lines = server.join().expect("server thread should finish");

        assert_eq!(lookup.outcome, LookupOutcome::Matched);
        assert_eq!(lookup.enrichment.release_year, Some(2018));
        assert_eq!(
            request_lines[0],
            "GET /api/games?key=test-key&search=Super%20Metroid%20%26%20Co&page_size=1 HTTP/1.1"
        );
    }

    #[test]
    fn test_search_game_http_error_yields_failed_lookup() {
        let (base_url, server) =
            spawn_responder(vec![(500, "{\"detail\":\"boom\"}".to_string())]);
        let client = RawgClient::new(&test_settings(&base_url, 0));

        let lookup = client.search_game("Celeste");
        server.join().expect("server thread should finish");

        assert_eq!(lookup.outcome, LookupOutcome::Failed);
        assert!(lookup.enrichment.is_empty());
    }

    #[test]
    fn test_search_game_malformed_body_yields_failed_lookup() {
        let (base_url, server) = spawn_responder(vec![(200, "<html>busy</html>".to_string())]);
        let client = RawgClient::new(&test_settings(&base_url, 0));

        let lookup = client.search_game("Celeste");
        server.join().expect("server thread should finish");

        assert_eq!(lookup.outcome, LookupOutcome::Failed);
    }

    #[test]
    fn test_search_game_network_failure_yields_failed_lookup() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("listener should bind");
        let address = listener.local_addr().expect("listener should have address");
        drop(listener);
        let client = RawgClient::new(&test_settings(&format!("http://{address}/api"), 0));

        let lookup = client.search_game("Celeste");

        assert_eq!(lookup.outcome, LookupOutcome::Failed);
        assert!(lookup.enrichment.is_empty());
    }

    #[test]
    fn test_consecutive_searches_respect_request_interval() {
        let responses = (0..3).map(|_| (200, celeste_body())).collect();
        let (base_url, server) = spawn_responder(responses);
        let interval = Duration::from_millis(30);
        let client = RawgClient::new(&test_settings(&base_url, 30));

        let started = Instant::now();
        for _ in 0..3 {
            client.search_game("Celeste");
        }
        let elapsed = started.elapsed();
        server.join().expect("server thread should finish");

        assert!(elapsed + Duration::from_millis(1) >= interval * 2);
    }
}
