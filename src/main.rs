mod build_error;
mod build_pipeline;
mod catalog_search;
mod config;
mod dataset_writer;
mod enrichment_cache;
mod enrichment_manager;
mod game_data;
mod list_curation;
mod metadata_sources;
mod request_pacer;
mod source_reader;

use std::path::PathBuf;
use std::process::ExitCode;

use build_error::BuildError;
use build_pipeline::{run_build, BuildOutcome};
use catalog_search::{parse_selection, CatalogFilter, FacetOptions};
use clap::{Args, Parser, Subcommand};
use config::{load_config, Config};
use dataset_writer::read_artifact;
use list_curation::curate;
use log::{error, info, LevelFilter};
use metadata_sources::rawg::RawgClient;
use metadata_sources::GameMetadataSource;

#[derive(Parser, Debug)]
#[command(
    name = "archipelago-directory",
    about = "Build and search the enriched Archipelago game directory"
)]
struct Cli {
    /// TOML config file; defaults to ./archipelago-directory.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log per-request detail.
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse the master list, enrich it, and write the games data file.
    Build(BuildArgs),
    /// Correct known names and flag Archipelago tools in the master list.
    Curate,
    /// Filter a previously built games data file.
    Search(SearchArgs),
}

#[derive(Args, Debug)]
struct BuildArgs {
    /// Regenerate even when the CSV hash is unchanged.
    #[arg(long, default_value_t = false)]
    force: bool,

    /// Use cached enrichment only; uncached games stay unenriched.
    #[arg(long, default_value_t = false)]
    offline: bool,

    /// Fetch again any cached lookups that previously failed.
    #[arg(long, default_value_t = false)]
    retry_failed: bool,

    #[arg(long, env = "RAWG_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

#[derive(Args, Debug)]
struct SearchArgs {
    /// Case-insensitive text matched against name, status, platform, and emulator.
    #[arg(default_value = "")]
    query: String,

    /// Comma-separated statuses, e.g. `Official,Stable`.
    #[arg(long)]
    status: Option<String>,

    #[arg(long)]
    platform: Option<String>,

    #[arg(long)]
    emulator: Option<String>,

    #[arg(long)]
    genre: Option<String>,

    /// First letter of the game name.
    #[arg(long)]
    letter: Option<char>,

    /// Print the available filter values instead of matches.
    #[arg(long, default_value_t = false)]
    facets: bool,

    /// Games data file; defaults to the configured build output.
    #[arg(long)]
    dataset: Option<PathBuf>,
}

/// Applies `--api-key` and `--retry-failed` on top of the loaded config.
fn apply_build_overrides(mut config: Config, args: &BuildArgs) -> Config {
    if let Some(api_key) = args.api_key.as_deref() {
        config.enrichment.api_key = api_key.trim().to_string();
    }
    config.enrichment.retry_failed |= args.retry_failed;
    config
}

/// RAWG client for an online build, `None` offline.
fn metadata_client(config: &Config, offline: bool) -> Result<Option<RawgClient>, BuildError> {
    if offline {
        info!("Build: offline mode, skipping RAWG lookups");
        return Ok(None);
    }
    if config.enrichment.api_key.is_empty() {
        return Err(BuildError::MissingApiKey);
    }
    Ok(Some(RawgClient::new(&config.enrichment)))
}

fn run_build_command(config: Config, args: BuildArgs) -> Result<(), BuildError> {
    let config = apply_build_overrides(config, &args);
    let mut client = metadata_client(&config, args.offline)?;
    let source = client
        .as_mut()
        .map(|client| client as &mut dyn GameMetadataSource);

    match run_build(&config, args.force, source)? {
        BuildOutcome::Skipped { csv_hash } => {
            info!("Build: games data already matches CSV hash {csv_hash}")
        }
        BuildOutcome::Built(summary) => info!(
            "Build: wrote {} games for CSV hash {}",
            summary.games_parsed, summary.csv_hash
        ),
    }
    Ok(())
}

fn run_search_command(config: Config, args: SearchArgs) -> Result<(), BuildError> {
    let dataset = args.dataset.unwrap_or(config.paths.dataset_output);
    let artifact = read_artifact(&dataset)?;

    if args.facets {
        let facets = FacetOptions::from_games(&artifact.games);
        println!("Status: {}", facets.statuses.join(", "));
        println!("Platform: {}", facets.platforms.join(", "));
        println!("Emulator: {}", facets.emulators.join(", "));
        println!("Genre: {}", facets.genres.join(", "));
        return Ok(());
    }

    let selection = |raw: Option<String>| raw.as_deref().map(parse_selection).unwrap_or_default();
    let filter = CatalogFilter {
        query: args.query,
        statuses: selection(args.status),
        platforms: selection(args.platform),
        emulators: selection(args.emulator),
        genres: selection(args.genre),
        letter: args.letter,
    };
    let matches = filter.apply(&artifact.games);
    for game in &matches {
        let emulator = if game.emulator.is_empty() {
            String::new()
        } else {
            format!(" via {}", game.emulator)
        };
        let year = game
            .release_year
            .map(|year| format!(" ({year})"))
            .unwrap_or_default();
        let tool = if game.is_tool { " [tool]" } else { "" };
        println!(
            "{}{year} | {} | {}{emulator}{tool}",
            game.name, game.status, game.platform
        );
    }
    info!(
        "Search: {} of {} games matched",
        matches.len(),
        artifact.games.len()
    );
    Ok(())
}

fn run(cli: Cli) -> Result<(), BuildError> {
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Build(args) => run_build_command(config, args),
        Command::Curate => curate(&config.paths.source_csv, &config.paths.backup_csv).map(|_| ()),
        Command::Search(args) => run_search_command(config, args),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut clog = colog::default_builder();
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    clog.filter(None, level);
    clog.init();

    std::panic::set_hook(Box::new(|panic_info| {
        let current_thread = std::thread::current();
        let thread_name = current_thread.name().unwrap_or("unnamed");
        log::error!("panic in thread '{}': {}", thread_name, panic_info);
    }));

    ExitCode::from(exit_status(run(cli)))
}

/// Process exit status: 0 on success, 1 after logging a fatal error.
fn exit_status(result: Result<(), BuildError>) -> u8 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            error!("{err}");
            1
        }
    }
}
