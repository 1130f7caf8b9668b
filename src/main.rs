//! Arena Synergy CLI - card co-occurrence and synergy statistics for MTG Arena

use anyhow::Context;
use arena_synergy::archetype::MatchupKey;
use arena_synergy::config::{self, ArenaSynergyConfig};
use arena_synergy::ingest::{read_json_lines, DeckObservation, MatchObservation};
use arena_synergy::suggestion::{CardCatalog, NoCatalog};
use arena_synergy::ui::{self, Icons};
use arena_synergy::{CardId, SynergyEngine};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};


#[derive(Parser)]
#[command(name = "arena-synergy")]
#[command(version = "0.0.1")]
#[command(about = "Card co-occurrence, synergy and matchup statistics for MTG Arena")]
#[command(long_about = r#"
Arena Synergy accumulates deck lists and match results, then derives:
  • How often card pairs are played together (PMI)
  • Win-rate synergy between card pairs
  • Archetype and matchup win rates
  • Add / remove / swap suggestions for a deck

Example usage:
  arena-synergy ingest-decks --file decks.jsonl --source-type tournament
  arena-synergy ingest-matches --file matches.jsonl
  arena-synergy recompute --format standard
  arena-synergy synergies --card 87012 --format standard
  arena-synergy suggest --deck my-deck --cards 87012,87013,87044
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print machine-readable JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    /// Path to the database file (overrides the config file)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Path to the config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// JSON object mapping card ids to names, used for display
    #[arg(long, global = true)]
    names: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Ingest deck lists (JSON Lines of {deck_id, format, cards})
    IngestDecks {
        #[arg(short, long)]
        file: PathBuf,

        /// Kind of source the decks came from
        #[arg(long, default_value = "local")]
        source_type: String,

        /// Source identifier (defaults to the file name)
        #[arg(long)]
        source_id: Option<String>,
    },

    /// Ingest finished matches (JSON Lines), skipping already processed ones
    IngestMatches {
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Recompute PMI and synergy scores for a format
    Recompute {
        #[arg(short, long)]
        format: Option<String>,
    },

    /// Best win-rate synergy partners of a card
    Synergies {
        #[arg(short, long)]
        card: u32,

        #[arg(short, long)]
        format: Option<String>,

        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Cards most often played alongside a card
    Pairs {
        #[arg(short, long)]
        card: u32,

        #[arg(short, long)]
        format: Option<String>,

        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Synergy report for a deck's card list
    Report {
        #[arg(long)]
        deck: String,

        /// Comma-separated card ids
        #[arg(short, long, value_delimiter = ',', required = true)]
        cards: Vec<u32>,

        #[arg(short, long)]
        format: Option<String>,
    },

    /// Matchup records of an account
    Matchups {
        #[arg(short, long)]
        account: i64,

        #[arg(short, long)]
        format: Option<String>,

        /// Only the N most played matchups (requires a format)
        #[arg(short, long)]
        top: Option<usize>,
    },

    /// Win rate of one archetype against another
    WinRate {
        #[arg(short, long)]
        account: i64,

        #[arg(long)]
        player: String,

        #[arg(long)]
        opponent: String,

        #[arg(short, long)]
        format: Option<String>,
    },

    /// Archetype performance in a format
    Archetypes {
        #[arg(short, long)]
        format: Option<String>,

        /// A single archetype
        #[arg(short, long)]
        archetype: Option<String>,
    },

    /// Generate and store suggestions for a deck
    Suggest {
        #[arg(long)]
        deck: String,

        /// Comma-separated card ids
        #[arg(short, long, value_delimiter = ',', required = true)]
        cards: Vec<u32>,

        #[arg(short, long)]
        format: Option<String>,
    },

    /// List stored suggestions for a deck
    Suggestions {
        #[arg(long)]
        deck: String,

        /// Only suggestions still awaiting a decision
        #[arg(long)]
        active: bool,
    },

    /// Dismiss a suggestion
    Dismiss { id: i64 },

    /// Mark a suggestion as applied
    Apply { id: i64 },

    /// Record the measured win-rate change of an applied suggestion
    Outcome {
        id: i64,

        /// Win-rate change in percentage points
        #[arg(allow_hyphen_values = true)]
        change: f64,
    },

    /// Delete every counter and score of a format
    Clear {
        #[arg(short, long)]
        format: String,
    },

    /// Show database statistics
    Stats,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    if let Err(err) = run(cli) {
        ui::error(&format!("{:#}", err));
        std::process::exit(1);
    }
    Ok(())
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);

    if let Commands::Init { force } = cli.command {
        ArenaSynergyConfig::initial(Path::new(".")).write(&config_path, force)?;
        ui::success(&format!("Wrote {}", config_path.display()));
        return Ok(());
    }

    let settings = ArenaSynergyConfig::load(&config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;
    let database = settings.resolve_database(cli.database.clone(), Path::new("."))?;

    let mut engine = SynergyEngine::open(&database, settings.engine.clone())
        .with_context(|| format!("opening database {}", database.display()))?;
    let catalog = load_catalog(cli.names.as_deref())?;
    let pick_format = |format: Option<String>| settings.resolve_format(format);

    match cli.command {
        // written before the database is opened
        Commands::Init { .. } => {}

        Commands::IngestDecks { file, source_type, source_id } => {
            let decks: Vec<DeckObservation> = read_json_lines(BufReader::new(File::open(&file)?))?;
            let source_id = source_id.unwrap_or_else(|| {
                file.file_name()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_else(|| "unknown".to_string())
            });
            let summary = engine.ingest_decks(&source_type, &source_id, &decks)?;
            if cli.json {
                print_json(&summary)?;
            } else {
                ui::header(&format!("Ingested {} deck lists from {}", decks.len(), source_id));
                println!("{}", summary);
            }
        }

        Commands::IngestMatches { file } => {
            let matches: Vec<MatchObservation> = read_json_lines(BufReader::new(File::open(&file)?))?;
            let summary = engine.ingest_matches(&matches)?;
            if cli.json {
                print_json(&summary)?;
            } else {
                ui::header(&format!("Ingested matches from {}", file.display()));
                println!("{}", summary);
            }
        }

        Commands::Recompute { format } => {
            let format = pick_format(format);
            let summary = engine.recompute(&format)?;
            if cli.json {
                print_json(&summary)?;
            } else {
                ui::success(&format!("Recomputed {}", format));
                println!("{}", summary);
            }
        }

        Commands::Synergies { card, format, limit } => {
            let format = pick_format(format);
            let card = CardId(card);
            let partners = engine.top_synergies_for_card(card, &format, limit)?;
            if cli.json {
                print_json(&partners)?;
            } else if partners.is_empty() {
                ui::warn(&format!("No synergy data for {} in {}", catalog.display_name(card), format));
            } else {
                ui::header(&format!("Synergies of {} ({})", catalog.display_name(card), format));
                println!("{}", ui::synergy_table(&partners, catalog.as_ref()));
            }
        }

        Commands::Pairs { card, format, limit } => {
            let format = pick_format(format);
            let card = CardId(card);
            let partners = engine.top_pairs_for(card, &format, limit)?;
            if cli.json {
                print_json(&partners)?;
            } else if partners.is_empty() {
                ui::warn(&format!("{} has no recorded pairs in {}", catalog.display_name(card), format));
            } else {
                ui::header(&format!("Played with {} ({})", catalog.display_name(card), format));
                println!("{}", ui::pairs_table(&partners, catalog.as_ref()));
            }
        }

        Commands::Report { deck, cards, format } => {
            let format = pick_format(format);
            let cards: Vec<CardId> = cards.into_iter().map(CardId).collect();
            let report = engine.synergy_report(&deck, &format, &cards)?;
            if cli.json {
                print_json(&report)?;
            } else {
                ui::header(&format!("Synergy report for {}", deck));
                ui::summary_row("Cards:", &report.card_count.to_string());
                ui::summary_row("Pairs with data:", &report.total_pairs.to_string());
                ui::summary_row("Average synergy:", &ui::signed(report.avg_synergy_score));
                if !report.synergies.is_empty() {
                    println!("{}", ui::report_table(&report.synergies, catalog.as_ref()));
                }
            }
        }

        Commands::Matchups { account, format, top } => {
            let matchups = match top {
                Some(limit) => engine.top_matchups(account, &pick_format(format), limit)?,
                None => engine.list_matchups(account, format.as_deref())?,
            };
            if cli.json {
                print_json(&matchups)?;
            } else if matchups.is_empty() {
                ui::warn(&format!("No matchups recorded for account {}", account));
            } else {
                ui::header(&format!("{} Matchups for account {}", Icons::SWORDS, account));
                println!("{}", ui::matchup_table(&matchups));
            }
        }

        Commands::WinRate { account, player, opponent, format } => {
            let key = MatchupKey::new(account, &player, &opponent, &pick_format(format));
            let win_rate = engine.matchup_win_rate(&key)?;
            if cli.json {
                print_json(&serde_json::json!({ "matchup": key, "winRate": win_rate }))?;
            } else {
                ui::info(&format!("{} vs {}", player, opponent), &ui::percent(win_rate));
            }
        }

        Commands::Archetypes { format, archetype } => {
            let format = pick_format(format);
            let archetypes: Vec<_> = match archetype {
                Some(name) => engine.archetype_performance(&name, &format)?.into_iter().collect(),
                None => engine.store().list_archetypes(&format)?,
            };
            if cli.json {
                print_json(&archetypes)?;
            } else if archetypes.is_empty() {
                ui::warn(&format!("No archetype results in {}", format));
            } else {
                ui::header(&format!("Archetypes ({})", format));
                println!("{}", ui::archetype_table(&archetypes));
            }
        }

        Commands::Suggest { deck, cards, format } => {
            let format = pick_format(format);
            let cards: Vec<CardId> = cards.into_iter().map(CardId).collect();
            let suggestions = engine.generate_suggestions(&deck, &format, &cards, catalog.as_ref())?;
            if cli.json {
                print_json(&suggestions)?;
            } else if suggestions.is_empty() {
                ui::info("Suggestions", "nothing stands out for this deck");
            } else {
                ui::header(&format!("{} Suggestions for {}", Icons::BULB, deck));
                for s in &suggestions {
                    ui::status(suggestion_icon(s), &s.title, &s.description);
                }
                println!("{}", ui::suggestion_table(&suggestions));
            }
        }

        Commands::Suggestions { deck, active } => {
            let suggestions = if active {
                engine.active_suggestions(&deck)?
            } else {
                engine.suggestions_for_deck(&deck)?
            };
            if cli.json {
                print_json(&suggestions)?;
            } else if suggestions.is_empty() {
                ui::warn(&format!("No suggestions stored for {}", deck));
            } else {
                println!("{}", ui::suggestion_table(&suggestions));
            }
        }

        Commands::Dismiss { id } => {
            let s = engine.dismiss_suggestion(id)?;
            report_transition(cli.json, &s)?;
        }

        Commands::Apply { id } => {
            let s = engine.apply_suggestion(id)?;
            report_transition(cli.json, &s)?;
        }

        Commands::Outcome { id, change } => {
            let s = engine.record_outcome(id, change)?;
            report_transition(cli.json, &s)?;
        }

        Commands::Clear { format } => {
            let removed = engine.store_mut().clear_format(&format)?;
            ui::success(&format!("Cleared {} ({} rows)", format, removed));
        }

        Commands::Stats => {
            let stats = engine.store().stats()?;
            if cli.json {
                print_json(&stats)?;
            } else {
                ui::header(&format!("{} Arena Synergy Statistics ({})", Icons::STATS, database.display()));
                println!(
                    "{}",
                    ui::stats_table(&[
                        ("Tracked cards", stats.cards.to_string()),
                        ("Co-occurring pairs", stats.pairs.to_string()),
                        ("Combination rows", stats.combinations.to_string()),
                        ("Processed matches", stats.processed_matches.to_string()),
                        ("Matchups", stats.matchups.to_string()),
                        ("Suggestions", stats.suggestions.to_string()),
                    ])
                );
            }
        }
    }

    Ok(())
}

fn load_catalog(path: Option<&Path>) -> anyhow::Result<Box<dyn CardCatalog>> {
    let Some(path) = path else {
        return Ok(Box::new(NoCatalog));
    };
    let contents = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let raw: HashMap<u32, String> = serde_json::from_str(&contents)?;
    let names: HashMap<CardId, String> = raw.into_iter().map(|(id, name)| (CardId(id), name)).collect();
    Ok(Box::new(names))
}

fn suggestion_icon(s: &arena_synergy::MlSuggestion) -> &'static str {
    match s.suggestion_type {
        arena_synergy::SuggestionType::Add => Icons::UP,
        arena_synergy::SuggestionType::Remove => Icons::DOWN,
        arena_synergy::SuggestionType::Swap => Icons::SWAP,
    }
}

fn report_transition(json: bool, s: &arena_synergy::MlSuggestion) -> anyhow::Result<()> {
    if json {
        return print_json(s);
    }
    ui::success(&format!("Suggestion {} is now {}", s.id, s.state()));
    ui::summary_row("Title:", &s.title);
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
