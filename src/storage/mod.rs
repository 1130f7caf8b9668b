//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with tables:
//! - card_frequency(card_id, format, deck_count) + format_totals(format, total_decks)
//! - card_cooccurrence(card_a_id, card_b_id, format, count, pmi_score)
//! - card_combination_stats(card_id_1, card_id_2, deck_id, format, counters, scores)
//! - card_individual_stats(card_id, format, total_games, wins)
//! - matchup_statistics(account_id, player_archetype, opponent_archetype, format, ...)
//! - archetype_stats(archetype, format, totals)
//! - ml_suggestions(id, deck_id, type, card, lifecycle flags, reasoning JSON)
//! - processed_matches(match_id, format)
//!
//! Query modules are free functions over a `&Connection`, so the same code
//! runs on the bare connection or inside a batch transaction.

pub(crate) mod combination;
pub(crate) mod cooccurrence;
pub(crate) mod frequency;
pub(crate) mod matchup;
pub mod schema;
pub mod sqlite;
pub(crate) mod suggestion;

pub use sqlite::{DbStats, SqliteStore};
