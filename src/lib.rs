//! # Arena Synergy - Card co-occurrence and synergy statistics
//!
//! Statistical aggregation and scoring engine over streamed MTG Arena deck and
//! match observations.
//!
//! Arena Synergy provides:
//! - Per-format card frequency and pair co-occurrence counters
//! - Pointwise mutual information (PMI) scoring over a format snapshot
//! - Confidence-weighted win-rate synergy between card pairs
//! - Archetype performance and matchup tables
//! - Add/remove/swap deck suggestions with a user-driven lifecycle
//! - SQLite-backed storage where every batch commits atomically

pub mod card;
pub mod confidence;
pub mod frequency;
pub mod cooccurrence;
pub mod synergy;
pub mod archetype;
pub mod suggestion;
pub mod ingest;
pub mod storage;
pub mod engine;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use card::{CardId, CardPair};
pub use confidence::confidence;
pub use synergy::{synergy_score, CombinationDelta, CombinationKey, CombinationStats, MIN_GAMES_FOR_SYNERGY};
pub use suggestion::{MlSuggestion, SuggestionState, SuggestionType};
pub use engine::SynergyEngine;
pub use storage::SqliteStore;

/// Result type alias for Arena Synergy operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Arena Synergy operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Invalid card pair: card {0} paired with itself")]
    InvalidPair(CardId),

    #[error("Invalid delta: {0}")]
    InvalidDelta(String),

    #[error("Suggestion not found: {0}")]
    SuggestionNotFound(i64),

    #[error("Suggestion {id} cannot be {action} while {from}")]
    InvalidTransition {
        id: i64,
        from: SuggestionState,
        action: &'static str,
    },

    #[error("Invalid suggestion: {0}")]
    InvalidSuggestion(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
