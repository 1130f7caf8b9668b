//! Database schema definitions

/// Per-card deck counts; the format total lives in `format_totals`
pub const CREATE_CARD_FREQUENCY_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS card_frequency (
    card_id INTEGER NOT NULL,
    format TEXT NOT NULL,
    deck_count INTEGER NOT NULL DEFAULT 0,
    last_updated TEXT NOT NULL,
    PRIMARY KEY (card_id, format)
)
"#;

/// Number of decks seen per format
pub const CREATE_FORMAT_TOTALS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS format_totals (
    format TEXT PRIMARY KEY,
    total_decks INTEGER NOT NULL DEFAULT 0,
    last_updated TEXT NOT NULL
)
"#;

/// Pair co-occurrence counts, lower card id first
pub const CREATE_CARD_COOCCURRENCE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS card_cooccurrence (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    card_a_id INTEGER NOT NULL,
    card_b_id INTEGER NOT NULL,
    format TEXT NOT NULL,
    count INTEGER NOT NULL DEFAULT 0,
    pmi_score REAL,
    last_updated TEXT NOT NULL,
    pmi_computed_at TEXT,
    UNIQUE(card_a_id, card_b_id, format),
    CHECK (card_a_id < card_b_id)
)
"#;

/// Deck sources that fed a format
pub const CREATE_COOCCURRENCE_SOURCES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS cooccurrence_sources (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_type TEXT NOT NULL,
    source_id TEXT NOT NULL,
    format TEXT NOT NULL,
    deck_count INTEGER NOT NULL DEFAULT 0,
    card_count INTEGER NOT NULL DEFAULT 0,
    last_synced TEXT NOT NULL,
    UNIQUE(source_type, source_id, format)
)
"#;

/// Win-rate counters per card pair; deck_id '' means format-wide
pub const CREATE_CARD_COMBINATION_STATS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS card_combination_stats (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    card_id_1 INTEGER NOT NULL,
    card_id_2 INTEGER NOT NULL,
    deck_id TEXT NOT NULL DEFAULT '',
    format TEXT NOT NULL,
    games_together INTEGER NOT NULL DEFAULT 0,
    games_card1_only INTEGER NOT NULL DEFAULT 0,
    games_card2_only INTEGER NOT NULL DEFAULT 0,
    wins_together INTEGER NOT NULL DEFAULT 0,
    wins_card1_only INTEGER NOT NULL DEFAULT 0,
    wins_card2_only INTEGER NOT NULL DEFAULT 0,
    games_card1_derived INTEGER NOT NULL DEFAULT 0,
    wins_card1_derived INTEGER NOT NULL DEFAULT 0,
    games_card2_derived INTEGER NOT NULL DEFAULT 0,
    wins_card2_derived INTEGER NOT NULL DEFAULT 0,
    synergy_score REAL NOT NULL DEFAULT 0,
    confidence_score REAL NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    scores_computed_at TEXT,
    UNIQUE(card_id_1, card_id_2, deck_id, format),
    CHECK (card_id_1 < card_id_2)
)
"#;

/// Every game a card appeared in
pub const CREATE_CARD_INDIVIDUAL_STATS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS card_individual_stats (
    card_id INTEGER NOT NULL,
    format TEXT NOT NULL,
    total_games INTEGER NOT NULL DEFAULT 0,
    wins INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (card_id, format)
)
"#;

pub const CREATE_MATCHUP_STATISTICS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS matchup_statistics (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    account_id INTEGER NOT NULL,
    player_archetype TEXT NOT NULL,
    opponent_archetype TEXT NOT NULL,
    format TEXT NOT NULL,
    total_matches INTEGER NOT NULL DEFAULT 0,
    wins INTEGER NOT NULL DEFAULT 0,
    losses INTEGER NOT NULL DEFAULT 0,
    avg_game_duration INTEGER,
    last_match_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(account_id, player_archetype, opponent_archetype, format)
)
"#;

/// Archetype totals; averages are derived on read
pub const CREATE_ARCHETYPE_STATS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS archetype_stats (
    archetype TEXT NOT NULL,
    format TEXT NOT NULL,
    total_matches INTEGER NOT NULL DEFAULT 0,
    total_wins INTEGER NOT NULL DEFAULT 0,
    duration_sum INTEGER NOT NULL DEFAULT 0,
    duration_samples INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (archetype, format)
)
"#;

pub const CREATE_ML_SUGGESTIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS ml_suggestions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    deck_id TEXT NOT NULL,
    suggestion_type TEXT NOT NULL,
    card_id INTEGER NOT NULL,
    card_name TEXT NOT NULL,
    swap_for_card_id INTEGER,
    swap_for_card_name TEXT,
    confidence REAL NOT NULL,
    expected_win_rate_change REAL NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    reasoning TEXT NOT NULL DEFAULT '[]',
    evidence TEXT NOT NULL DEFAULT '{}',
    is_dismissed INTEGER NOT NULL DEFAULT 0,
    was_applied INTEGER NOT NULL DEFAULT 0,
    outcome_win_rate_change REAL,
    created_at TEXT NOT NULL,
    applied_at TEXT,
    outcome_recorded_at TEXT
)
"#;

/// Matches already folded into the counters
pub const CREATE_PROCESSED_MATCHES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS processed_matches (
    match_id TEXT PRIMARY KEY,
    format TEXT NOT NULL,
    processed_at TEXT NOT NULL
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_cooccurrence_a ON card_cooccurrence(card_a_id, format)",
    "CREATE INDEX IF NOT EXISTS idx_cooccurrence_b ON card_cooccurrence(card_b_id, format)",
    "CREATE INDEX IF NOT EXISTS idx_combination_card1 ON card_combination_stats(card_id_1, format)",
    "CREATE INDEX IF NOT EXISTS idx_combination_card2 ON card_combination_stats(card_id_2, format)",
    "CREATE INDEX IF NOT EXISTS idx_matchup_account ON matchup_statistics(account_id, format)",
    "CREATE INDEX IF NOT EXISTS idx_suggestions_deck ON ml_suggestions(deck_id)",
];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![
        CREATE_CARD_FREQUENCY_TABLE,
        CREATE_FORMAT_TOTALS_TABLE,
        CREATE_CARD_COOCCURRENCE_TABLE,
        CREATE_COOCCURRENCE_SOURCES_TABLE,
        CREATE_CARD_COMBINATION_STATS_TABLE,
        CREATE_CARD_INDIVIDUAL_STATS_TABLE,
        CREATE_MATCHUP_STATISTICS_TABLE,
        CREATE_ARCHETYPE_STATS_TABLE,
        CREATE_ML_SUGGESTIONS_TABLE,
        CREATE_PROCESSED_MATCHES_TABLE,
    ];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
