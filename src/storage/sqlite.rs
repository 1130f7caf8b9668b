//! SQLite storage implementation

use std::path::Path;

use chrono::Utc;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::{debug, warn};

use super::{combination, cooccurrence, frequency, matchup, schema, suggestion};
use crate::archetype::{ArchetypePerformance, MatchupDelta, MatchupKey, MatchupStatistic};
use crate::card::{CardId, CardPair};
use crate::cooccurrence::{CardCooccurrence, CooccurrencePartner, CooccurrenceSource};
use crate::frequency::CardFrequency;
use crate::suggestion::MlSuggestion;
use crate::synergy::{CardIndividualStats, CombinationDelta, CombinationKey, CombinationStats, SynergyPartner};
use crate::Result;

/// SQLite-backed storage for all counters, derived scores and suggestions
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.initialize_schema()?;
        debug!(path = %path.display(), "opened synergy database");
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize_schema(&self) -> Result<()> {
        for stmt in schema::all_schema_statements() {
            self.conn.execute(stmt, [])?;
        }
        Ok(())
    }

    /// Run `f` inside one IMMEDIATE transaction.
    ///
    /// Commits when `f` returns `Ok`; any error rolls every write back. The
    /// write lock is taken up front, so two batches touching the same format
    /// never interleave.
    pub fn transaction<T>(&mut self, f: impl FnOnce(&Transaction) -> Result<T>) -> Result<T> {
        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = match f(&tx) {
            Ok(value) => value,
            Err(err) => {
                warn!(error = %err, "batch rejected, rolling back");
                return Err(err);
            }
        };
        tx.commit()?;
        Ok(value)
    }

    // ========== Frequency Operations ==========

    /// Count one more deck containing `card`; `new_deck` also bumps the
    /// format total.
    pub fn record_observation(&mut self, card: CardId, format: &str, new_deck: bool) -> Result<()> {
        let now = Utc::now();
        self.transaction(|tx| {
            if new_deck {
                frequency::increment_format_total(tx, format, now)?;
            }
            frequency::increment_card(tx, card, format, now)
        })
    }

    pub fn card_frequency(&self, card: CardId, format: &str) -> Result<Option<CardFrequency>> {
        frequency::get_card_frequency(&self.conn, card, format)
    }

    /// Share of the format's decks playing `card`, 0 when unseen
    pub fn frequency(&self, card: CardId, format: &str) -> Result<f64> {
        Ok(self.card_frequency(card, format)?.map(|f| f.frequency()).unwrap_or(0.0))
    }

    pub fn format_total(&self, format: &str) -> Result<u32> {
        frequency::format_total(&self.conn, format)
    }

    // ========== Co-occurrence Operations ==========

    /// Count one more deck containing both cards, in either order
    pub fn increment_cooccurrence(&mut self, a: CardId, b: CardId, format: &str) -> Result<()> {
        let pair = CardPair::new(a, b)?;
        let now = Utc::now();
        self.transaction(|tx| cooccurrence::increment_pair(tx, pair, format, now))
    }

    pub fn cooccurrence(&self, a: CardId, b: CardId, format: &str) -> Result<Option<CardCooccurrence>> {
        cooccurrence::get_cooccurrence(&self.conn, CardPair::new(a, b)?, format)
    }

    /// Last computed PMI of a pair, 0 when absent or never scored
    pub fn cooccurrence_score(&self, a: CardId, b: CardId, format: &str) -> Result<f64> {
        Ok(self.cooccurrence(a, b, format)?.map(|c| c.pmi_or_zero()).unwrap_or(0.0))
    }

    pub fn top_pairs_for(&self, card: CardId, format: &str, limit: usize) -> Result<Vec<CooccurrencePartner>> {
        let rows = cooccurrence::top_pairs_for(&self.conn, card, format, limit)?;
        Ok(rows.iter().filter_map(|r| CooccurrencePartner::from_row(r, card)).collect())
    }

    pub fn upsert_source(&mut self, source: &CooccurrenceSource) -> Result<()> {
        self.transaction(|tx| cooccurrence::upsert_source(tx, source))
    }

    pub fn sources(&self, format: &str) -> Result<Vec<CooccurrenceSource>> {
        cooccurrence::list_sources(&self.conn, format)
    }

    // ========== Combination Operations ==========

    /// Add a delta to a pair's combination counters and return the merged row.
    ///
    /// `delta` is oriented to `(a, b)` as given; when `a > b` its solo
    /// counters are swapped along with the ids.
    pub fn accumulate(
        &mut self,
        a: CardId,
        b: CardId,
        deck_id: Option<&str>,
        format: &str,
        delta: CombinationDelta,
    ) -> Result<CombinationStats> {
        let (pair, swapped) = CardPair::ordered(a, b)?;
        let delta = if swapped { delta.swapped() } else { delta };
        let key = match deck_id {
            Some(deck) => CombinationKey::for_deck(pair, deck, format),
            None => CombinationKey::format_wide(pair, format),
        };
        let now = Utc::now();
        self.transaction(|tx| combination::accumulate(tx, &key, &delta, now))
    }

    pub fn combination_stats(
        &self,
        a: CardId,
        b: CardId,
        deck_id: Option<&str>,
        format: &str,
    ) -> Result<Option<CombinationStats>> {
        let pair = CardPair::new(a, b)?;
        let key = match deck_id {
            Some(deck) => CombinationKey::for_deck(pair, deck, format),
            None => CombinationKey::format_wide(pair, format),
        };
        combination::get_combination(&self.conn, &key)
    }

    pub fn top_synergies_for_card(&self, card: CardId, format: &str, limit: usize) -> Result<Vec<SynergyPartner>> {
        let rows = combination::top_synergies_for_card(&self.conn, card, format, limit)?;
        Ok(rows.iter().filter_map(|s| SynergyPartner::from_stats(s, card)).collect())
    }

    pub fn pair_stats_among(&self, cards: &[CardId], format: &str) -> Result<Vec<CombinationStats>> {
        combination::pair_stats_among(&self.conn, cards, format)
    }

    /// Every game `card` was in, regardless of partners
    pub fn individual_stats(&self, card: CardId, format: &str) -> Result<Option<CardIndividualStats>> {
        combination::get_individual(&self.conn, card, format)
    }

    pub fn is_match_processed(&self, match_id: &str) -> Result<bool> {
        combination::is_processed(&self.conn, match_id)
    }

    // ========== Matchup Operations ==========

    pub fn record_matchup(&mut self, key: &MatchupKey, delta: &MatchupDelta) -> Result<MatchupStatistic> {
        let now = Utc::now();
        self.transaction(|tx| matchup::record_matchup(tx, key, delta, now))
    }

    pub fn matchup(&self, key: &MatchupKey) -> Result<Option<MatchupStatistic>> {
        matchup::get_matchup(&self.conn, key)
    }

    /// `wins / total_matches`, 0 when the matchup was never played
    pub fn matchup_win_rate(&self, key: &MatchupKey) -> Result<f64> {
        Ok(self.matchup(key)?.map(|m| m.win_rate()).unwrap_or(0.0))
    }

    pub fn top_matchups(&self, account_id: i64, format: &str, limit: usize) -> Result<Vec<MatchupStatistic>> {
        matchup::top_matchups(&self.conn, account_id, format, limit)
    }

    pub fn list_matchups(&self, account_id: i64, format: Option<&str>) -> Result<Vec<MatchupStatistic>> {
        matchup::list_matchups(&self.conn, account_id, format)
    }

    pub fn record_archetype_result(
        &mut self,
        archetype: &str,
        format: &str,
        won: bool,
        duration_secs: Option<u32>,
    ) -> Result<()> {
        let now = Utc::now();
        self.transaction(|tx| matchup::record_archetype_result(tx, archetype, format, won, duration_secs, now))
    }

    pub fn archetype_performance(&self, archetype: &str, format: &str) -> Result<Option<ArchetypePerformance>> {
        matchup::archetype_performance(&self.conn, archetype, format)
    }

    pub fn list_archetypes(&self, format: &str) -> Result<Vec<ArchetypePerformance>> {
        matchup::list_archetypes(&self.conn, format)
    }

    pub fn clear_matchups(&mut self, format: &str) -> Result<usize> {
        self.transaction(|tx| matchup::clear_format(tx, format))
    }

    // ========== Suggestion Operations ==========

    pub fn suggestion(&self, id: i64) -> Result<Option<MlSuggestion>> {
        suggestion::get_suggestion(&self.conn, id)
    }

    pub fn suggestions_for_deck(&self, deck_id: &str) -> Result<Vec<MlSuggestion>> {
        suggestion::suggestions_for_deck(&self.conn, deck_id)
    }

    pub fn active_suggestions(&self, deck_id: &str) -> Result<Vec<MlSuggestion>> {
        suggestion::active_suggestions(&self.conn, deck_id)
    }

    pub fn delete_suggestions_for_deck(&mut self, deck_id: &str) -> Result<usize> {
        self.transaction(|tx| suggestion::delete_for_deck(tx, deck_id))
    }

    // ========== Maintenance ==========

    /// Drop every counter, score and ledger entry of a format
    pub fn clear_format(&mut self, format: &str) -> Result<usize> {
        self.transaction(|tx| {
            let mut removed = frequency::clear_format(tx, format)?;
            removed += cooccurrence::clear_format(tx, format)?;
            removed += combination::clear_format(tx, format)?;
            removed += matchup::clear_format(tx, format)?;
            Ok(removed)
        })
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        Ok(DbStats {
            cards: frequency::count_tracked_cards(&self.conn)?,
            pairs: cooccurrence::count_pairs(&self.conn)?,
            combinations: combination::count_combinations(&self.conn)?,
            processed_matches: combination::count_processed(&self.conn)?,
            matchups: matchup::count_matchups(&self.conn)?,
            suggestions: suggestion::count_suggestions(&self.conn)?,
        })
    }
}

/// Database statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct DbStats {
    pub cards: usize,
    pub pairs: usize,
    pub combinations: usize,
    pub processed_matches: usize,
    pub matchups: usize,
    pub suggestions: usize,
}

impl std::fmt::Display for DbStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database Statistics:")?;
        writeln!(f, "  Tracked cards: {}", self.cards)?;
        writeln!(f, "  Co-occurring pairs: {}", self.pairs)?;
        writeln!(f, "  Combination rows: {}", self.combinations)?;
        writeln!(f, "  Processed matches: {}", self.processed_matches)?;
        writeln!(f, "  Matchups: {}", self.matchups)?;
        writeln!(f, "  Suggestions: {}", self.suggestions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_frequency_unseen_is_zero() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.frequency(CardId(1), "standard").unwrap(), 0.0);
    }

    #[test]
    fn test_record_observation() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.record_observation(CardId(1), "standard", true).unwrap();
        store.record_observation(CardId(2), "standard", false).unwrap();
        store.record_observation(CardId(1), "standard", true).unwrap();

        assert_eq!(store.format_total("standard").unwrap(), 2);
        assert_eq!(store.frequency(CardId(1), "standard").unwrap(), 1.0);
        assert_eq!(store.frequency(CardId(2), "standard").unwrap(), 0.5);
    }

    #[test]
    fn test_self_pair_rejected() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let err = store.increment_cooccurrence(CardId(3), CardId(3), "standard").unwrap_err();
        assert!(matches!(err, Error::InvalidPair(CardId(3))));
        assert_eq!(store.stats().unwrap().pairs, 0);
    }

    #[test]
    fn test_cooccurrence_score_absent_is_zero() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.cooccurrence_score(CardId(1), CardId(2), "standard").unwrap(), 0.0);
        store.increment_cooccurrence(CardId(2), CardId(1), "standard").unwrap();
        assert_eq!(store.cooccurrence(CardId(1), CardId(2), "standard").unwrap().unwrap().count, 1);
        assert_eq!(store.cooccurrence_score(CardId(1), CardId(2), "standard").unwrap(), 0.0);
    }

    #[test]
    fn test_reversed_accumulate_swaps_solo_counters() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let delta = CombinationDelta {
            games_together: 4,
            wins_together: 2,
            games_card1_only: 6,
            wins_card1_only: 3,
            games_card2_only: 1,
            wins_card2_only: 0,
        };
        // card 9 is "card1" in the caller's view
        let stats = store.accumulate(CardId(9), CardId(2), None, "standard", delta).unwrap();

        assert_eq!(stats.key.pair.first(), CardId(2));
        assert_eq!(stats.games_card2_only, 6);
        assert_eq!(stats.wins_card2_only, 3);
        assert_eq!(stats.games_card1_only, 1);
    }

    #[test]
    fn test_failed_transaction_rolls_back() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let now = Utc::now();
        let result: Result<()> = store.transaction(|tx| {
            frequency::increment_format_total(tx, "standard", now)?;
            frequency::increment_card(tx, CardId(1), "standard", now)?;
            Err(Error::InvalidDelta("forced".to_string()))
        });

        assert!(result.is_err());
        assert_eq!(store.format_total("standard").unwrap(), 0);
        assert!(store.card_frequency(CardId(1), "standard").unwrap().is_none());
    }

    #[test]
    fn test_clear_format_leaves_other_formats() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.record_observation(CardId(1), "standard", true).unwrap();
        store.record_observation(CardId(1), "historic", true).unwrap();
        store.increment_cooccurrence(CardId(1), CardId(2), "standard").unwrap();

        store.clear_format("standard").unwrap();

        assert_eq!(store.format_total("standard").unwrap(), 0);
        assert_eq!(store.format_total("historic").unwrap(), 1);
        assert!(store.cooccurrence(CardId(1), CardId(2), "standard").unwrap().is_none());
    }
}
