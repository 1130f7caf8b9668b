//! Synergy engine - batch ingestion, recompute passes and suggestions
//!
//! `SynergyEngine` owns the store and runs every mutating batch inside one
//! store transaction. Reads go straight to the store and may observe derived
//! scores that lag the counters until the next [`SynergyEngine::recompute`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;
use tracing::{debug, info};

use crate::archetype::{ArchetypePerformance, MatchupDelta, MatchupKey, MatchupStatistic};
use crate::card::{all_pairs, CardId};
use crate::cooccurrence::{pmi_score, CooccurrencePartner, CooccurrenceSource};
use crate::ingest::{unique_cards, DeckObservation, IngestSummary, MatchObservation};
use crate::storage::{combination, cooccurrence, frequency, matchup, suggestion, SqliteStore};
use crate::suggestion::{CardCatalog, ComposerConfig, MlSuggestion, SuggestionComposer};
use crate::synergy::{
    synergy_score, CombinationDelta, CombinationKey, PairSynergy, SynergyPartner, SynergyReport,
    MIN_GAMES_FOR_SYNERGY,
};
use crate::{Error, Result};

/// Result of one recompute pass over a format.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecomputeSummary {
    pub format: String,
    pub total_decks: u32,
    /// Pairs that received a fresh PMI score
    pub pmi_pairs: usize,
    pub solo_refreshed: usize,
    pub combinations_scored: usize,
}

impl std::fmt::Display for RecomputeSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Recompute Summary ({}):", self.format)?;
        writeln!(f, "  Decks in format: {}", self.total_decks)?;
        writeln!(f, "  PMI scores: {}", self.pmi_pairs)?;
        writeln!(f, "  Solo counters refreshed: {}", self.solo_refreshed)?;
        writeln!(f, "  Synergy scores: {}", self.combinations_scored)
    }
}

pub struct SynergyEngine {
    store: SqliteStore,
    config: ComposerConfig,
}

impl SynergyEngine {
    pub fn new(store: SqliteStore, config: ComposerConfig) -> Self {
        Self { store, config }
    }

    pub fn open(path: &Path, config: ComposerConfig) -> Result<Self> {
        Ok(Self::new(SqliteStore::open(path)?, config))
    }

    /// In-memory engine with default thresholds (for testing)
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::new(SqliteStore::open_in_memory()?, ComposerConfig::default()))
    }

    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut SqliteStore {
        &mut self.store
    }

    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    // ========== Ingestion ==========

    /// Fold one deck list into frequency and co-occurrence counters.
    pub fn ingest_deck(&mut self, deck: &DeckObservation) -> Result<IngestSummary> {
        let now = Utc::now();
        let summary = self.store.transaction(|tx| {
            let mut summary = IngestSummary::default();
            apply_deck(tx, deck, now, &mut summary)?;
            Ok(summary)
        })?;
        debug!(deck = %deck.deck_id, format = %deck.format, pairs = summary.pairs_updated, "ingested deck");
        Ok(summary)
    }

    /// Fold a batch of deck lists from one source; all or nothing.
    ///
    /// Each format in the batch gets its source row refreshed with the deck
    /// and distinct card counts of this batch. Decks skipped as too small
    /// are not counted.
    pub fn ingest_decks(
        &mut self,
        source_type: &str,
        source_id: &str,
        decks: &[DeckObservation],
    ) -> Result<IngestSummary> {
        let now = Utc::now();
        let summary = self.store.transaction(|tx| {
            let mut summary = IngestSummary::default();
            let mut applied = Vec::with_capacity(decks.len());
            for deck in decks {
                if apply_deck(tx, deck, now, &mut summary)? {
                    applied.push(deck);
                }
            }

            for format in &summary.formats {
                let in_format: Vec<&DeckObservation> = applied.iter().copied().filter(|d| &d.format == format).collect();
                let cards: Vec<CardId> = in_format.iter().flat_map(|d| d.cards.iter().copied()).collect();
                cooccurrence::upsert_source(
                    tx,
                    &CooccurrenceSource {
                        source_type: source_type.to_string(),
                        source_id: source_id.to_string(),
                        format: format.clone(),
                        deck_count: in_format.len() as u32,
                        card_count: unique_cards(&cards).len() as u32,
                        last_synced: now,
                    },
                )?;
            }
            Ok(summary)
        })?;

        info!(
            source = %source_id,
            decks = summary.observations,
            skipped = summary.skipped_small,
            pairs = summary.pairs_updated,
            "ingested deck batch"
        );
        Ok(summary)
    }

    /// Fold one finished match into the win-rate and archetype counters.
    ///
    /// Does not consult the processed-match ledger; redelivering the same
    /// match counts it twice. Use [`SynergyEngine::ingest_matches`] for
    /// at-least-once feeds.
    pub fn record_match(&mut self, observation: &MatchObservation) -> Result<IngestSummary> {
        let now = Utc::now();
        self.store.transaction(|tx| {
            let mut summary = IngestSummary::default();
            apply_match(tx, observation, now, &mut summary)?;
            combination::mark_processed(tx, &observation.match_id, &observation.format, now)?;
            Ok(summary)
        })
    }

    /// Fold a batch of matches, skipping any already in the ledger.
    pub fn ingest_matches(&mut self, matches: &[MatchObservation]) -> Result<IngestSummary> {
        let now = Utc::now();
        let summary = self.store.transaction(|tx| {
            let mut summary = IngestSummary::default();
            for observation in matches {
                if combination::is_processed(tx, &observation.match_id)? {
                    debug!(match_id = %observation.match_id, "match already processed, skipping");
                    summary.skipped_duplicates += 1;
                    continue;
                }
                apply_match(tx, observation, now, &mut summary)?;
                combination::mark_processed(tx, &observation.match_id, &observation.format, now)?;
            }
            Ok(summary)
        })?;

        info!(
            matches = summary.observations,
            duplicates = summary.skipped_duplicates,
            pairs = summary.pairs_updated,
            "ingested match batch"
        );
        Ok(summary)
    }

    // ========== Recompute ==========

    /// Refresh every derived value of a format from a consistent snapshot.
    ///
    /// PMI is skipped when the format has no decks; synergy scores are still
    /// refreshed from the combination counters.
    pub fn recompute(&mut self, format: &str) -> Result<RecomputeSummary> {
        let now = Utc::now();
        let summary = self.store.transaction(|tx| {
            let mut summary = RecomputeSummary {
                format: format.to_string(),
                ..Default::default()
            };

            summary.total_decks = frequency::format_total(tx, format)?;
            if summary.total_decks > 0 {
                summary.pmi_pairs = recompute_pmi(tx, format, summary.total_decks, now)?;
            } else {
                debug!(format = %format, "no decks recorded, PMI pass skipped");
            }

            summary.solo_refreshed = combination::refresh_solo_counters(tx, format)?;
            summary.combinations_scored = combination::recompute_scores(tx, format, now)?;
            Ok(summary)
        })?;

        info!(
            format = %format,
            pmi = summary.pmi_pairs,
            scored = summary.combinations_scored,
            "recompute complete"
        );
        Ok(summary)
    }

    // ========== Queries ==========

    pub fn top_pairs_for(&self, card: CardId, format: &str, limit: usize) -> Result<Vec<CooccurrencePartner>> {
        self.store.top_pairs_for(card, format, limit)
    }

    pub fn top_synergies_for_card(&self, card: CardId, format: &str, limit: usize) -> Result<Vec<SynergyPartner>> {
        self.store.top_synergies_for_card(card, format, limit)
    }

    /// Synergy of every in-deck pair with at least `MIN_GAMES_FOR_SYNERGY`
    /// games together.
    pub fn synergy_report(&self, deck_id: &str, format: &str, cards: &[CardId]) -> Result<SynergyReport> {
        let unique = unique_cards(cards);
        let pairs = self
            .store
            .pair_stats_among(&unique, format)?
            .into_iter()
            .filter(|s| s.games_together >= MIN_GAMES_FOR_SYNERGY)
            .map(|s| PairSynergy {
                pair: s.key.pair,
                synergy_score: synergy_score(&s),
                games_together: s.games_together,
                win_rate: s.win_rate_together(),
            })
            .collect();
        Ok(SynergyReport::build(deck_id, unique.len(), pairs))
    }

    pub fn archetype_performance(&self, archetype: &str, format: &str) -> Result<Option<ArchetypePerformance>> {
        self.store.archetype_performance(archetype, format)
    }

    pub fn matchup_win_rate(&self, key: &MatchupKey) -> Result<f64> {
        self.store.matchup_win_rate(key)
    }

    pub fn top_matchups(&self, account_id: i64, format: &str, limit: usize) -> Result<Vec<MatchupStatistic>> {
        self.store.top_matchups(account_id, format, limit)
    }

    pub fn list_matchups(&self, account_id: i64, format: Option<&str>) -> Result<Vec<MatchupStatistic>> {
        self.store.list_matchups(account_id, format)
    }

    // ========== Suggestions ==========

    /// Compose add, remove and swap suggestions for a deck and persist them.
    ///
    /// Reads the current synergy views, so a recompute should run first for
    /// fresh results. Repeated calls store repeated suggestions.
    pub fn generate_suggestions(
        &mut self,
        deck_id: &str,
        format: &str,
        cards: &[CardId],
        catalog: &dyn CardCatalog,
    ) -> Result<Vec<MlSuggestion>> {
        let deck_cards = unique_cards(cards);
        let now = Utc::now();

        let add_synergies = self.partners_of(&deck_cards, format, self.config.add_lookup_limit)?;
        let swap_synergies = self.partners_of(&deck_cards, format, self.config.swap_lookup_limit)?;
        let pair_stats = self.store.pair_stats_among(&deck_cards, format)?;

        let composer = SuggestionComposer::new(&self.config, catalog);
        let mut composed = composer.add_suggestions(deck_id, &deck_cards, &add_synergies, now)?;
        composed.extend(composer.remove_suggestions(deck_id, &pair_stats, now)?);
        if let Some(swap) = composer.swap_suggestion(deck_id, &deck_cards, &pair_stats, &swap_synergies, now)? {
            composed.push(swap);
        }

        let stored = self.store.transaction(|tx| {
            let mut stored = Vec::with_capacity(composed.len());
            for mut s in composed {
                s.id = suggestion::insert_suggestion(tx, &s)?;
                stored.push(s);
            }
            Ok(stored)
        })?;

        info!(deck = %deck_id, format = %format, suggestions = stored.len(), "generated suggestions");
        Ok(stored)
    }

    fn partners_of(&self, deck_cards: &[CardId], format: &str, limit: usize) -> Result<Vec<SynergyPartner>> {
        let mut partners = Vec::new();
        for card in deck_cards {
            partners.extend(self.store.top_synergies_for_card(*card, format, limit)?);
        }
        Ok(partners)
    }

    pub fn dismiss_suggestion(&mut self, id: i64) -> Result<MlSuggestion> {
        self.transition(id, |s, _| s.dismiss())
    }

    pub fn apply_suggestion(&mut self, id: i64) -> Result<MlSuggestion> {
        self.transition(id, |s, now| s.apply(now))
    }

    /// Attach the measured win-rate change (percentage points) to an applied suggestion
    pub fn record_outcome(&mut self, id: i64, win_rate_change: f64) -> Result<MlSuggestion> {
        self.transition(id, |s, now| s.record_outcome(win_rate_change, now))
    }

    fn transition(
        &mut self,
        id: i64,
        step: impl FnOnce(&mut MlSuggestion, DateTime<Utc>) -> Result<()>,
    ) -> Result<MlSuggestion> {
        let now = Utc::now();
        let updated = self.store.transaction(|tx| {
            let mut s = suggestion::get_suggestion(tx, id)?.ok_or(Error::SuggestionNotFound(id))?;
            step(&mut s, now)?;
            suggestion::update_lifecycle(tx, &s)?;
            Ok(s)
        })?;
        info!(id, state = %updated.state(), "suggestion updated");
        Ok(updated)
    }

    pub fn suggestion(&self, id: i64) -> Result<Option<MlSuggestion>> {
        self.store.suggestion(id)
    }

    pub fn suggestions_for_deck(&self, deck_id: &str) -> Result<Vec<MlSuggestion>> {
        self.store.suggestions_for_deck(deck_id)
    }

    pub fn active_suggestions(&self, deck_id: &str) -> Result<Vec<MlSuggestion>> {
        self.store.active_suggestions(deck_id)
    }
}

/// Returns false when the deck was skipped.
fn apply_deck(conn: &Connection, deck: &DeckObservation, now: DateTime<Utc>, summary: &mut IngestSummary) -> Result<bool> {
    let cards = unique_cards(&deck.cards);
    if cards.len() < 2 {
        debug!(deck = %deck.deck_id, cards = cards.len(), "deck too small, skipping");
        summary.skipped_small += 1;
        return Ok(false);
    }

    frequency::increment_format_total(conn, &deck.format, now)?;
    for card in &cards {
        frequency::increment_card(conn, *card, &deck.format, now)?;
    }
    let pairs = all_pairs(&cards);
    for pair in &pairs {
        cooccurrence::increment_pair(conn, *pair, &deck.format, now)?;
    }

    summary.touch_format(&deck.format);
    summary.observations += 1;
    summary.cards_tracked += cards.len();
    summary.pairs_updated += pairs.len();
    Ok(true)
}

fn apply_match(
    conn: &Connection,
    observation: &MatchObservation,
    now: DateTime<Utc>,
    summary: &mut IngestSummary,
) -> Result<()> {
    let format = observation.format.as_str();
    let won = observation.won;

    let cards = observation.unique_cards();
    if cards.len() < 2 {
        debug!(match_id = %observation.match_id, cards = cards.len(), "match deck too small, skipping");
        summary.skipped_small += 1;
        return Ok(());
    }

    for card in &cards {
        combination::record_individual(conn, *card, format, won, now)?;
    }

    let pairs = all_pairs(&cards);
    let delta = CombinationDelta::together(won);
    for pair in &pairs {
        combination::accumulate(conn, &CombinationKey::format_wide(*pair, format), &delta, now)?;
        if !observation.deck_id.is_empty() {
            combination::accumulate(conn, &CombinationKey::for_deck(*pair, &observation.deck_id, format), &delta, now)?;
        }
    }

    if let Some(player) = observation.player_archetype.as_deref() {
        matchup::record_archetype_result(conn, player, format, won, observation.duration_secs, now)?;

        if let Some(opponent) = observation.opponent_archetype.as_deref() {
            let key = MatchupKey::new(observation.account_id, player, opponent, format);
            let delta = MatchupDelta::single(won, observation.duration_secs, observation.played_at.or(Some(now)));
            matchup::record_matchup(conn, &key, &delta, now)?;
        }
    }

    summary.touch_format(format);
    summary.observations += 1;
    summary.cards_tracked += cards.len();
    summary.pairs_updated += pairs.len();
    Ok(())
}

/// Score every pair of a format against one snapshot of the counters.
fn recompute_pmi(conn: &Connection, format: &str, total_decks: u32, now: DateTime<Utc>) -> Result<usize> {
    let counts = frequency::deck_counts(conn, format)?;
    let rows = cooccurrence::pairs_in_format(conn, format)?;

    for row in &rows {
        let freq_a = counts.get(&row.pair.first()).copied().unwrap_or(0);
        let freq_b = counts.get(&row.pair.second()).copied().unwrap_or(0);
        let pmi = pmi_score(row.count, freq_a, freq_b, total_decks);
        cooccurrence::set_pmi(conn, row.pair, format, pmi, now)?;
    }
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suggestion::{NoCatalog, SuggestionState, SuggestionType};

    fn deck(id: &str, format: &str, cards: &[u32]) -> DeckObservation {
        DeckObservation {
            deck_id: id.to_string(),
            format: format.to_string(),
            cards: cards.iter().copied().map(CardId).collect(),
        }
    }

    fn game(id: &str, cards: &[u32], won: bool) -> MatchObservation {
        MatchObservation {
            match_id: id.to_string(),
            account_id: 1,
            deck_id: "deck-1".to_string(),
            format: "standard".to_string(),
            cards: cards.iter().copied().map(CardId).collect(),
            won,
            player_archetype: Some("Gruul Aggro".to_string()),
            opponent_archetype: Some("Mono Red".to_string()),
            duration_secs: Some(600),
            played_at: None,
        }
    }

    #[test]
    fn test_deck_ingest_and_pmi() {
        let mut engine = SynergyEngine::open_in_memory().unwrap();
        let decks = vec![
            deck("d1", "standard", &[1, 2, 3]),
            deck("d2", "standard", &[1, 2]),
            deck("d3", "standard", &[3, 4]),
            deck("d4", "standard", &[4, 5]),
        ];
        let summary = engine.ingest_decks("local", "decks", &decks).unwrap();
        assert_eq!(summary.observations, 4);
        assert_eq!(summary.pairs_updated, 6);

        let recompute = engine.recompute("standard").unwrap();
        assert_eq!(recompute.total_decks, 4);
        assert_eq!(recompute.pmi_pairs, 5);

        // 1 and 2 always together: log2(2 * 4 / (2 * 2)) = 1
        let score = engine.store().cooccurrence_score(CardId(1), CardId(2), "standard").unwrap();
        assert!((score - 1.0).abs() < 1e-9);

        let top = engine.top_pairs_for(CardId(1), "standard", 5).unwrap();
        assert_eq!(top[0].card_id, CardId(2));
        assert_eq!(engine.store().sources("standard").unwrap()[0].deck_count, 4);
    }

    #[test]
    fn test_small_deck_contributes_nothing() {
        let mut engine = SynergyEngine::open_in_memory().unwrap();
        let summary = engine.ingest_deck(&deck("d1", "standard", &[7, 7, 7])).unwrap();
        assert_eq!(summary.skipped_small, 1);
        assert_eq!(engine.store().format_total("standard").unwrap(), 0);
    }

    #[test]
    fn test_source_counts_only_applied_decks() {
        let mut engine = SynergyEngine::open_in_memory().unwrap();
        let decks = vec![
            deck("d1", "standard", &[1, 2]),
            deck("d2", "standard", &[9]),
            deck("d3", "standard", &[3, 4]),
        ];
        let summary = engine.ingest_decks("local", "decks", &decks).unwrap();
        assert_eq!(summary.skipped_small, 1);

        let source = &engine.store().sources("standard").unwrap()[0];
        assert_eq!(source.deck_count, 2);
        assert_eq!(source.deck_count, engine.store().format_total("standard").unwrap());
        assert_eq!(source.card_count, 4);
    }

    #[test]
    fn test_recompute_empty_format_is_noop() {
        let mut engine = SynergyEngine::open_in_memory().unwrap();
        let summary = engine.recompute("alchemy").unwrap();
        assert_eq!(summary.pmi_pairs, 0);
        assert_eq!(summary.combinations_scored, 0);
    }

    #[test]
    fn test_match_ingest_feeds_all_counters() {
        let mut engine = SynergyEngine::open_in_memory().unwrap();
        let matches: Vec<MatchObservation> = (0..10).map(|i| game(&format!("m{}", i), &[1, 2, 3], i < 7)).collect();
        let summary = engine.ingest_matches(&matches).unwrap();
        assert_eq!(summary.observations, 10);

        let again = engine.ingest_matches(&matches).unwrap();
        assert_eq!(again.skipped_duplicates, 10);
        assert_eq!(again.observations, 0);

        engine.recompute("standard").unwrap();
        let stats = engine
            .store()
            .combination_stats(CardId(1), CardId(2), None, "standard")
            .unwrap()
            .unwrap();
        assert_eq!(stats.games_together, 10);
        assert_eq!(stats.wins_together, 7);
        assert!(engine
            .store()
            .combination_stats(CardId(1), CardId(2), Some("deck-1"), "standard")
            .unwrap()
            .is_some());

        let key = MatchupKey::new(1, "Gruul Aggro", "Mono Red", "standard");
        assert!((engine.matchup_win_rate(&key).unwrap() - 0.7).abs() < 1e-9);
        let perf = engine.archetype_performance("Gruul Aggro", "standard").unwrap().unwrap();
        assert_eq!(perf.total_matches, 10);
        assert_eq!(perf.avg_duration, Some(600.0));
    }

    #[test]
    fn test_record_match_trusts_caller() {
        let mut engine = SynergyEngine::open_in_memory().unwrap();
        let m = game("m1", &[1, 2], true);
        engine.record_match(&m).unwrap();
        engine.record_match(&m).unwrap();

        let stats = engine
            .store()
            .combination_stats(CardId(1), CardId(2), None, "standard")
            .unwrap()
            .unwrap();
        assert_eq!(stats.games_together, 2);
        assert!(engine.store().is_match_processed("m1").unwrap());
    }

    #[test]
    fn test_suggestion_lifecycle() {
        let mut engine = SynergyEngine::open_in_memory().unwrap();
        // 1+2 win together, 1+3 lose together
        let mut matches = Vec::new();
        for i in 0..12 {
            matches.push(game(&format!("a{}", i), &[1, 2], true));
            matches.push(game(&format!("b{}", i), &[1, 3], false));
        }
        engine.ingest_matches(&matches).unwrap();
        engine.recompute("standard").unwrap();

        let suggestions = engine
            .generate_suggestions("deck-2", "standard", &[CardId(1), CardId(3)], &NoCatalog)
            .unwrap();
        let add = suggestions
            .iter()
            .find(|s| s.suggestion_type == SuggestionType::Add)
            .unwrap();
        assert_eq!(add.card_id, CardId(2));
        assert!(add.id > 0);

        let applied = engine.apply_suggestion(add.id).unwrap();
        assert_eq!(applied.state(), SuggestionState::Applied);
        assert!(matches!(engine.dismiss_suggestion(add.id), Err(Error::InvalidTransition { .. })));

        let done = engine.record_outcome(add.id, 3.0).unwrap();
        assert_eq!(done.state(), SuggestionState::OutcomeRecorded);
        assert_eq!(done.outcome_win_rate_change, Some(3.0));
        assert!(matches!(engine.apply_suggestion(9999), Err(Error::SuggestionNotFound(9999))));
    }
}
