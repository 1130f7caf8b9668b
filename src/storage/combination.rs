//! Combination counters, individual card counters and the match ledger.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::card::{all_pairs, CardId, CardPair};
use crate::synergy::{derive_solo, CardIndividualStats, CombinationDelta, CombinationKey, CombinationStats, MIN_GAMES_FOR_SYNERGY};
use crate::Result;

const COLUMNS: &str = "card_id_1, card_id_2, deck_id, format, \
    games_together, games_card1_only, games_card2_only, \
    wins_together, wins_card1_only, wins_card2_only, \
    games_card1_derived, wins_card1_derived, games_card2_derived, wins_card2_derived, \
    synergy_score, confidence_score, created_at, updated_at, scores_computed_at";

/// Add `delta` to the row at `key`, creating it if needed, and return the
/// merged row. The delta must already be oriented to the canonical pair.
pub fn accumulate(
    conn: &Connection,
    key: &CombinationKey,
    delta: &CombinationDelta,
    now: DateTime<Utc>,
) -> Result<CombinationStats> {
    delta.validate()?;

    conn.prepare_cached(
        "INSERT INTO card_combination_stats (
            card_id_1, card_id_2, deck_id, format,
            games_together, games_card1_only, games_card2_only,
            wins_together, wins_card1_only, wins_card2_only,
            created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
         ON CONFLICT(card_id_1, card_id_2, deck_id, format) DO UPDATE SET
            games_together = games_together + excluded.games_together,
            games_card1_only = games_card1_only + excluded.games_card1_only,
            games_card2_only = games_card2_only + excluded.games_card2_only,
            wins_together = wins_together + excluded.wins_together,
            wins_card1_only = wins_card1_only + excluded.wins_card1_only,
            wins_card2_only = wins_card2_only + excluded.wins_card2_only,
            updated_at = excluded.updated_at",
    )?
    .execute(params![
        key.pair.first(),
        key.pair.second(),
        key.deck_column(),
        key.format,
        delta.games_together,
        delta.games_card1_only,
        delta.games_card2_only,
        delta.wins_together,
        delta.wins_card1_only,
        delta.wins_card2_only,
        now,
    ])?;

    get_combination(conn, key)?.ok_or(rusqlite::Error::QueryReturnedNoRows.into())
}

pub fn get_combination(conn: &Connection, key: &CombinationKey) -> Result<Option<CombinationStats>> {
    conn.prepare_cached(&format!(
        "SELECT {} FROM card_combination_stats
         WHERE card_id_1 = ?1 AND card_id_2 = ?2 AND deck_id = ?3 AND format = ?4",
        COLUMNS
    ))?
    .query_row(
        params![key.pair.first(), key.pair.second(), key.deck_column(), key.format],
        row_to_combination,
    )
    .optional()
    .map_err(Into::into)
}

/// Format-wide partners of `card` with enough shared games, best synergy first.
pub fn top_synergies_for_card(
    conn: &Connection,
    card: CardId,
    format: &str,
    limit: usize,
) -> Result<Vec<CombinationStats>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM card_combination_stats
         WHERE (card_id_1 = ?1 OR card_id_2 = ?1) AND format = ?2 AND deck_id = ''
           AND games_together >= ?3
         ORDER BY synergy_score DESC, games_together DESC
         LIMIT ?4",
        COLUMNS
    ))?;
    let rows = stmt
        .query_map(params![card, format, MIN_GAMES_FOR_SYNERGY, limit as i64], row_to_combination)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Format-wide rows for every pair of `cards` that has one.
pub fn pair_stats_among(conn: &Connection, cards: &[CardId], format: &str) -> Result<Vec<CombinationStats>> {
    let mut found = Vec::new();
    for pair in all_pairs(cards) {
        if let Some(stats) = get_combination(conn, &CombinationKey::format_wide(pair, format))? {
            found.push(stats);
        }
    }
    Ok(found)
}

pub fn combinations_in_format(conn: &Connection, format: &str) -> Result<Vec<CombinationStats>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM card_combination_stats WHERE format = ?1 ORDER BY card_id_1, card_id_2, deck_id",
        COLUMNS
    ))?;
    let rows = stmt
        .query_map([format], row_to_combination)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Rewrite the derived solo counters of format-wide rows from individual
/// card totals.
///
/// Only the `*_derived` columns are touched; counters merged in through
/// [`accumulate`] are left as they are. A side whose card has no individual
/// stats derives nothing. Returns the number of rows changed.
pub fn refresh_solo_counters(conn: &Connection, format: &str) -> Result<usize> {
    let individual = individual_stats_in_format(conn, format)?;

    let mut update = conn.prepare_cached(
        "UPDATE card_combination_stats SET
            games_card1_derived = ?1, wins_card1_derived = ?2,
            games_card2_derived = ?3, wins_card2_derived = ?4
         WHERE card_id_1 = ?5 AND card_id_2 = ?6 AND deck_id = '' AND format = ?7",
    )?;

    let mut changed = 0;
    for stats in combinations_in_format(conn, format)? {
        if stats.key.deck_id.is_some() {
            continue;
        }
        let side = |card: CardId| match individual.get(&card) {
            Some(ind) => derive_solo(ind.total_games, ind.wins, stats.games_together, stats.wins_together),
            None => (0, 0),
        };
        let (g1, w1) = side(stats.key.pair.first());
        let (g2, w2) = side(stats.key.pair.second());

        if (g1, w1, g2, w2)
            == (
                stats.games_card1_derived,
                stats.wins_card1_derived,
                stats.games_card2_derived,
                stats.wins_card2_derived,
            )
        {
            continue;
        }
        update.execute(params![g1, w1, g2, w2, stats.key.pair.first(), stats.key.pair.second(), format])?;
        changed += 1;
    }
    Ok(changed)
}

/// Store fresh synergy and confidence scores for every row of a format.
pub fn recompute_scores(conn: &Connection, format: &str, now: DateTime<Utc>) -> Result<usize> {
    let mut update = conn.prepare_cached(
        "UPDATE card_combination_stats SET synergy_score = ?1, confidence_score = ?2, scores_computed_at = ?3
         WHERE card_id_1 = ?4 AND card_id_2 = ?5 AND deck_id = ?6 AND format = ?7",
    )?;

    let mut rows = combinations_in_format(conn, format)?;
    for stats in &mut rows {
        stats.refresh_scores(now);
        update.execute(params![
            stats.synergy_score,
            stats.confidence_score,
            now,
            stats.key.pair.first(),
            stats.key.pair.second(),
            stats.key.deck_column(),
            format,
        ])?;
    }
    Ok(rows.len())
}

pub fn count_combinations(conn: &Connection) -> Result<usize> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM card_combination_stats", [], |row| row.get(0))?;
    Ok(count as usize)
}

fn row_to_combination(row: &Row) -> rusqlite::Result<CombinationStats> {
    let a: CardId = row.get(0)?;
    let b: CardId = row.get(1)?;
    let pair = CardPair::new(a, b).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Integer, Box::new(e))
    })?;
    let deck_id: String = row.get(2)?;
    let format: String = row.get(3)?;

    Ok(CombinationStats {
        key: CombinationKey {
            pair,
            deck_id: (!deck_id.is_empty()).then_some(deck_id),
            format,
        },
        games_together: row.get(4)?,
        games_card1_only: row.get(5)?,
        games_card2_only: row.get(6)?,
        wins_together: row.get(7)?,
        wins_card1_only: row.get(8)?,
        wins_card2_only: row.get(9)?,
        games_card1_derived: row.get(10)?,
        wins_card1_derived: row.get(11)?,
        games_card2_derived: row.get(12)?,
        wins_card2_derived: row.get(13)?,
        synergy_score: row.get(14)?,
        confidence_score: row.get(15)?,
        created_at: row.get(16)?,
        updated_at: row.get(17)?,
        scores_computed_at: row.get(18)?,
    })
}

// ========== Individual Card Stats ==========

pub fn record_individual(conn: &Connection, card: CardId, format: &str, won: bool, now: DateTime<Utc>) -> Result<()> {
    conn.prepare_cached(
        "INSERT INTO card_individual_stats (card_id, format, total_games, wins, updated_at)
         VALUES (?1, ?2, 1, ?3, ?4)
         ON CONFLICT(card_id, format) DO UPDATE SET
            total_games = total_games + 1,
            wins = wins + excluded.wins,
            updated_at = excluded.updated_at",
    )?
    .execute(params![card, format, u32::from(won), now])?;
    Ok(())
}

pub fn get_individual(conn: &Connection, card: CardId, format: &str) -> Result<Option<CardIndividualStats>> {
    conn.query_row(
        "SELECT card_id, format, total_games, wins, updated_at
         FROM card_individual_stats WHERE card_id = ?1 AND format = ?2",
        params![card, format],
        row_to_individual,
    )
    .optional()
    .map_err(Into::into)
}

fn individual_stats_in_format(conn: &Connection, format: &str) -> Result<HashMap<CardId, CardIndividualStats>> {
    let mut stmt = conn.prepare(
        "SELECT card_id, format, total_games, wins, updated_at FROM card_individual_stats WHERE format = ?1",
    )?;
    let stats = stmt
        .query_map([format], |row| row_to_individual(row).map(|s| (s.card_id, s)))?
        .collect::<rusqlite::Result<HashMap<_, _>>>()?;
    Ok(stats)
}

fn row_to_individual(row: &Row) -> rusqlite::Result<CardIndividualStats> {
    Ok(CardIndividualStats {
        card_id: row.get(0)?,
        format: row.get(1)?,
        total_games: row.get(2)?,
        wins: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

// ========== Match Ledger ==========

pub fn is_processed(conn: &Connection, match_id: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM processed_matches WHERE match_id = ?1", [match_id], |row| row.get(0))
        .optional()?;
    Ok(found.is_some())
}

pub fn mark_processed(conn: &Connection, match_id: &str, format: &str, now: DateTime<Utc>) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO processed_matches (match_id, format, processed_at) VALUES (?1, ?2, ?3)",
        params![match_id, format, now],
    )?;
    Ok(())
}

pub fn count_processed(conn: &Connection) -> Result<usize> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM processed_matches", [], |row| row.get(0))?;
    Ok(count as usize)
}

pub fn clear_format(conn: &Connection, format: &str) -> Result<usize> {
    let rows = conn.execute("DELETE FROM card_combination_stats WHERE format = ?1", [format])?;
    conn.execute("DELETE FROM card_individual_stats WHERE format = ?1", [format])?;
    conn.execute("DELETE FROM processed_matches WHERE format = ?1", [format])?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        for stmt in schema::all_schema_statements() {
            conn.execute(stmt, []).unwrap();
        }
        conn
    }

    fn key(a: u32, b: u32) -> CombinationKey {
        CombinationKey::format_wide(CardPair::new(CardId(a), CardId(b)).unwrap(), "standard")
    }

    #[test]
    fn test_accumulate_is_additive() {
        let conn = conn();
        let delta = CombinationDelta {
            games_together: 10,
            wins_together: 6,
            ..Default::default()
        };
        accumulate(&conn, &key(1, 2), &delta, Utc::now()).unwrap();
        let merged = accumulate(&conn, &key(1, 2), &delta, Utc::now()).unwrap();

        assert_eq!(merged.games_together, 20);
        assert_eq!(merged.wins_together, 12);
        assert!(merged.is_stale());
    }

    #[test]
    fn test_deck_rows_separate_from_format_wide() {
        let conn = conn();
        let pair = CardPair::new(CardId(1), CardId(2)).unwrap();
        let deck_key = CombinationKey::for_deck(pair, "deck-1", "standard");
        accumulate(&conn, &deck_key, &CombinationDelta::together(true), Utc::now()).unwrap();

        assert!(get_combination(&conn, &key(1, 2)).unwrap().is_none());
        let row = get_combination(&conn, &deck_key).unwrap().unwrap();
        assert_eq!(row.key.deck_id.as_deref(), Some("deck-1"));
    }

    #[test]
    fn test_invalid_delta_writes_nothing() {
        let conn = conn();
        let delta = CombinationDelta {
            games_together: 1,
            wins_together: 3,
            ..Default::default()
        };
        assert!(accumulate(&conn, &key(1, 2), &delta, Utc::now()).is_err());
        assert_eq!(count_combinations(&conn).unwrap(), 0);
    }

    #[test]
    fn test_solo_refresh_and_scores() {
        let conn = conn();
        let now = Utc::now();
        let together = CombinationDelta {
            games_together: 20,
            wins_together: 14,
            ..Default::default()
        };
        accumulate(&conn, &key(1, 2), &together, now).unwrap();

        // card 1: 30 games / 19 wins overall, card 2: 30 / 19
        for card in [CardId(1), CardId(2)] {
            for i in 0..30 {
                record_individual(&conn, card, "standard", i < 19, now).unwrap();
            }
        }

        assert_eq!(refresh_solo_counters(&conn, "standard").unwrap(), 1);
        assert_eq!(recompute_scores(&conn, "standard", Utc::now()).unwrap(), 1);

        let row = get_combination(&conn, &key(1, 2)).unwrap().unwrap();
        assert_eq!((row.games_card1_only, row.wins_card1_only), (0, 0));
        assert_eq!(row.solo_card1(), (10, 5));
        assert_eq!(row.solo_card2(), (10, 5));
        assert!((row.synergy_score - crate::synergy::synergy_score(&row)).abs() < 1e-12);
        assert!(row.synergy_score > 0.15);
        assert!(!row.is_stale());

        let top = top_synergies_for_card(&conn, CardId(2), "standard", 5).unwrap();
        assert_eq!(top.len(), 1);
    }

    #[test]
    fn test_solo_refresh_keeps_accumulated_counters() {
        let conn = conn();
        let now = Utc::now();
        let delta = CombinationDelta {
            games_together: 20,
            wins_together: 14,
            games_card1_only: 10,
            wins_card1_only: 2,
            games_card2_only: 10,
            wins_card2_only: 2,
        };
        accumulate(&conn, &key(1, 2), &delta, now).unwrap();
        recompute_scores(&conn, "standard", now).unwrap();
        let before = get_combination(&conn, &key(1, 2)).unwrap().unwrap();

        // one unrelated game for card 1 puts it into the individual table
        record_individual(&conn, CardId(1), "standard", true, now).unwrap();
        refresh_solo_counters(&conn, "standard").unwrap();
        recompute_scores(&conn, "standard", Utc::now()).unwrap();

        let after = get_combination(&conn, &key(1, 2)).unwrap().unwrap();
        assert_eq!((after.games_card1_only, after.wins_card1_only), (10, 2));
        assert_eq!((after.games_card2_only, after.wins_card2_only), (10, 2));
        assert_eq!(after.solo_card1(), (10, 2));
        assert!((after.synergy_score - before.synergy_score).abs() < 1e-12);
    }

    #[test]
    fn test_top_synergies_skip_thin_samples() {
        let conn = conn();
        accumulate(&conn, &key(1, 2), &CombinationDelta::together(true), Utc::now()).unwrap();
        recompute_scores(&conn, "standard", Utc::now()).unwrap();
        assert!(top_synergies_for_card(&conn, CardId(1), "standard", 5).unwrap().is_empty());
    }

    #[test]
    fn test_ledger() {
        let conn = conn();
        assert!(!is_processed(&conn, "m1").unwrap());
        mark_processed(&conn, "m1", "standard", Utc::now()).unwrap();
        mark_processed(&conn, "m1", "standard", Utc::now()).unwrap();
        assert!(is_processed(&conn, "m1").unwrap());
        assert_eq!(count_processed(&conn).unwrap(), 1);

        clear_format(&conn, "standard").unwrap();
        assert!(!is_processed(&conn, "m1").unwrap());
    }
}
