//! Pair co-occurrence counts, PMI scores and deck sources.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::card::{CardId, CardPair};
use crate::cooccurrence::{CardCooccurrence, CooccurrenceSource};
use crate::Result;

const COLUMNS: &str = "card_a_id, card_b_id, format, count, pmi_score, last_updated, pmi_computed_at";

/// Count one more deck containing both cards of `pair`.
pub fn increment_pair(conn: &Connection, pair: CardPair, format: &str, now: DateTime<Utc>) -> Result<()> {
    conn.prepare_cached(
        "INSERT INTO card_cooccurrence (card_a_id, card_b_id, format, count, last_updated)
         VALUES (?1, ?2, ?3, 1, ?4)
         ON CONFLICT(card_a_id, card_b_id, format) DO UPDATE SET
            count = count + 1,
            last_updated = excluded.last_updated",
    )?
    .execute(params![pair.first(), pair.second(), format, now])?;
    Ok(())
}

pub fn get_cooccurrence(conn: &Connection, pair: CardPair, format: &str) -> Result<Option<CardCooccurrence>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM card_cooccurrence WHERE card_a_id = ?1 AND card_b_id = ?2 AND format = ?3",
            COLUMNS
        ),
        params![pair.first(), pair.second(), format],
        row_to_cooccurrence,
    )
    .optional()
    .map_err(Into::into)
}

/// Rows touching `card`, best PMI first; never-scored rows sort last.
pub fn top_pairs_for(conn: &Connection, card: CardId, format: &str, limit: usize) -> Result<Vec<CardCooccurrence>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM card_cooccurrence
         WHERE (card_a_id = ?1 OR card_b_id = ?1) AND format = ?2
         ORDER BY pmi_score IS NULL, pmi_score DESC, count DESC
         LIMIT ?3",
        COLUMNS
    ))?;
    let rows = stmt
        .query_map(params![card, format, limit as i64], row_to_cooccurrence)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn pairs_in_format(conn: &Connection, format: &str) -> Result<Vec<CardCooccurrence>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM card_cooccurrence WHERE format = ?1 ORDER BY card_a_id, card_b_id",
        COLUMNS
    ))?;
    let rows = stmt
        .query_map([format], row_to_cooccurrence)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn set_pmi(conn: &Connection, pair: CardPair, format: &str, pmi: f64, now: DateTime<Utc>) -> Result<()> {
    conn.prepare_cached(
        "UPDATE card_cooccurrence SET pmi_score = ?1, pmi_computed_at = ?2
         WHERE card_a_id = ?3 AND card_b_id = ?4 AND format = ?5",
    )?
    .execute(params![pmi, now, pair.first(), pair.second(), format])?;
    Ok(())
}

pub fn count_pairs(conn: &Connection) -> Result<usize> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM card_cooccurrence", [], |row| row.get(0))?;
    Ok(count as usize)
}

pub fn clear_format(conn: &Connection, format: &str) -> Result<usize> {
    let pairs = conn.execute("DELETE FROM card_cooccurrence WHERE format = ?1", [format])?;
    conn.execute("DELETE FROM cooccurrence_sources WHERE format = ?1", [format])?;
    Ok(pairs)
}

fn row_to_cooccurrence(row: &Row) -> rusqlite::Result<CardCooccurrence> {
    let a: CardId = row.get(0)?;
    let b: CardId = row.get(1)?;
    let pair = CardPair::new(a, b).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Integer, Box::new(e))
    })?;

    Ok(CardCooccurrence {
        pair,
        format: row.get(2)?,
        count: row.get(3)?,
        pmi_score: row.get(4)?,
        last_updated: row.get(5)?,
        pmi_computed_at: row.get(6)?,
    })
}

// ========== Sources ==========

/// Record the latest sync of a deck source; replaces earlier counts.
pub fn upsert_source(conn: &Connection, source: &CooccurrenceSource) -> Result<()> {
    conn.execute(
        "INSERT INTO cooccurrence_sources (source_type, source_id, format, deck_count, card_count, last_synced)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(source_type, source_id, format) DO UPDATE SET
            deck_count = excluded.deck_count,
            card_count = excluded.card_count,
            last_synced = excluded.last_synced",
        params![
            source.source_type,
            source.source_id,
            source.format,
            source.deck_count,
            source.card_count,
            source.last_synced,
        ],
    )?;
    Ok(())
}

pub fn list_sources(conn: &Connection, format: &str) -> Result<Vec<CooccurrenceSource>> {
    let mut stmt = conn.prepare(
        "SELECT source_type, source_id, format, deck_count, card_count, last_synced
         FROM cooccurrence_sources WHERE format = ?1 ORDER BY last_synced DESC",
    )?;
    let sources = stmt
        .query_map([format], |row| {
            Ok(CooccurrenceSource {
                source_type: row.get(0)?,
                source_id: row.get(1)?,
                format: row.get(2)?,
                deck_count: row.get(3)?,
                card_count: row.get(4)?,
                last_synced: row.get(5)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(sources)
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

    fn pair(a: u32, b: u32) -> CardPair {
        CardPair::new(CardId(a), CardId(b)).unwrap()
    }

    #[test]
    fn test_increment_is_order_independent() {
        let conn = conn();
        let now = Utc::now();
        increment_pair(&conn, pair(5, 2), "standard", now).unwrap();
        increment_pair(&conn, pair(2, 5), "standard", now).unwrap();

        let row = get_cooccurrence(&conn, pair(2, 5), "standard").unwrap().unwrap();
        assert_eq!(row.count, 2);
        assert_eq!(row.pair.first(), CardId(2));
        assert!(row.is_stale());
    }

    #[test]
    fn test_top_pairs_ordering() {
        let conn = conn();
        let now = Utc::now();
        for (a, b) in [(1, 2), (1, 3), (1, 4)] {
            increment_pair(&conn, pair(a, b), "standard", now).unwrap();
        }
        increment_pair(&conn, pair(1, 4), "standard", now).unwrap();
        set_pmi(&conn, pair(1, 2), "standard", 0.5, now).unwrap();
        set_pmi(&conn, pair(1, 3), "standard", 2.0, now).unwrap();

        let top = top_pairs_for(&conn, CardId(1), "standard", 10).unwrap();
        let partners: Vec<CardId> = top.iter().filter_map(|r| r.pair.partner_of(CardId(1))).collect();
        // unscored (1,4) last despite the higher count
        assert_eq!(partners, vec![CardId(3), CardId(2), CardId(4)]);
        assert!(!top[0].is_stale());
    }

    #[test]
    fn test_source_last_write_wins() {
        let conn = conn();
        let mut source = CooccurrenceSource {
            source_type: "local".to_string(),
            source_id: "decks".to_string(),
            format: "standard".to_string(),
            deck_count: 3,
            card_count: 40,
            last_synced: Utc::now(),
        };
        upsert_source(&conn, &source).unwrap();
        source.deck_count = 5;
        upsert_source(&conn, &source).unwrap();

        let sources = list_sources(&conn, "standard").unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].deck_count, 5);
    }
}
