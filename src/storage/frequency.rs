//! Card frequency and per-format deck totals.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::card::CardId;
use crate::frequency::CardFrequency;
use crate::Result;

/// Count one more deck containing `card`.
pub fn increment_card(conn: &Connection, card: CardId, format: &str, now: DateTime<Utc>) -> Result<()> {
    conn.execute(
        "INSERT INTO card_frequency (card_id, format, deck_count, last_updated)
         VALUES (?1, ?2, 1, ?3)
         ON CONFLICT(card_id, format) DO UPDATE SET
            deck_count = deck_count + 1,
            last_updated = excluded.last_updated",
        params![card, format, now],
    )?;
    Ok(())
}

/// Count one more deck seen in `format`.
pub fn increment_format_total(conn: &Connection, format: &str, now: DateTime<Utc>) -> Result<()> {
    conn.execute(
        "INSERT INTO format_totals (format, total_decks, last_updated)
         VALUES (?1, 1, ?2)
         ON CONFLICT(format) DO UPDATE SET
            total_decks = total_decks + 1,
            last_updated = excluded.last_updated",
        params![format, now],
    )?;
    Ok(())
}

pub fn format_total(conn: &Connection, format: &str) -> Result<u32> {
    let total: Option<u32> = conn
        .query_row(
            "SELECT total_decks FROM format_totals WHERE format = ?1",
            [format],
            |row| row.get(0),
        )
        .optional()?;
    Ok(total.unwrap_or(0))
}

pub fn get_card_frequency(conn: &Connection, card: CardId, format: &str) -> Result<Option<CardFrequency>> {
    conn.query_row(
        "SELECT f.card_id, f.format, f.deck_count, COALESCE(t.total_decks, 0), f.last_updated
         FROM card_frequency f
         LEFT JOIN format_totals t ON t.format = f.format
         WHERE f.card_id = ?1 AND f.format = ?2",
        params![card, format],
        |row| {
            Ok(CardFrequency {
                card_id: row.get(0)?,
                format: row.get(1)?,
                deck_count: row.get(2)?,
                total_decks_in_format: row.get(3)?,
                last_updated: row.get(4)?,
            })
        },
    )
    .optional()
    .map_err(Into::into)
}

/// Deck count of every card in a format, for the PMI pass.
pub fn deck_counts(conn: &Connection, format: &str) -> Result<HashMap<CardId, u32>> {
    let mut stmt = conn.prepare("SELECT card_id, deck_count FROM card_frequency WHERE format = ?1")?;
    let counts = stmt
        .query_map([format], |row| Ok((row.get::<_, CardId>(0)?, row.get::<_, u32>(1)?)))?
        .collect::<rusqlite::Result<HashMap<_, _>>>()?;
    Ok(counts)
}

pub fn count_tracked_cards(conn: &Connection) -> Result<usize> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM card_frequency", [], |row| row.get(0))?;
    Ok(count as usize)
}

pub fn clear_format(conn: &Connection, format: &str) -> Result<usize> {
    let cards = conn.execute("DELETE FROM card_frequency WHERE format = ?1", [format])?;
    conn.execute("DELETE FROM format_totals WHERE format = ?1", [format])?;
    Ok(cards)
}
