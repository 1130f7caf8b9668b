//! Persisted suggestions.

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::suggestion::{MlSuggestion, SuggestionType};
use crate::{Error, Result};

const COLUMNS: &str = "id, deck_id, suggestion_type, card_id, card_name, swap_for_card_id, swap_for_card_name, \
    confidence, expected_win_rate_change, title, description, reasoning, evidence, \
    is_dismissed, was_applied, outcome_win_rate_change, created_at, applied_at, outcome_recorded_at";

/// Insert a new suggestion and return its id.
pub fn insert_suggestion(conn: &Connection, suggestion: &MlSuggestion) -> Result<i64> {
    let reasoning = serde_json::to_string(&suggestion.reasoning)?;
    let evidence = serde_json::to_string(&suggestion.evidence)?;

    conn.execute(
        "INSERT INTO ml_suggestions (
            deck_id, suggestion_type, card_id, card_name, swap_for_card_id, swap_for_card_name,
            confidence, expected_win_rate_change, title, description, reasoning, evidence,
            is_dismissed, was_applied, outcome_win_rate_change, created_at, applied_at, outcome_recorded_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
        params![
            suggestion.deck_id,
            suggestion.suggestion_type.as_str(),
            suggestion.card_id,
            suggestion.card_name,
            suggestion.swap_for_card_id,
            suggestion.swap_for_card_name,
            suggestion.confidence,
            suggestion.expected_win_rate_change,
            suggestion.title,
            suggestion.description,
            reasoning,
            evidence,
            suggestion.is_dismissed,
            suggestion.was_applied,
            suggestion.outcome_win_rate_change,
            suggestion.created_at,
            suggestion.applied_at,
            suggestion.outcome_recorded_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_suggestion(conn: &Connection, id: i64) -> Result<Option<MlSuggestion>> {
    conn.query_row(
        &format!("SELECT {} FROM ml_suggestions WHERE id = ?1", COLUMNS),
        [id],
        row_to_suggestion,
    )
    .optional()
    .map_err(Into::into)
}

/// Persist the lifecycle fields of an existing suggestion.
pub fn update_lifecycle(conn: &Connection, suggestion: &MlSuggestion) -> Result<()> {
    let updated = conn.execute(
        "UPDATE ml_suggestions SET
            is_dismissed = ?1, was_applied = ?2, applied_at = ?3,
            outcome_win_rate_change = ?4, outcome_recorded_at = ?5
         WHERE id = ?6",
        params![
            suggestion.is_dismissed,
            suggestion.was_applied,
            suggestion.applied_at,
            suggestion.outcome_win_rate_change,
            suggestion.outcome_recorded_at,
            suggestion.id,
        ],
    )?;
    if updated == 0 {
        return Err(Error::SuggestionNotFound(suggestion.id));
    }
    Ok(())
}

/// All suggestions for a deck, newest first.
pub fn suggestions_for_deck(conn: &Connection, deck_id: &str) -> Result<Vec<MlSuggestion>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM ml_suggestions WHERE deck_id = ?1 ORDER BY created_at DESC, id DESC",
        COLUMNS
    ))?;
    let rows = stmt
        .query_map([deck_id], row_to_suggestion)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Suggestions still awaiting a decision, most confident first.
pub fn active_suggestions(conn: &Connection, deck_id: &str) -> Result<Vec<MlSuggestion>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM ml_suggestions
         WHERE deck_id = ?1 AND is_dismissed = 0 AND was_applied = 0
         ORDER BY confidence DESC, id",
        COLUMNS
    ))?;
    let rows = stmt
        .query_map([deck_id], row_to_suggestion)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn delete_for_deck(conn: &Connection, deck_id: &str) -> Result<usize> {
    Ok(conn.execute("DELETE FROM ml_suggestions WHERE deck_id = ?1", [deck_id])?)
}

pub fn count_suggestions(conn: &Connection) -> Result<usize> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM ml_suggestions", [], |row| row.get(0))?;
    Ok(count as usize)
}

fn row_to_suggestion(row: &Row) -> rusqlite::Result<MlSuggestion> {
    let type_str: String = row.get(2)?;
    let suggestion_type: SuggestionType = type_str.parse().map_err(|e: Error| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let reasoning_str: String = row.get(11)?;
    let reasoning = serde_json::from_str(&reasoning_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(11, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let evidence_str: String = row.get(12)?;
    let evidence = serde_json::from_str(&evidence_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(12, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(MlSuggestion {
        id: row.get(0)?,
        deck_id: row.get(1)?,
        suggestion_type,
        card_id: row.get(3)?,
        card_name: row.get(4)?,
        swap_for_card_id: row.get(5)?,
        swap_for_card_name: row.get(6)?,
        confidence: row.get(7)?,
        expected_win_rate_change: row.get(8)?,
        title: row.get(9)?,
        description: row.get(10)?,
        reasoning,
        evidence,
        is_dismissed: row.get(13)?,
        was_applied: row.get(14)?,
        outcome_win_rate_change: row.get(15)?,
        created_at: row.get(16)?,
        applied_at: row.get(17)?,
        outcome_recorded_at: row.get(18)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardId;
    use crate::storage::schema;
    use crate::suggestion::{ReasonKind, SuggestionDraft, SuggestionReason, SuggestionState};
    use chrono::Utc;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        for stmt in schema::all_schema_statements() {
            conn.execute(stmt, []).unwrap();
        }
        conn
    }

    fn swap() -> MlSuggestion {
        MlSuggestion::compose(
            SuggestionDraft {
                deck_id: "deck-1".to_string(),
                suggestion_type: SuggestionType::Swap,
                card_id: CardId(4),
                card_name: "Bad Card".to_string(),
                swap_for: Some((CardId(9), "Good Card".to_string())),
                confidence: 0.6,
                expected_win_rate_change: 3.5,
                reasons: vec![SuggestionReason {
                    kind: ReasonKind::Synergy,
                    description: "Bad Card has negative synergy (-4.0%) with your deck".to_string(),
                    impact: -0.04,
                    confidence: 0.6,
                }],
                evidence: serde_json::json!({ "pairings": 5 }),
                description: None,
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_insert_and_read_back() {
        let conn = conn();
        let id = insert_suggestion(&conn, &swap()).unwrap();

        let stored = get_suggestion(&conn, id).unwrap().unwrap();
        assert_eq!(stored.id, id);
        assert_eq!(stored.suggestion_type, SuggestionType::Swap);
        assert_eq!(stored.swap_for_card_id, Some(CardId(9)));
        assert_eq!(stored.reasoning.len(), 1);
        assert_eq!(stored.reasoning[0].kind, ReasonKind::Synergy);
        assert_eq!(stored.evidence["pairings"], 5);
        assert_eq!(stored.state(), SuggestionState::Created);
    }

    #[test]
    fn test_lifecycle_update() {
        let conn = conn();
        let id = insert_suggestion(&conn, &swap()).unwrap();
        let mut stored = get_suggestion(&conn, id).unwrap().unwrap();
        stored.apply(Utc::now()).unwrap();
        update_lifecycle(&conn, &stored).unwrap();

        assert!(active_suggestions(&conn, "deck-1").unwrap().is_empty());
        assert_eq!(suggestions_for_deck(&conn, "deck-1").unwrap().len(), 1);
        let reread = get_suggestion(&conn, id).unwrap().unwrap();
        assert_eq!(reread.state(), SuggestionState::Applied);
    }

    #[test]
    fn test_update_unknown_id() {
        let conn = conn();
        let mut ghost = swap();
        ghost.id = 42;
        assert!(matches!(update_lifecycle(&conn, &ghost), Err(Error::SuggestionNotFound(42))));
    }
}
