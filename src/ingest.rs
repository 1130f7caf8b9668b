//! Observations delivered by the match/deck processing pipeline

use crate::card::CardId;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::BufRead;

/// A deck list seen in a format (local decks, tournament feeds, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckObservation {
    pub deck_id: String,
    pub format: String,
    pub cards: Vec<CardId>,
}

/// A completed match with the player's mainboard and both archetype labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchObservation {
    pub match_id: String,
    pub account_id: i64,
    pub deck_id: String,
    pub format: String,
    pub cards: Vec<CardId>,
    pub won: bool,
    #[serde(default)]
    pub player_archetype: Option<String>,
    #[serde(default)]
    pub opponent_archetype: Option<String>,
    #[serde(default)]
    pub duration_secs: Option<u32>,
    #[serde(default)]
    pub played_at: Option<DateTime<Utc>>,
}

impl MatchObservation {
    /// Mainboard cards without duplicates, in ascending id order
    pub fn unique_cards(&self) -> Vec<CardId> {
        unique_cards(&self.cards)
    }
}

pub(crate) fn unique_cards(cards: &[CardId]) -> Vec<CardId> {
    let mut unique = cards.to_vec();
    unique.sort_unstable();
    unique.dedup();
    unique
}

/// Summary of one ingestion batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestSummary {
    /// Formats that received at least one observation
    pub formats: Vec<String>,
    pub observations: usize,
    /// Already in the processed-match ledger
    pub skipped_duplicates: usize,
    /// Fewer than two distinct cards
    pub skipped_small: usize,
    pub pairs_updated: usize,
    pub cards_tracked: usize,
}

impl IngestSummary {
    pub(crate) fn touch_format(&mut self, format: &str) {
        if !self.formats.iter().any(|f| f == format) {
            self.formats.push(format.to_string());
        }
    }
}

impl std::fmt::Display for IngestSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Ingestion Summary:")?;
        if !self.formats.is_empty() {
            writeln!(f, "  Formats: {}", self.formats.join(", "))?;
        }
        writeln!(f, "  Observations: {}", self.observations)?;
        writeln!(f, "  Skipped (already processed): {}", self.skipped_duplicates)?;
        writeln!(f, "  Skipped (too few cards): {}", self.skipped_small)?;
        writeln!(f, "  Pairs updated: {}", self.pairs_updated)?;
        writeln!(f, "  Cards tracked: {}", self.cards_tracked)
    }
}

/// Parse newline-delimited JSON records, skipping blank lines.
pub fn read_json_lines<T, R>(reader: R) -> Result<Vec<T>>
where
    T: serde::de::DeserializeOwned,
    R: BufRead,
{
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        records.push(serde_json::from_str(trimmed)?);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_match_lines() {
        let input = r#"
{"match_id":"m1","account_id":1,"deck_id":"d1","format":"standard","cards":[3,1,3],"won":true}

{"match_id":"m2","account_id":1,"deck_id":"d1","format":"standard","cards":[1,2],"won":false,"player_archetype":"Gruul Aggro","duration_secs":540}
"#;
        let matches: Vec<MatchObservation> = read_json_lines(input.as_bytes()).unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].unique_cards(), vec![CardId(1), CardId(3)]);
        assert_eq!(matches[1].player_archetype.as_deref(), Some("Gruul Aggro"));
        assert_eq!(matches[1].duration_secs, Some(540));
    }

    #[test]
    fn test_bad_line_is_error() {
        let result: Result<Vec<DeckObservation>> = read_json_lines("{not json}".as_bytes());
        assert!(matches!(result, Err(crate::Error::Serialization(_))));
    }
}
