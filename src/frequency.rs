//! Card frequency - how many decks of a format contain each card
//!
//! The per-card deck count is the denominator side of every probability the
//! PMI pass estimates. The format total is kept once per format and joined in
//! on read, so it can never disagree between cards.

use crate::card::CardId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Deck count for a card within a format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardFrequency {
    pub card_id: CardId,
    pub format: String,
    pub deck_count: u32,
    pub total_decks_in_format: u32,
    pub last_updated: DateTime<Utc>,
}

impl CardFrequency {
    /// Share of the format's decks that play this card
    pub fn frequency(&self) -> f64 {
        frequency(self.deck_count, self.total_decks_in_format)
    }
}

/// `deck_count / total_decks`, 0 for an empty format.
pub fn frequency(deck_count: u32, total_decks: u32) -> f64 {
    if total_decks == 0 {
        return 0.0;
    }
    f64::from(deck_count) / f64::from(total_decks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency() {
        assert_eq!(frequency(5, 20), 0.25);
        assert_eq!(frequency(0, 20), 0.0);
    }

    #[test]
    fn test_empty_format_is_zero() {
        assert_eq!(frequency(3, 0), 0.0);
    }
}
