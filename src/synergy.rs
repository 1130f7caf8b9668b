//! Win-rate synergy between card pairs
//!
//! A combination row tracks games and wins with both cards present and with
//! only one of them present. Synergy is the confidence-weighted gap between
//! the together win rate and the average solo win rate:
//!
//! ```text
//! raw     = wr_together - (wr_card1_alone + wr_card2_alone) / 2
//! synergy = raw * confidence(games_together)
//! ```
//!
//! Counters only ever grow by additive merges; scores are derived by the
//! recompute pass and stale in between.
//!
//! Solo games come from two places: counters merged in by callers, and
//! counters the recompute pass derives from individual card totals. They are
//! stored apart and summed on read, so a recompute never takes back games a
//! caller accumulated.

use crate::card::{CardId, CardPair};
use crate::confidence::confidence;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Games together below which a pair has no synergy signal at all.
///
/// Shared by the score floor and by the top-synergy query filter.
pub const MIN_GAMES_FOR_SYNERGY: u32 = 5;

/// Win rate assumed for a card never seen without its partner.
pub const NEUTRAL_WIN_RATE: f64 = 0.5;

/// Unique key of a combination row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CombinationKey {
    pub pair: CardPair,
    /// `None` for format-wide rows
    pub deck_id: Option<String>,
    pub format: String,
}

impl CombinationKey {
    pub fn format_wide(pair: CardPair, format: &str) -> Self {
        Self {
            pair,
            deck_id: None,
            format: format.to_string(),
        }
    }

    pub fn for_deck(pair: CardPair, deck_id: &str, format: &str) -> Self {
        Self {
            pair,
            deck_id: Some(deck_id.to_string()),
            format: format.to_string(),
        }
    }

    /// Storage form of the deck scope; the empty string means format-wide
    pub fn deck_column(&self) -> &str {
        self.deck_id.as_deref().unwrap_or("")
    }
}

/// Increments for the six counters of a combination row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinationDelta {
    pub games_together: u32,
    pub games_card1_only: u32,
    pub games_card2_only: u32,
    pub wins_together: u32,
    pub wins_card1_only: u32,
    pub wins_card2_only: u32,
}

impl CombinationDelta {
    /// One game with both cards in the deck
    pub fn together(won: bool) -> Self {
        Self {
            games_together: 1,
            wins_together: u32::from(won),
            ..Default::default()
        }
    }

    /// The same delta seen from the other card's side
    pub fn swapped(self) -> Self {
        Self {
            games_together: self.games_together,
            games_card1_only: self.games_card2_only,
            games_card2_only: self.games_card1_only,
            wins_together: self.wins_together,
            wins_card1_only: self.wins_card2_only,
            wins_card2_only: self.wins_card1_only,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("together", self.wins_together, self.games_together),
            ("card1_only", self.wins_card1_only, self.games_card1_only),
            ("card2_only", self.wins_card2_only, self.games_card2_only),
        ];
        for (label, wins, games) in checks {
            if wins > games {
                return Err(Error::InvalidDelta(format!(
                    "wins_{} ({}) exceeds games_{} ({})",
                    label, wins, label, games
                )));
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Combination counters plus derived scores for one key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinationStats {
    pub key: CombinationKey,
    pub games_together: u32,
    pub games_card1_only: u32,
    pub games_card2_only: u32,
    pub wins_together: u32,
    pub wins_card1_only: u32,
    pub wins_card2_only: u32,
    /// Solo counters derived from individual totals, replaced on recompute
    #[serde(default)]
    pub games_card1_derived: u32,
    #[serde(default)]
    pub wins_card1_derived: u32,
    #[serde(default)]
    pub games_card2_derived: u32,
    #[serde(default)]
    pub wins_card2_derived: u32,
    pub synergy_score: f64,
    pub confidence_score: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub scores_computed_at: Option<DateTime<Utc>>,
}

impl CombinationStats {
    /// Fresh zeroed row for a key
    pub fn empty(key: CombinationKey, now: DateTime<Utc>) -> Self {
        Self {
            key,
            games_together: 0,
            games_card1_only: 0,
            games_card2_only: 0,
            wins_together: 0,
            wins_card1_only: 0,
            wins_card2_only: 0,
            games_card1_derived: 0,
            wins_card1_derived: 0,
            games_card2_derived: 0,
            wins_card2_derived: 0,
            synergy_score: 0.0,
            confidence_score: 0.0,
            created_at: now,
            updated_at: now,
            scores_computed_at: None,
        }
    }

    /// Additive merge of a delta into the counters. Scores are left stale.
    pub fn apply(&mut self, delta: &CombinationDelta, now: DateTime<Utc>) {
        self.games_together = self.games_together.saturating_add(delta.games_together);
        self.games_card1_only = self.games_card1_only.saturating_add(delta.games_card1_only);
        self.games_card2_only = self.games_card2_only.saturating_add(delta.games_card2_only);
        self.wins_together = self.wins_together.saturating_add(delta.wins_together);
        self.wins_card1_only = self.wins_card1_only.saturating_add(delta.wins_card1_only);
        self.wins_card2_only = self.wins_card2_only.saturating_add(delta.wins_card2_only);
        self.updated_at = now;
    }

    /// Recompute stored scores from the current counters
    pub fn refresh_scores(&mut self, now: DateTime<Utc>) {
        self.synergy_score = synergy_score(self);
        self.confidence_score = confidence(self.games_together);
        self.scores_computed_at = Some(now);
    }

    pub fn is_stale(&self) -> bool {
        match self.scores_computed_at {
            Some(computed) => computed < self.updated_at,
            None => true,
        }
    }

    pub fn win_rate_together(&self) -> f64 {
        win_rate(self.wins_together, self.games_together)
    }

    /// Games and wins of card 1 without card 2, accumulated plus derived
    pub fn solo_card1(&self) -> (u32, u32) {
        (
            self.games_card1_only.saturating_add(self.games_card1_derived),
            self.wins_card1_only.saturating_add(self.wins_card1_derived),
        )
    }

    /// Games and wins of card 2 without card 1, accumulated plus derived
    pub fn solo_card2(&self) -> (u32, u32) {
        (
            self.games_card2_only.saturating_add(self.games_card2_derived),
            self.wins_card2_only.saturating_add(self.wins_card2_derived),
        )
    }

    pub fn win_rate_card1_only(&self) -> f64 {
        let (games, wins) = self.solo_card1();
        win_rate(wins, games)
    }

    pub fn win_rate_card2_only(&self) -> f64 {
        let (games, wins) = self.solo_card2();
        win_rate(wins, games)
    }

    /// The other card in this combination
    pub fn partner_of(&self, card: CardId) -> Option<CardId> {
        self.key.pair.partner_of(card)
    }
}

fn win_rate(wins: u32, games: u32) -> f64 {
    if games == 0 {
        return 0.0;
    }
    f64::from(wins) / f64::from(games)
}

fn solo_win_rate(wins: u32, games: u32) -> f64 {
    if games == 0 {
        return NEUTRAL_WIN_RATE;
    }
    f64::from(wins) / f64::from(games)
}

/// Confidence-weighted synergy of a combination row.
///
/// Exactly 0 below [`MIN_GAMES_FOR_SYNERGY`] games together, whatever the
/// other counters say. May be negative (anti-synergy).
pub fn synergy_score(stats: &CombinationStats) -> f64 {
    if stats.games_together < MIN_GAMES_FOR_SYNERGY {
        return 0.0;
    }

    let together = win_rate(stats.wins_together, stats.games_together);
    let (games1, wins1) = stats.solo_card1();
    let (games2, wins2) = stats.solo_card2();
    let card1_alone = solo_win_rate(wins1, games1);
    let card2_alone = solo_win_rate(wins2, games2);

    let raw = together - (card1_alone + card2_alone) / 2.0;
    raw * confidence(stats.games_together)
}

/// Every game a card appeared in, regardless of partners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardIndividualStats {
    pub card_id: CardId,
    pub format: String,
    pub total_games: u32,
    pub wins: u32,
    pub updated_at: DateTime<Utc>,
}

impl CardIndividualStats {
    pub fn win_rate(&self) -> f64 {
        win_rate(self.wins, self.total_games)
    }
}

/// Solo counters for one side of a pair, derived from the card's individual
/// totals minus the games it shared with its partner.
pub fn derive_solo(individual_games: u32, individual_wins: u32, games_together: u32, wins_together: u32) -> (u32, u32) {
    let games = individual_games.saturating_sub(games_together);
    if games == 0 {
        return (0, 0);
    }
    let wins = individual_wins.saturating_sub(wins_together).min(games);
    (games, wins)
}

/// Synergy partner of a card, as consumed by suggestion generation and UIs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynergyPartner {
    pub card_id: CardId,
    pub partner_id: CardId,
    pub synergy_score: f64,
    pub confidence_score: f64,
    pub win_rate_together: f64,
    pub games_together: u32,
}

impl SynergyPartner {
    pub fn from_stats(stats: &CombinationStats, card: CardId) -> Option<Self> {
        let partner_id = stats.partner_of(card)?;
        Some(Self {
            card_id: card,
            partner_id,
            synergy_score: stats.synergy_score,
            confidence_score: stats.confidence_score,
            win_rate_together: stats.win_rate_together(),
            games_together: stats.games_together,
        })
    }
}

/// One in-deck pair of a synergy report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairSynergy {
    pub pair: CardPair,
    pub synergy_score: f64,
    pub games_together: u32,
    pub win_rate: f64,
}

/// Synergy summary of a deck's card list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynergyReport {
    pub deck_id: String,
    pub card_count: usize,
    pub total_pairs: usize,
    pub avg_synergy_score: f64,
    /// Best and worst pairs, at most 10 of each
    pub synergies: Vec<PairSynergy>,
}

impl SynergyReport {
    /// Largest report kept before trimming to the top and bottom ten
    pub const MAX_LISTED: usize = 20;

    pub fn build(deck_id: &str, card_count: usize, mut pairs: Vec<PairSynergy>) -> Self {
        let total_pairs = pairs.len();
        let avg_synergy_score = if total_pairs > 0 {
            pairs.iter().map(|p| p.synergy_score).sum::<f64>() / total_pairs as f64
        } else {
            0.0
        };

        pairs.sort_by(|a, b| b.synergy_score.total_cmp(&a.synergy_score));
        if pairs.len() > Self::MAX_LISTED {
            let half = Self::MAX_LISTED / 2;
            let bottom = pairs.split_off(pairs.len() - half);
            pairs.truncate(half);
            pairs.extend(bottom);
        }

        Self {
            deck_id: deck_id.to_string(),
            card_count,
            total_pairs,
            avg_synergy_score,
            synergies: pairs,
        }
    }
}
