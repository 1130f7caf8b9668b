//! Pair co-occurrence counts and the PMI signal derived from them
//!
//! `count` is the number of decks in a format containing both cards. The PMI
//! score measures how much more (or less) often the pair shows up together
//! than independent base rates would predict:
//!
//! ```text
//! PMI(A,B) = log2( count(A,B) * N / (freq(A) * freq(B)) )
//! ```
//!
//! where `N` is the number of decks seen for the format.

use crate::card::{CardId, CardPair};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Co-occurrence row for one canonical pair in one format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardCooccurrence {
    pub pair: CardPair,
    pub format: String,
    pub count: u32,
    /// Derived; `None` until the first PMI pass covering this row
    pub pmi_score: Option<f64>,
    pub last_updated: DateTime<Utc>,
    pub pmi_computed_at: Option<DateTime<Utc>>,
}

impl CardCooccurrence {
    /// True when the count changed after the last PMI pass (or none ran yet)
    pub fn is_stale(&self) -> bool {
        match self.pmi_computed_at {
            Some(computed) => computed < self.last_updated,
            None => true,
        }
    }

    /// PMI score, treating a never-computed score as no signal
    pub fn pmi_or_zero(&self) -> f64 {
        self.pmi_score.unwrap_or(0.0)
    }
}

/// Pointwise mutual information of a pair.
///
/// Returns 0 when either card has no recorded decks or the pair itself was
/// never seen.
pub fn pmi_score(count: u32, freq_a: u32, freq_b: u32, total_decks: u32) -> f64 {
    if freq_a == 0 || freq_b == 0 || count == 0 || total_decks == 0 {
        return 0.0;
    }
    let joint = f64::from(count) * f64::from(total_decks);
    let independent = f64::from(freq_a) * f64::from(freq_b);
    (joint / independent).log2()
}

/// Squash a PMI value into `[0, 1]` for display.
///
/// Non-positive PMI (pairs that avoid each other) carries no synergy and maps
/// to 0; positive values scale linearly and saturate at PMI 5.
pub fn normalize_pmi(pmi: f64) -> f64 {
    if pmi <= 0.0 {
        return 0.0;
    }
    (pmi / 5.0).min(1.0)
}

/// Co-occurrence partner of a card, as returned by top-pair queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CooccurrencePartner {
    pub card_id: CardId,
    /// Normalized score in `[0, 1]`
    pub score: f64,
    pub raw_pmi: Option<f64>,
    pub count: u32,
}

impl CooccurrencePartner {
    pub fn from_row(row: &CardCooccurrence, card: CardId) -> Option<Self> {
        let partner = row.pair.partner_of(card)?;
        Some(Self {
            card_id: partner,
            score: normalize_pmi(row.pmi_or_zero()),
            raw_pmi: row.pmi_score,
            count: row.count,
        })
    }
}

/// Where a format's deck lists came from (last write wins).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CooccurrenceSource {
    pub source_type: String,
    pub source_id: String,
    pub format: String,
    pub deck_count: u32,
    pub card_count: u32,
    pub last_synced: DateTime<Utc>,
}
