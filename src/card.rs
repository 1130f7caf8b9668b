//! Card identity and canonical pair ordering
//!
//! Every pair-keyed table stores an unordered pair exactly once, lower id
//! first. `CardPair` is the only way to build such a key, so storage and
//! scoring code never branch on argument order.

use crate::{Error, Result};
use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Arena card identifier (`grpId` in the client logs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(pub u32);

impl CardId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u32 {
        self.0
    }

    /// Fallback display name when no card catalog knows the id
    pub fn placeholder_name(&self) -> String {
        format!("Card #{}", self.0)
    }
}

impl From<u32> for CardId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl FromStr for CardId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<u32>()
            .map(CardId)
            .map_err(|_| Error::Parse(format!("Invalid card id: {}", s)))
    }
}

impl std::fmt::Display for CardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ToSql for CardId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        self.0.to_sql()
    }
}

impl FromSql for CardId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        u32::column_result(value).map(CardId)
    }
}

/// An unordered pair of distinct cards in canonical order (`first < second`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CardPair {
    first: CardId,
    second: CardId,
}

impl CardPair {
    /// Canonicalize two cards into a pair. Self-pairs are rejected.
    pub fn new(a: CardId, b: CardId) -> Result<Self> {
        Self::ordered(a, b).map(|(pair, _)| pair)
    }

    /// Canonicalize and report whether the arguments were swapped to get there.
    ///
    /// Callers carrying per-card data alongside the pair (solo counters) use the
    /// flag to swap that data too.
    pub fn ordered(a: CardId, b: CardId) -> Result<(Self, bool)> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Ok((Self { first: a, second: b }, false)),
            std::cmp::Ordering::Greater => Ok((Self { first: b, second: a }, true)),
            std::cmp::Ordering::Equal => Err(Error::InvalidPair(a)),
        }
    }

    pub fn first(&self) -> CardId {
        self.first
    }

    pub fn second(&self) -> CardId {
        self.second
    }

    pub fn contains(&self, card: CardId) -> bool {
        self.first == card || self.second == card
    }

    /// The other card of the pair, if `card` belongs to it
    pub fn partner_of(&self, card: CardId) -> Option<CardId> {
        if self.first == card {
            Some(self.second)
        } else if self.second == card {
            Some(self.first)
        } else {
            None
        }
    }
}

impl std::fmt::Display for CardPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.first, self.second)
    }
}

/// All canonical pairs over a card list, ignoring duplicates.
pub fn all_pairs(cards: &[CardId]) -> Vec<CardPair> {
    let mut unique = cards.to_vec();
    unique.sort_unstable();
    unique.dedup();

    let mut pairs = Vec::with_capacity(unique.len() * unique.len().saturating_sub(1) / 2);
    for (i, &a) in unique.iter().enumerate() {
        for &b in &unique[i + 1..] {
            pairs.push(CardPair { first: a, second: b });
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_canonical_order() {
        let forward = CardPair::new(CardId(10), CardId(3)).unwrap();
        let backward = CardPair::new(CardId(3), CardId(10)).unwrap();

        assert_eq!(forward, backward);
        assert_eq!(forward.first(), CardId(3));
        assert_eq!(forward.second(), CardId(10));
    }

    #[test]
    fn test_ordered_reports_swap() {
        let (_, swapped) = CardPair::ordered(CardId(9), CardId(2)).unwrap();
        assert!(swapped);
        let (_, swapped) = CardPair::ordered(CardId(2), CardId(9)).unwrap();
        assert!(!swapped);
    }

    #[test]
    fn test_self_pair_rejected() {
        let err = CardPair::new(CardId(7), CardId(7)).unwrap_err();
        assert!(matches!(err, Error::InvalidPair(CardId(7))));
    }

    #[test]
    fn test_partner_of() {
        let pair = CardPair::new(CardId(1), CardId(2)).unwrap();
        assert_eq!(pair.partner_of(CardId(1)), Some(CardId(2)));
        assert_eq!(pair.partner_of(CardId(2)), Some(CardId(1)));
        assert_eq!(pair.partner_of(CardId(3)), None);
    }

    #[test]
    fn test_all_pairs_dedups() {
        let pairs = all_pairs(&[CardId(3), CardId(1), CardId(3), CardId(2)]);
        assert_eq!(pairs.len(), 3);
        assert!(pairs.iter().all(|p| p.first() < p.second()));
    }

    #[test]
    fn test_card_id_parse() {
        assert_eq!("12345".parse::<CardId>().unwrap(), CardId(12345));
        assert!("abc".parse::<CardId>().is_err());
    }
}
