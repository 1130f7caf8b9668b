//! Archetype performance and matchup statistics
//!
//! Archetype labels come from an upstream classifier and are opaque here.
//! Match, win and loss counts merge additively; average duration and the last
//! match timestamp are last-write-wins.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Unique key of a matchup row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchupKey {
    pub account_id: i64,
    pub player_archetype: String,
    pub opponent_archetype: String,
    pub format: String,
}

impl MatchupKey {
    pub fn new(account_id: i64, player_archetype: &str, opponent_archetype: &str, format: &str) -> Self {
        Self {
            account_id,
            player_archetype: player_archetype.to_string(),
            opponent_archetype: opponent_archetype.to_string(),
            format: format.to_string(),
        }
    }
}

/// One matchup observation batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchupDelta {
    pub matches: u32,
    pub wins: u32,
    pub losses: u32,
    /// Replaces the stored average, absent included
    pub avg_game_duration: Option<u32>,
    /// Replaces the stored timestamp, absent included
    pub last_match_at: Option<DateTime<Utc>>,
}

impl MatchupDelta {
    /// A single finished match
    pub fn single(won: bool, duration_secs: Option<u32>, played_at: Option<DateTime<Utc>>) -> Self {
        Self {
            matches: 1,
            wins: u32::from(won),
            losses: u32::from(!won),
            avg_game_duration: duration_secs,
            last_match_at: played_at,
        }
    }

    /// Reject deltas whose outcomes do not fit in their match count.
    pub fn validate(&self) -> Result<()> {
        if self.wins > self.matches {
            return Err(Error::InvalidDelta(format!(
                "wins ({}) exceeds matches ({})",
                self.wins, self.matches
            )));
        }
        if u64::from(self.wins) + u64::from(self.losses) > u64::from(self.matches) {
            return Err(Error::InvalidDelta(format!(
                "wins ({}) + losses ({}) exceeds matches ({})",
                self.wins, self.losses, self.matches
            )));
        }
        Ok(())
    }
}

/// Player archetype vs opponent archetype record for an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchupStatistic {
    pub key: MatchupKey,
    pub total_matches: u32,
    pub wins: u32,
    pub losses: u32,
    pub avg_game_duration: Option<u32>,
    pub last_match_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MatchupStatistic {
    pub fn empty(key: MatchupKey, now: DateTime<Utc>) -> Self {
        Self {
            key,
            total_matches: 0,
            wins: 0,
            losses: 0,
            avg_game_duration: None,
            last_match_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Merge a delta: counts add, duration and timestamp are replaced
    pub fn apply(&mut self, delta: &MatchupDelta, now: DateTime<Utc>) {
        self.total_matches = self.total_matches.saturating_add(delta.matches);
        self.wins = self.wins.saturating_add(delta.wins);
        self.losses = self.losses.saturating_add(delta.losses);
        self.avg_game_duration = delta.avg_game_duration;
        self.last_match_at = delta.last_match_at;
        self.updated_at = now;
    }

    /// `wins / total_matches`, 0 when no matches were recorded
    pub fn win_rate(&self) -> f64 {
        if self.total_matches == 0 {
            return 0.0;
        }
        f64::from(self.wins) / f64::from(self.total_matches)
    }
}

/// Aggregated results of an archetype within a format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchetypePerformance {
    pub archetype: String,
    pub format: String,
    pub total_matches: u32,
    pub total_wins: u32,
    pub win_rate: f64,
    /// Mean match length in seconds over matches that reported one
    pub avg_duration: Option<f64>,
}

impl ArchetypePerformance {
    pub fn from_totals(
        archetype: &str,
        format: &str,
        total_matches: u32,
        total_wins: u32,
        duration_sum: u64,
        duration_samples: u32,
    ) -> Self {
        let win_rate = if total_matches > 0 {
            f64::from(total_wins) / f64::from(total_matches)
        } else {
            0.0
        };
        let avg_duration = (duration_samples > 0).then(|| duration_sum as f64 / f64::from(duration_samples));

        Self {
            archetype: archetype.to_string(),
            format: format.to_string(),
            total_matches,
            total_wins,
            win_rate,
            avg_duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> MatchupKey {
        MatchupKey::new(1, "UW Flyers", "Mono Red", "standard")
    }

    #[test]
    fn test_delta_validation() {
        assert!(MatchupDelta::single(true, None, None).validate().is_ok());

        let too_many_wins = MatchupDelta {
            matches: 1,
            wins: 2,
            ..Default::default()
        };
        assert!(matches!(too_many_wins.validate(), Err(Error::InvalidDelta(_))));

        let too_many_outcomes = MatchupDelta {
            matches: 2,
            wins: 1,
            losses: 2,
            ..Default::default()
        };
        assert!(matches!(too_many_outcomes.validate(), Err(Error::InvalidDelta(_))));
    }

    #[test]
    fn test_win_rate_zero_matches() {
        let stat = MatchupStatistic::empty(key(), Utc::now());
        assert_eq!(stat.win_rate(), 0.0);
        assert!(!stat.win_rate().is_nan());
    }

    #[test]
    fn test_apply_adds_counts_and_replaces_duration() {
        let mut stat = MatchupStatistic::empty(key(), Utc::now());
        stat.apply(
            &MatchupDelta { matches: 3, wins: 2, losses: 1, avg_game_duration: Some(600), last_match_at: None },
            Utc::now(),
        );
        stat.apply(
            &MatchupDelta { matches: 1, wins: 1, losses: 0, avg_game_duration: Some(420), last_match_at: None },
            Utc::now(),
        );

        assert_eq!(stat.total_matches, 4);
        assert_eq!(stat.wins, 3);
        assert_eq!(stat.losses, 1);
        assert_eq!(stat.avg_game_duration, Some(420));
        assert!((stat.win_rate() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_performance_from_totals() {
        let perf = ArchetypePerformance::from_totals("Gruul Aggro", "standard", 4, 3, 2000, 4);
        assert!((perf.win_rate - 0.75).abs() < 1e-9);
        assert_eq!(perf.avg_duration, Some(500.0));

        let empty = ArchetypePerformance::from_totals("Gruul Aggro", "standard", 0, 0, 0, 0);
        assert_eq!(empty.win_rate, 0.0);
        assert_eq!(empty.avg_duration, None);
    }
}
