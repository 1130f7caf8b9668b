//! Deck suggestions and their lifecycle
//!
//! A suggestion is created once and afterwards only moves through
//!
//! ```text
//! created ──dismiss──▶ dismissed
//!    └─────apply─────▶ applied ──record_outcome──▶ outcome_recorded
//! ```
//!
//! `dismissed` and `outcome_recorded` are terminal. Any other move is
//! rejected with [`Error::InvalidTransition`].

use crate::card::CardId;
use crate::confidence::confidence;
use crate::synergy::{synergy_score, CombinationStats, SynergyPartner};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;

/// What a suggestion asks the player to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionType {
    Add,
    Remove,
    /// Replace `card_id` with `swap_for_card_id`
    Swap,
}

impl SuggestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionType::Add => "add",
            SuggestionType::Remove => "remove",
            SuggestionType::Swap => "swap",
        }
    }
}

impl FromStr for SuggestionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "add" => Ok(SuggestionType::Add),
            "remove" => Ok(SuggestionType::Remove),
            "swap" => Ok(SuggestionType::Swap),
            _ => Err(Error::Parse(format!("Unknown suggestion type: {}", s))),
        }
    }
}

impl std::fmt::Display for SuggestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle position, derived from the persisted flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionState {
    Created,
    Dismissed,
    Applied,
    OutcomeRecorded,
}

impl SuggestionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionState::Created => "created",
            SuggestionState::Dismissed => "dismissed",
            SuggestionState::Applied => "applied",
            SuggestionState::OutcomeRecorded => "outcome_recorded",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SuggestionState::Dismissed | SuggestionState::OutcomeRecorded)
    }
}

impl std::fmt::Display for SuggestionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Signal family a reason was drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasonKind {
    Synergy,
    Performance,
    Curve,
    Meta,
}

/// Human-readable justification attached to a suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionReason {
    #[serde(rename = "type")]
    pub kind: ReasonKind,
    pub description: String,
    /// -1.0 to 1.0
    pub impact: f64,
    /// 0.0 to 1.0
    pub confidence: f64,
}

/// A persisted deck-improvement suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MlSuggestion {
    pub id: i64,
    pub deck_id: String,
    pub suggestion_type: SuggestionType,
    pub card_id: CardId,
    pub card_name: String,
    pub swap_for_card_id: Option<CardId>,
    pub swap_for_card_name: Option<String>,
    pub confidence: f64,
    /// Percentage points
    pub expected_win_rate_change: f64,
    pub title: String,
    pub description: String,
    pub reasoning: Vec<SuggestionReason>,
    pub evidence: serde_json::Value,
    pub is_dismissed: bool,
    pub was_applied: bool,
    pub outcome_win_rate_change: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub applied_at: Option<DateTime<Utc>>,
    pub outcome_recorded_at: Option<DateTime<Utc>>,
}

impl MlSuggestion {
    /// Build a new suggestion in the `created` state (id assigned on insert).
    ///
    /// A suggestion without any reason, or a swap without a replacement card,
    /// is rejected.
    pub fn compose(draft: SuggestionDraft, now: DateTime<Utc>) -> Result<Self> {
        if draft.reasons.is_empty() {
            return Err(Error::InvalidSuggestion(format!(
                "{} suggestion for {} has no reason",
                draft.suggestion_type, draft.card_name
            )));
        }

        let (swap_for_card_id, swap_for_card_name) = match (draft.suggestion_type, draft.swap_for) {
            (SuggestionType::Swap, Some((id, name))) => (Some(id), Some(name)),
            (SuggestionType::Swap, None) => {
                return Err(Error::InvalidSuggestion(format!(
                    "swap suggestion for {} has no replacement card",
                    draft.card_name
                )));
            }
            (_, Some(_)) => {
                return Err(Error::InvalidSuggestion(format!(
                    "{} suggestion for {} cannot carry a replacement card",
                    draft.suggestion_type, draft.card_name
                )));
            }
            (_, None) => (None, None),
        };

        let title = match draft.suggestion_type {
            SuggestionType::Add => format!("Consider adding {}", draft.card_name),
            SuggestionType::Remove => format!("Consider removing {}", draft.card_name),
            SuggestionType::Swap => format!(
                "Swap {} for {}",
                draft.card_name,
                swap_for_card_name.as_deref().unwrap_or_default()
            ),
        };
        let description = draft
            .description
            .unwrap_or_else(|| draft.reasons[0].description.clone());

        Ok(Self {
            id: 0,
            deck_id: draft.deck_id,
            suggestion_type: draft.suggestion_type,
            card_id: draft.card_id,
            card_name: draft.card_name,
            swap_for_card_id,
            swap_for_card_name,
            confidence: draft.confidence.clamp(0.0, 1.0),
            expected_win_rate_change: draft.expected_win_rate_change,
            title,
            description,
            reasoning: draft.reasons,
            evidence: draft.evidence,
            is_dismissed: false,
            was_applied: false,
            outcome_win_rate_change: None,
            created_at: now,
            applied_at: None,
            outcome_recorded_at: None,
        })
    }

    pub fn state(&self) -> SuggestionState {
        if self.is_dismissed {
            SuggestionState::Dismissed
        } else if self.outcome_recorded_at.is_some() {
            SuggestionState::OutcomeRecorded
        } else if self.was_applied {
            SuggestionState::Applied
        } else {
            SuggestionState::Created
        }
    }

    /// Neither dismissed nor applied yet
    pub fn is_active(&self) -> bool {
        self.state() == SuggestionState::Created
    }

    pub fn dismiss(&mut self) -> Result<()> {
        self.require(SuggestionState::Created, "dismissed")?;
        self.is_dismissed = true;
        Ok(())
    }

    pub fn apply(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.require(SuggestionState::Created, "applied")?;
        self.was_applied = true;
        self.applied_at = Some(now);
        Ok(())
    }

    /// Record the measured win-rate change after the suggestion was applied
    pub fn record_outcome(&mut self, win_rate_change: f64, now: DateTime<Utc>) -> Result<()> {
        self.require(SuggestionState::Applied, "given an outcome")?;
        self.outcome_win_rate_change = Some(win_rate_change);
        self.outcome_recorded_at = Some(now);
        Ok(())
    }

    fn require(&self, expected: SuggestionState, action: &'static str) -> Result<()> {
        let from = self.state();
        if from != expected {
            return Err(Error::InvalidTransition { id: self.id, from, action });
        }
        Ok(())
    }
}

/// Inputs for [`MlSuggestion::compose`].
#[derive(Debug, Clone)]
pub struct SuggestionDraft {
    pub deck_id: String,
    pub suggestion_type: SuggestionType,
    pub card_id: CardId,
    pub card_name: String,
    pub swap_for: Option<(CardId, String)>,
    pub confidence: f64,
    pub expected_win_rate_change: f64,
    pub reasons: Vec<SuggestionReason>,
    pub evidence: serde_json::Value,
    /// Defaults to the first reason
    pub description: Option<String>,
}

/// Card name lookup used to make suggestions readable.
pub trait CardCatalog {
    fn card_name(&self, card: CardId) -> Option<String>;

    fn display_name(&self, card: CardId) -> String {
        self.card_name(card).unwrap_or_else(|| card.placeholder_name())
    }
}

impl CardCatalog for HashMap<CardId, String> {
    fn card_name(&self, card: CardId) -> Option<String> {
        self.get(&card).cloned()
    }
}

/// Catalog that knows no names; every card renders as `Card #<id>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCatalog;

impl CardCatalog for NoCatalog {
    fn card_name(&self, _card: CardId) -> Option<String> {
        None
    }
}

/// Thresholds and limits for suggestion generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposerConfig {
    /// Synergy links below this confidence are ignored when looking for additions
    pub min_confidence: f64,
    /// Accumulated synergy an addition candidate must exceed
    pub add_threshold: f64,
    /// Average in-deck synergy under which a card is suggested for removal
    pub remove_threshold: f64,
    /// Average in-deck synergy under which the worst card is swapped out
    pub swap_threshold: f64,
    /// In-deck pairings needed before a card's average synergy counts
    pub min_pairings: usize,
    pub max_add: usize,
    pub max_remove: usize,
    /// Partners fetched per deck card for additions
    pub add_lookup_limit: usize,
    /// Partners fetched per deck card for swap replacements
    pub swap_lookup_limit: usize,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.3,
            add_threshold: 0.0,
            remove_threshold: -0.02,
            swap_threshold: -0.01,
            min_pairings: 3,
            max_add: 3,
            max_remove: 2,
            add_lookup_limit: 20,
            swap_lookup_limit: 10,
        }
    }
}

/// Turns synergy views into ranked add/remove/swap suggestions.
///
/// Does not deduplicate: asking twice for the same deck yields the same
/// suggestions twice.
pub struct SuggestionComposer<'a> {
    config: &'a ComposerConfig,
    catalog: &'a dyn CardCatalog,
}

#[derive(Debug, Clone, Copy)]
struct InDeckAverage {
    card: CardId,
    avg: f64,
    pairings: usize,
}

impl<'a> SuggestionComposer<'a> {
    pub fn new(config: &'a ComposerConfig, catalog: &'a dyn CardCatalog) -> Self {
        Self { config, catalog }
    }

    /// Cards outside the deck with strong accumulated synergy to cards in it.
    ///
    /// `synergies` holds top partners of each deck card (`card_id` in the
    /// deck, `partner_id` the candidate).
    pub fn add_suggestions(
        &self,
        deck_id: &str,
        deck_cards: &[CardId],
        synergies: &[SynergyPartner],
        now: DateTime<Utc>,
    ) -> Result<Vec<MlSuggestion>> {
        let in_deck: HashSet<CardId> = deck_cards.iter().copied().collect();
        let mut scores: HashMap<CardId, f64> = HashMap::new();
        let mut links: HashMap<CardId, Vec<&SynergyPartner>> = HashMap::new();

        for syn in synergies {
            if in_deck.contains(&syn.partner_id) {
                continue;
            }
            if confidence(syn.games_together) < self.config.min_confidence {
                continue;
            }
            *scores.entry(syn.partner_id).or_default() += syn.synergy_score;
            links.entry(syn.partner_id).or_default().push(syn);
        }

        let mut ranked: Vec<(CardId, f64)> = scores
            .into_iter()
            .filter(|(_, score)| *score > self.config.add_threshold)
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(self.config.max_add);

        let mut results = Vec::with_capacity(ranked.len());
        for (candidate, score) in ranked {
            let mut partners = links.remove(&candidate).unwrap_or_default();
            partners.sort_by(|a, b| b.synergy_score.total_cmp(&a.synergy_score));

            let name = self.catalog.display_name(candidate);
            let reasons = self.add_reasons(&name, &partners);
            let avg_confidence = if partners.is_empty() {
                0.0
            } else {
                partners.iter().map(|p| confidence(p.games_together)).sum::<f64>() / partners.len() as f64
            };
            let evidence = serde_json::json!({
                "partners": partners
                    .iter()
                    .map(|p| serde_json::json!({
                        "cardId": p.card_id,
                        "synergyScore": p.synergy_score,
                        "winRateTogether": p.win_rate_together,
                        "gamesTogether": p.games_together,
                    }))
                    .collect::<Vec<_>>(),
            });

            results.push(MlSuggestion::compose(
                SuggestionDraft {
                    deck_id: deck_id.to_string(),
                    suggestion_type: SuggestionType::Add,
                    card_id: candidate,
                    card_name: name,
                    swap_for: None,
                    confidence: avg_confidence,
                    expected_win_rate_change: score * 100.0,
                    reasons,
                    evidence,
                    description: None,
                },
                now,
            )?);
        }

        Ok(results)
    }

    fn add_reasons(&self, name: &str, partners: &[&SynergyPartner]) -> Vec<SuggestionReason> {
        let Some(top) = partners.first() else {
            return Vec::new();
        };

        let mut reasons = vec![SuggestionReason {
            kind: ReasonKind::Synergy,
            description: format!(
                "{} wins {:.1}% of games when paired with {}",
                name,
                top.win_rate_together * 100.0,
                self.catalog.display_name(top.card_id)
            ),
            impact: top.synergy_score,
            confidence: confidence(top.games_together),
        }];

        if partners.len() >= 3 {
            reasons.push(SuggestionReason {
                kind: ReasonKind::Performance,
                description: format!("Has positive synergy with {} cards already in your deck", partners.len()),
                impact: 0.5,
                confidence: 0.7,
            });
        }
        reasons
    }

    /// Deck cards whose average synergy with the rest of the deck is negative.
    ///
    /// `pair_stats` holds the combination rows of in-deck pairs.
    pub fn remove_suggestions(
        &self,
        deck_id: &str,
        pair_stats: &[CombinationStats],
        now: DateTime<Utc>,
    ) -> Result<Vec<MlSuggestion>> {
        let mut negatives: Vec<InDeckAverage> = self
            .in_deck_averages(pair_stats)
            .into_iter()
            .filter(|c| c.avg < self.config.remove_threshold)
            .collect();
        negatives.sort_by(|a, b| a.avg.total_cmp(&b.avg).then(a.card.cmp(&b.card)));
        negatives.truncate(self.config.max_remove);

        let mut results = Vec::with_capacity(negatives.len());
        for candidate in negatives {
            let name = self.catalog.display_name(candidate.card);
            let weight = confidence(candidate.pairings.saturating_mul(5).try_into().unwrap_or(u32::MAX));
            let reasons = vec![SuggestionReason {
                kind: ReasonKind::Synergy,
                description: format!(
                    "{} has negative synergy with {} other cards in your deck",
                    name, candidate.pairings
                ),
                impact: candidate.avg,
                confidence: weight,
            }];

            results.push(MlSuggestion::compose(
                SuggestionDraft {
                    deck_id: deck_id.to_string(),
                    suggestion_type: SuggestionType::Remove,
                    card_id: candidate.card,
                    card_name: name,
                    swap_for: None,
                    confidence: weight,
                    expected_win_rate_change: candidate.avg * 100.0,
                    reasons,
                    evidence: serde_json::json!({
                        "avgSynergy": candidate.avg,
                        "pairings": candidate.pairings,
                    }),
                    description: None,
                },
                now,
            )?);
        }

        Ok(results)
    }

    /// Replace the worst in-deck card with the best positive-synergy outsider.
    ///
    /// `synergies` holds top partners of each deck card; links from the card
    /// being swapped out are ignored.
    pub fn swap_suggestion(
        &self,
        deck_id: &str,
        deck_cards: &[CardId],
        pair_stats: &[CombinationStats],
        synergies: &[SynergyPartner],
        now: DateTime<Utc>,
    ) -> Result<Option<MlSuggestion>> {
        let worst = self
            .in_deck_averages(pair_stats)
            .into_iter()
            .min_by(|a, b| a.avg.total_cmp(&b.avg).then(a.card.cmp(&b.card)));
        let Some(worst) = worst.filter(|w| w.avg < self.config.swap_threshold) else {
            return Ok(None);
        };

        let in_deck: HashSet<CardId> = deck_cards.iter().copied().collect();
        let mut scores: HashMap<CardId, f64> = HashMap::new();
        for syn in synergies {
            if syn.card_id == worst.card || in_deck.contains(&syn.partner_id) || syn.synergy_score <= 0.0 {
                continue;
            }
            *scores.entry(syn.partner_id).or_default() += syn.synergy_score;
        }

        let best = scores
            .into_iter()
            .max_by(|a, b| a.1.total_cmp(&b.1).then(b.0.cmp(&a.0)));
        let Some((replacement, best_score)) = best else {
            return Ok(None);
        };

        let worst_name = self.catalog.display_name(worst.card);
        let best_name = self.catalog.display_name(replacement);
        let weight = confidence(worst.pairings.saturating_mul(5).try_into().unwrap_or(u32::MAX));

        let reasons = vec![
            SuggestionReason {
                kind: ReasonKind::Synergy,
                description: format!(
                    "{} has negative synergy ({:.1}%) with your deck",
                    worst_name,
                    worst.avg * 100.0
                ),
                impact: worst.avg,
                confidence: weight,
            },
            SuggestionReason {
                kind: ReasonKind::Synergy,
                description: format!(
                    "{} has strong synergy ({:.1}%) with your other cards",
                    best_name,
                    best_score * 100.0
                ),
                impact: best_score.min(1.0),
                confidence: weight,
            },
        ];

        let suggestion = MlSuggestion::compose(
            SuggestionDraft {
                deck_id: deck_id.to_string(),
                suggestion_type: SuggestionType::Swap,
                card_id: worst.card,
                card_name: worst_name.clone(),
                swap_for: Some((replacement, best_name.clone())),
                confidence: weight,
                expected_win_rate_change: (best_score - worst.avg) * 100.0,
                reasons,
                evidence: serde_json::json!({
                    "worstAvgSynergy": worst.avg,
                    "replacementSynergy": best_score,
                    "pairings": worst.pairings,
                }),
                description: Some(format!(
                    "Replace underperforming {} with {} which has better synergy with your deck",
                    worst_name, best_name
                )),
            },
            now,
        )?;

        Ok(Some(suggestion))
    }

    /// Average synergy of each deck card over its in-deck pairings, keeping
    /// only cards with enough pairings.
    fn in_deck_averages(&self, pair_stats: &[CombinationStats]) -> Vec<InDeckAverage> {
        let mut sums: HashMap<CardId, (f64, usize)> = HashMap::new();
        for stats in pair_stats {
            let synergy = synergy_score(stats);
            for card in [stats.key.pair.first(), stats.key.pair.second()] {
                let entry = sums.entry(card).or_default();
                entry.0 += synergy;
                entry.1 += 1;
            }
        }

        sums.into_iter()
            .filter(|(_, (_, count))| *count >= self.config.min_pairings)
            .map(|(card, (sum, count))| InDeckAverage {
                card,
                avg: sum / count as f64,
                pairings: count,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardPair;
    use crate::synergy::CombinationKey;

    fn reason() -> SuggestionReason {
        SuggestionReason {
            kind: ReasonKind::Synergy,
            description: "plays well".to_string(),
            impact: 0.1,
            confidence: 0.5,
        }
    }

    fn draft(kind: SuggestionType) -> SuggestionDraft {
        SuggestionDraft {
            deck_id: "deck-1".to_string(),
            suggestion_type: kind,
            card_id: CardId(1),
            card_name: "Llanowar Elves".to_string(),
            swap_for: None,
            confidence: 0.8,
            expected_win_rate_change: 4.0,
            reasons: vec![reason()],
            evidence: serde_json::json!({}),
            description: None,
        }
    }

    fn created() -> MlSuggestion {
        MlSuggestion::compose(draft(SuggestionType::Add), Utc::now()).unwrap()
    }

    fn partner(card: u32, partner: u32, synergy: f64, games: u32) -> SynergyPartner {
        SynergyPartner {
            card_id: CardId(card),
            partner_id: CardId(partner),
            synergy_score: synergy,
            confidence_score: confidence(games),
            win_rate_together: 0.6,
            games_together: games,
        }
    }

    fn pair_stats(a: u32, b: u32, games: u32, wins: u32) -> CombinationStats {
        let pair = CardPair::new(CardId(a), CardId(b)).unwrap();
        let mut s = CombinationStats::empty(CombinationKey::format_wide(pair, "standard"), Utc::now());
        s.games_together = games;
        s.wins_together = wins;
        s.games_card1_only = 20;
        s.wins_card1_only = 12;
        s.games_card2_only = 20;
        s.wins_card2_only = 12;
        s
    }

    #[test]
    fn test_compose_defaults() {
        let s = created();
        assert_eq!(s.title, "Consider adding Llanowar Elves");
        assert_eq!(s.description, "plays well");
        assert_eq!(s.state(), SuggestionState::Created);
    }

    #[test]
    fn test_compose_requires_reason() {
        let mut d = draft(SuggestionType::Add);
        d.reasons.clear();
        assert!(matches!(MlSuggestion::compose(d, Utc::now()), Err(Error::InvalidSuggestion(_))));
    }

    #[test]
    fn test_swap_requires_target() {
        let d = draft(SuggestionType::Swap);
        assert!(matches!(MlSuggestion::compose(d, Utc::now()), Err(Error::InvalidSuggestion(_))));
    }

    #[test]
    fn test_dismiss_then_apply_rejected() {
        let mut s = created();
        s.dismiss().unwrap();
        let err = s.apply(Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidTransition { from: SuggestionState::Dismissed, .. }
        ));
        assert!(!s.was_applied);
    }

    #[test]
    fn test_apply_then_dismiss_rejected() {
        let mut s = created();
        s.apply(Utc::now()).unwrap();
        assert!(s.dismiss().is_err());
        assert_eq!(s.state(), SuggestionState::Applied);
    }

    #[test]
    fn test_outcome_only_after_apply() {
        let mut s = created();
        assert!(s.record_outcome(2.5, Utc::now()).is_err());

        s.apply(Utc::now()).unwrap();
        s.record_outcome(2.5, Utc::now()).unwrap();
        assert_eq!(s.state(), SuggestionState::OutcomeRecorded);
        assert!(s.state().is_terminal());
        assert!(s.record_outcome(1.0, Utc::now()).is_err());
    }

    #[test]
    fn test_add_suggestions_rank_and_filter() {
        let config = ComposerConfig::default();
        let composer = SuggestionComposer::new(&config, &NoCatalog);
        let deck = [CardId(1), CardId(2), CardId(3)];
        let synergies = vec![
            partner(1, 10, 0.10, 25),
            partner(2, 10, 0.05, 25),
            partner(1, 11, 0.20, 25),
            // already in deck
            partner(1, 2, 0.90, 25),
            // too little evidence: confidence(0) = 0
            partner(3, 12, 0.90, 0),
            // net negative
            partner(3, 13, -0.10, 25),
        ];

        let out = composer.add_suggestions("deck-1", &deck, &synergies, Utc::now()).unwrap();
        let ids: Vec<CardId> = out.iter().map(|s| s.card_id).collect();
        assert_eq!(ids, vec![CardId(11), CardId(10)]);
        assert_eq!(out[0].title, "Consider adding Card #11");
        assert!((out[0].expected_win_rate_change - 20.0).abs() < 1e-9);
        assert!(out[0].reasoning[0].description.contains("Card #1"));
    }

    #[test]
    fn test_remove_and_swap() {
        let config = ComposerConfig::default();
        let names: HashMap<CardId, String> = [(CardId(4), "Bad Card".to_string())].into_iter().collect();
        let composer = SuggestionComposer::new(&config, &names);
        let deck = [CardId(1), CardId(2), CardId(3), CardId(4)];

        // card 4 loses a lot with everyone, the others are neutral together
        let stats = vec![
            pair_stats(1, 4, 20, 4),
            pair_stats(2, 4, 20, 4),
            pair_stats(3, 4, 20, 4),
            pair_stats(1, 2, 20, 12),
            pair_stats(1, 3, 20, 12),
            pair_stats(2, 3, 20, 12),
        ];

        let removals = composer.remove_suggestions("deck-1", &stats, Utc::now()).unwrap();
        assert_eq!(removals[0].card_id, CardId(4));
        assert_eq!(removals[0].title, "Consider removing Bad Card");

        let synergies = vec![partner(1, 50, 0.2, 30), partner(4, 60, 0.9, 30)];
        let swap = composer
            .swap_suggestion("deck-1", &deck, &stats, &synergies, Utc::now())
            .unwrap()
            .unwrap();
        assert_eq!(swap.card_id, CardId(4));
        assert_eq!(swap.swap_for_card_id, Some(CardId(50)));
        assert_eq!(swap.title, "Swap Bad Card for Card #50");
        assert_eq!(swap.reasoning.len(), 2);
    }

    #[test]
    fn test_swap_needs_negative_worst() {
        let config = ComposerConfig::default();
        let composer = SuggestionComposer::new(&config, &NoCatalog);
        let stats = vec![
            pair_stats(1, 2, 20, 12),
            pair_stats(1, 3, 20, 12),
            pair_stats(2, 3, 20, 12),
        ];
        let deck = [CardId(1), CardId(2), CardId(3)];
        let synergies = vec![partner(1, 50, 0.2, 30)];
        let swap = composer.swap_suggestion("deck-1", &deck, &stats, &synergies, Utc::now()).unwrap();
        assert!(swap.is_none());
    }
}
