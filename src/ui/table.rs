use tabled::{settings::Style, Table, Tabled};

use crate::archetype::{ArchetypePerformance, MatchupStatistic};
use crate::cooccurrence::CooccurrencePartner;
use crate::suggestion::{CardCatalog, MlSuggestion};
use crate::synergy::{PairSynergy, SynergyPartner};
use crate::ui::output::{percent, signed};

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn stats_table(stats: &[(&str, String)]) -> String {
    let mut builder = TableBuilder::new();
    for (label, value) in stats {
        builder.add_row(label, value);
    }
    builder.build()
}

fn render<T: Tabled>(rows: &[T]) -> String {
    if rows.is_empty() {
        return String::new();
    }
    Table::new(rows).with(Style::rounded()).to_string()
}

#[derive(Tabled)]
struct SynergyRow {
    #[tabled(rename = "Partner")]
    partner: String,
    #[tabled(rename = "Synergy")]
    synergy: String,
    #[tabled(rename = "Confidence")]
    confidence: String,
    #[tabled(rename = "Win Rate")]
    win_rate: String,
    #[tabled(rename = "Games")]
    games: u32,
}

pub fn synergy_table(partners: &[SynergyPartner], catalog: &dyn CardCatalog) -> String {
    let rows: Vec<SynergyRow> = partners
        .iter()
        .map(|p| SynergyRow {
            partner: catalog.display_name(p.partner_id),
            synergy: signed(p.synergy_score),
            confidence: format!("{:.2}", p.confidence_score),
            win_rate: percent(p.win_rate_together),
            games: p.games_together,
        })
        .collect();
    render(&rows)
}

#[derive(Tabled)]
struct PairRow {
    #[tabled(rename = "Partner")]
    partner: String,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "PMI")]
    pmi: String,
    #[tabled(rename = "Decks")]
    count: u32,
}

pub fn pairs_table(partners: &[CooccurrencePartner], catalog: &dyn CardCatalog) -> String {
    let rows: Vec<PairRow> = partners
        .iter()
        .map(|p| PairRow {
            partner: catalog.display_name(p.card_id),
            score: format!("{:.2}", p.score),
            pmi: p.raw_pmi.map(|v| format!("{:.3}", v)).unwrap_or_else(|| "-".to_string()),
            count: p.count,
        })
        .collect();
    render(&rows)
}

#[derive(Tabled)]
struct ReportRow {
    #[tabled(rename = "Pair")]
    pair: String,
    #[tabled(rename = "Synergy")]
    synergy: String,
    #[tabled(rename = "Win Rate")]
    win_rate: String,
    #[tabled(rename = "Games")]
    games: u32,
}

pub fn report_table(pairs: &[PairSynergy], catalog: &dyn CardCatalog) -> String {
    let rows: Vec<ReportRow> = pairs
        .iter()
        .map(|p| ReportRow {
            pair: format!(
                "{} + {}",
                catalog.display_name(p.pair.first()),
                catalog.display_name(p.pair.second())
            ),
            synergy: signed(p.synergy_score),
            win_rate: percent(p.win_rate),
            games: p.games_together,
        })
        .collect();
    render(&rows)
}

#[derive(Tabled)]
struct MatchupRow {
    #[tabled(rename = "Playing")]
    player: String,
    #[tabled(rename = "Against")]
    opponent: String,
    #[tabled(rename = "Format")]
    format: String,
    #[tabled(rename = "Record")]
    record: String,
    #[tabled(rename = "Win Rate")]
    win_rate: String,
}

pub fn matchup_table(matchups: &[MatchupStatistic]) -> String {
    let rows: Vec<MatchupRow> = matchups
        .iter()
        .map(|m| MatchupRow {
            player: m.key.player_archetype.clone(),
            opponent: m.key.opponent_archetype.clone(),
            format: m.key.format.clone(),
            record: format!("{}-{}", m.wins, m.losses),
            win_rate: percent(m.win_rate()),
        })
        .collect();
    render(&rows)
}

#[derive(Tabled)]
struct ArchetypeRow {
    #[tabled(rename = "Archetype")]
    archetype: String,
    #[tabled(rename = "Matches")]
    matches: u32,
    #[tabled(rename = "Win Rate")]
    win_rate: String,
    #[tabled(rename = "Avg Duration")]
    duration: String,
}

pub fn archetype_table(archetypes: &[ArchetypePerformance]) -> String {
    let rows: Vec<ArchetypeRow> = archetypes
        .iter()
        .map(|a| ArchetypeRow {
            archetype: a.archetype.clone(),
            matches: a.total_matches,
            win_rate: percent(a.win_rate),
            duration: a
                .avg_duration
                .map(|secs| format!("{}m {:02}s", (secs as u64) / 60, (secs as u64) % 60))
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect();
    render(&rows)
}

#[derive(Tabled)]
struct SuggestionRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Suggestion")]
    title: String,
    #[tabled(rename = "Confidence")]
    confidence: String,
    #[tabled(rename = "Expected")]
    expected: String,
    #[tabled(rename = "State")]
    state: String,
}

pub fn suggestion_table(suggestions: &[MlSuggestion]) -> String {
    let rows: Vec<SuggestionRow> = suggestions
        .iter()
        .map(|s| SuggestionRow {
            id: s.id,
            title: s.title.clone(),
            confidence: format!("{:.2}", s.confidence),
            expected: format!("{:+.1}pp", s.expected_win_rate_change),
            state: s.state().to_string(),
        })
        .collect();
    render(&rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_tables_render_nothing() {
        assert!(TableBuilder::new().build().is_empty());
        assert!(matchup_table(&[]).is_empty());
    }

    #[test]
    fn test_stats_table_contains_values() {
        let table = stats_table(&[("Tracked cards", "42".to_string())]);
        assert!(table.contains("Tracked cards"));
        assert!(table.contains("42"));
    }
}
