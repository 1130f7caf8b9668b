pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{error, header, info, percent, signed, status, success, summary_row, warn};
pub use table::{
    archetype_table, matchup_table, pairs_table, report_table, stats_table, suggestion_table, synergy_table,
    TableBuilder,
};
pub use theme::{theme, Theme};
