//! Matchup and archetype counters.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::archetype::{ArchetypePerformance, MatchupDelta, MatchupKey, MatchupStatistic};
use crate::Result;

const COLUMNS: &str = "account_id, player_archetype, opponent_archetype, format, \
    total_matches, wins, losses, avg_game_duration, last_match_at, created_at, updated_at";

/// Merge a delta into a matchup row and return the result.
pub fn record_matchup(
    conn: &Connection,
    key: &MatchupKey,
    delta: &MatchupDelta,
    now: DateTime<Utc>,
) -> Result<MatchupStatistic> {
    delta.validate()?;

    conn.prepare_cached(
        "INSERT INTO matchup_statistics (
            account_id, player_archetype, opponent_archetype, format,
            total_matches, wins, losses, avg_game_duration, last_match_at, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
         ON CONFLICT(account_id, player_archetype, opponent_archetype, format) DO UPDATE SET
            total_matches = total_matches + excluded.total_matches,
            wins = wins + excluded.wins,
            losses = losses + excluded.losses,
            avg_game_duration = excluded.avg_game_duration,
            last_match_at = excluded.last_match_at,
            updated_at = excluded.updated_at",
    )?
    .execute(params![
        key.account_id,
        key.player_archetype,
        key.opponent_archetype,
        key.format,
        delta.matches,
        delta.wins,
        delta.losses,
        delta.avg_game_duration,
        delta.last_match_at,
        now,
    ])?;

    get_matchup(conn, key)?.ok_or(rusqlite::Error::QueryReturnedNoRows.into())
}

pub fn get_matchup(conn: &Connection, key: &MatchupKey) -> Result<Option<MatchupStatistic>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM matchup_statistics
             WHERE account_id = ?1 AND player_archetype = ?2 AND opponent_archetype = ?3 AND format = ?4",
            COLUMNS
        ),
        params![key.account_id, key.player_archetype, key.opponent_archetype, key.format],
        row_to_matchup,
    )
    .optional()
    .map_err(Into::into)
}

/// Most-played matchups of an account in a format.
pub fn top_matchups(conn: &Connection, account_id: i64, format: &str, limit: usize) -> Result<Vec<MatchupStatistic>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM matchup_statistics
         WHERE account_id = ?1 AND format = ?2
         ORDER BY total_matches DESC, wins DESC
         LIMIT ?3",
        COLUMNS
    ))?;
    let rows = stmt
        .query_map(params![account_id, format, limit as i64], row_to_matchup)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn list_matchups(conn: &Connection, account_id: i64, format: Option<&str>) -> Result<Vec<MatchupStatistic>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM matchup_statistics
         WHERE account_id = ?1 AND (?2 IS NULL OR format = ?2)
         ORDER BY format, player_archetype, opponent_archetype",
        COLUMNS
    ))?;
    let rows = stmt
        .query_map(params![account_id, format], row_to_matchup)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn row_to_matchup(row: &Row) -> rusqlite::Result<MatchupStatistic> {
    Ok(MatchupStatistic {
        key: MatchupKey {
            account_id: row.get(0)?,
            player_archetype: row.get(1)?,
            opponent_archetype: row.get(2)?,
            format: row.get(3)?,
        },
        total_matches: row.get(4)?,
        wins: row.get(5)?,
        losses: row.get(6)?,
        avg_game_duration: row.get(7)?,
        last_match_at: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

// ========== Archetype Stats ==========

pub fn record_archetype_result(
    conn: &Connection,
    archetype: &str,
    format: &str,
    won: bool,
    duration_secs: Option<u32>,
    now: DateTime<Utc>,
) -> Result<()> {
    conn.prepare_cached(
        "INSERT INTO archetype_stats (archetype, format, total_matches, total_wins, duration_sum, duration_samples, updated_at)
         VALUES (?1, ?2, 1, ?3, ?4, ?5, ?6)
         ON CONFLICT(archetype, format) DO UPDATE SET
            total_matches = total_matches + 1,
            total_wins = total_wins + excluded.total_wins,
            duration_sum = duration_sum + excluded.duration_sum,
            duration_samples = duration_samples + excluded.duration_samples,
            updated_at = excluded.updated_at",
    )?
    .execute(params![
        archetype,
        format,
        u32::from(won),
        duration_secs.unwrap_or(0),
        u32::from(duration_secs.is_some()),
        now,
    ])?;
    Ok(())
}

pub fn archetype_performance(conn: &Connection, archetype: &str, format: &str) -> Result<Option<ArchetypePerformance>> {
    conn.query_row(
        "SELECT archetype, format, total_matches, total_wins, duration_sum, duration_samples
         FROM archetype_stats WHERE archetype = ?1 AND format = ?2",
        params![archetype, format],
        row_to_performance,
    )
    .optional()
    .map_err(Into::into)
}

/// Every archetype of a format, most played first.
pub fn list_archetypes(conn: &Connection, format: &str) -> Result<Vec<ArchetypePerformance>> {
    let mut stmt = conn.prepare(
        "SELECT archetype, format, total_matches, total_wins, duration_sum, duration_samples
         FROM archetype_stats WHERE format = ?1
         ORDER BY total_matches DESC, archetype",
    )?;
    let rows = stmt
        .query_map([format], row_to_performance)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn row_to_performance(row: &Row) -> rusqlite::Result<ArchetypePerformance> {
    let archetype: String = row.get(0)?;
    let format: String = row.get(1)?;
    let duration_sum: i64 = row.get(4)?;
    Ok(ArchetypePerformance::from_totals(
        &archetype,
        &format,
        row.get(2)?,
        row.get(3)?,
        duration_sum.max(0) as u64,
        row.get(5)?,
    ))
}

pub fn count_matchups(conn: &Connection) -> Result<usize> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM matchup_statistics", [], |row| row.get(0))?;
    Ok(count as usize)
}

pub fn clear_format(conn: &Connection, format: &str) -> Result<usize> {
    let rows = conn.execute("DELETE FROM matchup_statistics WHERE format = ?1", [format])?;
    conn.execute("DELETE FROM archetype_stats WHERE format = ?1", [format])?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        for stmt in schema::all_schema_statements() {
            conn.execute(stmt, []).unwrap();
        }
        conn
    }

    fn key(opponent: &str) -> MatchupKey {
        MatchupKey::new(1, "Gruul Aggro", opponent, "standard")
    }

    #[test]
    fn test_matchup_counts_add_duration_replaced() {
        let conn = conn();
        let first = MatchupDelta {
            matches: 3,
            wins: 2,
            losses: 1,
            avg_game_duration: Some(600),
            last_match_at: Some(Utc::now()),
        };
        record_matchup(&conn, &key("Mono Red"), &first, Utc::now()).unwrap();
        let merged = record_matchup(&conn, &key("Mono Red"), &MatchupDelta::single(false, None, None), Utc::now()).unwrap();

        assert_eq!(merged.total_matches, 4);
        assert_eq!(merged.wins, 2);
        assert_eq!(merged.losses, 2);
        assert_eq!(merged.avg_game_duration, None);
        assert_eq!(merged.last_match_at, None);
        assert!((merged.win_rate() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_matchup_delta_writes_nothing() {
        let conn = conn();
        let delta = MatchupDelta {
            matches: 1,
            wins: 3,
            ..Default::default()
        };
        let err = record_matchup(&conn, &key("Mono Red"), &delta, Utc::now()).unwrap_err();
        assert!(matches!(err, crate::Error::InvalidDelta(_)));
        assert!(get_matchup(&conn, &key("Mono Red")).unwrap().is_none());
    }

    #[test]
    fn test_top_matchups_by_volume() {
        let conn = conn();
        let now = Utc::now();
        for (opponent, n) in [("Mono Red", 2), ("Esper Control", 5), ("Azorius", 1)] {
            for _ in 0..n {
                record_matchup(&conn, &key(opponent), &MatchupDelta::single(true, None, None), now).unwrap();
            }
        }

        let top = top_matchups(&conn, 1, "standard", 2).unwrap();
        let names: Vec<&str> = top.iter().map(|m| m.key.opponent_archetype.as_str()).collect();
        assert_eq!(names, vec!["Esper Control", "Mono Red"]);

        assert_eq!(list_matchups(&conn, 1, None).unwrap().len(), 3);
        assert!(list_matchups(&conn, 1, Some("historic")).unwrap().is_empty());
        assert!(top_matchups(&conn, 2, "standard", 5).unwrap().is_empty());
    }

    #[test]
    fn test_archetype_performance() {
        let conn = conn();
        let now = Utc::now();
        record_archetype_result(&conn, "Gruul Aggro", "standard", true, Some(400), now).unwrap();
        record_archetype_result(&conn, "Gruul Aggro", "standard", true, None, now).unwrap();
        record_archetype_result(&conn, "Gruul Aggro", "standard", false, Some(600), now).unwrap();

        let perf = archetype_performance(&conn, "Gruul Aggro", "standard").unwrap().unwrap();
        assert_eq!(perf.total_matches, 3);
        assert_eq!(perf.total_wins, 2);
        assert_eq!(perf.avg_duration, Some(500.0));
        assert!(archetype_performance(&conn, "Gruul Aggro", "historic").unwrap().is_none());
    }
}
