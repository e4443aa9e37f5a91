//! Schedule snapshot storage.
//!
//! A learner's snapshot is the full `ScheduleState` table. Saves replace the
//! whole snapshot inside one transaction, so readers never see a half-written
//! table.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Result, Row};
use std::collections::HashMap;

use crate::domain::{Quality, ReviewEvent, ScheduleState};

/// Fixed-width RFC 3339 with nanoseconds, so stored text sorts chronologically
fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_ts(idx: usize, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub fn learner_exists(conn: &Connection, learner_id: &str) -> Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM learners WHERE learner_id = ?1",
        params![learner_id],
        |row| row.get(0),
    )
}

/// Load a learner's snapshot; `None` if nothing was ever saved for them
pub fn load_snapshot(conn: &Connection, learner_id: &str) -> Result<Option<Vec<ScheduleState>>> {
    if !learner_exists(conn, learner_id)? {
        return Ok(None);
    }

    let mut stmt = conn.prepare(
        r#"
    SELECT item_id, ease_factor, interval_days, repetitions, next_review_due, last_reviewed_at
    FROM schedule_states
    WHERE learner_id = ?1
    ORDER BY item_id
    "#,
    )?;
    let mut states = stmt
        .query_map(params![learner_id], row_to_state)?
        .collect::<Result<Vec<_>>>()?;

    let mut events_stmt = conn.prepare(
        r#"
    SELECT item_id, reviewed_at, quality, time_spent_seconds
    FROM review_events
    WHERE learner_id = ?1
    ORDER BY item_id, seq
    "#,
    )?;
    let rows = events_stmt.query_map(params![learner_id], |row| {
        let item_id: String = row.get(0)?;
        Ok((item_id, row_to_event(row)?))
    })?;

    let mut history: HashMap<String, Vec<ReviewEvent>> = HashMap::new();
    for row in rows {
        let (item_id, event) = row?;
        history.entry(item_id).or_default().push(event);
    }
    for state in &mut states {
        if let Some(events) = history.remove(&state.item_id) {
            state.history = events;
        }
    }

    Ok(Some(states))
}

/// Replace a learner's snapshot with `states`
pub fn save_snapshot(
    conn: &Connection,
    learner_id: &str,
    states: &[ScheduleState],
    saved_at: DateTime<Utc>,
) -> Result<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute(
        r#"
    INSERT INTO learners (learner_id, saved_at) VALUES (?1, ?2)
    ON CONFLICT(learner_id) DO UPDATE SET saved_at = excluded.saved_at
    "#,
        params![learner_id, format_ts(&saved_at)],
    )?;
    tx.execute("DELETE FROM review_events WHERE learner_id = ?1", params![learner_id])?;
    tx.execute("DELETE FROM schedule_states WHERE learner_id = ?1", params![learner_id])?;

    {
        let mut insert_state = tx.prepare(
            r#"
      INSERT INTO schedule_states
        (learner_id, item_id, ease_factor, interval_days, repetitions, next_review_due, last_reviewed_at)
      VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
      "#,
        )?;
        let mut insert_event = tx.prepare(
            r#"
      INSERT INTO review_events (learner_id, item_id, seq, reviewed_at, quality, time_spent_seconds)
      VALUES (?1, ?2, ?3, ?4, ?5, ?6)
      "#,
        )?;

        for state in states {
            insert_state.execute(params![
                learner_id,
                state.item_id,
                state.ease_factor,
                state.interval,
                state.repetitions,
                format_ts(&state.next_review_due),
                state.last_reviewed_at.as_ref().map(format_ts),
            ])?;

            for (seq, event) in state.history.iter().enumerate() {
                insert_event.execute(params![
                    learner_id,
                    state.item_id,
                    seq as i64,
                    format_ts(&event.timestamp),
                    event.quality.value(),
                    event.time_spent_seconds,
                ])?;
            }
        }
    }

    tx.commit()
}

/// Forget everything stored for a learner
pub fn clear_snapshot(conn: &Connection, learner_id: &str) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM review_events WHERE learner_id = ?1", params![learner_id])?;
    tx.execute("DELETE FROM schedule_states WHERE learner_id = ?1", params![learner_id])?;
    tx.execute("DELETE FROM learners WHERE learner_id = ?1", params![learner_id])?;
    tx.commit()
}

fn row_to_state(row: &Row) -> Result<ScheduleState> {
    let next_review_due: String = row.get(4)?;
    let last_reviewed_at: Option<String> = row.get(5)?;

    Ok(ScheduleState {
        item_id: row.get(0)?,
        ease_factor: row.get(1)?,
        interval: row.get(2)?,
        repetitions: row.get(3)?,
        next_review_due: parse_ts(4, &next_review_due)?,
        last_reviewed_at: last_reviewed_at
            .as_deref()
            .map(|s| parse_ts(5, s))
            .transpose()?,
        history: Vec::new(),
    })
}

fn row_to_event(row: &Row) -> Result<ReviewEvent> {
    let reviewed_at: String = row.get(1)?;
    let quality: i64 = row.get(2)?;

    Ok(ReviewEvent {
        timestamp: parse_ts(1, &reviewed_at)?,
        quality: Quality::new(quality)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Integer, Box::new(e)))?,
        time_spent_seconds: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::run_migrations;
    use chrono::{Duration, TimeZone};

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn t0() -> DateTime<Utc> {
        // Sub-second precision must survive storage
        Utc.with_ymd_and_hms(2025, 3, 30, 1, 59, 59).unwrap() + Duration::nanoseconds(123_456_789)
    }

    fn reviewed_state(id: &str) -> ScheduleState {
        let mut state = ScheduleState::new(id, t0());
        state.ease_factor = 2.36;
        state.interval = 6;
        state.repetitions = 2;
        state.next_review_due = t0() + Duration::days(6);
        state.last_reviewed_at = Some(t0());
        state.history = vec![
            ReviewEvent::new(t0() - Duration::days(1), Quality::new(5).unwrap(), 12),
            ReviewEvent::new(t0(), Quality::new(3).unwrap(), 40),
        ];
        state
    }

    #[test]
    fn test_unknown_learner_is_none() {
        let conn = conn();
        assert_eq!(load_snapshot(&conn, "nobody").unwrap(), None);
        assert!(!learner_exists(&conn, "nobody").unwrap());
    }

    #[test]
    fn test_roundtrip_is_exact() {
        let conn = conn();
        let states = vec![reviewed_state("a"), ScheduleState::new("b", t0())];
        save_snapshot(&conn, "ana@example.com", &states, t0()).unwrap();

        let loaded = load_snapshot(&conn, "ana@example.com").unwrap().unwrap();
        assert_eq!(loaded, states);
    }

    #[test]
    fn test_save_replaces_previous_snapshot() {
        let conn = conn();
        save_snapshot(&conn, "ana", &[reviewed_state("a"), reviewed_state("b")], t0()).unwrap();
        save_snapshot(&conn, "ana", &[reviewed_state("b")], t0()).unwrap();

        let loaded = load_snapshot(&conn, "ana").unwrap().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].item_id, "b");
        assert_eq!(loaded[0].history.len(), 2);
    }

    #[test]
    fn test_empty_snapshot_is_some() {
        let conn = conn();
        save_snapshot(&conn, "ana", &[], t0()).unwrap();
        assert_eq!(load_snapshot(&conn, "ana").unwrap(), Some(Vec::new()));
    }

    #[test]
    fn test_learners_are_isolated() {
        let conn = conn();
        save_snapshot(&conn, "ana", &[reviewed_state("a")], t0()).unwrap();
        save_snapshot(&conn, "ben", &[ScheduleState::new("z", t0())], t0()).unwrap();

        clear_snapshot(&conn, "ana").unwrap();
        assert_eq!(load_snapshot(&conn, "ana").unwrap(), None);

        let ben = load_snapshot(&conn, "ben").unwrap().unwrap();
        assert_eq!(ben.len(), 1);
        assert_eq!(ben[0].item_id, "z");
    }

    #[test]
    fn test_corrupt_quality_is_an_error() {
        let conn = conn();
        save_snapshot(&conn, "ana", &[reviewed_state("a")], t0()).unwrap();
        conn.execute("UPDATE review_events SET quality = 9 WHERE seq = 0", [])
            .unwrap();

        assert!(load_snapshot(&conn, "ana").is_err());
    }
}
