use rusqlite::{Connection, Result};

pub fn run_migrations(conn: &Connection) -> Result<()> {
    // Create tables with COMPLETE schema for new databases
    // Migrations below handle upgrades for existing databases
    conn.execute_batch(
        r#"
    CREATE TABLE IF NOT EXISTS learners (
      learner_id TEXT PRIMARY KEY,
      saved_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS schedule_states (
      learner_id TEXT NOT NULL,
      item_id TEXT NOT NULL,
      ease_factor REAL NOT NULL DEFAULT 2.5,
      interval_days INTEGER NOT NULL DEFAULT 0,
      repetitions INTEGER NOT NULL DEFAULT 0,
      next_review_due TEXT NOT NULL,
      last_reviewed_at TEXT,
      PRIMARY KEY (learner_id, item_id),
      FOREIGN KEY (learner_id) REFERENCES learners(learner_id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS review_events (
      learner_id TEXT NOT NULL,
      item_id TEXT NOT NULL,
      seq INTEGER NOT NULL,
      reviewed_at TEXT NOT NULL,
      quality INTEGER NOT NULL,
      time_spent_seconds INTEGER NOT NULL DEFAULT 0,
      PRIMARY KEY (learner_id, item_id, seq),
      FOREIGN KEY (learner_id, item_id)
        REFERENCES schedule_states(learner_id, item_id) ON DELETE CASCADE
    );

    -- Indexes
    CREATE INDEX IF NOT EXISTS idx_schedule_states_due ON schedule_states(learner_id, next_review_due);
    "#,
    )?;

    // ============================================================
    // MIGRATIONS FOR EXISTING DATABASES
    // These are no-ops for new databases (columns already exist)
    // ============================================================

    // Migration: time tracking was added after the first release
    add_column_if_missing(
        conn,
        "review_events",
        "time_spent_seconds",
        "INTEGER NOT NULL DEFAULT 0",
    )?;

    Ok(())
}

/// Check if a column exists in a table
fn column_exists(conn: &Connection, table: &str, column: &str) -> bool {
    conn.prepare(&format!("SELECT {} FROM {} LIMIT 1", column, table))
        .is_ok()
}

/// Add a column if it doesn't already exist
fn add_column_if_missing(conn: &Connection, table: &str, column: &str, column_def: &str) -> Result<()> {
    if !column_exists(conn, table, column) {
        conn.execute(
            &format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, column_def),
            [],
        )?;
    }
    Ok(())
}
