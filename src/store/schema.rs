//! Schema creation
//!
//! All tables are created idempotently on startup. Ordered prompt steps and
//! selected chatbot id lists are stored as JSON text columns; everything else
//! is a flat row.

use rusqlite::Connection;

use super::StoreError;

/// Create all tables and indexes if they do not exist
pub fn create_tables(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL,
            prompts     TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS runs (
            id            TEXT PRIMARY KEY,
            session_id    TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
            chatbot_ids   TEXT NOT NULL,
            status        TEXT NOT NULL,
            created_at    TEXT NOT NULL,
            completed_at  TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_runs_session ON runs(session_id);

        CREATE TABLE IF NOT EXISTS responses (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            run_id      TEXT NOT NULL REFERENCES runs(id) ON DELETE CASCADE,
            chatbot_id  TEXT NOT NULL,
            step_order  INTEGER NOT NULL,
            content     TEXT,
            error       TEXT,
            latency_ms  INTEGER NOT NULL,
            created_at  TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_responses_run ON responses(run_id);

        CREATE TABLE IF NOT EXISTS arena_matches (
            id            TEXT PRIMARY KEY,
            chatbot_a     TEXT NOT NULL,
            chatbot_b     TEXT NOT NULL,
            rounds_total  INTEGER NOT NULL,
            status        TEXT NOT NULL,
            score_a       INTEGER NOT NULL DEFAULT 0,
            score_b       INTEGER NOT NULL DEFAULT 0,
            error         TEXT,
            created_at    TEXT NOT NULL,
            completed_at  TEXT
        );

        CREATE TABLE IF NOT EXISTS arena_rounds (
            id        INTEGER PRIMARY KEY AUTOINCREMENT,
            match_id  TEXT NOT NULL REFERENCES arena_matches(id) ON DELETE CASCADE,
            round     INTEGER NOT NULL,
            move_a    TEXT NOT NULL,
            move_b    TEXT NOT NULL,
            score_a   INTEGER NOT NULL,
            score_b   INTEGER NOT NULL,
            raw_a     TEXT NOT NULL,
            raw_b     TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_arena_rounds_match ON arena_rounds(match_id);

        CREATE TABLE IF NOT EXISTS leaderboard_entries (
            chatbot_id  TEXT PRIMARY KEY,
            score       REAL NOT NULL,
            wins        INTEGER NOT NULL DEFAULT 0,
            losses      INTEGER NOT NULL DEFAULT 0,
            updated_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS toolkit_entries (
            id           TEXT PRIMARY KEY,
            name         TEXT NOT NULL,
            category     TEXT NOT NULL,
            url          TEXT NOT NULL,
            description  TEXT NOT NULL,
            created_at   TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS benchmark_proposals (
            id           TEXT PRIMARY KEY,
            title        TEXT NOT NULL,
            description  TEXT NOT NULL,
            category     TEXT NOT NULL,
            status       TEXT NOT NULL,
            created_at   TEXT NOT NULL
        );
        "#,
    )?;

    Ok(())
}
