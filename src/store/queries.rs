//! Database query implementations
//!
//! Functions take a borrowed connection (obtained through
//! `Database::with_connection`) and map rows into the domain types. JSON
//! columns and status labels that fail to parse surface as conversion errors
//! rather than panics.

use rusqlite::{Connection, OptionalExtension, params};

use super::StoreError;
use crate::models::arena::{ArenaMatch, ArenaMove, ArenaRound, MatchStatus};
use crate::models::catalog::{BenchmarkProposal, LeaderboardEntry, ProposalStatus, ToolkitEntry};
use crate::models::run::{ChatbotResponse, Run, RunStatus};
use crate::models::session::Session;
use chrono::{DateTime, Utc};

fn corrupt(what: &str, detail: impl std::fmt::Display) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        format!("{what}: {detail}").into(),
    )
}

fn parse_timestamp(raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| corrupt("timestamp", e))
}

fn parse_opt_timestamp(raw: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    raw.as_deref().map(parse_timestamp).transpose()
}

// ─── Sessions ────────────────────────────────────────────────────────────────

pub fn insert_session(conn: &Connection, session: &Session) -> Result<(), StoreError> {
    let prompts = serde_json::to_string(&session.prompts)
        .map_err(|e| StoreError::CorruptRow(format!("prompts encode: {e}")))?;
    conn.execute(
        "INSERT INTO sessions (id, name, prompts, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            session.id,
            session.name,
            prompts,
            session.created_at.to_rfc3339()
        ],
    )?;
    Ok(())
}

fn session_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Session> {
    let prompts_raw: String = row.get(2)?;
    let created_raw: String = row.get(3)?;
    Ok(Session {
        id: row.get(0)?,
        name: row.get(1)?,
        prompts: serde_json::from_str(&prompts_raw).map_err(|e| corrupt("prompts", e))?,
        created_at: parse_timestamp(&created_raw)?,
    })
}

pub fn get_session(conn: &Connection, id: &str) -> Result<Option<Session>, StoreError> {
    let session = conn
        .query_row(
            "SELECT id, name, prompts, created_at FROM sessions WHERE id = ?1",
            params![id],
            session_from_row,
        )
        .optional()?;
    Ok(session)
}

pub fn list_sessions(conn: &Connection) -> Result<Vec<Session>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, prompts, created_at FROM sessions ORDER BY created_at DESC",
    )?;
    let sessions = stmt
        .query_map([], session_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(sessions)
}

pub fn update_session(
    conn: &Connection,
    id: &str,
    name: &str,
    prompts: &[String],
) -> Result<bool, StoreError> {
    let prompts = serde_json::to_string(prompts)
        .map_err(|e| StoreError::CorruptRow(format!("prompts encode: {e}")))?;
    let changed = conn.execute(
        "UPDATE sessions SET name = ?2, prompts = ?3 WHERE id = ?1",
        params![id, name, prompts],
    )?;
    Ok(changed > 0)
}

pub fn delete_session(conn: &Connection, id: &str) -> Result<bool, StoreError> {
    let changed = conn.execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
    Ok(changed > 0)
}

// ─── Runs & responses ────────────────────────────────────────────────────────

pub fn insert_run(conn: &Connection, run: &Run) -> Result<(), StoreError> {
    let chatbot_ids = serde_json::to_string(&run.chatbot_ids)
        .map_err(|e| StoreError::CorruptRow(format!("chatbot_ids encode: {e}")))?;
    conn.execute(
        "INSERT INTO runs (id, session_id, chatbot_ids, status, created_at, completed_at) \
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            run.id,
            run.session_id,
            chatbot_ids,
            run.status.as_str(),
            run.created_at.to_rfc3339(),
            run.completed_at.map(|t| t.to_rfc3339()),
        ],
    )?;
    Ok(())
}

fn run_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Run> {
    let chatbot_ids_raw: String = row.get(2)?;
    let status_raw: String = row.get(3)?;
    let created_raw: String = row.get(4)?;
    let completed_raw: Option<String> = row.get(5)?;
    Ok(Run {
        id: row.get(0)?,
        session_id: row.get(1)?,
        chatbot_ids: serde_json::from_str(&chatbot_ids_raw)
            .map_err(|e| corrupt("chatbot_ids", e))?,
        status: RunStatus::parse(&status_raw).ok_or_else(|| corrupt("run status", &status_raw))?,
        created_at: parse_timestamp(&created_raw)?,
        completed_at: parse_opt_timestamp(completed_raw)?,
        responses: Vec::new(),
    })
}

/// Fetch a run including its responses (the polling surface)
pub fn get_run(conn: &Connection, id: &str) -> Result<Option<Run>, StoreError> {
    let run = conn
        .query_row(
            "SELECT id, session_id, chatbot_ids, status, created_at, completed_at \
            FROM runs WHERE id = ?1",
            params![id],
            run_from_row,
        )
        .optional()?;

    match run {
        Some(mut run) => {
            run.responses = list_responses(conn, id)?;
            Ok(Some(run))
        }
        None => Ok(None),
    }
}

/// List runs, newest first, optionally filtered by session
///
/// Responses are not loaded here; fetch a single run for the full record.
pub fn list_runs(conn: &Connection, session_id: Option<&str>) -> Result<Vec<Run>, StoreError> {
    let runs = match session_id {
        Some(session_id) => {
            let mut stmt = conn.prepare(
                "SELECT id, session_id, chatbot_ids, status, created_at, completed_at \
                FROM runs WHERE session_id = ?1 ORDER BY created_at DESC",
            )?;
            let rows = stmt.query_map(params![session_id], run_from_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        }
        None => {
            let mut stmt = conn.prepare(
                "SELECT id, session_id, chatbot_ids, status, created_at, completed_at \
                FROM runs ORDER BY created_at DESC",
            )?;
            let rows = stmt.query_map([], run_from_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        }
    };
    Ok(runs)
}

pub fn set_run_status(
    conn: &Connection,
    id: &str,
    status: RunStatus,
    completed_at: Option<DateTime<Utc>>,
) -> Result<bool, StoreError> {
    let changed = conn.execute(
        "UPDATE runs SET status = ?2, completed_at = ?3 WHERE id = ?1",
        params![id, status.as_str(), completed_at.map(|t| t.to_rfc3339())],
    )?;
    Ok(changed > 0)
}

pub fn append_response(
    conn: &Connection,
    run_id: &str,
    response: &ChatbotResponse,
) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO responses (run_id, chatbot_id, step_order, content, error, latency_ms, created_at) \
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            run_id,
            response.chatbot_id,
            response.step_order,
            response.content,
            response.error,
            response.latency_ms,
            response.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn list_responses(conn: &Connection, run_id: &str) -> Result<Vec<ChatbotResponse>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT chatbot_id, step_order, content, error, latency_ms, created_at \
        FROM responses WHERE run_id = ?1 ORDER BY id",
    )?;
    let responses = stmt
        .query_map(params![run_id], |row| {
            let created_raw: String = row.get(5)?;
            Ok(ChatbotResponse {
                chatbot_id: row.get(0)?,
                step_order: row.get(1)?,
                content: row.get(2)?,
                error: row.get(3)?,
                latency_ms: row.get(4)?,
                created_at: parse_timestamp(&created_raw)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(responses)
}

pub fn delete_run(conn: &Connection, id: &str) -> Result<bool, StoreError> {
    let changed = conn.execute("DELETE FROM runs WHERE id = ?1", params![id])?;
    Ok(changed > 0)
}

// ─── Arena matches ───────────────────────────────────────────────────────────

pub fn insert_match(conn: &Connection, arena_match: &ArenaMatch) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO arena_matches \
        (id, chatbot_a, chatbot_b, rounds_total, status, score_a, score_b, error, created_at, completed_at) \
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            arena_match.id,
            arena_match.chatbot_a,
            arena_match.chatbot_b,
            arena_match.rounds_total,
            arena_match.status.as_str(),
            arena_match.score_a,
            arena_match.score_b,
            arena_match.error,
            arena_match.created_at.to_rfc3339(),
            arena_match.completed_at.map(|t| t.to_rfc3339()),
        ],
    )?;
    Ok(())
}

fn match_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ArenaMatch> {
    let status_raw: String = row.get(4)?;
    let created_raw: String = row.get(8)?;
    let completed_raw: Option<String> = row.get(9)?;
    Ok(ArenaMatch {
        id: row.get(0)?,
        chatbot_a: row.get(1)?,
        chatbot_b: row.get(2)?,
        rounds_total: row.get(3)?,
        status: MatchStatus::parse(&status_raw)
            .ok_or_else(|| corrupt("match status", &status_raw))?,
        score_a: row.get(5)?,
        score_b: row.get(6)?,
        error: row.get(7)?,
        created_at: parse_timestamp(&created_raw)?,
        completed_at: parse_opt_timestamp(completed_raw)?,
        rounds: Vec::new(),
    })
}

/// Fetch a match including its rounds (the viewer's polling surface)
pub fn get_match(conn: &Connection, id: &str) -> Result<Option<ArenaMatch>, StoreError> {
    let arena_match = conn
        .query_row(
            "SELECT id, chatbot_a, chatbot_b, rounds_total, status, score_a, score_b, error, \
            created_at, completed_at FROM arena_matches WHERE id = ?1",
            params![id],
            match_from_row,
        )
        .optional()?;

    match arena_match {
        Some(mut arena_match) => {
            arena_match.rounds = list_rounds(conn, id)?;
            Ok(Some(arena_match))
        }
        None => Ok(None),
    }
}

pub fn list_matches(conn: &Connection) -> Result<Vec<ArenaMatch>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, chatbot_a, chatbot_b, rounds_total, status, score_a, score_b, error, \
        created_at, completed_at FROM arena_matches ORDER BY created_at DESC",
    )?;
    let matches = stmt
        .query_map([], match_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(matches)
}

fn list_rounds(conn: &Connection, match_id: &str) -> Result<Vec<ArenaRound>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT round, move_a, move_b, score_a, score_b, raw_a, raw_b \
        FROM arena_rounds WHERE match_id = ?1 ORDER BY round",
    )?;
    let rounds = stmt
        .query_map(params![match_id], |row| {
            let move_a_raw: String = row.get(1)?;
            let move_b_raw: String = row.get(2)?;
            Ok(ArenaRound {
                round: row.get(0)?,
                move_a: ArenaMove::parse(&move_a_raw)
                    .ok_or_else(|| corrupt("arena move", &move_a_raw))?,
                move_b: ArenaMove::parse(&move_b_raw)
                    .ok_or_else(|| corrupt("arena move", &move_b_raw))?,
                score_a: row.get(3)?,
                score_b: row.get(4)?,
                raw_a: row.get(5)?,
                raw_b: row.get(6)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rounds)
}

/// Append a completed round and bump the match's running totals
pub fn append_round(
    conn: &Connection,
    match_id: &str,
    round: &ArenaRound,
) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO arena_rounds (match_id, round, move_a, move_b, score_a, score_b, raw_a, raw_b) \
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            match_id,
            round.round,
            round.move_a.as_str(),
            round.move_b.as_str(),
            round.score_a,
            round.score_b,
            round.raw_a,
            round.raw_b,
        ],
    )?;
    conn.execute(
        "UPDATE arena_matches SET score_a = score_a + ?2, score_b = score_b + ?3 WHERE id = ?1",
        params![match_id, round.score_a, round.score_b],
    )?;
    Ok(())
}

pub fn set_match_status(
    conn: &Connection,
    id: &str,
    status: MatchStatus,
    error: Option<&str>,
    completed_at: Option<DateTime<Utc>>,
) -> Result<bool, StoreError> {
    let changed = conn.execute(
        "UPDATE arena_matches SET status = ?2, error = ?3, completed_at = ?4 WHERE id = ?1",
        params![
            id,
            status.as_str(),
            error,
            completed_at.map(|t| t.to_rfc3339())
        ],
    )?;
    Ok(changed > 0)
}

pub fn delete_match(conn: &Connection, id: &str) -> Result<bool, StoreError> {
    let changed = conn.execute("DELETE FROM arena_matches WHERE id = ?1", params![id])?;
    Ok(changed > 0)
}

// ─── Leaderboard ─────────────────────────────────────────────────────────────

pub fn upsert_leaderboard_entry(
    conn: &Connection,
    entry: &LeaderboardEntry,
) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO leaderboard_entries (chatbot_id, score, wins, losses, updated_at) \
        VALUES (?1, ?2, ?3, ?4, ?5) \
        ON CONFLICT(chatbot_id) DO UPDATE SET \
        score = excluded.score, wins = excluded.wins, losses = excluded.losses, \
        updated_at = excluded.updated_at",
        params![
            entry.chatbot_id,
            entry.score,
            entry.wins,
            entry.losses,
            entry.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn list_leaderboard(conn: &Connection) -> Result<Vec<LeaderboardEntry>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT chatbot_id, score, wins, losses, updated_at \
        FROM leaderboard_entries ORDER BY score DESC, chatbot_id",
    )?;
    let entries = stmt
        .query_map([], |row| {
            let updated_raw: String = row.get(4)?;
            Ok(LeaderboardEntry {
                chatbot_id: row.get(0)?,
                score: row.get(1)?,
                wins: row.get(2)?,
                losses: row.get(3)?,
                updated_at: parse_timestamp(&updated_raw)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(entries)
}

pub fn delete_leaderboard_entry(conn: &Connection, chatbot_id: &str) -> Result<bool, StoreError> {
    let changed = conn.execute(
        "DELETE FROM leaderboard_entries WHERE chatbot_id = ?1",
        params![chatbot_id],
    )?;
    Ok(changed > 0)
}

// ─── Toolkit catalog ─────────────────────────────────────────────────────────

pub fn insert_toolkit_entry(conn: &Connection, entry: &ToolkitEntry) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO toolkit_entries (id, name, category, url, description, created_at) \
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            entry.id,
            entry.name,
            entry.category,
            entry.url,
            entry.description,
            entry.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn list_toolkit_entries(conn: &Connection) -> Result<Vec<ToolkitEntry>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, category, url, description, created_at \
        FROM toolkit_entries ORDER BY category, name",
    )?;
    let entries = stmt
        .query_map([], |row| {
            let created_raw: String = row.get(5)?;
            Ok(ToolkitEntry {
                id: row.get(0)?,
                name: row.get(1)?,
                category: row.get(2)?,
                url: row.get(3)?,
                description: row.get(4)?,
                created_at: parse_timestamp(&created_raw)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(entries)
}

pub fn delete_toolkit_entry(conn: &Connection, id: &str) -> Result<bool, StoreError> {
    let changed = conn.execute("DELETE FROM toolkit_entries WHERE id = ?1", params![id])?;
    Ok(changed > 0)
}

// ─── Benchmark proposals ─────────────────────────────────────────────────────

pub fn insert_proposal(conn: &Connection, proposal: &BenchmarkProposal) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO benchmark_proposals (id, title, description, category, status, created_at) \
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            proposal.id,
            proposal.title,
            proposal.description,
            proposal.category,
            proposal.status.as_str(),
            proposal.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn list_proposals(conn: &Connection) -> Result<Vec<BenchmarkProposal>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, title, description, category, status, created_at \
        FROM benchmark_proposals ORDER BY created_at DESC",
    )?;
    let proposals = stmt
        .query_map([], |row| {
            let status_raw: String = row.get(4)?;
            let created_raw: String = row.get(5)?;
            Ok(BenchmarkProposal {
                id: row.get(0)?,
                title: row.get(1)?,
                description: row.get(2)?,
                category: row.get(3)?,
                status: ProposalStatus::parse(&status_raw)
                    .ok_or_else(|| corrupt("proposal status", &status_raw))?,
                created_at: parse_timestamp(&created_raw)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(proposals)
}

pub fn set_proposal_status(
    conn: &Connection,
    id: &str,
    status: ProposalStatus,
) -> Result<bool, StoreError> {
    let changed = conn.execute(
        "UPDATE benchmark_proposals SET status = ?2 WHERE id = ?1",
        params![id, status.as_str()],
    )?;
    Ok(changed > 0)
}

pub fn delete_proposal(conn: &Connection, id: &str) -> Result<bool, StoreError> {
    let changed = conn.execute("DELETE FROM benchmark_proposals WHERE id = ?1", params![id])?;
    Ok(changed > 0)
}
