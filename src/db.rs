//! SQLite persistence for the decision log.

use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use crate::audit::DecisionEntry;

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {:?}", dir))?;
        }
    }
    let conn = Connection::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS decisions (
            id             INTEGER PRIMARY KEY,
            run_id         TEXT NOT NULL,
            seq            INTEGER NOT NULL,
            incoming_title TEXT NOT NULL,
            incoming_link  TEXT NOT NULL,
            existing_title TEXT NOT NULL,
            existing_link  TEXT NOT NULL,
            kind           TEXT NOT NULL,
            score          REAL NOT NULL,
            decision       TEXT NOT NULL,
            decided_at     TEXT NOT NULL,
            logged_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_decisions_run ON decisions(run_id);
        ",
    )?;
    Ok(())
}

pub fn insert_decision(conn: &Connection, run_id: &str, entry: &DecisionEntry) -> Result<()> {
    conn.execute(
        "INSERT INTO decisions (run_id, seq, incoming_title, incoming_link, existing_title, existing_link, kind, score, decision, decided_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            run_id,
            entry.seq as i64,
            entry.incoming_title,
            entry.incoming_link,
            entry.existing_title,
            entry.existing_link,
            entry.kind,
            entry.score,
            entry.decision,
            entry.decided_at,
        ],
    )?;
    Ok(())
}

#[derive(Debug)]
pub struct LoggedDecision {
    pub run_id: String,
    pub seq: i64,
    pub incoming_title: String,
    pub incoming_link: String,
    pub existing_title: String,
    pub existing_link: String,
    pub kind: String,
    pub score: f64,
    pub decision: String,
    pub decided_at: String,
}

/// Most recent decisions, newest run first, sequence order within a run.
pub fn fetch_decisions(
    conn: &Connection,
    run_id: Option<&str>,
    limit: usize,
) -> Result<Vec<LoggedDecision>> {
    let sql = "SELECT run_id, seq, incoming_title, incoming_link, existing_title, existing_link, kind, score, decision, decided_at
         FROM decisions
         WHERE (?1 IS NULL OR run_id = ?1)
         ORDER BY run_id DESC, seq ASC
         LIMIT ?2";
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params![run_id, limit as i64], |row| {
            Ok(LoggedDecision {
                run_id: row.get(0)?,
                seq: row.get(1)?,
                incoming_title: row.get(2)?,
                incoming_link: row.get(3)?,
                existing_title: row.get(4)?,
                existing_link: row.get(5)?,
                kind: row.get(6)?,
                score: row.get(7)?,
                decision: row.get(8)?,
                decided_at: row.get(9)?,
            })
        })?
        .filter_map(|r| r.ok())
        .collect();
    Ok(rows)
}
