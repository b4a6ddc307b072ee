//! Append-only decision log for one reconciliation run.
//!
//! Entries accumulate in memory during the pass and are persisted in one
//! batch afterwards. The log is written for traceability only; it is never
//! read back to influence a future dedup decision.

use anyhow::Result;
use chrono::Utc;
use rusqlite::Connection;
use tracing::info;

use crate::db;
use crate::decide::{Conflict, Decision};
use crate::record::CandidateRecord;

#[derive(Debug, Clone)]
pub struct DecisionEntry {
    pub seq: usize,
    pub incoming_title: String,
    pub incoming_link: String,
    pub existing_title: String,
    pub existing_link: String,
    pub kind: &'static str,
    pub score: f64,
    pub decision: &'static str,
    pub decided_at: String,
}

pub struct AuditLog {
    run_id: String,
    entries: Vec<DecisionEntry>,
}

impl AuditLog {
    pub fn new(run_id: String) -> Self {
        AuditLog {
            run_id,
            entries: Vec::new(),
        }
    }

    pub fn record(
        &mut self,
        conflict: &Conflict,
        existing: &CandidateRecord,
        incoming: &CandidateRecord,
        decision: Decision,
    ) {
        let entry = DecisionEntry {
            seq: self.entries.len() + 1,
            incoming_title: incoming.title_raw.clone(),
            incoming_link: incoming.link_raw.clone(),
            existing_title: existing.title_raw.clone(),
            existing_link: existing.link_raw.clone(),
            kind: conflict.kind.as_str(),
            score: conflict.score,
            decision: decision.as_str(),
            decided_at: Utc::now().to_rfc3339(),
        };
        info!(
            seq = entry.seq,
            kind = entry.kind,
            score = entry.score,
            decision = entry.decision,
            incoming = %incoming.identity(),
            existing = %existing.identity(),
            "conflict resolved"
        );
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[DecisionEntry] {
        &self.entries
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn persist(&self, conn: &Connection) -> Result<()> {
        for entry in &self.entries {
            db::insert_decision(conn, &self.run_id, entry)?;
        }
        Ok(())
    }
}

pub fn new_run_id() -> String {
    format!("run-{}", Utc::now().timestamp())
}
