//! The reconciliation pass: classify each incoming candidate as new, exact
//! duplicate, or conflict, and drive conflict resolution.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::audit::AuditLog;
use crate::decide::{Conflict, ConflictKind, Decision, DecisionProvider};
use crate::error::ReconError;
use crate::merge;
use crate::record::{CandidateRecord, CanonicalRecord};
use crate::similarity;
use crate::store::CanonicalStore;

/// What happened to one incoming candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    AcceptedNew,
    ExactDuplicate,
    Discarded,
    Replaced,
    Merged,
    KeptBoth,
}

#[derive(Debug, Default, Clone)]
pub struct ReconcileStats {
    pub incoming: usize,
    pub accepted: usize,
    pub exact_duplicates: usize,
    pub conflicts: usize,
    pub merged: usize,
    pub replaced: usize,
    pub kept_both: usize,
    pub discarded: usize,
}

impl ReconcileStats {
    pub fn print(&self) {
        println!(
            "Reconciled {} incoming: {} accepted, {} exact duplicates, {} conflicts ({} merged, {} replaced, {} kept alongside, {} discarded).",
            self.incoming,
            self.accepted,
            self.exact_duplicates,
            self.conflicts,
            self.merged,
            self.replaced,
            self.kept_both,
            self.discarded,
        );
    }
}

/// Owns the canonical store and the accepted-key set for one pass. All
/// store mutation happens here, and only after a decision has been fully
/// computed, so an aborted pass leaves the last fully-applied state.
pub struct Reconciler {
    store: CanonicalStore,
    accepted_keys: HashSet<String>,
    threshold: f64,
    stats: ReconcileStats,
}

impl Reconciler {
    pub fn new(threshold: f64) -> Self {
        Reconciler {
            store: CanonicalStore::new(),
            accepted_keys: HashSet::new(),
            threshold,
            stats: ReconcileStats::default(),
        }
    }

    pub fn store(&self) -> &CanonicalStore {
        &self.store
    }

    pub fn stats(&self) -> &ReconcileStats {
        &self.stats
    }

    /// Run one candidate through the state machine.
    pub fn offer(
        &mut self,
        incoming: CandidateRecord,
        provider: &mut dyn DecisionProvider,
        audit: &mut AuditLog,
    ) -> Result<Outcome, ReconError> {
        self.stats.incoming += 1;

        // Exact check first: silent duplicate, logged but never escalated.
        if !incoming.link_key.is_empty() && self.accepted_keys.contains(&incoming.link_key) {
            match self
                .store
                .iter()
                .find(|r| similarity::exact_match(&r.record, &incoming))
            {
                Some(existing) => {
                    let conflict = Conflict {
                        kind: ConflictKind::ExactLink,
                        score: 1.0,
                    };
                    audit.record(&conflict, &existing.record, &incoming, Decision::SkipNew);
                }
                None => warn!(
                    link = %incoming.link_raw,
                    "accepted-key set referenced a record no longer in the store"
                ),
            }
            debug!(incoming = %incoming.identity(), "exact duplicate, skipped");
            self.stats.exact_duplicates += 1;
            return Ok(Outcome::ExactDuplicate);
        }

        // Fuzzy scan over the store in acceptance order. The first conflict
        // is resolved first; later records are only reached when an earlier
        // resolution left the incoming record unconsumed.
        let mut discard = false;
        let mut kept_both = false;
        let mut idx = 0;
        while idx < self.store.len() {
            let existing = match self.store.get(idx) {
                Some(e) => e.clone(),
                None => break,
            };
            let Some(conflict) = detect_conflict(&existing.record, &incoming, self.threshold)
            else {
                idx += 1;
                continue;
            };
            self.stats.conflicts += 1;

            let resolution = provider.decide(&conflict, &existing, &incoming)?;
            audit.record(&conflict, &existing.record, &incoming, resolution.decision);

            match resolution.decision {
                Decision::SkipNew => {
                    discard = true;
                    idx += 1;
                }
                Decision::KeepBoth => {
                    kept_both = true;
                    idx += 1;
                }
                Decision::ReplaceWithNew => {
                    let replaced = merge::replacement(&existing, &incoming);
                    self.unregister_key(&existing.record.link_key);
                    let removed = if existing.record.link_key.is_empty() {
                        self.store.remove_at(idx)
                    } else {
                        self.store.remove_by_link_key(&existing.record.link_key)
                    };
                    if removed.is_none() {
                        warn!(
                            existing = %existing.record.identity(),
                            "superseded record was already gone from the store"
                        );
                    }
                    self.register_key(&replaced.record.link_key);
                    self.stats.replaced += 1;
                    info!(
                        superseded = %existing.record.identity(),
                        by = %replaced.record.identity(),
                        "replaced canonical record"
                    );
                    self.store.push(replaced);
                    return Ok(Outcome::Replaced);
                }
                Decision::MergeFields => {
                    let merged =
                        merge::merge_fields(&existing, &incoming, &resolution.field_choices)?;
                    self.unregister_key(&existing.record.link_key);
                    self.register_key(&merged.record.link_key);
                    self.store.replace(idx, merged);
                    self.stats.merged += 1;
                    return Ok(Outcome::Merged);
                }
            }
        }

        if discard {
            self.stats.discarded += 1;
            info!(incoming = %incoming.identity(), "incoming record discarded");
            return Ok(Outcome::Discarded);
        }

        self.register_key(&incoming.link_key);
        self.store.push(CanonicalRecord::accepted(incoming));
        self.stats.accepted += 1;
        if kept_both {
            self.stats.kept_both += 1;
            Ok(Outcome::KeptBoth)
        } else {
            Ok(Outcome::AcceptedNew)
        }
    }

    fn register_key(&mut self, key: &str) {
        if !key.is_empty() {
            self.accepted_keys.insert(key.to_string());
        }
    }

    fn unregister_key(&mut self, key: &str) {
        if !key.is_empty() {
            self.accepted_keys.remove(key);
        }
    }
}

/// Conflict detection against one existing record. Normalized-title
/// equality escalates regardless of the fuzzy threshold; otherwise the
/// combined-key similarity decides.
fn detect_conflict(
    existing: &CandidateRecord,
    incoming: &CandidateRecord,
    threshold: f64,
) -> Option<Conflict> {
    let score = similarity::fuzzy_score(existing, incoming);
    if !existing.title_key.is_empty() && existing.title_key == incoming.title_key {
        return Some(Conflict {
            kind: ConflictKind::ExactTitle,
            score,
        });
    }
    if similarity::above_threshold(score, threshold) {
        return Some(Conflict {
            kind: ConflictKind::Fuzzy,
            score,
        });
    }
    None
}
