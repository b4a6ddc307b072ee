//! The decision channel: conflicts, resolutions, and the providers that
//! turn one into the other.
//!
//! The reconciliation engine never talks to a console directly. It hands a
//! conflict to a [`DecisionProvider`] and blocks on the answer, so the same
//! pass runs against an interactive terminal or a scripted policy.

use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Stdin, Stdout, Write};

use crate::error::ReconError;
use crate::merge::{differing_fields, FieldChoice};
use crate::record::{CandidateRecord, CanonicalRecord, OUTPUT_COLUMNS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// Identical link keys.
    ExactLink,
    /// Identical normalized titles with different link keys.
    ExactTitle,
    /// Similarity at or above the configured threshold.
    Fuzzy,
}

impl ConflictKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictKind::ExactLink => "EXACT",
            ConflictKind::ExactTitle => "EXACT_TITLE",
            ConflictKind::Fuzzy => "FUZZY",
        }
    }
}

/// A detected relationship between an incoming candidate and one existing
/// canonical record. Ephemeral: produced, resolved, discarded.
#[derive(Debug, Clone)]
pub struct Conflict {
    pub kind: ConflictKind,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    SkipNew,
    ReplaceWithNew,
    KeepBoth,
    MergeFields,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::SkipNew => "SKIP_NEW",
            Decision::ReplaceWithNew => "REPLACE_WITH_NEW",
            Decision::KeepBoth => "KEEP_BOTH",
            Decision::MergeFields => "MERGE_FIELDS",
        }
    }
}

/// A decision plus, for merges, the per-field choices.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub decision: Decision,
    pub field_choices: BTreeMap<String, FieldChoice>,
}

impl Resolution {
    pub fn plain(decision: Decision) -> Self {
        Resolution {
            decision,
            field_choices: BTreeMap::new(),
        }
    }
}

pub trait DecisionProvider {
    fn decide(
        &mut self,
        conflict: &Conflict,
        existing: &CanonicalRecord,
        incoming: &CandidateRecord,
    ) -> Result<Resolution, ReconError>;
}

/// Unattended resolution policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Discard every conflicting incoming record.
    Skip,
    /// Keep both sides of every conflict.
    KeepBoth,
    /// Let the newer record supersede the existing one.
    PreferNew,
}

pub struct Scripted {
    policy: Policy,
}

impl Scripted {
    pub fn new(policy: Policy) -> Self {
        Scripted { policy }
    }
}

impl DecisionProvider for Scripted {
    fn decide(
        &mut self,
        _conflict: &Conflict,
        _existing: &CanonicalRecord,
        _incoming: &CandidateRecord,
    ) -> Result<Resolution, ReconError> {
        let decision = match self.policy {
            Policy::Skip => Decision::SkipNew,
            Policy::KeepBoth => Decision::KeepBoth,
            Policy::PreferNew => Decision::ReplaceWithNew,
        };
        Ok(Resolution::plain(decision))
    }
}

/// Blocking terminal prompt. Presents both records side by side and asks
/// for one of skip / replace / keep both / merge; a merge walks every
/// differing field and asks which side wins (or takes a literal value).
pub struct Interactive<R, W> {
    input: R,
    output: W,
}

impl Interactive<BufReader<Stdin>, Stdout> {
    pub fn stdio() -> Self {
        Interactive::new(BufReader::new(std::io::stdin()), std::io::stdout())
    }
}

impl<R: BufRead, W: Write> Interactive<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Interactive { input, output }
    }

    fn read_line(&mut self) -> Result<String, ReconError> {
        self.output.flush().map_err(|_| ReconError::DecisionChannelClosed)?;
        let mut line = String::new();
        let n = self
            .input
            .read_line(&mut line)
            .map_err(|_| ReconError::DecisionChannelClosed)?;
        if n == 0 {
            return Err(ReconError::DecisionChannelClosed);
        }
        Ok(line.trim().to_string())
    }

    fn print_record(&mut self, heading: &str, rec: &CandidateRecord) -> std::io::Result<()> {
        writeln!(self.output, "\n--- {} ---", heading)?;
        writeln!(self.output, "{}", "=".repeat(70))?;
        for col in OUTPUT_COLUMNS {
            let value = rec.field(col);
            if !value.is_empty() {
                writeln!(self.output, "  {:<16}: {}", col, value)?;
            }
        }
        writeln!(self.output, "{}", "=".repeat(70))?;
        Ok(())
    }
}

impl<R: BufRead, W: Write> DecisionProvider for Interactive<R, W> {
    fn decide(
        &mut self,
        conflict: &Conflict,
        existing: &CanonicalRecord,
        incoming: &CandidateRecord,
    ) -> Result<Resolution, ReconError> {
        (|| -> std::io::Result<()> {
            writeln!(self.output, "\n{}", "-".repeat(70))?;
            writeln!(
                self.output,
                "Potential duplicate ({}, similarity={:.2})",
                conflict.kind.as_str(),
                conflict.score
            )?;
            writeln!(self.output, "{}", "-".repeat(70))?;
            self.print_record("existing", &existing.record)?;
            self.print_record("incoming", incoming)?;
            Ok(())
        })()
        .map_err(|_| ReconError::DecisionChannelClosed)?;

        let decision = loop {
            write!(
                self.output,
                "\nResolve (s = skip new, r = replace with new, k = keep both, m = merge): "
            )
            .map_err(|_| ReconError::DecisionChannelClosed)?;
            match self.read_line()?.to_lowercase().as_str() {
                "s" => break Decision::SkipNew,
                "r" => break Decision::ReplaceWithNew,
                "k" => break Decision::KeepBoth,
                "m" => break Decision::MergeFields,
                other => {
                    writeln!(self.output, "Unrecognized choice: '{}'", other)
                        .map_err(|_| ReconError::DecisionChannelClosed)?;
                }
            }
        };

        let mut field_choices = BTreeMap::new();
        if decision == Decision::MergeFields {
            for col in differing_fields(&existing.record, incoming) {
                (|| -> std::io::Result<()> {
                    writeln!(self.output, "\nColumn: {}", col)?;
                    writeln!(self.output, "1: {}", existing.record.field(&col))?;
                    writeln!(self.output, "2: {}", incoming.field(&col))?;
                    write!(self.output, "Choose (1/2/custom value): ")?;
                    Ok(())
                })()
                .map_err(|_| ReconError::DecisionChannelClosed)?;
                let choice = match self.read_line()?.as_str() {
                    "1" => FieldChoice::Existing,
                    "2" => FieldChoice::Incoming,
                    custom => FieldChoice::Literal(custom.to_string()),
                };
                field_choices.insert(col, choice);
            }
        }

        Ok(Resolution {
            decision,
            field_choices,
        })
    }
}
