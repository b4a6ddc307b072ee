use thiserror::Error;

/// Errors surfaced by extraction, sources, and decision plumbing.
///
/// None of these are fatal to a pass: malformed records are skipped with a
/// warning, unavailable sources contribute zero candidates.
#[derive(Debug, Error)]
pub enum ReconError {
    /// A schema-required field is absent or empty. Carries the identifying
    /// fields of the offending record so it can be corrected by hand.
    #[error("malformed {kind} record (title: '{title}', link: '{link}'): {reason}")]
    MalformedRecord {
        kind: &'static str,
        title: String,
        link: String,
        reason: String,
    },

    /// An input source cannot be read at all.
    #[error("source '{path}' unavailable: {reason}")]
    SourceUnavailable { path: String, reason: String },

    /// A merge decision left a differing field without a choice.
    #[error("merge left no choice for differing field '{0}'")]
    MissingFieldChoice(String),

    /// The decision channel closed before a conflict was resolved.
    #[error("decision input closed before the conflict was resolved")]
    DecisionChannelClosed,
}
