//! Exact and fuzzy comparison between two records.

use crate::record::CandidateRecord;

/// Scores at or above this are reported as fuzzy conflicts. Overridable via
/// settings and the CLI; this constant is the only default.
pub const DEFAULT_THRESHOLD: f64 = 0.70;

/// Exact duplicate: both link keys non-empty and identical.
pub fn exact_match(a: &CandidateRecord, b: &CandidateRecord) -> bool {
    !a.link_key.is_empty() && a.link_key == b.link_key
}

/// Normalized edit-distance similarity over the records' combined
/// link+title keys. Symmetric, 1.0 on identity, in [0, 1].
pub fn fuzzy_score(a: &CandidateRecord, b: &CandidateRecord) -> f64 {
    strsim::normalized_levenshtein(&a.combined_key(), &b.combined_key())
}

/// Threshold classification: a score exactly at the threshold is a conflict.
pub fn above_threshold(score: f64, threshold: f64) -> bool {
    score >= threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::SourceKind;
    use std::collections::BTreeMap;

    fn rec(title: &str, link: &str) -> CandidateRecord {
        CandidateRecord::new(SourceKind::News, title.into(), link.into(), BTreeMap::new())
    }

    #[test]
    fn exact_needs_nonempty_keys() {
        let a = rec("A", "");
        let b = rec("B", "");
        assert!(!exact_match(&a, &b));
        let c = rec("A", "https://site.org/a?ref=1");
        let d = rec("B", "https://site.org/a");
        assert!(exact_match(&c, &d));
    }

    #[test]
    fn score_is_symmetric() {
        let a = rec("Weather Risk in Africa", "https://site.org/a");
        let b = rec("Weather risks in West Africa", "https://site.org/b");
        assert_eq!(fuzzy_score(&a, &b), fuzzy_score(&b, &a));
    }

    #[test]
    fn identical_record_scores_one() {
        let a = rec("Weather Risk in Africa", "https://site.org/a");
        assert_eq!(fuzzy_score(&a, &a), 1.0);
    }

    #[test]
    fn unrelated_records_score_low() {
        let a = rec("Weather Risk in Africa", "https://site.org/a");
        let b = rec("Quarterly planning meeting minutes", "https://intranet.example/minutes/q3");
        assert!(fuzzy_score(&a, &b) < DEFAULT_THRESHOLD);
    }

    #[test]
    fn score_in_unit_interval() {
        let a = rec("Alpha", "https://x.org/1");
        let b = rec("Omega", "https://y.net/2");
        let s = fuzzy_score(&a, &b);
        assert!((0.0..=1.0).contains(&s));
    }

    #[test]
    fn threshold_is_inclusive() {
        assert!(above_threshold(0.70, 0.70));
        assert!(!above_threshold(0.70 - 1e-9, 0.70));
        assert!(above_threshold(0.71, 0.70));
    }
}
