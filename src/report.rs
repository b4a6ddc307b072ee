//! Detection-only duplicate report: group candidates by normalized title
//! and print every group with more than one member. Nothing is mutated and
//! no decisions are taken.

use itertools::Itertools;

use crate::record::{CandidateRecord, OUTPUT_COLUMNS};

/// Groups of candidates sharing a normalized title, in title order.
/// Candidates without a usable title are excluded.
pub fn duplicate_groups(
    candidates: &[CandidateRecord],
) -> Vec<(String, Vec<&CandidateRecord>)> {
    candidates
        .iter()
        .filter(|c| !c.title_key.is_empty())
        .map(|c| (c.title_key.clone(), c))
        .into_group_map()
        .into_iter()
        .filter(|(_, members)| members.len() > 1)
        .sorted_by(|a, b| a.0.cmp(&b.0))
        .collect()
}

pub fn print_report(candidates: &[CandidateRecord]) {
    let groups = duplicate_groups(candidates);
    if groups.is_empty() {
        println!("No duplicate titles found across {} candidates.", candidates.len());
        return;
    }

    for (normalized, members) in &groups {
        println!("{}", "=".repeat(70));
        println!("DUPLICATE (normalized title: '{}')", normalized);
        println!("Shared original title: '{}'", members[0].title_raw);
        println!("{}", "=".repeat(70));
        for (i, member) in members.iter().enumerate() {
            println!("\n--- Entry {} ({}) ---", i + 1, member.kind.label());
            for col in OUTPUT_COLUMNS {
                let value = member.field(col);
                if !value.is_empty() {
                    let shown = if value.chars().count() > 120 {
                        let head: String = value.chars().take(120).collect();
                        format!("{}...", head)
                    } else {
                        value.to_string()
                    };
                    println!("  {:<16}: {}", col, shown);
                }
            }
        }
        println!("\n{}\n", "-".repeat(70));
    }
    println!(
        "{} duplicate group(s) across {} candidates.",
        groups.len(),
        candidates.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::SourceKind;
    use std::collections::BTreeMap;

    fn cand(kind: SourceKind, title: &str, link: &str) -> CandidateRecord {
        CandidateRecord::new(kind, title.into(), link.into(), BTreeMap::new())
    }

    #[test]
    fn groups_across_kinds_by_normalized_title() {
        let candidates = vec![
            cand(SourceKind::Publication, "Weather Risk in Africa", "https://doi.org/1"),
            cand(SourceKind::News, "weather risk, in AFRICA", "https://news.example/wra"),
            cand(SourceKind::Media, "Unrelated mention", "https://paper.example/x"),
        ];
        let groups = duplicate_groups(&candidates);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].0, "weather risk in africa");
        assert_eq!(groups[0].1.len(), 2);
    }

    #[test]
    fn unique_titles_produce_no_groups() {
        let candidates = vec![
            cand(SourceKind::News, "Alpha", "https://a.example"),
            cand(SourceKind::News, "Beta", "https://b.example"),
        ];
        assert!(duplicate_groups(&candidates).is_empty());
    }

    #[test]
    fn groups_are_sorted_for_stable_output() {
        let candidates = vec![
            cand(SourceKind::News, "Zebra crossing study", "https://z1.example"),
            cand(SourceKind::News, "Zebra Crossing Study", "https://z2.example"),
            cand(SourceKind::News, "Acacia growth rates", "https://a1.example"),
            cand(SourceKind::News, "acacia growth rates", "https://a2.example"),
        ];
        let groups = duplicate_groups(&candidates);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "acacia growth rates");
        assert_eq!(groups[1].0, "zebra crossing study");
    }
}
