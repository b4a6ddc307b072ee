//! Applies resolution directives to a conflicting pair of records.

use std::collections::BTreeMap;

use crate::error::ReconError;
use crate::normalize;
use crate::record::{CandidateRecord, CanonicalRecord, SourceKind, OUTPUT_COLUMNS};

/// Which side wins a differing field in a MERGE_FIELDS resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldChoice {
    Existing,
    Incoming,
    Literal(String),
}

/// Columns whose values differ (whitespace-insensitively) between the two
/// sides. These are the fields a MERGE_FIELDS decision must choose for.
pub fn differing_fields(existing: &CandidateRecord, incoming: &CandidateRecord) -> Vec<String> {
    OUTPUT_COLUMNS
        .iter()
        .filter(|col| !normalize::text_eq(existing.field(col), incoming.field(col)))
        .map(|col| col.to_string())
        .collect()
}

/// Merge the incoming record into the existing one.
///
/// Identical fields are kept; each differing field takes the side (or the
/// literal value) named in `choices`. Every written value passes through the
/// numeric canonicalizer, and the comparison keys are recomputed from the
/// merged raw values.
pub fn merge_fields(
    existing: &CanonicalRecord,
    incoming: &CandidateRecord,
    choices: &BTreeMap<String, FieldChoice>,
) -> Result<CanonicalRecord, ReconError> {
    let mut fields: BTreeMap<String, String> = BTreeMap::new();
    for col in OUTPUT_COLUMNS {
        let old = existing.record.field(col);
        let new = incoming.field(col);
        let value = if normalize::text_eq(old, new) {
            old.to_string()
        } else {
            match choices.get(col) {
                Some(FieldChoice::Existing) => old.to_string(),
                Some(FieldChoice::Incoming) => new.to_string(),
                Some(FieldChoice::Literal(v)) => v.clone(),
                None => return Err(ReconError::MissingFieldChoice(col.to_string())),
            }
        };
        fields.insert(col.to_string(), normalize::canonicalize_numeric(&value));
    }

    let kind = SourceKind::from_label(fields.get("data_type").map(String::as_str).unwrap_or(""))
        .unwrap_or(existing.record.kind);
    let title_raw = fields.get("title").cloned().unwrap_or_default();
    let link_raw = fields.get("url").cloned().unwrap_or_default();

    let mut origin = existing.origin.clone();
    origin.contributors.push(incoming.identity());

    Ok(CanonicalRecord {
        record: CandidateRecord::new(kind, title_raw, link_raw, fields),
        origin,
    })
}

/// Build the replacement record for a REPLACE_WITH_NEW resolution: the
/// incoming record, numerically canonicalized, whose origin records the
/// superseded record's identity.
pub fn replacement(old: &CanonicalRecord, incoming: &CandidateRecord) -> CanonicalRecord {
    let mut replaced = CanonicalRecord::accepted(canonicalize_record(incoming));
    replaced
        .origin
        .contributors
        .extend(old.origin.contributors.iter().cloned());
    replaced.origin.contributors.push(old.record.identity());
    replaced
}

/// Apply the numeric canonicalizer to every field and recompute keys.
pub fn canonicalize_record(rec: &CandidateRecord) -> CandidateRecord {
    let fields: BTreeMap<String, String> = rec
        .fields
        .iter()
        .map(|(k, v)| (k.clone(), normalize::canonicalize_numeric(v)))
        .collect();
    let title_raw = fields
        .get("title")
        .cloned()
        .unwrap_or_else(|| rec.title_raw.clone());
    let link_raw = fields
        .get("url")
        .cloned()
        .unwrap_or_else(|| rec.link_raw.clone());
    CandidateRecord::new(rec.kind, title_raw, link_raw, fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::SourceKind;

    fn publication(title: &str, year: &str, journal: &str) -> CandidateRecord {
        let link = format!(r#"<a href="https://doi.org/10.1/{}">{}</a>"#, title.len(), title);
        let mut fields = BTreeMap::new();
        fields.insert("data_type".to_string(), "Publication".to_string());
        fields.insert("title".to_string(), title.to_string());
        fields.insert("url".to_string(), link.clone());
        fields.insert("published_year".to_string(), year.to_string());
        fields.insert("journal".to_string(), journal.to_string());
        CandidateRecord::new(SourceKind::Publication, title.into(), link, fields)
    }

    #[test]
    fn single_differing_field_takes_chosen_side() {
        let old = CanonicalRecord::accepted(publication("Soil Carbon", "2015.0", "GCB"));
        let new = publication("Soil Carbon", "2016", "GCB");
        let mut choices = BTreeMap::new();
        choices.insert("published_year".to_string(), FieldChoice::Incoming);
        let merged = merge_fields(&old, &new, &choices).unwrap();
        assert_eq!(merged.record.field("published_year"), "2016");
        assert_eq!(merged.record.field("journal"), "GCB");
        assert_eq!(merged.record.title_raw, "Soil Carbon");
    }

    #[test]
    fn identical_fields_need_no_choice() {
        let old = CanonicalRecord::accepted(publication("Soil Carbon", "2015.0", "GCB"));
        let new = publication("Soil Carbon", "2015.0", "GCB");
        let merged = merge_fields(&old, &new, &BTreeMap::new()).unwrap();
        // Identical values still come out canonicalized.
        assert_eq!(merged.record.field("published_year"), "2015");
    }

    #[test]
    fn missing_choice_is_an_error() {
        let old = CanonicalRecord::accepted(publication("Soil Carbon", "2015", "GCB"));
        let new = publication("Soil Carbon", "2016", "GCB");
        let err = merge_fields(&old, &new, &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, ReconError::MissingFieldChoice(col) if col == "published_year"));
    }

    #[test]
    fn literal_override_wins() {
        let old = CanonicalRecord::accepted(publication("Soil Carbon", "2015", "GCB"));
        let new = publication("Soil Carbon", "2016", "GCB");
        let mut choices = BTreeMap::new();
        choices.insert(
            "published_year".to_string(),
            FieldChoice::Literal("2017.0".to_string()),
        );
        let merged = merge_fields(&old, &new, &choices).unwrap();
        assert_eq!(merged.record.field("published_year"), "2017");
    }

    #[test]
    fn merged_keys_follow_merged_url() {
        let old = CanonicalRecord::accepted(publication("Soil Carbon", "2015", "GCB"));
        let new = publication("Soil Carbon Stocks", "2015", "GCB");
        let mut choices = BTreeMap::new();
        choices.insert("title".to_string(), FieldChoice::Incoming);
        choices.insert("url".to_string(), FieldChoice::Incoming);
        let merged = merge_fields(&old, &new, &choices).unwrap();
        assert_eq!(merged.record.link_key, new.link_key);
        assert_eq!(merged.record.title_key, new.title_key);
    }

    #[test]
    fn merge_records_contributor() {
        let old = CanonicalRecord::accepted(publication("Soil Carbon", "2015", "GCB"));
        let new = publication("Soil Carbon", "2016", "GCB");
        let mut choices = BTreeMap::new();
        choices.insert("published_year".to_string(), FieldChoice::Existing);
        let merged = merge_fields(&old, &new, &choices).unwrap();
        assert_eq!(merged.origin.contributors.len(), 1);
        assert!(merged.origin.contributors[0].contains("Soil Carbon"));
    }

    #[test]
    fn replacement_supersedes_old_identity() {
        let old = CanonicalRecord::accepted(publication("Old Title", "2015.0", "GCB"));
        let new = publication("New Title", "2015.0", "GCB");
        let replaced = replacement(&old, &new);
        assert_eq!(replaced.record.title_raw, "New Title");
        assert_eq!(replaced.record.field("published_year"), "2015");
        assert!(replaced
            .origin
            .contributors
            .iter()
            .any(|c| c.contains("Old Title")));
    }

    #[test]
    fn differing_fields_ignores_whitespace() {
        let a = publication("Soil Carbon", "2015", "Global  Change Biology");
        let b = publication("Soil Carbon", "2015", "Global Change Biology");
        assert!(differing_fields(&a, &b).is_empty());
        let c = publication("Soil Carbon", "2016", "Global Change Biology");
        assert_eq!(differing_fields(&a, &c), vec!["published_year".to_string()]);
    }
}
