//! Adapts heterogeneous source rows into uniform candidate records.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::ReconError;
use crate::normalize;
use crate::record::{CandidateRecord, SourceKind, SourceRow};

fn looks_like_year(val: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^(19|20)\d{2}$").unwrap());
    re.is_match(&normalize::canonicalize_numeric(val))
}

/// Build a candidate from one source row, using the kind's schema map.
///
/// Publication rows carry their title inside the anchor-encoded `url`
/// column; a publication without recoverable anchor text is malformed.
/// News and media rows must have a non-empty `title` column.
pub fn extract(kind: SourceKind, row: &SourceRow) -> Result<CandidateRecord, ReconError> {
    let mut fields: BTreeMap<String, String> = BTreeMap::new();
    for (src, dest) in kind.column_map() {
        if let Some(value) = row.get(*src) {
            fields.insert((*dest).to_string(), value.clone());
        }
    }

    let link_raw = fields.get("url").cloned().unwrap_or_default();

    if let Some(year) = fields.get("published_year") {
        if !year.trim().is_empty() && !looks_like_year(year) {
            let reason = format!("unparseable published_year '{}'", year.trim());
            return Err(malformed(kind, &link_raw, &reason));
        }
    }

    let title_raw = match kind {
        SourceKind::Publication => normalize::split_anchor(&link_raw)
            .map(|(_, text)| text)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| malformed(kind, &link_raw, "no title in anchor-encoded url"))?,
        SourceKind::News | SourceKind::Media => {
            let title = fields.get("title").cloned().unwrap_or_default();
            if title.trim().is_empty() {
                return Err(malformed(kind, &link_raw, "missing title"));
            }
            title
        }
    };

    fields.insert("data_type".to_string(), kind.label().to_string());
    fields.insert("title".to_string(), title_raw.clone());

    Ok(CandidateRecord::new(kind, title_raw, link_raw, fields))
}

fn malformed(kind: SourceKind, link: &str, reason: &str) -> ReconError {
    ReconError::MalformedRecord {
        kind: kind.label(),
        title: String::new(),
        link: link.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> SourceRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn publication_title_from_anchor() {
        let r = row(&[
            ("url", r#"<a href="https://doi.org/10.1/xyz">Soil Carbon Dynamics</a>"#),
            ("publisher", "Elsevier"),
            ("published_year", "2015.0"),
            ("authors", "Okafor, N.; Hart, J."),
            ("journal", "Global Change Biology"),
        ]);
        let rec = extract(SourceKind::Publication, &r).unwrap();
        assert_eq!(rec.title_raw, "Soil Carbon Dynamics");
        assert_eq!(rec.field("data_type"), "Publication");
        assert_eq!(rec.field("authors_pub"), "Okafor, N.; Hart, J.");
        assert_eq!(rec.field("published_year"), "2015.0");
        assert!(!rec.link_key.is_empty());
    }

    #[test]
    fn publication_doubled_quote_anchor() {
        let r = row(&[(
            "url",
            r#"<a href=""https://doi.org/10.1/abc"">Rainfall Variability</a>"#,
        )]);
        let rec = extract(SourceKind::Publication, &r).unwrap();
        assert_eq!(rec.title_raw, "Rainfall Variability");
    }

    #[test]
    fn publication_without_anchor_is_malformed() {
        let r = row(&[("url", "https://doi.org/10.1/xyz"), ("publisher", "X")]);
        let err = extract(SourceKind::Publication, &r).unwrap_err();
        assert!(matches!(err, ReconError::MalformedRecord { .. }));
        assert!(err.to_string().contains("doi.org"));
    }

    #[test]
    fn publication_empty_anchor_text_is_malformed() {
        let r = row(&[("url", r#"<a href="https://doi.org/10.1/xyz">  </a>"#)]);
        assert!(extract(SourceKind::Publication, &r).is_err());
    }

    #[test]
    fn unparseable_year_is_malformed() {
        let r = row(&[
            ("url", r#"<a href="https://doi.org/10.1/xyz">Soil Carbon</a>"#),
            ("published_year", "banana"),
        ]);
        let err = extract(SourceKind::Publication, &r).unwrap_err();
        assert!(err.to_string().contains("published_year"));
        // Float-formatted years are acceptable.
        let ok = row(&[
            ("url", r#"<a href="https://doi.org/10.1/xyz">Soil Carbon</a>"#),
            ("published_year", "2015.0"),
        ]);
        assert!(extract(SourceKind::Publication, &ok).is_ok());
    }

    #[test]
    fn news_row_maps_columns() {
        let r = row(&[
            ("title", "Institute opens new field station"),
            ("url", "https://news.site.org/field-station"),
            ("author", "M. Reyes"),
            ("date", "March 3, 2021"),
            ("excerpt", "A new research outpost..."),
            ("imagename", "station.jpg"),
        ]);
        let rec = extract(SourceKind::News, &r).unwrap();
        assert_eq!(rec.field("data_type"), "News/Feature");
        assert_eq!(rec.field("imagename"), "station.jpg");
        assert_eq!(rec.title_key, "institute opens new field station");
    }

    #[test]
    fn news_missing_title_is_malformed() {
        let r = row(&[("url", "https://news.site.org/x"), ("title", "  ")]);
        assert!(extract(SourceKind::News, &r).is_err());
    }

    #[test]
    fn media_link_column_renamed() {
        let r = row(&[
            ("title", "Researchers cited in drought coverage"),
            ("external_link", "https://paper.example/drought?utm=feed"),
            ("date", "2020-07-01"),
            ("source", "The Daily Ledger"),
        ]);
        let rec = extract(SourceKind::Media, &r).unwrap();
        assert_eq!(rec.field("url"), "https://paper.example/drought?utm=feed");
        assert_eq!(rec.field("source_media"), "The Daily Ledger");
        // Exact key ignores the tracking query.
        assert_eq!(rec.link_key, normalize::normalize_link("https://paper.example/drought"));
    }

    #[test]
    fn unknown_columns_are_ignored() {
        let r = row(&[
            ("title", "T"),
            ("external_link", "https://x.org"),
            ("scraped_by", "bot-7"),
        ]);
        let rec = extract(SourceKind::Media, &r).unwrap();
        assert_eq!(rec.field("scraped_by"), "");
    }
}
