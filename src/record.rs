//! Record types shared across the pipeline.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::normalize;

/// A source row as handed over by the tabular adapters: column name → value.
pub type SourceRow = BTreeMap<String, String>;

/// Fixed union schema of the output table. Every row carries every column;
/// columns not applicable to a record's kind are emitted empty.
pub const OUTPUT_COLUMNS: [&str; 15] = [
    "data_type",
    "title",
    "url",
    "date",
    "author",
    "imagename",
    "excerpt",
    "publisher",
    "published_year",
    "published_month",
    "authors_pub",
    "journal",
    "volume",
    "issue",
    "source_media",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    Publication,
    News,
    Media,
}

impl SourceKind {
    pub fn all() -> [SourceKind; 3] {
        // Source order of the original exports: media, news, publications.
        [SourceKind::Media, SourceKind::News, SourceKind::Publication]
    }

    /// Display label, also the `data_type` column value.
    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::Publication => "Publication",
            SourceKind::News => "News/Feature",
            SourceKind::Media => "Media Mention",
        }
    }

    pub fn from_label(label: &str) -> Option<SourceKind> {
        match label {
            "Publication" => Some(SourceKind::Publication),
            "News/Feature" => Some(SourceKind::News),
            "Media Mention" => Some(SourceKind::Media),
            _ => None,
        }
    }

    /// Declarative schema map: (source column, output column). One table per
    /// kind instead of three hand-rolled mapping blocks.
    pub fn column_map(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            SourceKind::Publication => &[
                ("url", "url"),
                ("publisher", "publisher"),
                ("published_year", "published_year"),
                ("published_month", "published_month"),
                ("authors", "authors_pub"),
                ("journal", "journal"),
                ("volume", "volume"),
                ("issue", "issue"),
            ],
            SourceKind::News => &[
                ("title", "title"),
                ("url", "url"),
                ("author", "author"),
                ("date", "date"),
                ("imagename", "imagename"),
                ("excerpt", "excerpt"),
            ],
            SourceKind::Media => &[
                ("title", "title"),
                ("external_link", "url"),
                ("date", "date"),
                ("source", "source_media"),
            ],
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A record proposed for inclusion in the canonical set.
///
/// `title_key` and `link_key` are derived from the raw values on
/// construction and are recomputed whenever the raw values change; they are
/// never written out on their own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub kind: SourceKind,
    pub title_raw: String,
    pub title_key: String,
    pub link_raw: String,
    pub link_key: String,
    pub fields: BTreeMap<String, String>,
}

impl CandidateRecord {
    pub fn new(
        kind: SourceKind,
        title_raw: String,
        link_raw: String,
        fields: BTreeMap<String, String>,
    ) -> Self {
        let title_key = normalize::normalize_title(&title_raw);
        let link_key = normalize::normalize_link(&link_raw);
        CandidateRecord {
            kind,
            title_raw,
            title_key,
            link_raw,
            link_key,
            fields,
        }
    }

    /// Combined normalized link + title text, the input to fuzzy scoring.
    pub fn combined_key(&self) -> String {
        normalize::combined_key(&self.title_raw, &self.link_raw)
    }

    /// Output value for a schema column; empty when not applicable.
    pub fn field(&self, column: &str) -> &str {
        self.fields.get(column).map(String::as_str).unwrap_or("")
    }

    /// Short identity used in logs and the decision channel.
    pub fn identity(&self) -> String {
        if self.link_raw.is_empty() {
            self.title_raw.clone()
        } else {
            format!("{} <{}>", self.title_raw, self.link_raw)
        }
    }
}

/// Provenance of an accepted record: the source kind that produced it and,
/// when it superseded or absorbed other records, their raw identities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Origin {
    pub source: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contributors: Vec<String>,
}

impl Origin {
    pub fn new(source: &str) -> Self {
        Origin {
            source: source.to_string(),
            contributors: Vec::new(),
        }
    }
}

/// A candidate accepted into the canonical set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub record: CandidateRecord,
    pub origin: Origin,
}

impl CanonicalRecord {
    pub fn accepted(record: CandidateRecord) -> Self {
        let origin = Origin::new(record.kind.label());
        CanonicalRecord { record, origin }
    }
}
