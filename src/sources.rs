//! CSV adapters: per-kind ingestion and union-schema emission.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::warn;

use crate::error::ReconError;
use crate::extract;
use crate::record::{CandidateRecord, SourceKind, SourceRow};
use crate::store::CanonicalStore;

/// Candidates loaded from one source, plus how many rows were dropped.
pub struct SourceBatch {
    pub kind: SourceKind,
    pub candidates: Vec<CandidateRecord>,
    pub malformed: usize,
}

/// Read one source file into raw rows. An unreadable file is
/// `SourceUnavailable`; the caller decides whether that is fatal (it never
/// is — the source just contributes zero candidates).
pub fn read_rows(path: &Path) -> Result<Vec<SourceRow>, ReconError> {
    let unavailable = |reason: String| ReconError::SourceUnavailable {
        path: path.display().to_string(),
        reason,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| unavailable(e.to_string()))?;
    let headers = reader
        .headers()
        .map_err(|e| unavailable(e.to_string()))?
        .clone();

    let mut rows = Vec::new();
    for (line, result) in reader.records().enumerate() {
        match result {
            Ok(record) => {
                let row: SourceRow = headers
                    .iter()
                    .zip(record.iter())
                    .map(|(h, v)| (h.to_string(), v.to_string()))
                    .collect();
                rows.push(row);
            }
            Err(e) => {
                warn!(path = %path.display(), row = line + 2, error = %e, "unreadable row skipped");
            }
        }
    }
    Ok(rows)
}

/// Load and extract all candidates of one kind. Malformed rows are warned
/// about and dropped; extraction never aborts the pass.
pub fn load_candidates(kind: SourceKind, path: &Path) -> Result<SourceBatch, ReconError> {
    let rows = read_rows(path)?;
    let mut candidates = Vec::new();
    let mut malformed = 0usize;
    for row in &rows {
        match extract::extract(kind, row) {
            Ok(candidate) => candidates.push(candidate),
            Err(e) => {
                malformed += 1;
                warn!(source = kind.label(), error = %e, "record skipped");
            }
        }
    }
    Ok(SourceBatch {
        kind,
        candidates,
        malformed,
    })
}

/// Write the canonical store as one table under the fixed union schema.
pub fn write_output(path: &Path, store: &CanonicalStore) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {:?}", path))?;
    writer.write_record(CanonicalStore::header())?;
    for row in store.to_rows() {
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{CanonicalRecord, OUTPUT_COLUMNS};
    use std::path::PathBuf;

    fn fixture(name: &str) -> PathBuf {
        PathBuf::from("tests/fixtures").join(name)
    }

    #[test]
    fn publications_fixture_extracts_titles_from_anchors() {
        let batch = load_candidates(SourceKind::Publication, &fixture("publications.csv")).unwrap();
        assert_eq!(batch.candidates.len(), 3);
        assert_eq!(batch.malformed, 1); // the row without anchor text
        let titles: Vec<&str> = batch
            .candidates
            .iter()
            .map(|c| c.title_raw.as_str())
            .collect();
        assert!(titles.contains(&"Weather Risk in Sub-Saharan Agriculture"));
        assert!(batch.candidates.iter().all(|c| !c.link_key.is_empty()));
    }

    #[test]
    fn news_fixture_loads_all_columns() {
        let batch = load_candidates(SourceKind::News, &fixture("news.csv")).unwrap();
        assert_eq!(batch.candidates.len(), 2);
        assert_eq!(batch.malformed, 0);
        let first = &batch.candidates[0];
        assert_eq!(first.field("data_type"), "News/Feature");
        assert!(!first.field("excerpt").is_empty());
    }

    #[test]
    fn media_fixture_maps_external_link() {
        let batch = load_candidates(SourceKind::Media, &fixture("media.csv")).unwrap();
        assert_eq!(batch.candidates.len(), 2);
        assert!(batch.candidates[0].field("url").starts_with("https://"));
        assert!(!batch.candidates[0].field("source_media").is_empty());
    }

    #[test]
    fn missing_file_is_source_unavailable() {
        let err = read_rows(Path::new("tests/fixtures/no_such_file.csv")).unwrap_err();
        assert!(matches!(err, ReconError::SourceUnavailable { .. }));
    }

    #[test]
    fn output_round_trips_through_csv() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("combined.csv");

        let batch = load_candidates(SourceKind::Media, &fixture("media.csv")).unwrap();
        let mut store = CanonicalStore::new();
        for c in batch.candidates {
            store.push(CanonicalRecord::accepted(c));
        }
        write_output(&out, &store).unwrap();

        let rows = read_rows(&out).unwrap();
        assert_eq!(rows.len(), 2);
        for row in &rows {
            assert_eq!(row.len(), OUTPUT_COLUMNS.len());
            assert_eq!(row.get("data_type").map(String::as_str), Some("Media Mention"));
        }
    }
}
