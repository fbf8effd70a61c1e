//! Access to the trail reference dataset.
//!
//! The store reads the dataset through [`TrailSource`] on every query. The
//! file-backed source re-reads the file each time; a caching source can be
//! dropped in behind the same trait without touching the store.

use crate::error::{DataError, Result};
use crate::report::{DataIssue, Reporter};
use crate::Trail;
use serde_json::Value;
use std::collections::HashSet;
use std::path::PathBuf;

/// A provider of trail records.
pub trait TrailSource: Send + Sync {
    /// Where the records come from, used in diagnostics.
    fn origin(&self) -> PathBuf;

    /// Load every usable record in dataset order.
    ///
    /// An error means the dataset as a whole is unusable. Individual bad records
    /// are reported through `reporter` and skipped.
    fn load(&self, reporter: &dyn Reporter) -> Result<Vec<Trail>>;
}

/// Trail records stored as a JSON array in a file.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TrailSource for JsonFileSource {
    fn origin(&self) -> PathBuf {
        self.path.clone()
    }

    fn load(&self, reporter: &dyn Reporter) -> Result<Vec<Trail>> {
        let bytes = std::fs::read(&self.path).map_err(|e| DataError::io(&self.path, e))?;
        let document: Value = serde_json::from_slice(&bytes)?;
        match document {
            Value::Array(records) => Ok(decode_records(records, reporter)),
            _ => Err(DataError::NotAnArray),
        }
    }
}

/// An in-memory dataset. Each load hands out a fresh copy.
impl TrailSource for Vec<Trail> {
    fn origin(&self) -> PathBuf {
        PathBuf::from("<memory>")
    }

    fn load(&self, _reporter: &dyn Reporter) -> Result<Vec<Trail>> {
        Ok(self.clone())
    }
}

/// Decode raw JSON records one by one, skipping the ones that do not describe a
/// trail and flagging duplicate ids.
pub fn decode_records(records: Vec<Value>, reporter: &dyn Reporter) -> Vec<Trail> {
    let mut seen = HashSet::new();
    let mut trails = Vec::with_capacity(records.len());

    for (position, record) in records.into_iter().enumerate() {
        match serde_json::from_value::<Trail>(record) {
            Ok(trail) => {
                if !seen.insert(trail.id) {
                    reporter.report(DataIssue::DuplicateTrailId { trail_id: trail.id });
                }
                trails.push(trail);
            }
            Err(e) => reporter.report(DataIssue::RecordSkipped {
                position,
                reason: e.to_string(),
            }),
        }
    }

    trails
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::MemoryReporter;
    use serde_json::json;

    #[test]
    fn test_decode_skips_bad_records() {
        let reporter = MemoryReporter::new();
        let records = vec![
            json!({"id": 1, "name": "Good", "latitude": 1.0, "longitude": 2.0}),
            json!({"name": "No id"}),
            json!("not an object"),
            json!({"id": 2, "name": "Also good"}),
        ];

        let trails = decode_records(records, &reporter);
        let ids: Vec<u64> = trails.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 2]);

        let issues = reporter.issues();
        assert_eq!(issues.len(), 2);
        assert!(matches!(issues[0], DataIssue::RecordSkipped { position: 1, .. }));
        assert!(matches!(issues[1], DataIssue::RecordSkipped { position: 2, .. }));
    }

    #[test]
    fn test_decode_flags_duplicate_ids_but_keeps_order() {
        let reporter = MemoryReporter::new();
        let records = vec![
            json!({"id": 7, "name": "First"}),
            json!({"id": 7, "name": "Second"}),
        ];

        let trails = decode_records(records, &reporter);
        assert_eq!(trails.len(), 2);
        assert_eq!(trails[0].name, "First");
        assert_eq!(reporter.issues(), vec![DataIssue::DuplicateTrailId { trail_id: 7 }]);
    }

    #[test]
    fn test_decode_accepts_null_checkpoints() {
        let reporter = MemoryReporter::new();
        let records = vec![json!({
            "id": 1, "name": "Loop", "latitude": 37.8, "longitude": -122.4,
            "checkpoints": null
        })];

        let trails = decode_records(records, &reporter);
        assert_eq!(trails.len(), 1);
        assert!(trails[0].checkpoints.is_empty());
        assert!(reporter.issues().is_empty());
    }

    #[test]
    fn test_json_file_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trails.json");
        std::fs::write(&path, r#"[{"id": 1, "name": "Loop", "latitude": 37.8, "longitude": -122.4}]"#)
            .unwrap();

        let source = JsonFileSource::new(&path);
        let trails = source.load(&MemoryReporter::new()).unwrap();
        assert_eq!(trails.len(), 1);
        assert_eq!(trails[0].name, "Loop");
        assert_eq!(source.origin(), path);
    }

    #[test]
    fn test_json_file_source_errors() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = MemoryReporter::new();

        let missing = JsonFileSource::new(dir.path().join("absent.json"));
        assert!(missing.load(&reporter).unwrap_err().is_missing_file());

        let object_path = dir.path().join("object.json");
        std::fs::write(&object_path, r#"{"id": 1}"#).unwrap();
        assert!(matches!(
            JsonFileSource::new(&object_path).load(&reporter),
            Err(DataError::NotAnArray)
        ));

        let garbage_path = dir.path().join("garbage.json");
        std::fs::write(&garbage_path, "[{").unwrap();
        assert!(matches!(
            JsonFileSource::new(&garbage_path).load(&reporter),
            Err(DataError::Json(_))
        ));
    }
}
