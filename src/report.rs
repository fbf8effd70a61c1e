//! Reporting of recoverable data problems.
//!
//! Components never fail a request because of bad reference data. Instead they
//! describe what went wrong as a [`DataIssue`] and hand it to the [`Reporter`]
//! they were built with, then carry on with a degraded result.

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// How serious a reported issue is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// A recoverable problem found while reading reference data.
#[derive(Debug, Clone, PartialEq)]
pub enum DataIssue {
    /// The trail dataset could not be found.
    DatasetMissing { path: PathBuf },
    /// The trail dataset exists but could not be read as a list of records.
    DatasetMalformed { path: PathBuf, reason: String },
    /// A single record was skipped; the rest of the dataset is still served.
    RecordSkipped { position: usize, reason: String },
    /// Two records share an id. Lookups resolve to the first one.
    DuplicateTrailId { trail_id: u64 },
    /// A trail references a track file that does not exist.
    TrackMissing { path: PathBuf },
    /// A track file exists but is not valid GPX.
    TrackMalformed { path: PathBuf, reason: String },
    /// A track reference points outside the track directory.
    UnsafeTrackReference { reference: String },
    /// A keyword maps to a reference image that is not on disk or not decodable.
    ReferenceImageUnavailable { keyword: String, path: PathBuf },
}

impl DataIssue {
    pub fn severity(&self) -> Severity {
        match self {
            DataIssue::TrackMissing { .. }
            | DataIssue::DuplicateTrailId { .. }
            | DataIssue::ReferenceImageUnavailable { .. } => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for DataIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataIssue::DatasetMissing { path } => {
                write!(f, "Trail dataset not found: {}", path.display())
            }
            DataIssue::DatasetMalformed { path, reason } => {
                write!(f, "Trail dataset {} is malformed: {}", path.display(), reason)
            }
            DataIssue::RecordSkipped { position, reason } => {
                write!(f, "Skipping trail record #{}: {}", position, reason)
            }
            DataIssue::DuplicateTrailId { trail_id } => {
                write!(f, "Duplicate trail id {} in dataset", trail_id)
            }
            DataIssue::TrackMissing { path } => {
                write!(f, "GPX file not found: {}", path.display())
            }
            DataIssue::TrackMalformed { path, reason } => {
                write!(f, "Failed to parse GPX file {}: {}", path.display(), reason)
            }
            DataIssue::UnsafeTrackReference { reference } => {
                write!(f, "Ignoring track reference outside the track directory: {}", reference)
            }
            DataIssue::ReferenceImageUnavailable { keyword, path } => {
                write!(
                    f,
                    "Reference image for '{}' unavailable: {}",
                    keyword,
                    path.display()
                )
            }
        }
    }
}

/// Sink for recoverable data problems, injected into each component.
pub trait Reporter: Send + Sync {
    fn report(&self, issue: DataIssue);
}

/// Forwards issues to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report(&self, issue: DataIssue) {
        match issue.severity() {
            Severity::Warning => log::warn!("[StrideQuest] {}", issue),
            Severity::Error => log::error!("[StrideQuest] {}", issue),
        }
    }
}

/// Keeps every reported issue in memory.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    issues: Mutex<Vec<DataIssue>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the issues reported so far.
    pub fn issues(&self) -> Vec<DataIssue> {
        match self.issues.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Reporter for MemoryReporter {
    fn report(&self, issue: DataIssue) {
        match self.issues.lock() {
            Ok(mut guard) => guard.push(issue),
            Err(poisoned) => poisoned.into_inner().push(issue),
        }
    }
}

/// The reporter used when none is supplied.
pub fn default_reporter() -> Arc<dyn Reporter> {
    Arc::new(LogReporter)
}
