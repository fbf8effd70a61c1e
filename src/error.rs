//! Error types for the trail service.
//!
//! Two families are kept apart:
//!
//! - [`DataError`] covers problems with the reference data (dataset, track files,
//!   images). Components recover from these locally: the problem is reported and
//!   the operation degrades to an empty or pass-through result.
//! - [`QueryError`] covers failures that belong to the caller: invalid input
//!   (validation) or an unknown trail/checkpoint (not found).

use std::path::PathBuf;

/// Failure while reading or decoding reference data.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("GPX parsing error: {0}")]
    Gpx(#[from] ::gpx::errors::GpxError),

    #[error("Dataset must be a JSON array of trail records")]
    NotAnArray,

    #[error("Track reference '{0}' escapes the track directory")]
    UnsafeTrackReference(String),

    #[error("Image decoding error: {0}")]
    Image(#[from] image::ImageError),
}

impl DataError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DataError::Io {
            path: path.into(),
            source,
        }
    }

    /// True when the underlying cause is a missing file.
    pub fn is_missing_file(&self) -> bool {
        matches!(self, DataError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

/// Result type alias for data-layer operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Caller-facing failure of a trail query or arrival check.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QueryError {
    #[error("Latitude {0} is outside [-90, 90]")]
    InvalidLatitude(f64),

    #[error("Longitude {0} is outside [-180, 180]")]
    InvalidLongitude(f64),

    #[error("Radius {0} km must be a non-negative number")]
    InvalidRadius(f64),

    #[error("Trail not found")]
    TrailNotFound { trail_id: u64 },

    #[error("Invalid checkpoint")]
    InvalidCheckpoint {
        trail_id: u64,
        index: usize,
        checkpoint_count: usize,
    },

    #[error("Checkpoint coordinates missing")]
    CheckpointCoordinatesMissing { trail_id: u64, index: usize },
}

impl QueryError {
    /// Input was rejected before any lookup took place.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            QueryError::InvalidLatitude(_)
                | QueryError::InvalidLongitude(_)
                | QueryError::InvalidRadius(_)
                | QueryError::InvalidCheckpoint { .. }
        )
    }

    /// The referenced trail or checkpoint position does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            QueryError::TrailNotFound { .. } | QueryError::CheckpointCoordinatesMissing { .. }
        )
    }
}
