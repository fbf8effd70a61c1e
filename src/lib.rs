//! # Stride Quest
//!
//! Location-based trail experiences: find trails near a user, fetch trail detail
//! with checkpoints snapped onto the recorded GPX track, check whether a user has
//! reached a checkpoint, and validate challenge photos.
//!
//! This library provides:
//! - Geodesic distance utilities ([`geo_utils`])
//! - GPX track parsing ([`gpx_track`])
//! - Checkpoint snapping onto a recorded track ([`snapping`])
//! - A read-only trail store with proximity search ([`store`])
//! - Checkpoint arrival checks ([`proximity`])
//! - Photo challenge validation ([`photo`])
//!
//! ## Features
//!
//! - **`parallel`** - Enrich nearby-trail results in parallel with rayon
//! - **`http`** - HTTP facade (axum) and the `stride-quest-server` binary
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stride_quest::{StoreConfig, TrailStore};
//!
//! let store = TrailStore::from_config(&StoreConfig::default());
//! let nearby = store.find_nearby(32.1670, 34.8045, Some(25.0)).unwrap();
//! for trail in &nearby {
//!     println!("{} ({:?} km away)", trail.trail.name, trail.distance_km);
//! }
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub mod config;
pub mod error;
pub mod features;
pub mod geo_utils;
pub mod gpx_track;
pub mod photo;
pub mod proximity;
pub mod report;
pub mod snapping;
pub mod source;
pub mod store;

#[cfg(feature = "http")]
pub mod http;

pub use config::Config;
pub use error::{DataError, QueryError};
pub use gpx_track::{read_track_points, GpxTrackParser};
pub use photo::{filename_matches, PhotoConfig, PhotoValidator, PhotoVerdict};
pub use proximity::{ArrivalStatus, ProximityChecker, ARRIVAL_RADIUS_METERS};
pub use report::{DataIssue, LogReporter, MemoryReporter, Reporter};
pub use snapping::{nearest_track_point, snap_checkpoints};
pub use source::{JsonFileSource, TrailSource};
pub use store::{StoreConfig, TrailStore, DEFAULT_RADIUS_KM};

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude.
///
/// Serialized as `{"lat": .., "lon": ..}`.
///
/// # Example
/// ```
/// use stride_quest::GpsPoint;
/// let point = GpsPoint::new(32.1670, 34.8045);
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lon")]
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }

    /// Build a point from live client input, rejecting out-of-range values
    /// instead of clamping them.
    pub fn validated(latitude: f64, longitude: f64) -> Result<Self, QueryError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(QueryError::InvalidLatitude(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(QueryError::InvalidLongitude(longitude));
        }
        Ok(Self::new(latitude, longitude))
    }
}

/// A single sample of a recorded track. Only position in the sequence matters.
pub type TrackPoint = GpsPoint;

/// A point of interest along a trail.
///
/// A checkpoint is identified by its index in the owning trail's sequence.
/// Coordinates may be absent in the dataset; snapping fills or overwrites them on
/// a per-request copy. Authored content (title, quiz, challenge, ...) is kept in
/// `extra` untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Checkpoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Checkpoint {
    pub fn at(latitude: f64, longitude: f64) -> Self {
        Self {
            lat: Some(latitude),
            lon: Some(longitude),
            extra: Map::new(),
        }
    }

    /// Coordinates, when both are present and in range.
    pub fn position(&self) -> Option<GpsPoint> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some(GpsPoint::new(lat, lon)).filter(GpsPoint::is_valid),
            _ => None,
        }
    }

    /// Copy of this checkpoint moved to `point`.
    pub fn moved_to(&self, point: &GpsPoint) -> Self {
        Self {
            lat: Some(point.latitude),
            lon: Some(point.longitude),
            extra: self.extra.clone(),
        }
    }

    pub fn title(&self) -> Option<&str> {
        self.extra.get("title").and_then(Value::as_str)
    }
}

/// A trail record from the reference dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trail {
    pub id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Track file name, relative to the configured track directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpx_file: Option<String>,
    /// Absent and `null` both mean no checkpoints.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub checkpoints: Vec<Checkpoint>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Trail {
    pub fn new(id: u64, name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            id,
            name: name.into(),
            latitude: Some(latitude),
            longitude: Some(longitude),
            gpx_file: None,
            checkpoints: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Reference location, when both coordinates are present and in range.
    pub fn location(&self) -> Option<GpsPoint> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(GpsPoint::new(lat, lon)).filter(GpsPoint::is_valid),
            _ => None,
        }
    }

    pub fn summary(&self) -> TrailSummary {
        TrailSummary {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Id and name of a trail, for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrailSummary {
    pub id: u64,
    pub name: String,
}

/// A trail as returned to callers: a private copy of the stored record with
/// checkpoints snapped to the track, the track geometry, and (for proximity
/// queries) the distance from the query point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedTrail {
    #[serde(flatten)]
    pub trail: Trail,
    /// Parsed track, empty when the trail has no usable track file.
    pub gpx_points: Vec<TrackPoint>,
    /// Distance in km from the query point, rounded to 2 decimals.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

// ============================================================================
// Tests
// ============================================================================
