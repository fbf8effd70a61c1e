//! Trail store: loading, proximity search and lookup.
//!
//! The store holds no trail data of its own. Every query reads the dataset fresh
//! from its [`TrailSource`] and enriches private copies of the matching records,
//! so concurrent queries never share or mutate the same checkpoint data.

use crate::error::QueryError;
use crate::geo_utils::{distance_km, round_to};
use crate::gpx_track::GpxTrackParser;
use crate::report::{default_reporter, DataIssue, Reporter};
use crate::snapping::snap_checkpoints;
use crate::source::{JsonFileSource, TrailSource};
use crate::{EnrichedTrail, GpsPoint, Trail, TrailSummary};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Search radius used when a query does not name one.
pub const DEFAULT_RADIUS_KM: f64 = 200.0;

/// Configuration for the trail store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON array of trail records.
    /// Default: data/sample_trails.json
    pub trails_path: PathBuf,

    /// Directory that `gpx_file` references are resolved against.
    /// Default: data/gpx
    pub track_dir: PathBuf,

    /// Radius for nearby queries without an explicit radius.
    /// Default: 200.0 km
    pub default_radius_km: f64,

    /// Distance below which a user has reached a checkpoint.
    /// Default: 50.0 meters
    pub arrival_radius_m: f64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            trails_path: PathBuf::from("data/sample_trails.json"),
            track_dir: PathBuf::from("data/gpx"),
            default_radius_km: DEFAULT_RADIUS_KM,
            arrival_radius_m: crate::proximity::ARRIVAL_RADIUS_METERS,
        }
    }
}

/// Read-only access to the trail catalog.
pub struct TrailStore<S: TrailSource = JsonFileSource> {
    source: S,
    tracks: GpxTrackParser,
    default_radius_km: f64,
    reporter: Arc<dyn Reporter>,
}

impl TrailStore<JsonFileSource> {
    /// File-backed store that logs data problems.
    pub fn from_config(config: &StoreConfig) -> Self {
        Self::from_config_with_reporter(config, default_reporter())
    }

    pub fn from_config_with_reporter(config: &StoreConfig, reporter: Arc<dyn Reporter>) -> Self {
        let source = JsonFileSource::new(&config.trails_path);
        let tracks = GpxTrackParser::with_reporter(&config.track_dir, reporter.clone());
        Self::new(source, tracks, reporter).with_default_radius(config.default_radius_km)
    }
}

impl<S: TrailSource> TrailStore<S> {
    pub fn new(source: S, tracks: GpxTrackParser, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            source,
            tracks,
            default_radius_km: DEFAULT_RADIUS_KM,
            reporter,
        }
    }

    pub fn with_default_radius(mut self, radius_km: f64) -> Self {
        self.default_radius_km = radius_km;
        self
    }

    /// Read the full dataset.
    ///
    /// A missing or unreadable dataset is reported and yields an empty list.
    pub fn load_all(&self) -> Vec<Trail> {
        match self.source.load(self.reporter.as_ref()) {
            Ok(trails) => {
                debug!("[StrideQuest] Loaded {} trails", trails.len());
                trails
            }
            Err(e) => {
                let path = self.source.origin();
                let issue = if e.is_missing_file() {
                    DataIssue::DatasetMissing { path }
                } else {
                    DataIssue::DatasetMalformed {
                        path,
                        reason: e.to_string(),
                    }
                };
                self.reporter.report(issue);
                Vec::new()
            }
        }
    }

    /// Id and name of every trail, in dataset order.
    pub fn list(&self) -> Vec<TrailSummary> {
        self.load_all().iter().map(Trail::summary).collect()
    }

    /// Trails whose reference location lies within `radius_km` of the query point.
    ///
    /// Results are ordered by ascending distance, measured before rounding, with
    /// ties in dataset order.
    /// Trails without usable coordinates are skipped. `None` uses the store's
    /// default radius. Out-of-range coordinates and negative radii are rejected.
    pub fn find_nearby(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: Option<f64>,
    ) -> Result<Vec<EnrichedTrail>, QueryError> {
        let origin = GpsPoint::validated(latitude, longitude)?;
        let radius_km = radius_km.unwrap_or(self.default_radius_km);
        if radius_km.is_nan() || radius_km < 0.0 {
            return Err(QueryError::InvalidRadius(radius_km));
        }

        let mut hits: Vec<(Trail, f64)> = self
            .load_all()
            .into_iter()
            .filter_map(|trail| {
                let dist = distance_km(&origin, &trail.location()?);
                (dist <= radius_km).then_some((trail, dist))
            })
            .collect();

        // Order on the unrounded distance; stable sort keeps dataset order for equal ones
        hits.sort_by(|a, b| a.1.total_cmp(&b.1));

        info!(
            "[StrideQuest] find_nearby ({:.4}, {:.4}) within {} km: {} trails",
            latitude,
            longitude,
            radius_km,
            hits.len()
        );

        #[cfg(feature = "parallel")]
        let iter = hits.into_par_iter();

        #[cfg(not(feature = "parallel"))]
        let iter = hits.into_iter();

        Ok(iter
            .map(|(trail, dist)| {
                let mut enriched = self.enrich(trail);
                // Rounding must not push a boundary trail past the radius
                enriched.distance_km = Some(round_to(dist, 2).min(radius_km));
                enriched
            })
            .collect())
    }

    /// The trail with the given id, enriched, or `None` when no record matches.
    pub fn get_by_id(&self, trail_id: u64) -> Option<EnrichedTrail> {
        let trail = self.load_all().into_iter().find(|t| t.id == trail_id)?;
        Some(self.enrich(trail))
    }

    /// Attach the parsed track and snap checkpoints onto it.
    ///
    /// Consumes the caller's copy; the dataset itself is never written back.
    pub fn enrich(&self, mut trail: Trail) -> EnrichedTrail {
        // Derived fields are computed here, never taken from the dataset
        trail.extra.remove("gpx_points");
        trail.extra.remove("distance_km");

        let gpx_points = match trail.gpx_file.as_deref() {
            Some(reference) => self.tracks.parse(reference),
            None => Vec::new(),
        };

        if !gpx_points.is_empty() {
            trail.checkpoints = snap_checkpoints(&trail.checkpoints, &gpx_points);
        }

        EnrichedTrail {
            trail,
            gpx_points,
            distance_km: None,
        }
    }
}

impl<S: TrailSource> std::fmt::Debug for TrailStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrailStore")
            .field("origin", &self.source.origin())
            .field("tracks", &self.tracks)
            .field("default_radius_km", &self.default_radius_km)
            .finish_non_exhaustive()
    }
}
