//! Checkpoint arrival checks.
//!
//! Compares a live position against a checkpoint's coordinates, as the store
//! serves them (snapped onto the track when the trail has one).

use crate::error::QueryError;
use crate::geo_utils::{distance_km, round_to};
use crate::source::TrailSource;
use crate::store::{StoreConfig, TrailStore};
use crate::GpsPoint;
use log::debug;
use serde::{Deserialize, Serialize};

/// A user closer than this to a checkpoint has reached it.
pub const ARRIVAL_RADIUS_METERS: f64 = 50.0;

/// Outcome of an arrival check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArrivalStatus {
    pub reached: bool,
    /// Distance to the checkpoint in km, rounded to 3 decimals.
    pub distance_km: f64,
}

/// Checks positions against trail checkpoints.
#[derive(Debug)]
pub struct ProximityChecker<'a, S: TrailSource> {
    store: &'a TrailStore<S>,
    arrival_radius_m: f64,
}

impl<'a, S: TrailSource> ProximityChecker<'a, S> {
    pub fn new(store: &'a TrailStore<S>) -> Self {
        Self {
            store,
            arrival_radius_m: ARRIVAL_RADIUS_METERS,
        }
    }

    pub fn from_config(store: &'a TrailStore<S>, config: &StoreConfig) -> Self {
        Self {
            store,
            arrival_radius_m: config.arrival_radius_m,
        }
    }

    /// Whether the position is within the arrival radius of a checkpoint.
    ///
    /// Fails when the position is out of range, the trail does not exist, the
    /// index is past the end of the trail's checkpoints, or the checkpoint has no
    /// coordinates.
    pub fn check(
        &self,
        trail_id: u64,
        checkpoint_index: usize,
        latitude: f64,
        longitude: f64,
    ) -> Result<ArrivalStatus, QueryError> {
        let position = GpsPoint::validated(latitude, longitude)?;

        let trail = self
            .store
            .get_by_id(trail_id)
            .ok_or(QueryError::TrailNotFound { trail_id })?;

        let checkpoints = &trail.trail.checkpoints;
        let checkpoint = checkpoints
            .get(checkpoint_index)
            .ok_or(QueryError::InvalidCheckpoint {
                trail_id,
                index: checkpoint_index,
                checkpoint_count: checkpoints.len(),
            })?;

        let target = checkpoint
            .position()
            .ok_or(QueryError::CheckpointCoordinatesMissing {
                trail_id,
                index: checkpoint_index,
            })?;

        let dist_km = distance_km(&position, &target);
        let reached = dist_km * 1000.0 < self.arrival_radius_m;

        debug!(
            "[StrideQuest] Trail {} checkpoint {}: {:.1}m away (reached: {})",
            trail_id,
            checkpoint_index,
            dist_km * 1000.0,
            reached
        );

        Ok(ArrivalStatus {
            reached,
            distance_km: round_to(dist_km, 3),
        })
    }
}
