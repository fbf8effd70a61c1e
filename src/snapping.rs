//! Checkpoint snapping.
//!
//! Hand-authored checkpoint coordinates are approximate. Snapping moves each
//! checkpoint onto the closest point of the recorded track, so arrival checks and
//! map markers line up with the path people actually walk.
//!
//! Each checkpoint is an independent nearest-neighbour search over the track,
//! O(checkpoints × track points). Track files are small enough that no spatial
//! index is needed.

use crate::geo_utils::distance_meters;
use crate::{Checkpoint, GpsPoint, TrackPoint};

/// Index and distance (meters) of the track point closest to `target`.
///
/// Ties resolve to the earliest point in track order. Returns `None` for an
/// empty track.
pub fn nearest_track_point(target: &GpsPoint, track: &[TrackPoint]) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;

    for (idx, point) in track.iter().enumerate() {
        let dist = distance_meters(target, point);
        match best {
            // Strict comparison keeps the first occurrence on ties
            Some((_, best_dist)) if dist >= best_dist => {}
            _ => best = Some((idx, dist)),
        }
    }

    best
}

/// Snap checkpoints onto a track.
///
/// Returns a new sequence of the same length and order. Checkpoints without
/// coordinates are passed through unchanged, as is everything when either input
/// is empty. The input slice is never modified.
///
/// # Example
/// ```
/// use stride_quest::{snap_checkpoints, Checkpoint, GpsPoint};
///
/// let track = vec![
///     GpsPoint::new(32.1000, 34.8000),
///     GpsPoint::new(32.1010, 34.8010),
/// ];
/// let checkpoints = vec![Checkpoint::at(32.1011, 34.8012)];
///
/// let snapped = snap_checkpoints(&checkpoints, &track);
/// assert_eq!(snapped[0].position(), Some(track[1]));
/// ```
pub fn snap_checkpoints(checkpoints: &[Checkpoint], track: &[TrackPoint]) -> Vec<Checkpoint> {
    if checkpoints.is_empty() || track.is_empty() {
        return checkpoints.to_vec();
    }

    checkpoints
        .iter()
        .map(|checkpoint| {
            let nearest = checkpoint
                .position()
                .and_then(|position| nearest_track_point(&position, track));

            match nearest {
                Some((idx, _)) => checkpoint.moved_to(&track[idx]),
                None => checkpoint.clone(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_track() -> Vec<TrackPoint> {
        vec![
            GpsPoint::new(32.1000, 34.8000),
            GpsPoint::new(32.1010, 34.8010),
            GpsPoint::new(32.1020, 34.8020),
        ]
    }

    #[test]
    fn test_nearest_track_point() {
        let track = sample_track();
        let (idx, dist) = nearest_track_point(&GpsPoint::new(32.1019, 34.8021), &track).unwrap();
        assert_eq!(idx, 2);
        assert!(dist < 20.0);

        assert!(nearest_track_point(&GpsPoint::new(0.0, 0.0), &[]).is_none());
    }

    #[test]
    fn test_ties_resolve_to_first_occurrence() {
        // Loop track: same location recorded at the start and the end
        let track = vec![
            GpsPoint::new(32.1000, 34.8000),
            GpsPoint::new(32.1050, 34.8050),
            GpsPoint::new(32.1000, 34.8000),
        ];
        let (idx, dist) = nearest_track_point(&GpsPoint::new(32.1000, 34.8000), &track).unwrap();
        assert_eq!(idx, 0);
        assert_eq!(dist, 0.0);
    }

    #[test]
    fn test_checkpoint_near_second_point_snaps_exactly() {
        let track = sample_track();
        let checkpoints = vec![Checkpoint::at(32.10105, 34.80098)];

        let snapped = snap_checkpoints(&checkpoints, &track);
        assert_eq!(snapped.len(), 1);
        assert_eq!(snapped[0].lat, Some(32.1010));
        assert_eq!(snapped[0].lon, Some(34.8010));
    }

    #[test]
    fn test_snapping_is_idempotent() {
        let track = sample_track();
        let checkpoints = vec![
            Checkpoint::at(32.0990, 34.7990),
            Checkpoint::at(32.1016, 34.8014),
            Checkpoint::at(32.2000, 34.9000),
        ];

        let once = snap_checkpoints(&checkpoints, &track);
        let twice = snap_checkpoints(&once, &track);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_empty_track_leaves_checkpoints_unchanged() {
        let checkpoints = vec![Checkpoint::at(1.0, 2.0), Checkpoint::default()];
        assert_eq!(snap_checkpoints(&checkpoints, &[]), checkpoints);
        assert!(snap_checkpoints(&[], &sample_track()).is_empty());
    }

    #[test]
    fn test_checkpoints_without_coordinates_pass_through() {
        let track = sample_track();
        let unmapped: Checkpoint = serde_json::from_value(json!({"title": "Spring", "lat": 32.1})).unwrap();
        let checkpoints = vec![unmapped.clone(), Checkpoint::at(32.1001, 34.8001)];

        let snapped = snap_checkpoints(&checkpoints, &track);
        assert_eq!(snapped[0], unmapped);
        assert_eq!(snapped[1].position(), Some(track[0]));
    }

    #[test]
    fn test_out_of_range_checkpoints_are_not_snapped() {
        let track = sample_track();
        let checkpoints = vec![Checkpoint::at(200.0, 34.8)];

        let snapped = snap_checkpoints(&checkpoints, &track);
        assert_eq!(snapped, checkpoints);
    }

    #[test]
    fn test_payload_preserved_and_input_untouched() {
        let track = sample_track();
        let checkpoint: Checkpoint = serde_json::from_value(json!({
            "lat": 32.1021, "lon": 34.8019,
            "title": "Mill", "quiz": {"question": "Built when?", "answer": "1880"}
        }))
        .unwrap();
        let checkpoints = vec![checkpoint.clone()];

        let snapped = snap_checkpoints(&checkpoints, &track);
        assert_eq!(snapped[0].title(), Some("Mill"));
        assert_eq!(snapped[0].extra["quiz"]["answer"], "1880");
        assert_eq!(snapped[0].position(), Some(track[2]));
        assert_eq!(checkpoints[0], checkpoint);
    }
}
