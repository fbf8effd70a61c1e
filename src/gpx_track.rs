//! GPX track file parsing.
//!
//! A trail's recorded path comes from a GPX file. Every segment of every track in
//! the file is flattened, in file order, into a single polyline of [`TrackPoint`]s.
//! Waypoints, routes, timestamps and elevation are ignored.

use crate::error::{DataError, Result};
use crate::geo_utils::polyline_length;
use crate::report::{default_reporter, DataIssue, Reporter};
use crate::TrackPoint;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Read every track point from GPX data, in track, segment, point order.
///
/// Strict: malformed input is an error. See [`GpxTrackParser::parse`] for the
/// lenient variant used by the trail store.
pub fn read_track_points<R: Read>(reader: R) -> Result<Vec<TrackPoint>> {
    let gpx = ::gpx::read(reader)?;

    let points = gpx
        .tracks
        .iter()
        .flat_map(|track| track.segments.iter())
        .flat_map(|segment| segment.points.iter())
        .map(|waypoint| {
            let point = waypoint.point();
            TrackPoint::new(point.y(), point.x())
        })
        .collect();

    Ok(points)
}

/// Resolves track references against a directory and parses them leniently.
#[derive(Clone)]
pub struct GpxTrackParser {
    track_dir: PathBuf,
    reporter: Arc<dyn Reporter>,
}

impl GpxTrackParser {
    pub fn new(track_dir: impl Into<PathBuf>) -> Self {
        Self::with_reporter(track_dir, default_reporter())
    }

    pub fn with_reporter(track_dir: impl Into<PathBuf>, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            track_dir: track_dir.into(),
            reporter,
        }
    }

    /// Location of a track reference inside the track directory.
    ///
    /// Only plain relative paths are accepted; absolute paths and `..`
    /// components are rejected.
    pub fn resolve(&self, reference: &str) -> Result<PathBuf> {
        let relative = Path::new(reference);
        let is_plain = !reference.trim().is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));

        if !is_plain {
            return Err(DataError::UnsafeTrackReference(reference.to_string()));
        }
        Ok(self.track_dir.join(relative))
    }

    /// Parse the referenced track file into an ordered point sequence.
    ///
    /// Never fails: a missing file, an unusable reference or malformed GPX is
    /// reported and yields an empty sequence, which callers treat exactly like a
    /// track without points.
    pub fn parse(&self, reference: &str) -> Vec<TrackPoint> {
        let path = match self.resolve(reference) {
            Ok(path) => path,
            Err(_) => {
                self.reporter.report(DataIssue::UnsafeTrackReference {
                    reference: reference.to_string(),
                });
                return Vec::new();
            }
        };

        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.reporter.report(DataIssue::TrackMissing { path });
                return Vec::new();
            }
            Err(e) => {
                self.reporter.report(DataIssue::TrackMalformed {
                    path,
                    reason: e.to_string(),
                });
                return Vec::new();
            }
        };

        match read_track_points(BufReader::new(file)) {
            Ok(points) => {
                log::debug!(
                    "[StrideQuest] Parsed {} track points ({:.0}m) from {}",
                    points.len(),
                    polyline_length(&points),
                    path.display()
                );
                points
            }
            Err(e) => {
                self.reporter.report(DataIssue::TrackMalformed {
                    path,
                    reason: e.to_string(),
                });
                Vec::new()
            }
        }
    }
}

impl std::fmt::Debug for GpxTrackParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpxTrackParser")
            .field("track_dir", &self.track_dir)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::report::MemoryReporter;

    pub(crate) const THREE_POINT_GPX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">
  <trk>
    <name>Yarkon</name>
    <trkseg>
      <trkpt lat="32.1000" lon="34.8000"><ele>12</ele></trkpt>
      <trkpt lat="32.1010" lon="34.8010"><ele>13</ele></trkpt>
      <trkpt lat="32.1020" lon="34.8020"><ele>14</ele></trkpt>
    </trkseg>
  </trk>
</gpx>"#;

    fn parser_with_reporter(dir: &Path) -> (GpxTrackParser, Arc<MemoryReporter>) {
        let reporter = Arc::new(MemoryReporter::new());
        let parser = GpxTrackParser::with_reporter(dir, reporter.clone());
        (parser, reporter)
    }

    #[test]
    fn test_read_single_track() {
        let points = read_track_points(THREE_POINT_GPX.as_bytes()).unwrap();
        assert_eq!(points.len(), 3);
        assert!((points[1].latitude - 32.1010).abs() < 1e-9);
        assert!((points[1].longitude - 34.8010).abs() < 1e-9);
    }

    #[test]
    fn test_multi_track_multi_segment_flattened_in_file_order() {
        let gpx = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">
  <trk>
    <trkseg>
      <trkpt lat="1.0" lon="1.0"></trkpt>
      <trkpt lat="2.0" lon="2.0"></trkpt>
    </trkseg>
    <trkseg>
      <trkpt lat="3.0" lon="3.0"></trkpt>
    </trkseg>
  </trk>
  <trk>
    <trkseg>
      <trkpt lat="4.0" lon="4.0"></trkpt>
    </trkseg>
  </trk>
</gpx>"#;

        let points = read_track_points(gpx.as_bytes()).unwrap();
        let lats: Vec<f64> = points.iter().map(|p| p.latitude).collect();
        assert_eq!(lats, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_waypoints_and_routes_are_ignored() {
        let gpx = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">
  <wpt lat="10.0" lon="10.0"><name>Spring</name></wpt>
  <rte><rtept lat="11.0" lon="11.0"></rtept></rte>
</gpx>"#;

        let points = read_track_points(gpx.as_bytes()).unwrap();
        assert!(points.is_empty());
    }

    #[test]
    fn test_invalid_xml_is_an_error() {
        assert!(read_track_points(&b"not xml at all"[..]).is_err());
    }

    #[test]
    fn test_parse_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("yarkon.gpx"), THREE_POINT_GPX).unwrap();
        let (parser, reporter) = parser_with_reporter(dir.path());

        let points = parser.parse("yarkon.gpx");
        assert_eq!(points.len(), 3);
        assert!(reporter.issues().is_empty());

        // Same file, same sequence
        assert_eq!(parser.parse("yarkon.gpx"), points);
    }

    #[test]
    fn test_missing_file_is_empty_with_warning() {
        let dir = tempfile::tempdir().unwrap();
        let (parser, reporter) = parser_with_reporter(dir.path());

        assert!(parser.parse("absent.gpx").is_empty());
        let issues = reporter.issues();
        assert_eq!(issues.len(), 1);
        assert!(matches!(issues[0], DataIssue::TrackMissing { .. }));
    }

    #[test]
    fn test_malformed_file_is_empty_with_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.gpx"), "<gpx><trk>").unwrap();
        let (parser, reporter) = parser_with_reporter(dir.path());

        assert!(parser.parse("broken.gpx").is_empty());
        assert!(matches!(
            reporter.issues()[0],
            DataIssue::TrackMalformed { .. }
        ));
    }

    #[test]
    fn test_references_outside_track_dir_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (parser, reporter) = parser_with_reporter(dir.path());

        assert!(parser.resolve("../secret.gpx").is_err());
        assert!(parser.resolve("/etc/passwd").is_err());
        assert!(parser.resolve("").is_err());
        assert!(parser.resolve("nested/track.gpx").is_ok());

        assert!(parser.parse("../secret.gpx").is_empty());
        assert!(matches!(
            reporter.issues()[0],
            DataIssue::UnsafeTrackReference { .. }
        ));
    }
}
