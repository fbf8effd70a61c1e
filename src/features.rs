//! Keypoint-based image similarity.
//!
//! Photos are compared by detecting FAST-9 corners, describing each corner with a
//! 256-bit BRIEF descriptor and counting mutual nearest-neighbour matches under
//! Hamming distance. The score is the fraction of strong matches relative to the
//! larger keypoint set.
//!
//! This is a heuristic: a high score means the two images share many local
//! structures, not that they show the same scene.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage};
use serde::{Deserialize, Serialize};

/// Offsets of the 16-pixel Bresenham circle of radius 3, clockwise from the top.
const CIRCLE: [(i32, i32); 16] = [
    (0, -3),
    (1, -3),
    (2, -2),
    (3, -1),
    (3, 0),
    (3, 1),
    (2, 2),
    (1, 3),
    (0, 3),
    (-1, 3),
    (-2, 2),
    (-3, 1),
    (-3, 0),
    (-3, -1),
    (-2, -2),
    (-1, -3),
];

/// Contiguous circle pixels needed for a FAST-9 corner.
const ARC_LENGTH: usize = 9;

/// Half-size of the square patch sampled by a descriptor.
const PATCH_RADIUS: i32 = 15;

/// Keypoints closer than this to the image edge are discarded.
const BORDER: u32 = PATCH_RADIUS as u32 + 1;

const DESCRIPTOR_BITS: usize = 256;

const PATTERN_SEED: u64 = 0x9E37_79B9_7F4A_7C15;

const SMOOTHING_SIGMA: f32 = 2.0;

/// A 256-bit binary descriptor.
pub type Descriptor = [u64; 4];

/// Tuning for keypoint detection and matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Intensity difference for a circle pixel to count as brighter/darker.
    /// Default: 20
    pub fast_threshold: u8,

    /// Strongest keypoints kept per image.
    /// Default: 500
    pub max_keypoints: usize,

    /// Hamming distance below which a mutual match counts as strong.
    /// Default: 50 (of 256 bits)
    pub match_distance: u32,

    /// Images are downscaled so their larger side is at most this many pixels.
    /// Default: 640
    pub max_dimension: u32,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            fast_threshold: 20,
            max_keypoints: 500,
            match_distance: 50,
            max_dimension: 640,
        }
    }
}

/// A detected corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Keypoint {
    pub x: u32,
    pub y: u32,
    pub score: u32,
}

/// Strategy for comparing an uploaded photo with a reference image.
pub trait SimilarityScorer: Send + Sync {
    /// Similarity in [0, 1]; higher is more similar.
    fn similarity(&self, upload: &DynamicImage, reference: &DynamicImage) -> f64;
}

/// FAST corners + BRIEF descriptors + cross-checked Hamming matching.
#[derive(Debug, Clone, Default)]
pub struct BriefScorer {
    config: FeatureConfig,
}

impl BriefScorer {
    pub fn new(config: FeatureConfig) -> Self {
        Self { config }
    }

    /// Keypoints and descriptors of an image, after downscaling.
    pub fn extract(&self, image: &DynamicImage) -> (Vec<Keypoint>, Vec<Descriptor>) {
        let gray = prepare(image, self.config.max_dimension);
        let keypoints = detect_corners(&gray, self.config.fast_threshold, self.config.max_keypoints);
        let descriptors = describe(&gray, &keypoints);
        (keypoints, descriptors)
    }
}

impl SimilarityScorer for BriefScorer {
    fn similarity(&self, upload: &DynamicImage, reference: &DynamicImage) -> f64 {
        let (_, upload_desc) = self.extract(upload);
        let (_, reference_desc) = self.extract(reference);

        let larger = upload_desc.len().max(reference_desc.len());
        if upload_desc.is_empty() || reference_desc.is_empty() {
            return 0.0;
        }

        let matches = count_strong_matches(&upload_desc, &reference_desc, self.config.match_distance);
        log::debug!(
            "[StrideQuest] {} strong matches between {} and {} keypoints",
            matches,
            upload_desc.len(),
            reference_desc.len()
        );

        (matches as f64 / larger as f64).clamp(0.0, 1.0)
    }
}

/// Grayscale copy of `image` whose larger side is at most `max_dimension`.
pub fn prepare(image: &DynamicImage, max_dimension: u32) -> GrayImage {
    let gray = image.to_luma8();
    let (width, height) = gray.dimensions();
    let larger = width.max(height);

    if max_dimension == 0 || larger <= max_dimension {
        return gray;
    }

    let scale = max_dimension as f64 / larger as f64;
    let new_width = ((width as f64 * scale).round() as u32).max(1);
    let new_height = ((height as f64 * scale).round() as u32).max(1);
    imageops::resize(&gray, new_width, new_height, FilterType::Triangle)
}

// ============================================================================
// Detection
// ============================================================================

/// FAST-9 corners with 3×3 non-maximum suppression, strongest first.
///
/// Corners within the descriptor border are ignored.
pub fn detect_corners(image: &GrayImage, threshold: u8, max_keypoints: usize) -> Vec<Keypoint> {
    let (width, height) = image.dimensions();
    if width <= 2 * BORDER || height <= 2 * BORDER {
        return Vec::new();
    }

    let mut scores = vec![0u32; (width * height) as usize];
    for y in BORDER..height - BORDER {
        for x in BORDER..width - BORDER {
            if let Some(score) = fast_score(image, x, y, threshold) {
                scores[(y * width + x) as usize] = score;
            }
        }
    }

    let mut keypoints = Vec::new();
    for y in BORDER..height - BORDER {
        for x in BORDER..width - BORDER {
            let idx = (y * width + x) as usize;
            let score = scores[idx];
            if score > 0 && is_local_maximum(&scores, width, x, y) {
                keypoints.push(Keypoint { x, y, score });
            }
        }
    }

    keypoints.sort_by(|a, b| b.score.cmp(&a.score));
    keypoints.truncate(max_keypoints);
    keypoints
}

/// Corner score of pixel (x, y), or `None` when it is not a FAST-9 corner.
fn fast_score(image: &GrayImage, x: u32, y: u32, threshold: u8) -> Option<u32> {
    let center = pixel(image, x as i32, y as i32) as i16;
    let t = threshold as i16;

    let mut classes = [0i8; 16];
    let mut score = 0u32;
    for (i, (dx, dy)) in CIRCLE.iter().enumerate() {
        let value = pixel(image, x as i32 + dx, y as i32 + dy) as i16;
        let diff = value - center;
        if diff > t {
            classes[i] = 1;
        } else if diff < -t {
            classes[i] = -1;
        }
        score += (diff.abs() - t).max(0) as u32;
    }

    let is_corner = [1i8, -1].iter().any(|&class| longest_circular_run(&classes, class) >= ARC_LENGTH);
    is_corner.then_some(score)
}

fn longest_circular_run(classes: &[i8; 16], class: i8) -> usize {
    let mut longest = 0;
    let mut run = 0;
    // Walk the circle twice so runs that wrap around are counted whole
    for i in 0..32 {
        if classes[i % 16] == class {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    longest.min(16)
}

/// Ties go to the pixel that comes first in row-major order.
fn is_local_maximum(scores: &[u32], width: u32, x: u32, y: u32) -> bool {
    let idx = (y * width + x) as usize;
    let score = scores[idx];

    for ny in y - 1..=y + 1 {
        for nx in x - 1..=x + 1 {
            let nidx = (ny * width + nx) as usize;
            if nidx == idx {
                continue;
            }
            let other = scores[nidx];
            if other > score || (other == score && nidx < idx) {
                return false;
            }
        }
    }
    true
}

// ============================================================================
// Description
// ============================================================================

/// BRIEF descriptors for `keypoints` over a smoothed copy of `image`.
///
/// Keypoints must lie at least the descriptor border away from the edges, as
/// returned by [`detect_corners`].
pub fn describe(image: &GrayImage, keypoints: &[Keypoint]) -> Vec<Descriptor> {
    let smoothed = imageops::blur(image, SMOOTHING_SIGMA);
    let pattern = sampling_pattern();

    keypoints
        .iter()
        .map(|kp| {
            let mut descriptor = [0u64; 4];
            for (bit, ((x1, y1), (x2, y2))) in pattern.iter().enumerate() {
                let a = pixel(&smoothed, kp.x as i32 + x1, kp.y as i32 + y1);
                let b = pixel(&smoothed, kp.x as i32 + x2, kp.y as i32 + y2);
                if a < b {
                    descriptor[bit / 64] |= 1 << (bit % 64);
                }
            }
            descriptor
        })
        .collect()
}

type SamplePair = ((i32, i32), (i32, i32));

/// Fixed pseudo-random test pairs inside the patch.
fn sampling_pattern() -> Vec<SamplePair> {
    let mut state = PATTERN_SEED;
    let span = (2 * PATCH_RADIUS + 1) as u64;
    let mut next = || {
        // xorshift64
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        (state % span) as i32 - PATCH_RADIUS
    };

    (0..DESCRIPTOR_BITS)
        .map(|_| ((next(), next()), (next(), next())))
        .collect()
}

#[inline]
fn pixel(image: &GrayImage, x: i32, y: i32) -> u8 {
    image.get_pixel(x as u32, y as u32).0[0]
}

// ============================================================================
// Matching
// ============================================================================

#[inline]
pub fn hamming_distance(a: &Descriptor, b: &Descriptor) -> u32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x ^ y).count_ones()).sum()
}

/// Index and distance of the closest descriptor, first one on ties.
fn nearest(query: &Descriptor, candidates: &[Descriptor]) -> Option<(usize, u32)> {
    let mut best: Option<(usize, u32)> = None;
    for (idx, candidate) in candidates.iter().enumerate() {
        let dist = hamming_distance(query, candidate);
        match best {
            Some((_, best_dist)) if dist >= best_dist => {}
            _ => best = Some((idx, dist)),
        }
    }
    best
}

/// Mutual nearest neighbours whose distance is below `max_distance`.
pub fn count_strong_matches(first: &[Descriptor], second: &[Descriptor], max_distance: u32) -> usize {
    let backward: Vec<Option<usize>> = second
        .iter()
        .map(|d| nearest(d, first).map(|(idx, _)| idx))
        .collect();

    first
        .iter()
        .enumerate()
        .filter(|(i, d)| match nearest(d, second) {
            Some((j, dist)) => dist < max_distance && backward[j] == Some(*i),
            None => false,
        })
        .count()
}
