//! Photo challenge validation.
//!
//! Two independent checks decide whether an uploaded photo completes a
//! checkpoint's challenge:
//!
//! - a naming convention: the photo's file name must contain the keyword
//!   ([`filename_matches`]);
//! - a visual one: a keypoint similarity score against the keyword's reference
//!   image ([`SimilarityScorer`]).
//!
//! A photo is accepted only when the name matches and the score reaches the
//! acceptance threshold. The two checks can disagree; neither overrides the other.

use crate::error::{DataError, Result};
use crate::features::{BriefScorer, FeatureConfig, SimilarityScorer};
use crate::report::{default_reporter, DataIssue, Reporter};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Configuration for photo validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhotoConfig {
    /// Directory holding the reference images.
    /// Default: data/references
    pub reference_dir: PathBuf,

    /// Challenge keyword -> reference image file name.
    /// Default: {"springs": "yarkon.jpg"}
    pub references: BTreeMap<String, String>,

    /// Minimum similarity score for a photo to be accepted.
    /// Default: 0.5
    pub acceptance_threshold: f64,

    /// Largest accepted upload body for the photo challenge route.
    /// Default: 25 MiB
    pub max_upload_bytes: usize,

    /// Keypoint detection and matching parameters.
    pub features: FeatureConfig,
}

impl Default for PhotoConfig {
    fn default() -> Self {
        let mut references = BTreeMap::new();
        references.insert("springs".to_string(), "yarkon.jpg".to_string());

        Self {
            reference_dir: PathBuf::from("data/references"),
            references,
            acceptance_threshold: 0.5,
            max_upload_bytes: 25 * 1024 * 1024,
            features: FeatureConfig::default(),
        }
    }
}

/// Result of validating a photo against a challenge keyword.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhotoVerdict {
    /// Combined decision: name matches and the score reaches the threshold.
    pub valid: bool,
    /// The file name contains the keyword.
    pub filename_match: bool,
    /// Similarity to the keyword's reference image; absent without a reference.
    pub score: Option<f64>,
}

impl PhotoVerdict {
    fn rejected() -> Self {
        Self {
            valid: false,
            filename_match: false,
            score: None,
        }
    }
}

/// Case-insensitive check that `file_name` contains `keyword`.
///
/// Surrounding whitespace is ignored on both sides; an empty keyword never
/// matches.
///
/// ```
/// use stride_quest::filename_matches;
/// assert!(filename_matches("Yarkon_Springs.JPG", " springs "));
/// assert!(!filename_matches("yarkon_photo.jpg", "springs"));
/// ```
pub fn filename_matches(file_name: &str, keyword: &str) -> bool {
    let keyword = normalize_keyword(keyword);
    !keyword.is_empty() && file_name.trim().to_lowercase().contains(&keyword)
}

fn normalize_keyword(keyword: &str) -> String {
    keyword.trim().to_lowercase()
}

/// Validates challenge photos.
pub struct PhotoValidator {
    config: PhotoConfig,
    scorer: Box<dyn SimilarityScorer>,
    reporter: Arc<dyn Reporter>,
}

impl PhotoValidator {
    pub fn new(config: PhotoConfig) -> Self {
        Self::with_reporter(config, default_reporter())
    }

    pub fn with_reporter(config: PhotoConfig, reporter: Arc<dyn Reporter>) -> Self {
        let scorer = Box::new(BriefScorer::new(config.features.clone()));
        Self {
            config,
            scorer,
            reporter,
        }
    }

    /// Replace the similarity strategy.
    pub fn with_scorer(mut self, scorer: Box<dyn SimilarityScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn config(&self) -> &PhotoConfig {
        &self.config
    }

    /// Name check for a photo on disk.
    ///
    /// False when the file is missing or not a decodable image; otherwise true
    /// iff its file name contains the keyword.
    pub fn validate(&self, image_path: &Path, keyword: &str) -> bool {
        if open_image(image_path).is_err() {
            return false;
        }
        filename_matches(&file_name_of(image_path), keyword)
    }

    /// Similarity between a photo on disk and the keyword's reference image.
    ///
    /// `None` when the keyword has no configured reference, the reference image
    /// is unavailable, or the photo cannot be decoded.
    pub fn score(&self, image_path: &Path, keyword: &str) -> Option<f64> {
        let reference = self.reference_image(keyword)?;
        let upload = open_image(image_path).ok()?;
        Some(self.scorer.similarity(&upload, &reference))
    }

    /// Both checks and the combined decision for a photo on disk.
    pub fn assess(&self, image_path: &Path, keyword: &str) -> PhotoVerdict {
        match open_image(image_path) {
            Ok(image) => self.assess_image(&file_name_of(image_path), &image, keyword),
            Err(e) => {
                log::debug!("[StrideQuest] Rejecting {}: {}", image_path.display(), e);
                PhotoVerdict::rejected()
            }
        }
    }

    /// Both checks and the combined decision for uploaded bytes.
    ///
    /// Bytes that are not a decodable image are rejected, not an error.
    pub fn assess_upload(&self, file_name: &str, bytes: &[u8], keyword: &str) -> PhotoVerdict {
        match image::load_from_memory(bytes) {
            Ok(image) => self.assess_image(file_name, &image, keyword),
            Err(e) => {
                log::debug!("[StrideQuest] Rejecting upload {}: {}", file_name, e);
                PhotoVerdict::rejected()
            }
        }
    }

    fn assess_image(&self, file_name: &str, image: &DynamicImage, keyword: &str) -> PhotoVerdict {
        let filename_match = filename_matches(file_name, keyword);
        let score = self
            .reference_image(keyword)
            .map(|reference| self.scorer.similarity(image, &reference));

        let valid = self.is_accepted(filename_match, score);
        log::info!(
            "[StrideQuest] Photo '{}' for '{}': name match {}, score {:?}, accepted {}",
            file_name,
            keyword,
            filename_match,
            score,
            valid
        );

        PhotoVerdict {
            valid,
            filename_match,
            score,
        }
    }

    /// Combined acceptance policy.
    pub fn is_accepted(&self, filename_match: bool, score: Option<f64>) -> bool {
        filename_match && score.is_some_and(|s| s >= self.config.acceptance_threshold)
    }

    /// Path of the keyword's reference image, if one is configured.
    pub fn reference_path(&self, keyword: &str) -> Option<PathBuf> {
        self.config
            .references
            .get(&normalize_keyword(keyword))
            .map(|file| self.config.reference_dir.join(file))
    }

    fn reference_image(&self, keyword: &str) -> Option<DynamicImage> {
        let path = self.reference_path(keyword)?;
        match open_image(&path) {
            Ok(image) => Some(image),
            Err(_) => {
                self.reporter.report(DataIssue::ReferenceImageUnavailable {
                    keyword: keyword.to_string(),
                    path,
                });
                None
            }
        }
    }
}

impl std::fmt::Debug for PhotoValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhotoValidator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn open_image(path: &Path) -> Result<DynamicImage> {
    let reader = image::ImageReader::open(path).map_err(|e| DataError::io(path, e))?;
    let reader = reader.with_guessed_format().map_err(|e| DataError::io(path, e))?;
    Ok(reader.decode()?)
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
