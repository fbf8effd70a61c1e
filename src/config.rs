//! Service configuration.
//!
//! Every field has a default, so a config file only needs the values it changes:
//!
//! ```json
//! {
//!   "store": { "trails_path": "data/sample_trails.json", "default_radius_km": 50.0 },
//!   "photo": { "acceptance_threshold": 0.6 }
//! }
//! ```

use crate::error::{DataError, Result};
use crate::photo::PhotoConfig;
use crate::store::StoreConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub photo: PhotoConfig,
}

impl Config {
    /// Read a JSON config file. Missing sections and fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| DataError::io(path, e))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Point every data path at `data_dir`, keeping the file names.
    pub fn with_data_dir(mut self, data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref();
        self.store.trails_path = data_dir.join("sample_trails.json");
        self.store.track_dir = data_dir.join("gpx");
        self.photo.reference_dir = data_dir.join("references");
        self
    }
}
