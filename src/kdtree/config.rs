//! Build configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::Result;

/// Configuration for `PartitionBuilder`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Build the two halves of large regions on separate rayon tasks.
    pub parallel: bool,
    /// Minimum voxel count of a region before its halves are forked.
    pub parallel_min_voxels: usize,
    /// Check the finished index with `SpatialIndex::validate`.
    pub validate: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            parallel_min_voxels: 4096,
            validate: false,
        }
    }
}

impl BuildConfig {
    /// Single-threaded build, identical output to the parallel one.
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            ..Default::default()
        }
    }

    /// Load from a JSON file; missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: BuildConfig = serde_json::from_str(r#"{ "validate": true }"#).unwrap();
        assert!(config.validate);
        assert!(config.parallel);
        assert_eq!(config.parallel_min_voxels, 4096);
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "parallel": false, "parallel_min_voxels": 16 }}"#).unwrap();
        let config = BuildConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config, BuildConfig { parallel: false, parallel_min_voxels: 16, validate: false });
    }

    #[test]
    fn test_from_json_file_rejects_garbage() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            BuildConfig::from_json_file(file.path()),
            Err(crate::core::Error::Json(_))
        ));
    }
}
