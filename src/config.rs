//! Configuration management for the detection pipeline

use crate::constants::DEFAULT_BBOX_EXPANSION;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Library configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Face detector configuration
    pub detector: DetectorConfig,
}

/// Face detector parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Path to the face detection ONNX model
    pub model: PathBuf,

    /// Confidence threshold for face detection (0.0-1.0)
    pub confidence_threshold: f32,

    /// IOU threshold for non-maximum suppression (0.0-1.0)
    pub iou_threshold: f32,

    /// Maximum number of faces to keep per image
    pub max_faces: usize,

    /// Face region expansion factor applied before landmark cropping
    pub bbox_expansion: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            detector: DetectorConfig::default(),
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model: PathBuf::from("assets/face_detector.onnx"),
            confidence_threshold: 0.6,
            iou_threshold: 0.5,
            max_faces: 10,
            bbox_expansion: DEFAULT_BBOX_EXPANSION,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration values and the detector model path
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid setting found
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.detector.confidence_threshold) {
            return Err(Error::ConfigError(
                "Confidence threshold must be between 0.0 and 1.0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.detector.iou_threshold) {
            return Err(Error::ConfigError(
                "IOU threshold must be between 0.0 and 1.0".to_string(),
            ));
        }
        if self.detector.max_faces == 0 {
            return Err(Error::ConfigError("Max faces must be greater than 0".to_string()));
        }
        if self.detector.bbox_expansion < 0.0 {
            return Err(Error::ConfigError(
                "Bounding box expansion must not be negative".to_string(),
            ));
        }
        if !self.detector.model.exists() {
            return Err(Error::ConfigError(format!(
                "Face detector model not found: {}",
                self.detector.model.display()
            )));
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Face detection configuration

detector:
  model: "assets/face_detector.onnx"
  confidence_threshold: 0.6
  iou_threshold: 0.5
  max_faces: 10
  bbox_expansion: 0.2
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_config_parses() {
        let config: Config = serde_yaml::from_str(EXAMPLE_CONFIG).unwrap();
        assert_eq!(config.detector.max_faces, 10);
        assert_eq!(config.detector.confidence_threshold, 0.6);
    }

    #[test]
    fn test_validate_rejects_bad_thresholds() {
        let mut config = Config::default();
        config.detector.confidence_threshold = 1.5;
        assert!(matches!(config.validate(), Err(Error::ConfigError(_))));

        let mut config = Config::default();
        config.detector.iou_threshold = -0.1;
        assert!(matches!(config.validate(), Err(Error::ConfigError(_))));

        let mut config = Config::default();
        config.detector.max_faces = 0;
        assert!(matches!(config.validate(), Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_validate_reports_missing_model() {
        let mut config = Config::default();
        config.detector.model = PathBuf::from("definitely/not/here.onnx");

        match config.validate() {
            Err(Error::ConfigError(msg)) => assert!(msg.contains("not found")),
            other => panic!("Expected ConfigError, got {other:?}"),
        }
    }
}
