//! Pipeline configuration
//!
//! All tunables are carried in an explicit value handed to each stage's
//! constructor, so several pipelines with different models or thresholds
//! can coexist in one process.

use crate::error::PipelineError;
use crate::schema::FeatureSchema;
use serde::{Deserialize, Serialize};

/// Window width every shipped model was trained with
pub const REFERENCE_WINDOW_SIZE: usize = 30;

/// Default deception threshold
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Default video frame rate
pub const DEFAULT_FPS: f64 = 30.0;

/// Default label attached to reconciled tables
pub const DEFAULT_LABEL: &str = "sample";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Frames per analysis window
    pub window_size: usize,
    /// Score above which a window is labelled deceptive
    pub threshold: f64,
    /// Frame rate used to convert frame indices into seconds
    pub fps: f64,
    /// Run ensemble members on a worker pool
    pub parallel_inference: bool,
    /// Label attached to the reconciled table
    pub label: String,
    /// Order rows within each chunk table by its `frame` column
    pub order_by_frame: bool,
    /// Canonical feature list
    pub schema: FeatureSchema,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            window_size: REFERENCE_WINDOW_SIZE,
            threshold: DEFAULT_THRESHOLD,
            fps: DEFAULT_FPS,
            parallel_inference: true,
            label: DEFAULT_LABEL.to_string(),
            order_by_frame: false,
            schema: FeatureSchema::reference(),
        }
    }
}

impl PipelineConfig {
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_fps(mut self, fps: f64) -> Self {
        self.fps = fps;
        self
    }

    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }

    pub fn with_parallel_inference(mut self, parallel: bool) -> Self {
        self.parallel_inference = parallel;
        self
    }

    /// Check that every value is within its domain
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.window_size == 0 {
            return Err(PipelineError::InvalidConfig(
                "window_size must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(PipelineError::InvalidConfig(format!(
                "threshold must be within [0, 1], got {}",
                self.threshold
            )));
        }
        if !self.fps.is_finite() || self.fps <= 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "fps must be positive, got {}",
                self.fps
            )));
        }
        if self.schema.is_empty() {
            return Err(PipelineError::InvalidConfig(
                "feature schema is empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Load configuration from JSON; absent fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, PipelineError> {
        let config: PipelineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, PipelineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.window_size, 30);
        assert_eq!(config.threshold, 0.5);
        assert_eq!(config.fps, 30.0);
        assert_eq!(config.schema.len(), 32);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(PipelineConfig::default().with_threshold(1.5).validate().is_err());
        assert!(PipelineConfig::default().with_threshold(-0.1).validate().is_err());
        assert!(PipelineConfig::default().with_fps(0.0).validate().is_err());
        assert!(PipelineConfig::default().with_fps(f64::NAN).validate().is_err());
        assert!(PipelineConfig::default().with_window_size(0).validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = PipelineConfig::from_json(r#"{"threshold": 0.7, "fps": 25.0}"#).unwrap();
        assert_eq!(config.threshold, 0.7);
        assert_eq!(config.fps, 25.0);
        assert_eq!(config.window_size, REFERENCE_WINDOW_SIZE);
        assert!(config.parallel_inference);
    }

    #[test]
    fn test_json_rejects_invalid() {
        assert!(PipelineConfig::from_json(r#"{"threshold": 2.0}"#).is_err());
        assert!(PipelineConfig::from_json("not json").is_err());
    }

    #[test]
    fn test_json_roundtrip_preserves_schema() {
        let config = PipelineConfig::default().with_threshold(0.6);
        let restored = PipelineConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(restored, config);
    }
}
