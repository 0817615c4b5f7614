//! Ensemble members
//!
//! A member is an opaque binary classifier mapping every window of a batch
//! to a probability. Concrete members are resolved from model artifacts at
//! load time.

use crate::error::PipelineError;
use crate::types::WindowBatch;
use serde::{Deserialize, Serialize};

/// Capability every ensemble member provides.
///
/// `predict` returns one probability per window, in batch order.
pub trait EnsembleMember: Send + Sync {
    /// Stable display name, used in logs and error reports
    fn name(&self) -> &str;

    fn predict(&self, batch: &WindowBatch) -> Result<Vec<f64>, PipelineError>;
}

/// How a logistic member reduces a window to its input vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pooling {
    /// Per-feature mean over the window's rows (padding included)
    Mean,
    /// Every cell of the window, row-major
    Flatten,
}

/// Serialized model artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    Logistic {
        pooling: Pooling,
        weights: Vec<f64>,
        bias: f64,
    },
    Constant {
        probability: f64,
    },
}

impl ModelArtifact {
    pub fn kind(&self) -> &'static str {
        match self {
            ModelArtifact::Logistic { .. } => "logistic",
            ModelArtifact::Constant { .. } => "constant",
        }
    }

    /// Instantiate the artifact for windows of the given shape
    pub fn into_member(
        self,
        name: impl Into<String>,
        window_size: usize,
        feature_count: usize,
    ) -> Result<Box<dyn EnsembleMember>, PipelineError> {
        let name = name.into();
        match self {
            ModelArtifact::Logistic {
                pooling,
                weights,
                bias,
            } => Ok(Box::new(LogisticMember::new(
                name,
                pooling,
                weights,
                bias,
                window_size,
                feature_count,
            )?)),
            ModelArtifact::Constant { probability } => {
                Ok(Box::new(ConstantMember::new(name, probability)?))
            }
        }
    }
}

/// Logistic regression over a pooled window
#[derive(Debug, Clone)]
pub struct LogisticMember {
    name: String,
    pooling: Pooling,
    weights: Vec<f64>,
    bias: f64,
}

impl LogisticMember {
    pub fn new(
        name: impl Into<String>,
        pooling: Pooling,
        weights: Vec<f64>,
        bias: f64,
        window_size: usize,
        feature_count: usize,
    ) -> Result<Self, PipelineError> {
        let name = name.into();
        let expected = match pooling {
            Pooling::Mean => feature_count,
            Pooling::Flatten => window_size * feature_count,
        };
        if weights.len() != expected {
            return Err(PipelineError::ModelLoad {
                path: name,
                reason: format!(
                    "{:?} pooling expects {} weights, artifact has {}",
                    pooling,
                    expected,
                    weights.len()
                ),
            });
        }
        if !bias.is_finite() || weights.iter().any(|w| !w.is_finite()) {
            return Err(PipelineError::ModelLoad {
                path: name,
                reason: "non-finite parameters".to_string(),
            });
        }

        Ok(Self {
            name,
            pooling,
            weights,
            bias,
        })
    }

    fn logit(&self, batch: &WindowBatch, window: usize) -> f64 {
        let values = &batch.windows[window].values;
        match self.pooling {
            Pooling::Mean => {
                let rows = batch.window_size as f64;
                self.weights
                    .iter()
                    .enumerate()
                    .map(|(f, w)| {
                        let sum: f64 = (0..batch.window_size)
                            .map(|r| values[r * batch.feature_count + f] as f64)
                            .sum();
                        w * sum / rows
                    })
                    .sum::<f64>()
                    + self.bias
            }
            Pooling::Flatten => {
                self.weights
                    .iter()
                    .zip(values)
                    .map(|(w, v)| w * *v as f64)
                    .sum::<f64>()
                    + self.bias
            }
        }
    }
}

impl EnsembleMember for LogisticMember {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict(&self, batch: &WindowBatch) -> Result<Vec<f64>, PipelineError> {
        let expected = match self.pooling {
            Pooling::Mean => batch.feature_count,
            Pooling::Flatten => batch.window_size * batch.feature_count,
        };
        if expected != self.weights.len() {
            return Err(PipelineError::Inference {
                member: self.name.clone(),
                reason: format!(
                    "window shape {}x{} does not match {} weights",
                    batch.window_size,
                    batch.feature_count,
                    self.weights.len()
                ),
            });
        }

        Ok((0..batch.len())
            .map(|w| sigmoid(self.logit(batch, w)))
            .collect())
    }
}

/// Member that returns the same probability for every window
#[derive(Debug, Clone)]
pub struct ConstantMember {
    name: String,
    probability: f64,
}

impl ConstantMember {
    pub fn new(name: impl Into<String>, probability: f64) -> Result<Self, PipelineError> {
        let name = name.into();
        if !(0.0..=1.0).contains(&probability) {
            return Err(PipelineError::ModelLoad {
                path: name,
                reason: format!("probability {} outside [0, 1]", probability),
            });
        }
        Ok(Self { name, probability })
    }
}

impl EnsembleMember for ConstantMember {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict(&self, batch: &WindowBatch) -> Result<Vec<f64>, PipelineError> {
        Ok(vec![self.probability; batch.len()])
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Window;

    fn batch(windows: Vec<Vec<f32>>, window_size: usize, feature_count: usize) -> WindowBatch {
        WindowBatch {
            window_size,
            feature_count,
            total_frames: windows.len() * window_size,
            windows: windows
                .into_iter()
                .enumerate()
                .map(|(index, values)| Window {
                    index,
                    start_frame: index * window_size,
                    end_frame: (index + 1) * window_size,
                    representative_frame: index * window_size + window_size / 2,
                    values,
                })
                .collect(),
        }
    }

    #[test]
    fn test_sigmoid() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-12);
        assert!(sigmoid(20.0) > 0.999);
        assert!(sigmoid(-20.0) < 0.001);
    }

    #[test]
    fn test_logistic_mean_pooling() {
        // 2 rows x 2 features; means are [2, 0]
        let member = LogisticMember::new("m", Pooling::Mean, vec![1.0, 5.0], -2.0, 2, 2).unwrap();
        let b = batch(vec![vec![1.0, 0.0, 3.0, 0.0]], 2, 2);

        let probs = member.predict(&b).unwrap();
        assert_eq!(probs.len(), 1);
        assert!((probs[0] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_logistic_flatten_pooling() {
        let member =
            LogisticMember::new("m", Pooling::Flatten, vec![1.0, 0.0, 0.0, 1.0], 0.0, 2, 2)
                .unwrap();
        let b = batch(vec![vec![0.0; 4], vec![3.0, 9.0, 9.0, 3.0]], 2, 2);

        let probs = member.predict(&b).unwrap();
        assert!((probs[0] - 0.5).abs() < 1e-9);
        assert!((probs[1] - sigmoid(6.0)).abs() < 1e-9);
    }

    #[test]
    fn test_logistic_weight_count_checked() {
        let result = LogisticMember::new("m", Pooling::Mean, vec![1.0], 0.0, 30, 32);
        assert!(matches!(result, Err(PipelineError::ModelLoad { .. })));
    }

    #[test]
    fn test_logistic_shape_mismatch_at_inference() {
        let member = LogisticMember::new("m", Pooling::Mean, vec![1.0, 1.0], 0.0, 2, 2).unwrap();
        let b = batch(vec![vec![0.0; 6]], 2, 3);
        assert!(matches!(
            member.predict(&b),
            Err(PipelineError::Inference { .. })
        ));
    }

    #[test]
    fn test_constant_member() {
        let member = ConstantMember::new("c", 0.8).unwrap();
        let b = batch(vec![vec![0.0; 2], vec![1.0; 2]], 1, 2);
        assert_eq!(member.predict(&b).unwrap(), vec![0.8, 0.8]);
        assert!(ConstantMember::new("bad", 1.2).is_err());
    }

    #[test]
    fn test_artifact_json_tagging() {
        let artifact: ModelArtifact = serde_json::from_str(
            r#"{"kind": "logistic", "pooling": "mean", "weights": [0.5, -0.5], "bias": 0.1}"#,
        )
        .unwrap();
        assert_eq!(artifact.kind(), "logistic");

        let member = artifact.into_member("m0", 30, 2).unwrap();
        assert_eq!(member.name(), "m0");

        let constant: ModelArtifact =
            serde_json::from_str(r#"{"kind": "constant", "probability": 0.3}"#).unwrap();
        assert_eq!(
            constant,
            ModelArtifact::Constant { probability: 0.3 }
        );
    }
}
