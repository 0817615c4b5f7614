//! Ensemble scoring
//!
//! Runs every member over the whole window batch, collects a window x member
//! probability matrix, and reduces each row to a score, label and confidence.
//!
//! A failing member fails the whole call. There is no partial-ensemble
//! fallback.

use crate::config::{PipelineConfig, DEFAULT_THRESHOLD};
use crate::ensemble::member::EnsembleMember;
use crate::error::PipelineError;
use crate::types::{WindowBatch, WindowScore};
use rayon::prelude::*;
use std::sync::Arc;

/// Tolerance for member outputs that overshoot [0, 1] by rounding
const PROBABILITY_EPSILON: f64 = 1e-9;

/// Row-major `windows x members` probability matrix
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityMatrix {
    windows: usize,
    members: usize,
    values: Vec<f64>,
}

impl ProbabilityMatrix {
    /// Build from per-member columns, each ordered by window index
    fn from_columns(windows: usize, columns: &[Vec<f64>]) -> Self {
        let members = columns.len();
        let mut values = vec![0.0; windows * members];
        for (m, column) in columns.iter().enumerate() {
            for (w, p) in column.iter().enumerate() {
                values[w * members + m] = *p;
            }
        }
        Self {
            windows,
            members,
            values,
        }
    }

    pub fn windows(&self) -> usize {
        self.windows
    }

    pub fn members(&self) -> usize {
        self.members
    }

    pub fn get(&self, window: usize, member: usize) -> f64 {
        self.values[window * self.members + member]
    }

    /// Member probabilities for one window
    pub fn row(&self, window: usize) -> &[f64] {
        &self.values[window * self.members..(window + 1) * self.members]
    }
}

/// Scorer that aggregates N equally weighted members
#[derive(Clone)]
pub struct EnsembleScorer {
    members: Vec<Arc<dyn EnsembleMember>>,
    threshold: f64,
    parallel: bool,
}

impl std::fmt::Debug for EnsembleScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnsembleScorer")
            .field("members", &self.member_names())
            .field("threshold", &self.threshold)
            .field("parallel", &self.parallel)
            .finish()
    }
}

impl EnsembleScorer {
    pub fn new(members: Vec<Arc<dyn EnsembleMember>>) -> Result<Self, PipelineError> {
        if members.is_empty() {
            return Err(PipelineError::EmptyEnsemble);
        }
        Ok(Self {
            members,
            threshold: DEFAULT_THRESHOLD,
            parallel: true,
        })
    }

    pub fn from_config(
        members: Vec<Arc<dyn EnsembleMember>>,
        config: &PipelineConfig,
    ) -> Result<Self, PipelineError> {
        Self::new(members)?
            .with_threshold(config.threshold)
            .map(|s| s.with_parallel(config.parallel_inference))
    }

    pub fn with_threshold(mut self, threshold: f64) -> Result<Self, PipelineError> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(PipelineError::InvalidConfig(format!(
                "threshold must be within [0, 1], got {}",
                threshold
            )));
        }
        self.threshold = threshold;
        Ok(self)
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn member_names(&self) -> Vec<String> {
        self.members.iter().map(|m| m.name().to_string()).collect()
    }

    /// Run every member over the batch
    pub fn probabilities(&self, batch: &WindowBatch) -> Result<ProbabilityMatrix, PipelineError> {
        if batch.is_empty() {
            return Ok(ProbabilityMatrix {
                windows: 0,
                members: self.members.len(),
                values: Vec::new(),
            });
        }

        let columns: Vec<Vec<f64>> = if self.parallel && self.members.len() > 1 {
            self.members
                .par_iter()
                .map(|m| run_member(m.as_ref(), batch))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            self.members
                .iter()
                .map(|m| run_member(m.as_ref(), batch))
                .collect::<Result<Vec<_>, _>>()?
        };

        let matrix = ProbabilityMatrix::from_columns(batch.len(), &columns);
        log::debug!(
            "Raw probabilities ({} windows x {} members): {:?}",
            matrix.windows(),
            matrix.members(),
            matrix.values
        );
        Ok(matrix)
    }

    /// Score every window of the batch
    pub fn score(&self, batch: &WindowBatch) -> Result<Vec<WindowScore>, PipelineError> {
        let matrix = self.probabilities(batch)?;
        Ok(aggregate(&matrix, self.threshold))
    }
}

/// Reduce each matrix row to an unweighted mean score, a thresholded label
/// and a confidence.
pub fn aggregate(matrix: &ProbabilityMatrix, threshold: f64) -> Vec<WindowScore> {
    (0..matrix.windows())
        .map(|w| {
            let row = matrix.row(w);
            let score = row.iter().sum::<f64>() / row.len() as f64;
            window_score(score, threshold)
        })
        .collect()
}

/// Label and confidence for one aggregate score
pub fn window_score(score: f64, threshold: f64) -> WindowScore {
    WindowScore {
        score,
        label: u8::from(score > threshold),
        confidence: 2.0 * (score - 0.5).abs(),
    }
}

fn run_member(member: &dyn EnsembleMember, batch: &WindowBatch) -> Result<Vec<f64>, PipelineError> {
    let probs = member.predict(batch)?;

    if probs.len() != batch.len() {
        return Err(PipelineError::Inference {
            member: member.name().to_string(),
            reason: format!(
                "returned {} probabilities for {} windows",
                probs.len(),
                batch.len()
            ),
        });
    }

    probs
        .into_iter()
        .enumerate()
        .map(|(w, p)| {
            if p.is_nan() || p < -PROBABILITY_EPSILON || p > 1.0 + PROBABILITY_EPSILON {
                Err(PipelineError::Inference {
                    member: member.name().to_string(),
                    reason: format!("probability {} for window {} outside [0, 1]", p, w),
                })
            } else {
                Ok(p.clamp(0.0, 1.0))
            }
        })
        .collect()
}
