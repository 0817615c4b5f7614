//! Core types for the AU deception pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: reconciled feature tables, window batches, per-window ensemble
//! scores, and the timestamped score records handed to downstream consumers.

use crate::schema::FeatureSchema;
use serde::{Deserialize, Serialize};

/// One video frame's action unit measurements in canonical schema order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    /// Feature values, one per canonical feature
    pub values: Vec<f32>,
    /// Position of the originating chunk table in concatenation order
    pub chunk_id: u32,
}

/// Canonical, fixed-schema feature matrix produced by reconciliation
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    schema: FeatureSchema,
    rows: Vec<FeatureRow>,
    /// Free-form label carried alongside the data, not used in scoring
    pub label: String,
}

impl FeatureTable {
    /// Build a table, rejecting rows whose width differs from the schema
    pub fn new(
        schema: FeatureSchema,
        rows: Vec<FeatureRow>,
        label: impl Into<String>,
    ) -> Result<Self, crate::error::PipelineError> {
        if let Some((idx, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, r)| r.values.len() != schema.len())
        {
            return Err(crate::error::PipelineError::ShapeMismatch(format!(
                "row {} has {} values, schema has {} features",
                idx,
                row.values.len(),
                schema.len()
            )));
        }

        Ok(Self {
            schema,
            rows,
            label: label.into(),
        })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<FeatureRow> {
        self.rows
    }

    /// Number of frames
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn feature_count(&self) -> usize {
        self.schema.len()
    }

    /// All values of one canonical column, in frame order
    pub fn column(&self, name: &str) -> Option<Vec<f32>> {
        let idx = self.schema.position(name)?;
        Some(self.rows.iter().map(|r| r.values[idx]).collect())
    }
}

/// A fixed-size temporal slice of consecutive frames
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    /// Window index in chronological order
    pub index: usize,
    /// First real frame covered (inclusive)
    pub start_frame: usize,
    /// One past the last real frame covered; padding rows are not counted
    pub end_frame: usize,
    /// Representative frame used as the window's timestamp
    pub representative_frame: usize,
    /// Row-major `window_size x feature_count` values, zero-padded at the tail
    pub values: Vec<f32>,
}

impl Window {
    /// Number of source frames in the window (excludes padding)
    pub fn real_rows(&self) -> usize {
        self.end_frame - self.start_frame
    }

    pub fn is_padded(&self, window_size: usize) -> bool {
        self.real_rows() < window_size
    }
}

/// Ordered batch of windows sharing one shape
#[derive(Debug, Clone, PartialEq)]
pub struct WindowBatch {
    pub window_size: usize,
    pub feature_count: usize,
    /// Frame count of the table the batch was cut from
    pub total_frames: usize,
    pub windows: Vec<Window>,
}

impl WindowBatch {
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Values of row `row` of window `window`
    pub fn row(&self, window: usize, row: usize) -> &[f32] {
        let start = row * self.feature_count;
        &self.windows[window].values[start..start + self.feature_count]
    }

    pub fn representative_frames(&self) -> Vec<usize> {
        self.windows.iter().map(|w| w.representative_frame).collect()
    }
}

/// Aggregated ensemble output for one window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowScore {
    /// Mean member probability (0-1)
    pub score: f64,
    /// 1 when `score > threshold`
    pub label: u8,
    /// Distance from the decision boundary, `2 * |score - 0.5|` (0-1)
    pub confidence: f64,
}

/// Per-window result row of the output table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    #[serde(rename = "Chunk_Start_Frame")]
    pub start_frame: usize,
    #[serde(rename = "Chunk_End_Frame")]
    pub end_frame: usize,
    #[serde(rename = "Chunk_Start_Time")]
    pub start_time: f64,
    #[serde(rename = "Chunk_End_Time")]
    pub end_time: f64,
    #[serde(rename = "Frame")]
    pub frame: usize,
    #[serde(rename = "Time_Seconds")]
    pub time_seconds: f64,
    #[serde(rename = "Deception_Score")]
    pub deception_score: f64,
    #[serde(rename = "Binary_Prediction")]
    pub binary_prediction: u8,
    #[serde(rename = "Confidence")]
    pub confidence: f64,
}

/// Aggregate statistics over a score table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub window_count: usize,
    pub total_frames: usize,
    pub duration_seconds: f64,
    pub threshold: f64,
    /// Fraction of windows with score below the threshold
    pub truthful_fraction: f64,
    /// Fraction of windows with score at or above the threshold
    pub deceptive_fraction: f64,
    /// Fraction of windows labelled 0
    pub binary_truth_fraction: f64,
    /// Fraction of windows labelled 1
    pub binary_deception_fraction: f64,
    pub mean_score: f64,
    pub mean_confidence: f64,
}
