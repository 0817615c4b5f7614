//! Result assembly
//!
//! Joins window boundaries, representative frames and ensemble scores into
//! the ordered, timestamped output table, and derives summary statistics.

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::types::{ScoreRecord, Summary, WindowBatch, WindowScore};
use serde::{Deserialize, Serialize};

/// Ordered per-window results for one analyzed video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreTable {
    pub records: Vec<ScoreRecord>,
    pub total_frames: usize,
    pub window_size: usize,
    pub fps: f64,
    pub threshold: f64,
}

impl ScoreTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ScoreRecord> {
        self.records.iter()
    }

    pub fn duration_seconds(&self) -> f64 {
        self.total_frames as f64 / self.fps
    }

    /// Aggregate statistics, or `None` when there are no windows
    pub fn summary(&self) -> Option<Summary> {
        if self.records.is_empty() {
            return None;
        }

        let n = self.records.len() as f64;
        let threshold = self.threshold;
        let records = &self.records;

        Some(Summary {
            window_count: records.len(),
            total_frames: self.total_frames,
            duration_seconds: self.duration_seconds(),
            threshold,
            truthful_fraction: fraction(records, |r| r.deception_score < threshold),
            deceptive_fraction: fraction(records, |r| r.deception_score >= threshold),
            binary_truth_fraction: fraction(records, |r| r.binary_prediction == 0),
            binary_deception_fraction: fraction(records, |r| r.binary_prediction == 1),
            mean_score: self.records.iter().map(|r| r.deception_score).sum::<f64>() / n,
            mean_confidence: self.records.iter().map(|r| r.confidence).sum::<f64>() / n,
        })
    }
}

fn fraction(records: &[ScoreRecord], pred: impl Fn(&ScoreRecord) -> bool) -> f64 {
    records.iter().filter(|r| pred(r)).count() as f64 / records.len() as f64
}

impl<'a> IntoIterator for &'a ScoreTable {
    type Item = &'a ScoreRecord;
    type IntoIter = std::slice::Iter<'a, ScoreRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Assembler for building score tables
#[derive(Debug, Clone, Copy)]
pub struct ResultAssembler {
    fps: f64,
    threshold: f64,
}

impl ResultAssembler {
    pub fn new(fps: f64, threshold: f64) -> Result<Self, PipelineError> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "fps must be positive, got {}",
                fps
            )));
        }
        Ok(Self { fps, threshold })
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self, PipelineError> {
        Self::new(config.fps, config.threshold)
    }

    /// Zip windows and scores into one record per window
    pub fn assemble(
        &self,
        batch: &WindowBatch,
        scores: &[WindowScore],
    ) -> Result<ScoreTable, PipelineError> {
        if batch.len() != scores.len() {
            return Err(PipelineError::ShapeMismatch(format!(
                "{} windows but {} scores",
                batch.len(),
                scores.len()
            )));
        }

        let records = batch
            .windows
            .iter()
            .zip(scores)
            .map(|(window, score)| {
                let end_frame = window.end_frame.min(batch.total_frames);
                ScoreRecord {
                    start_frame: window.start_frame,
                    end_frame,
                    start_time: self.seconds(window.start_frame),
                    end_time: self.seconds(end_frame),
                    frame: window.representative_frame,
                    time_seconds: self.seconds(window.representative_frame),
                    deception_score: score.score,
                    binary_prediction: score.label,
                    confidence: score.confidence,
                }
            })
            .collect();

        Ok(ScoreTable {
            records,
            total_frames: batch.total_frames,
            window_size: batch.window_size,
            fps: self.fps,
            threshold: self.threshold,
        })
    }

    fn seconds(&self, frame: usize) -> f64 {
        frame as f64 / self.fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ensemble::window_score;
    use crate::types::Window;
    use pretty_assertions::assert_eq;

    fn batch(total_frames: usize, window_size: usize) -> WindowBatch {
        let windows = (0..total_frames.div_ceil(window_size))
            .map(|index| {
                let start_frame = index * window_size;
                let end_frame = (start_frame + window_size).min(total_frames);
                let real = end_frame - start_frame;
                Window {
                    index,
                    start_frame,
                    end_frame,
                    representative_frame: if real == window_size {
                        start_frame + window_size / 2
                    } else {
                        total_frames - real / 2
                    },
                    values: vec![0.0; window_size],
                }
            })
            .collect();
        WindowBatch {
            window_size,
            feature_count: 1,
            total_frames,
            windows,
        }
    }

    fn scores(values: &[f64]) -> Vec<WindowScore> {
        values.iter().map(|s| window_score(*s, 0.5)).collect()
    }

    #[test]
    fn test_records_carry_boundaries_and_times() {
        let assembler = ResultAssembler::new(30.0, 0.5).unwrap();
        let table = assembler
            .assemble(&batch(100, 30), &scores(&[0.1, 0.6, 0.5, 0.9]))
            .unwrap();

        assert_eq!(table.len(), 4);
        assert_eq!(
            table.records[0],
            ScoreRecord {
                start_frame: 0,
                end_frame: 30,
                start_time: 0.0,
                end_time: 1.0,
                frame: 15,
                time_seconds: 0.5,
                deception_score: 0.1,
                binary_prediction: 0,
                confidence: table.records[0].confidence,
            }
        );

        let last = &table.records[3];
        assert_eq!((last.start_frame, last.end_frame, last.frame), (90, 100, 95));
        assert!((last.end_time - 100.0 / 30.0).abs() < 1e-12);
        assert_eq!(last.binary_prediction, 1);
    }

    #[test]
    fn test_records_ordered_by_frame() {
        let table = ResultAssembler::new(25.0, 0.5)
            .unwrap()
            .assemble(&batch(211, 30), &scores(&[0.5; 8]))
            .unwrap();

        for pair in table.records.windows(2) {
            assert!(pair[0].frame < pair[1].frame);
        }
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let result = ResultAssembler::new(30.0, 0.5)
            .unwrap()
            .assemble(&batch(60, 30), &scores(&[0.5]));
        assert!(matches!(result, Err(PipelineError::ShapeMismatch(_))));
    }

    #[test]
    fn test_summary_statistics() {
        let table = ResultAssembler::new(30.0, 0.5)
            .unwrap()
            .assemble(&batch(120, 30), &scores(&[0.2, 0.5, 0.7, 0.9]))
            .unwrap();
        let summary = table.summary().unwrap();

        assert_eq!(summary.window_count, 4);
        assert_eq!(summary.total_frames, 120);
        assert!((summary.duration_seconds - 4.0).abs() < 1e-12);
        // 0.5 counts as deceptive by score but truthful by label
        assert_eq!(summary.truthful_fraction, 0.25);
        assert_eq!(summary.deceptive_fraction, 0.75);
        assert_eq!(summary.binary_truth_fraction, 0.5);
        assert_eq!(summary.binary_deception_fraction, 0.5);
        assert!((summary.mean_score - 0.575).abs() < 1e-12);
        assert!((summary.mean_confidence - (0.6 + 0.0 + 0.4 + 0.8) / 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_summary_of_empty_table_is_none() {
        let table = ResultAssembler::new(30.0, 0.5)
            .unwrap()
            .assemble(&batch(0, 30), &[])
            .unwrap();
        assert!(table.is_empty());
        assert!(table.summary().is_none());
    }

    #[test]
    fn test_invalid_fps_rejected() {
        assert!(ResultAssembler::new(0.0, 0.5).is_err());
        assert!(ResultAssembler::new(-30.0, 0.5).is_err());
    }
}
