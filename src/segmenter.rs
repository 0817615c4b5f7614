//! Window segmentation
//!
//! Partitions a canonical feature table into disjoint, fixed-size windows.
//! The trailing partial window, if any, is zero-padded to full width and its
//! frame range covers only the real rows.

use crate::config::REFERENCE_WINDOW_SIZE;
use crate::error::PipelineError;
use crate::types::{FeatureTable, Window, WindowBatch};

/// Segmenter for cutting feature tables into analysis windows
#[derive(Debug, Clone, Copy)]
pub struct WindowSegmenter {
    window_size: usize,
}

impl Default for WindowSegmenter {
    fn default() -> Self {
        Self {
            window_size: REFERENCE_WINDOW_SIZE,
        }
    }
}

impl WindowSegmenter {
    /// Create a segmenter. Sizes other than the reference width are allowed
    /// but logged, since the shipped models assume 30-frame windows.
    pub fn new(window_size: usize) -> Result<Self, PipelineError> {
        if window_size == 0 {
            return Err(PipelineError::InvalidConfig(
                "window_size must be positive".to_string(),
            ));
        }
        if window_size != REFERENCE_WINDOW_SIZE {
            log::warn!(
                "Expected window size of {} frames, but got {}",
                REFERENCE_WINDOW_SIZE,
                window_size
            );
        }
        Ok(Self { window_size })
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Number of windows a table of `frames` rows produces
    pub fn window_count(&self, frames: usize) -> usize {
        frames.div_ceil(self.window_size)
    }

    /// Cut the table into windows. An empty table yields an empty batch.
    pub fn segment(&self, table: FeatureTable) -> WindowBatch {
        let size = self.window_size;
        let feature_count = table.feature_count();
        let total_frames = table.len();
        let num_full = total_frames / size;
        let remainder = total_frames % size;

        log::debug!(
            "Segmenting {} frames: {} full windows of {}, {} remaining",
            total_frames,
            num_full,
            size,
            remainder
        );

        let rows = table.into_rows();
        let mut windows = Vec::with_capacity(self.window_count(total_frames));

        for (index, chunk) in rows.chunks(size).enumerate() {
            let start_frame = index * size;
            let end_frame = start_frame + chunk.len();

            let mut values = Vec::with_capacity(size * feature_count);
            for row in chunk {
                values.extend_from_slice(&row.values);
            }
            values.resize(size * feature_count, 0.0);

            let representative_frame = if chunk.len() == size {
                start_frame + size / 2
            } else {
                total_frames - chunk.len() / 2
            };

            windows.push(Window {
                index,
                start_frame,
                end_frame,
                representative_frame,
                values,
            });
        }

        WindowBatch {
            window_size: size,
            feature_count,
            total_frames,
            windows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FeatureSchema;
    use crate::types::FeatureRow;
    use pretty_assertions::assert_eq;

    fn ramp_table(frames: usize, features: usize) -> FeatureTable {
        let names: Vec<String> = (0..features).map(|i| format!("AU{:02}_r", i)).collect();
        let rows = (0..frames)
            .map(|f| FeatureRow {
                values: vec![(f + 1) as f32; features],
                chunk_id: 0,
            })
            .collect();
        FeatureTable::new(FeatureSchema::from_names(names), rows, "sample").unwrap()
    }

    #[test]
    fn test_exact_multiple_has_no_padding() {
        let batch = WindowSegmenter::new(30).unwrap().segment(ramp_table(90, 4));

        assert_eq!(batch.len(), 3);
        assert_eq!(batch.representative_frames(), vec![15, 45, 75]);
        assert!(batch.windows.iter().all(|w| !w.is_padded(30)));
        assert!(batch.windows.iter().all(|w| w.values.len() == 30 * 4));
    }

    #[test]
    fn test_remainder_window_is_padded() {
        let batch = WindowSegmenter::new(30).unwrap().segment(ramp_table(100, 2));

        assert_eq!(batch.len(), 4);
        let last = &batch.windows[3];
        assert_eq!(last.start_frame, 90);
        assert_eq!(last.end_frame, 100);
        assert_eq!(last.real_rows(), 10);
        assert!(last.is_padded(30));
        assert_eq!(last.representative_frame, 95);
        assert_eq!(last.values.len(), 60);

        // Real rows carry frames 91..=100, padding rows are zero
        assert_eq!(batch.row(3, 0), &[91.0, 91.0]);
        assert_eq!(batch.row(3, 9), &[100.0, 100.0]);
        assert!(last.values[20..].iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_short_input_yields_single_padded_window() {
        let batch = WindowSegmenter::new(30).unwrap().segment(ramp_table(7, 3));

        assert_eq!(batch.len(), 1);
        assert_eq!(batch.windows[0].start_frame, 0);
        assert_eq!(batch.windows[0].end_frame, 7);
        assert_eq!(batch.windows[0].representative_frame, 4);
    }

    #[test]
    fn test_empty_table_yields_no_windows() {
        let batch = WindowSegmenter::default().segment(ramp_table(0, 3));
        assert!(batch.is_empty());
        assert_eq!(batch.total_frames, 0);
    }

    #[test]
    fn test_window_count_is_ceiling() {
        for size in [1usize, 7, 30, 31] {
            let segmenter = WindowSegmenter::new(size).unwrap();
            for frames in [1usize, 29, 30, 31, 59, 60, 61, 211] {
                let batch = segmenter.segment(ramp_table(frames, 1));
                assert_eq!(batch.len(), frames.div_ceil(size));
                assert_eq!(batch.len(), segmenter.window_count(frames));
                assert!(batch.windows.iter().all(|w| w.values.len() == size));
            }
        }
    }

    #[test]
    fn test_windows_are_disjoint_and_ordered() {
        let batch = WindowSegmenter::new(30).unwrap().segment(ramp_table(100, 1));

        for pair in batch.windows.windows(2) {
            assert_eq!(pair[0].end_frame, pair[1].start_frame);
            assert!(pair[0].representative_frame < pair[1].representative_frame);
            assert_eq!(pair[0].index + 1, pair[1].index);
        }
    }

    #[test]
    fn test_zero_window_size_rejected() {
        assert!(WindowSegmenter::new(0).is_err());
    }
}
