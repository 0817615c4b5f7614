//! Pipeline orchestration
//!
//! This module provides the public API for the AU deception pipeline.
//! It orchestrates the full flow from per-chunk AU tables to an ordered,
//! timestamped score table.

use crate::assembler::{ResultAssembler, ScoreTable};
use crate::config::PipelineConfig;
use crate::ensemble::{EnsembleMember, EnsembleScorer, ModelStore};
use crate::error::PipelineError;
use crate::reconciler::FeatureTableReconciler;
use crate::schema::{ChunkSource, RawTable};
use crate::segmenter::WindowSegmenter;
use crate::types::FeatureTable;
use std::path::Path;
use std::sync::Arc;

/// Score a set of parsed chunk tables with an already loaded ensemble.
///
/// # Example
/// ```ignore
/// let store = ModelStore::load(Path::new("models"), 32)?;
/// let table = analyze_chunk_tables(&tables, store.into_members(), &PipelineConfig::default())?;
/// ```
pub fn analyze_chunk_tables(
    tables: &[RawTable],
    members: Vec<Arc<dyn EnsembleMember>>,
    config: &PipelineConfig,
) -> Result<ScoreTable, PipelineError> {
    DeceptionPipeline::new(config.clone(), members)?.run_tables(tables)
}

/// Configured pipeline instance.
///
/// Holds one instance of every stage. Members are shared through `Arc`, so
/// several pipelines with different thresholds can score with the same
/// loaded models.
#[derive(Debug, Clone)]
pub struct DeceptionPipeline {
    config: PipelineConfig,
    reconciler: FeatureTableReconciler,
    segmenter: WindowSegmenter,
    scorer: EnsembleScorer,
    assembler: ResultAssembler,
}

impl DeceptionPipeline {
    /// Build a pipeline from an explicit configuration and member list
    pub fn new(
        config: PipelineConfig,
        members: Vec<Arc<dyn EnsembleMember>>,
    ) -> Result<Self, PipelineError> {
        config.validate()?;

        Ok(Self {
            reconciler: FeatureTableReconciler::from_config(&config),
            segmenter: WindowSegmenter::new(config.window_size)?,
            scorer: EnsembleScorer::from_config(members, &config)?,
            assembler: ResultAssembler::from_config(&config)?,
            config,
        })
    }

    /// Load the ensemble from a model store directory.
    ///
    /// The window size recorded in the store's manifest replaces the one in
    /// `config`.
    pub fn from_model_store(mut config: PipelineConfig, dir: &Path) -> Result<Self, PipelineError> {
        config.validate()?;
        let store = ModelStore::load(dir, config.schema.len())?;

        if store.window_size() != config.window_size {
            log::info!(
                "Using window size {} from {} (configured {})",
                store.window_size(),
                dir.display(),
                config.window_size
            );
            config.window_size = store.window_size();
        }

        Self::new(config, store.into_members())
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn member_names(&self) -> Vec<String> {
        self.scorer.member_names()
    }

    /// Reconcile parsed chunk tables without scoring
    pub fn reconcile(&self, tables: &[RawTable]) -> Result<FeatureTable, PipelineError> {
        self.reconciler.reconcile(tables)
    }

    /// Run the full pipeline over parsed chunk tables
    pub fn run_tables(&self, tables: &[RawTable]) -> Result<ScoreTable, PipelineError> {
        let table = self.reconciler.reconcile(tables)?;
        self.analyze(table)
    }

    /// Run the full pipeline over raw chunk files; unparseable files are
    /// skipped
    pub fn run_sources(&self, sources: &[ChunkSource]) -> Result<ScoreTable, PipelineError> {
        let table = self.reconciler.reconcile_sources(sources)?;
        self.analyze(table)
    }

    /// Score a reconciled feature table.
    ///
    /// Pipeline stages:
    /// 1. WindowSegmenter - Cut into fixed-size, tail-padded windows
    /// 2. EnsembleScorer - Run every member and aggregate per window
    /// 3. ResultAssembler - Attach frame ranges and timestamps
    pub fn analyze(&self, table: FeatureTable) -> Result<ScoreTable, PipelineError> {
        if table.is_empty() {
            return Err(PipelineError::NoFrames);
        }
        if table.schema() != &self.config.schema {
            return Err(PipelineError::ShapeMismatch(format!(
                "table has {} features, pipeline expects {}",
                table.feature_count(),
                self.config.schema.len()
            )));
        }

        // Stage 1: Segment into windows
        let batch = self.segmenter.segment(table);
        log::info!(
            "Segmented {} frames into {} windows of {}",
            batch.total_frames,
            batch.len(),
            batch.window_size
        );

        // Stage 2: Ensemble inference and aggregation
        let scores = self.scorer.score(&batch)?;

        // Stage 3: Assemble timestamped records
        self.assembler.assemble(&batch, &scores)
    }
}
