//! AU Deception - Window ensemble scoring over facial action unit time series
//!
//! Turns the per-chunk AU tables written by an upstream extractor into an
//! ordered, timestamped deception score sequence through a deterministic
//! pipeline: schema reconciliation → window segmentation → ensemble scoring
//! → result assembly.
//!
//! ## Modules
//!
//! - **Reconciliation**: Merge heterogeneous chunk tables into one canonical feature matrix
//! - **Segmentation**: Cut the matrix into fixed-size, tail-padded windows
//! - **Ensemble**: Score each window with N independent classifiers and average
//! - **Assembly & Encoding**: Attach timestamps, summarize, and write CSV/JSON reports

pub mod assembler;
pub mod config;
pub mod encoder;
pub mod ensemble;
pub mod error;
pub mod pipeline;
pub mod reconciler;
pub mod schema;
pub mod segmenter;
pub mod types;

pub use assembler::{ResultAssembler, ScoreTable};
pub use config::{PipelineConfig, DEFAULT_THRESHOLD, REFERENCE_WINDOW_SIZE};
pub use encoder::ReportEncoder;
pub use ensemble::{EnsembleMember, EnsembleScorer, ModelStore};
pub use error::PipelineError;
pub use pipeline::{analyze_chunk_tables, DeceptionPipeline};
pub use reconciler::FeatureTableReconciler;
pub use segmenter::WindowSegmenter;

// Schema exports
pub use schema::{ChunkSource, FeatureSchema, RawTable, SCHEMA_VERSION};

/// Crate version embedded in every report
pub const CRATE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "au-deception";
