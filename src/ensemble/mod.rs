//! Ensemble of independently trained window classifiers
//!
//! Pipeline: WindowBatch → members (optionally in parallel) → probability
//! matrix → mean score, label and confidence per window

pub mod member;
pub mod scorer;
pub mod store;

pub use member::{ConstantMember, EnsembleMember, LogisticMember, ModelArtifact, Pooling};
pub use scorer::{aggregate, window_score, EnsembleScorer, ProbabilityMatrix};
pub use store::{load_member, EnsembleManifest, ModelStore, MANIFEST_FILE};
