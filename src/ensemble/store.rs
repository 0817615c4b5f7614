//! Model store loading
//!
//! A model store is a directory holding an `ensemble_metadata.json` manifest
//! and one JSON artifact per member. Each artifact is loaded exactly once;
//! the resulting members are immutable and may be shared between pipelines.

use crate::ensemble::member::{EnsembleMember, ModelArtifact};
use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Manifest file name inside a model store directory
pub const MANIFEST_FILE: &str = "ensemble_metadata.json";

/// Ensemble manifest: ordered artifact paths and the trained window size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleManifest {
    /// Artifact paths, relative to the store directory
    pub model_paths: Vec<String>,
    /// Window size the members were trained with
    #[serde(alias = "window_size")]
    pub s_size: usize,
}

impl EnsembleManifest {
    pub fn from_json(json: &str) -> Result<Self, PipelineError> {
        let manifest: EnsembleManifest = serde_json::from_str(json)?;
        if manifest.s_size == 0 {
            return Err(PipelineError::ModelLoad {
                path: MANIFEST_FILE.to_string(),
                reason: "s_size must be positive".to_string(),
            });
        }
        Ok(manifest)
    }
}

/// Members loaded from a model store
pub struct ModelStore {
    dir: PathBuf,
    manifest: EnsembleManifest,
    members: Vec<Arc<dyn EnsembleMember>>,
}

impl std::fmt::Debug for ModelStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelStore")
            .field("dir", &self.dir)
            .field("manifest", &self.manifest)
            .finish()
    }
}

impl ModelStore {
    /// Load the manifest and every member artifact from `dir`.
    ///
    /// `feature_count` is the width of the canonical schema the members
    /// will see.
    pub fn load(dir: &Path, feature_count: usize) -> Result<Self, PipelineError> {
        let manifest = Self::read_manifest(dir)?;

        let mut members: Vec<Arc<dyn EnsembleMember>> =
            Vec::with_capacity(manifest.model_paths.len());
        for rel in &manifest.model_paths {
            let member = load_member(&dir.join(rel), manifest.s_size, feature_count)?;
            members.push(Arc::from(member));
        }

        log::info!(
            "Loaded {} models with window size {}",
            members.len(),
            manifest.s_size
        );

        Ok(Self {
            dir: dir.to_path_buf(),
            manifest,
            members,
        })
    }

    /// Read only the manifest
    pub fn read_manifest(dir: &Path) -> Result<EnsembleManifest, PipelineError> {
        let path = dir.join(MANIFEST_FILE);
        let json = fs::read_to_string(&path).map_err(|e| PipelineError::ModelLoad {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        EnsembleManifest::from_json(&json).map_err(|e| PipelineError::ModelLoad {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn manifest(&self) -> &EnsembleManifest {
        &self.manifest
    }

    pub fn window_size(&self) -> usize {
        self.manifest.s_size
    }

    pub fn members(&self) -> &[Arc<dyn EnsembleMember>] {
        &self.members
    }

    pub fn into_members(self) -> Vec<Arc<dyn EnsembleMember>> {
        self.members
    }
}

/// Load one artifact and bind it to the window shape
pub fn load_member(
    path: &Path,
    window_size: usize,
    feature_count: usize,
) -> Result<Box<dyn EnsembleMember>, PipelineError> {
    let model_load = |reason: String| PipelineError::ModelLoad {
        path: path.display().to_string(),
        reason,
    };

    let json = fs::read_to_string(path).map_err(|e| model_load(e.to_string()))?;
    let artifact: ModelArtifact =
        serde_json::from_str(&json).map_err(|e| model_load(e.to_string()))?;

    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("model")
        .to_string();

    log::debug!("Loading {} model {} from {}", artifact.kind(), name, path.display());
    artifact.into_member(name, window_size, feature_count)
}
