//! Error types for the AU deception pipeline

use thiserror::Error;

/// Errors that can occur while reconciling, segmenting, scoring or encoding
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("No input data: {0}")]
    EmptyInput(String),

    #[error("Reconciled feature table contains no frames")]
    NoFrames,

    #[error("Failed to parse chunk table: {0}")]
    ParseError(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to load model {path}: {reason}")]
    ModelLoad { path: String, reason: String },

    #[error("Ensemble member {member} failed: {reason}")]
    Inference { member: String, reason: String },

    #[error("Ensemble has no members")]
    EmptyEnsemble,

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}

impl PipelineError {
    /// Stable machine-readable code for structured error output
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::EmptyInput(_) => "EMPTY_INPUT",
            PipelineError::NoFrames => "NO_FRAMES",
            PipelineError::ParseError(_) => "PARSE_ERROR",
            PipelineError::Csv(_) => "CSV_ERROR",
            PipelineError::JsonError(_) => "JSON_ERROR",
            PipelineError::Io(_) => "IO_ERROR",
            PipelineError::InvalidConfig(_) => "INVALID_CONFIG",
            PipelineError::ModelLoad { .. } => "MODEL_LOAD_ERROR",
            PipelineError::Inference { .. } => "INFERENCE_ERROR",
            PipelineError::EmptyEnsemble => "EMPTY_ENSEMBLE",
            PipelineError::ShapeMismatch(_) => "SHAPE_MISMATCH",
            PipelineError::EncodingError(_) => "ENCODING_ERROR",
        }
    }

    /// Whether the error aborts a pipeline run before any output is produced
    pub fn is_input_absence(&self) -> bool {
        matches!(self, PipelineError::EmptyInput(_) | PipelineError::NoFrames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(PipelineError::EmptyInput("x".into()).code(), "EMPTY_INPUT");
        assert_eq!(
            PipelineError::Inference {
                member: "m0".into(),
                reason: "boom".into()
            }
            .code(),
            "INFERENCE_ERROR"
        );
    }

    #[test]
    fn test_input_absence_classification() {
        assert!(PipelineError::NoFrames.is_input_absence());
        assert!(PipelineError::EmptyInput("none".into()).is_input_absence());
        assert!(!PipelineError::EmptyEnsemble.is_input_absence());
    }
}
