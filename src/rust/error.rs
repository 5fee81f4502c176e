use std::fmt;

use crate::preprocess::PreprocessError;

/// Identifies one of the two artifacts the server fronts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    /// The image-based crop-deficiency classifier
    ImageClassifier,
    /// The tabular fertilizer recommender pipeline
    FertilizerPipeline,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ImageClassifier => write!(f, "Crop model"),
            Self::FertilizerPipeline => write!(f, "Fertilizer model"),
        }
    }
}

/// Errors surfaced by the prediction service.
///
/// None of these are retried internally. `ModelUnavailable` is the only
/// variant the caller can expect to clear up on its own (once the server is
/// restarted with the artifact in place).
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    /// The requested artifact was not loaded at startup
    #[error("{0} offline")]
    ModelUnavailable(ModelKind),
    /// The request payload could not be turned into model input
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] PreprocessError),
    /// The artifact call failed on otherwise valid input
    #[error("Inference failed: {0:#}")]
    InferenceFailure(#[source] anyhow::Error),
}

impl ServeError {
    pub fn inference(err: impl Into<anyhow::Error>) -> Self {
        Self::InferenceFailure(err.into())
    }
}
