//! Callable handles over the two trained artifacts.
//!
//! The traits are the seam between the prediction service and whatever runs
//! the artifact. The ONNX Runtime implementations live in [`classifier`] and
//! [`pipeline`]; tests substitute their own.

use ndarray::Array4;

use crate::schema::TabularFeatureRow;

pub mod classifier;
pub mod pipeline;

pub use classifier::OnnxImageClassifier;
pub use pipeline::OnnxTabularPipeline;

/// A loaded crop image classifier.
pub trait ImageClassifier: Send + Sync {
    /// Number of classes the classifier scores
    fn output_width(&self) -> usize;

    /// Scores a `[1, H, W, C]` batch and returns one probability per class
    fn classify(&self, batch: &Array4<f32>) -> anyhow::Result<Vec<f32>>;
}

/// A loaded tabular pipeline (preprocessing and estimator as one unit).
pub trait TabularPipeline: Send + Sync {
    /// Predicts the label for a single row
    fn predict_label(&self, row: &TabularFeatureRow) -> anyhow::Result<String>;

    /// Class probabilities for a single row.
    ///
    /// `Ok(None)` means the pipeline cannot estimate probabilities at all.
    fn predict_proba(&self, _row: &TabularFeatureRow) -> anyhow::Result<Option<Vec<f32>>> {
        Ok(None)
    }
}
