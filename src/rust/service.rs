use std::sync::Arc;

use anyhow::anyhow;
use log::{debug, warn};

use crate::error::{ModelKind, ServeError};
use crate::preprocess::preprocess_image;
use crate::registry::{ModelRegistry, Slot};
use crate::schema::{translate, FertilizerPrediction, FertilizerRequest, ImagePrediction};

/// Probability reported when the fertilizer pipeline cannot estimate one.
///
/// This is a policy constant kept for compatibility with existing clients,
/// not a calibrated value.
pub const FALLBACK_PROBABILITY: f64 = 0.95;

/// Runs both prediction endpoints against a shared, read-only registry.
#[derive(Debug, Clone)]
pub struct PredictionService {
    registry: Arc<ModelRegistry>,
}

impl PredictionService {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Classifies a crop image and returns the most likely deficiency.
    ///
    /// Fails fast with `ModelUnavailable` before touching the bytes when the
    /// classifier is not loaded.
    pub fn predict_image(&self, bytes: &[u8]) -> Result<ImagePrediction, ServeError> {
        let Slot::Loaded(classifier) = self.registry.image() else {
            return Err(ServeError::ModelUnavailable(ModelKind::ImageClassifier));
        };

        let batch = preprocess_image(bytes)?;
        let probabilities = classifier.classify(&batch).map_err(ServeError::inference)?;

        let vocabulary = self.registry.vocabulary();
        if probabilities.len() != vocabulary.len() {
            return Err(ServeError::inference(anyhow!(
                "Crop classifier returned {} scores for {} classes",
                probabilities.len(),
                vocabulary.len()
            )));
        }

        let (index, confidence) = argmax(&probabilities)
            .ok_or_else(|| ServeError::inference(anyhow!("Crop classifier returned no usable scores")))?;
        let label = vocabulary
            .label(index)
            .ok_or_else(|| ServeError::inference(anyhow!("Class index {} outside vocabulary", index)))?;

        debug!("Image classified as '{}' ({:.4})", label, confidence);
        Ok(ImagePrediction {
            label: label.to_string(),
            confidence: round4(confidence as f64),
        })
    }

    /// Recommends a fertilizer for the given soil reading.
    ///
    /// The label must come from the pipeline; the probability falls back to
    /// [`FALLBACK_PROBABILITY`] whenever the pipeline cannot provide one.
    pub fn predict_fertilizer(&self, request: &FertilizerRequest) -> Result<FertilizerPrediction, ServeError> {
        let Slot::Loaded(pipeline) = self.registry.tabular() else {
            return Err(ServeError::ModelUnavailable(ModelKind::FertilizerPipeline));
        };

        let row = translate(request);
        let label = pipeline.predict_label(&row).map_err(ServeError::inference)?;

        let probabilities = match pipeline.predict_proba(&row) {
            Ok(probabilities) => probabilities,
            Err(e) => {
                warn!("Probability estimation failed, using fallback: {:#}", e);
                None
            }
        };
        let probability = match probabilities.as_deref().and_then(max_probability) {
            Some(max) => round4(max as f64),
            None => FALLBACK_PROBABILITY,
        };

        debug!("Fertilizer recommendation '{}' ({:.4})", label, probability);
        Ok(FertilizerPrediction { label, probability })
    }
}

/// Index and value of the largest score.
///
/// Ties go to the lowest index. NaN entries never win.
pub fn argmax(scores: &[f32]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (index, &score) in scores.iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((index, score)),
        }
    }
    best
}

fn max_probability(probabilities: &[f32]) -> Option<f32> {
    argmax(probabilities).map(|(_, max)| max)
}

/// Rounds to 4 decimal digits, exact halves going to the even digit
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round_ties_even() / 10_000.0
}
