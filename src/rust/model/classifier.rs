use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context};
use log::info;
use ndarray::{Array4, Axis};
use ort::session::Session;
use ort::value::{Tensor, ValueType};

use super::ImageClassifier;
use crate::preprocess::{CHANNELS, TARGET_SIZE};
use crate::runtime::{create_session_builder, RuntimeConfig};

/// Crop classifier backed by an ONNX Runtime session.
///
/// The graph must take a single float tensor `[N, 224, 224, 3]` and return
/// class probabilities `[N, classes]` as its first output.
#[derive(Debug)]
pub struct OnnxImageClassifier {
    path: PathBuf,
    session: Session,
    input_name: String,
    output_name: String,
    output_width: usize,
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<OnnxImageClassifier>();
    }
};

impl OnnxImageClassifier {
    /// Loads the classifier and checks it scores exactly `expected_width` classes.
    ///
    /// The width is measured by running a blank image through the graph, so
    /// graphs with symbolic output dimensions are checked too.
    pub fn load(path: &Path, config: &RuntimeConfig, expected_width: usize) -> anyhow::Result<Self> {
        let session = create_session_builder(config)?
            .commit_from_file(path)
            .with_context(|| format!("Failed to load crop classifier from {:?}", path))?;

        let (input_name, output_name) = Self::validate_model(&session, expected_width)?;
        info!("Crop classifier structure validated (input '{}', output '{}')", input_name, output_name);

        let mut classifier = Self {
            path: path.to_path_buf(),
            session,
            input_name,
            output_name,
            output_width: 0,
        };

        let side = TARGET_SIZE as usize;
        let probe = Array4::<f32>::zeros((1, side, side, CHANNELS));
        let scores = classifier
            .run(&probe)
            .context("Crop classifier failed on a blank probe image")?;
        if scores.len() != expected_width {
            bail!(
                "Crop classifier outputs {} classes but the vocabulary has {}",
                scores.len(),
                expected_width
            );
        }
        classifier.output_width = scores.len();

        Ok(classifier)
    }

    /// Returns the input and output names to bind, or why the graph is unusable
    fn validate_model(session: &Session, expected_width: usize) -> anyhow::Result<(String, String)> {
        let input = session
            .inputs
            .first()
            .ok_or_else(|| anyhow!("Model must have an image input"))?;
        match &input.input_type {
            ValueType::Tensor { dimensions, .. } => {
                if dimensions.len() != 4 {
                    bail!("Image input must be rank 4 [N, H, W, C], found rank {}", dimensions.len());
                }
                let channels = dimensions[3];
                if channels >= 0 && channels as usize != CHANNELS {
                    bail!("Image input must be channel-last with {} channels, found {}", CHANNELS, channels);
                }
            }
            other => bail!("Image input must be a tensor, found {:?}", other),
        }

        let output = session
            .outputs
            .first()
            .ok_or_else(|| anyhow!("Model must have at least 1 output for class probabilities"))?;
        if let ValueType::Tensor { dimensions, .. } = &output.output_type {
            if let Some(&width) = dimensions.last() {
                if width >= 0 && width as usize != expected_width {
                    bail!(
                        "Crop classifier declares {} output classes but the vocabulary has {}",
                        width,
                        expected_width
                    );
                }
            }
        }

        Ok((input.name.clone(), output.name.clone()))
    }

    fn run(&self, batch: &Array4<f32>) -> anyhow::Result<Vec<f32>> {
        let batch_dyn = batch.view().into_dyn();
        let batch_std = batch_dyn.as_standard_layout();

        let mut inputs = HashMap::new();
        inputs.insert(
            self.input_name.as_str(),
            Tensor::from_array(&batch_std).context("Failed to create image tensor")?,
        );

        let outputs = self
            .session
            .run(inputs)
            .with_context(|| format!("Failed to run crop classifier {:?}", self.path))?;
        let scores = outputs[self.output_name.as_str()]
            .try_extract_tensor::<f32>()
            .context("Failed to extract class probabilities")?;

        let first = match scores.ndim() {
            0 => bail!("Crop classifier returned a scalar"),
            1 => scores.iter().copied().collect(),
            _ => scores.index_axis(Axis(0), 0).iter().copied().collect(),
        };
        Ok(first)
    }
}

impl ImageClassifier for OnnxImageClassifier {
    fn output_width(&self) -> usize {
        self.output_width
    }

    fn classify(&self, batch: &Array4<f32>) -> anyhow::Result<Vec<f32>> {
        self.run(batch)
    }
}
