use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context};
use log::{info, warn};
use ndarray::Array2;
use ort::session::{Session, SessionOutputs};
use ort::tensor::TensorElementType;
use ort::value::{DynValue, Tensor, ValueType};

use super::TabularPipeline;
use crate::runtime::{create_session_builder, RuntimeConfig};
use crate::schema::{FeatureValue, TabularFeatureRow};

/// Element type a pipeline input column is declared with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Float32,
    Float64,
    Text,
}

/// Element type of the predicted label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LabelKind {
    Text,
    Int64,
}

/// Fertilizer pipeline exported as a single ONNX graph.
///
/// Expected layout (what sklearn-onnx produces for a column transformer
/// pipeline):
/// - one `[N, 1]` input per feature column, named after the column
/// - first output: predicted label, string or int64
/// - optional float output `[N, classes]` with class probabilities
///
/// A probability output in any other shape (a ZipMap sequence, for example)
/// is treated as unavailable.
#[derive(Debug)]
pub struct OnnxTabularPipeline {
    path: PathBuf,
    session: Session,
    columns: Vec<(String, ColumnKind)>,
    label_output: (String, LabelKind),
    proba_output: Option<String>,
}

impl OnnxTabularPipeline {
    pub fn load(path: &Path, config: &RuntimeConfig) -> anyhow::Result<Self> {
        let session = create_session_builder(config)?
            .commit_from_file(path)
            .with_context(|| format!("Failed to load fertilizer pipeline from {:?}", path))?;

        let columns = Self::bind_columns(&session)?;
        let (label_output, proba_output) = Self::bind_outputs(&session)?;

        info!(
            "Fertilizer pipeline structure validated ({} columns, label '{}')",
            columns.len(),
            label_output.0
        );
        match &proba_output {
            Some(name) => info!("Fertilizer pipeline exposes probabilities via '{}'", name),
            None => warn!("Fertilizer pipeline has no probability tensor; fallback probability will be reported"),
        }

        Ok(Self {
            path: path.to_path_buf(),
            session,
            columns,
            label_output,
            proba_output,
        })
    }

    /// Every internal column must be declared as a graph input of a compatible type
    fn bind_columns(session: &Session) -> anyhow::Result<Vec<(String, ColumnKind)>> {
        let mut columns = Vec::with_capacity(TabularFeatureRow::COLUMNS.len());
        for column in TabularFeatureRow::COLUMNS {
            let input = session
                .inputs
                .iter()
                .find(|input| input.name == column)
                .ok_or_else(|| anyhow!("Pipeline has no input for column '{}'", column))?;

            let kind = match &input.input_type {
                ValueType::Tensor { ty: TensorElementType::Float32, .. } => ColumnKind::Float32,
                ValueType::Tensor { ty: TensorElementType::Float64, .. } => ColumnKind::Float64,
                ValueType::Tensor { ty: TensorElementType::String, .. } => ColumnKind::Text,
                other => bail!("Unsupported input type for column '{}': {:?}", column, other),
            };
            columns.push((column.to_string(), kind));
        }

        if let Some(extra) = session
            .inputs
            .iter()
            .find(|input| !TabularFeatureRow::COLUMNS.contains(&input.name.as_str()))
        {
            bail!("Pipeline expects unknown input '{}'", extra.name);
        }
        Ok(columns)
    }

    fn bind_outputs(session: &Session) -> anyhow::Result<((String, LabelKind), Option<String>)> {
        let label = session
            .outputs
            .first()
            .ok_or_else(|| anyhow!("Pipeline must have a label output"))?;
        let label_kind = match &label.output_type {
            ValueType::Tensor { ty: TensorElementType::String, .. } => LabelKind::Text,
            ValueType::Tensor { ty: TensorElementType::Int64, .. } => LabelKind::Int64,
            other => bail!("Unsupported label output type: {:?}", other),
        };

        let proba = session.outputs.iter().skip(1).find_map(|output| match &output.output_type {
            ValueType::Tensor { ty: TensorElementType::Float32, .. } => Some(output.name.clone()),
            _ => None,
        });

        Ok(((label.name.clone(), label_kind), proba))
    }

    fn run(&self, row: &TabularFeatureRow) -> anyhow::Result<SessionOutputs<'_, '_>> {
        let mut inputs: HashMap<&str, DynValue> = HashMap::new();
        for (column, kind) in &self.columns {
            let value = row
                .value(column)
                .ok_or_else(|| anyhow!("Row has no value for column '{}'", column))?;
            let tensor = match (kind, value) {
                (ColumnKind::Float32, FeatureValue::Numeric(v)) => {
                    Tensor::from_array(Array2::from_elem((1, 1), v as f32))?.into_dyn()
                }
                (ColumnKind::Float64, FeatureValue::Numeric(v)) => {
                    Tensor::from_array(Array2::from_elem((1, 1), v))?.into_dyn()
                }
                (ColumnKind::Text, FeatureValue::Categorical(s)) => {
                    Tensor::from_string_array(Array2::from_elem((1, 1), s.to_string()))?.into_dyn()
                }
                (kind, value) => bail!("Column '{}' expects {:?}, got {:?}", column, kind, value),
            };
            inputs.insert(column.as_str(), tensor);
        }

        self.session
            .run(inputs)
            .with_context(|| format!("Failed to run fertilizer pipeline {:?}", self.path))
    }
}

impl TabularPipeline for OnnxTabularPipeline {
    fn predict_label(&self, row: &TabularFeatureRow) -> anyhow::Result<String> {
        let outputs = self.run(row)?;
        let (name, kind) = &self.label_output;
        let label = match kind {
            LabelKind::Text => outputs[name.as_str()]
                .try_extract_string_tensor()
                .context("Failed to extract predicted label")?
                .iter()
                .next()
                .cloned(),
            LabelKind::Int64 => outputs[name.as_str()]
                .try_extract_tensor::<i64>()
                .context("Failed to extract predicted label")?
                .iter()
                .next()
                .map(|id| id.to_string()),
        };
        label.ok_or_else(|| anyhow!("Fertilizer pipeline returned no label"))
    }

    fn predict_proba(&self, row: &TabularFeatureRow) -> anyhow::Result<Option<Vec<f32>>> {
        let Some(name) = &self.proba_output else {
            return Ok(None);
        };
        let outputs = self.run(row)?;
        let probabilities = outputs[name.as_str()]
            .try_extract_tensor::<f32>()
            .context("Failed to extract class probabilities")?;
        Ok(Some(probabilities.iter().copied().collect()))
    }
}
