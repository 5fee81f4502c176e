//! Wire schemas and the translation from the public fertilizer request to the
//! feature row the tabular pipeline was trained on.
//!
//! `translate` is the only place the two schemas meet. The public field names
//! may change freely; the internal column names are frozen by the trained
//! artifact.

use serde::{Deserialize, Serialize};

/// Soil type assumed when a request does not name one.
pub const DEFAULT_SOIL_TYPE: &str = "Loamy";

/// Fertilizer recommendation request as sent by clients.
///
/// Soil type may arrive as `soilType` or under the older `Soil_Type` key.
/// When both are present `soilType` wins and the other is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "FertilizerRequestWire")]
pub struct FertilizerRequest {
    #[serde(rename = "N")]
    pub nitrogen: f64,
    #[serde(rename = "P")]
    pub phosphorus: f64,
    #[serde(rename = "K")]
    pub potassium: f64,
    pub temperature: f64,
    pub humidity: f64,
    #[serde(rename = "cropType")]
    pub crop_type: String,
    #[serde(rename = "soilType", skip_serializing_if = "Option::is_none")]
    pub soil_type: Option<String>,
}

#[derive(Deserialize)]
struct FertilizerRequestWire {
    #[serde(rename = "N")]
    nitrogen: f64,
    #[serde(rename = "P")]
    phosphorus: f64,
    #[serde(rename = "K")]
    potassium: f64,
    temperature: f64,
    humidity: f64,
    #[serde(rename = "cropType")]
    crop_type: String,
    #[serde(rename = "soilType", default)]
    soil_type: Option<String>,
    #[serde(rename = "Soil_Type", default)]
    legacy_soil_type: Option<String>,
}

impl From<FertilizerRequestWire> for FertilizerRequest {
    fn from(wire: FertilizerRequestWire) -> Self {
        Self {
            nitrogen: wire.nitrogen,
            phosphorus: wire.phosphorus,
            potassium: wire.potassium,
            temperature: wire.temperature,
            humidity: wire.humidity,
            crop_type: wire.crop_type,
            soil_type: wire.soil_type.or(wire.legacy_soil_type),
        }
    }
}

/// A single feature value handed to the tabular pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue<'a> {
    Numeric(f64),
    Categorical(&'a str),
}

/// One row in the internal feature schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TabularFeatureRow {
    #[serde(rename = "Nitrogen")]
    pub nitrogen: f64,
    #[serde(rename = "Phosphorus")]
    pub phosphorus: f64,
    #[serde(rename = "Potassium")]
    pub potassium: f64,
    #[serde(rename = "Temperature")]
    pub temperature: f64,
    #[serde(rename = "Humidity")]
    pub humidity: f64,
    #[serde(rename = "Soil_Type")]
    pub soil_type: String,
    #[serde(rename = "Crop_Type")]
    pub crop_type: String,
}

impl TabularFeatureRow {
    /// Internal column names, in training order.
    pub const COLUMNS: [&'static str; 7] = [
        "Nitrogen",
        "Phosphorus",
        "Potassium",
        "Temperature",
        "Humidity",
        "Soil_Type",
        "Crop_Type",
    ];

    /// Looks up a column by its internal name
    pub fn value(&self, column: &str) -> Option<FeatureValue<'_>> {
        let value = match column {
            "Nitrogen" => FeatureValue::Numeric(self.nitrogen),
            "Phosphorus" => FeatureValue::Numeric(self.phosphorus),
            "Potassium" => FeatureValue::Numeric(self.potassium),
            "Temperature" => FeatureValue::Numeric(self.temperature),
            "Humidity" => FeatureValue::Numeric(self.humidity),
            "Soil_Type" => FeatureValue::Categorical(&self.soil_type),
            "Crop_Type" => FeatureValue::Categorical(&self.crop_type),
            _ => return None,
        };
        Some(value)
    }

    /// Iterates `(column, value)` pairs in training order
    pub fn values(&self) -> impl Iterator<Item = (&'static str, FeatureValue<'_>)> + '_ {
        Self::COLUMNS
            .iter()
            .filter_map(move |&column| self.value(column).map(|value| (column, value)))
    }
}

impl From<&FertilizerRequest> for TabularFeatureRow {
    fn from(request: &FertilizerRequest) -> Self {
        translate(request)
    }
}

/// Maps a public request onto the frozen internal schema.
pub fn translate(request: &FertilizerRequest) -> TabularFeatureRow {
    TabularFeatureRow {
        nitrogen: request.nitrogen,
        phosphorus: request.phosphorus,
        potassium: request.potassium,
        temperature: request.temperature,
        humidity: request.humidity,
        soil_type: request
            .soil_type
            .clone()
            .unwrap_or_else(|| DEFAULT_SOIL_TYPE.to_string()),
        crop_type: request.crop_type.clone(),
    }
}

/// Result of the crop image endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagePrediction {
    #[serde(rename = "deficiency")]
    pub label: String,
    /// Probability of the predicted class, rounded to 4 decimals
    pub confidence: f64,
}

/// Result of the fertilizer endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FertilizerPrediction {
    #[serde(rename = "fertilizer")]
    pub label: String,
    /// Highest class probability, or the fallback when the pipeline has none
    pub probability: f64,
}
