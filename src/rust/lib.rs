//! A prediction server fronting two trained artifacts for an agricultural
//! assistant: a crop-deficiency image classifier and a fertilizer
//! recommendation pipeline, both run through ONNX Runtime.
//!
//! # Basic Usage
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use agriserve::{ModelRegistry, PredictionService, ServeConfig, FertilizerRequest};
//! use std::sync::Arc;
//!
//! let config = ServeConfig::with_artifacts("models/crop_model.onnx", "models/fertilizer_model.onnx");
//! let service = PredictionService::new(Arc::new(ModelRegistry::load(&config)));
//!
//! let request = FertilizerRequest {
//!     nitrogen: 40.0,
//!     phosphorus: 50.0,
//!     potassium: 40.0,
//!     temperature: 25.0,
//!     humidity: 60.0,
//!     crop_type: "Rice".to_string(),
//!     soil_type: None,
//! };
//! let prediction = service.predict_fertilizer(&request)?;
//! println!("Recommended: {} ({})", prediction.label, prediction.probability);
//! # Ok(())
//! # }
//! ```
//!
//! # Degraded operation
//!
//! Each artifact is loaded independently at startup. If one is missing or
//! broken, its endpoint answers with `ModelUnavailable` while the other keeps
//! working; the registry never retries a load.

pub mod artifact;
pub mod config;
pub mod error;
pub mod model;
pub mod preprocess;
pub mod registry;
mod runtime;
pub mod schema;
pub mod server;
pub mod service;
pub mod vocabulary;

pub use artifact::{ArtifactError, ArtifactSpec};
pub use config::{Args, ServeConfig};
pub use error::{ModelKind, ServeError};
pub use model::{ImageClassifier, OnnxImageClassifier, OnnxTabularPipeline, TabularPipeline};
pub use preprocess::{preprocess_image, PreprocessError};
pub use registry::{ModelRegistry, Slot, SlotState};
pub use runtime::{create_session_builder, RuntimeConfig};
pub use schema::{translate, FertilizerPrediction, FertilizerRequest, ImagePrediction, TabularFeatureRow};
pub use service::{PredictionService, FALLBACK_PROBABILITY};
pub use vocabulary::{ClassVocabulary, CROP_CLASSES};

pub fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}
