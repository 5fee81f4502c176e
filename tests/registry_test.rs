use agriserve::{ModelKind, ModelRegistry, PredictionService, ServeConfig, ServeError, SlotState};
use std::fs;
use std::sync::Arc;

#[test]
fn test_missing_artifacts_leave_process_degraded() {
    let dir = tempfile::tempdir().unwrap();
    let config = ServeConfig::with_artifacts(
        dir.path().join("crop_model.onnx"),
        dir.path().join("fertilizer_model.onnx"),
    );

    let registry = ModelRegistry::load(&config);
    assert_eq!(registry.state(ModelKind::ImageClassifier), SlotState::Absent);
    assert_eq!(registry.state(ModelKind::FertilizerPipeline), SlotState::Absent);

    let service = PredictionService::new(Arc::new(registry));
    assert!(matches!(
        service.predict_image(b"\x89PNG"),
        Err(ServeError::ModelUnavailable(ModelKind::ImageClassifier))
    ));
}

#[test]
fn test_broken_artifacts_fail_independently() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let classifier = dir.path().join("crop_model.onnx");
    let pipeline = dir.path().join("fertilizer_model.onnx");
    // A Keras checkpoint and a joblib pickle are not ONNX graphs
    fs::write(&classifier, b"\x89HDF\r\n\x1a\n")?;
    fs::write(&pipeline, b"\x80\x04\x95")?;

    let registry = ModelRegistry::load(&ServeConfig::with_artifacts(&classifier, &pipeline));
    assert_eq!(registry.state(ModelKind::ImageClassifier), SlotState::Absent);
    assert_eq!(registry.state(ModelKind::FertilizerPipeline), SlotState::Absent);
    Ok(())
}

#[test]
fn test_pinned_hash_mismatch_keeps_slot_absent() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let pipeline = dir.path().join("fertilizer_model.onnx");
    fs::write(&pipeline, b"tampered")?;

    let mut config = ServeConfig::with_artifacts(dir.path().join("missing.onnx"), &pipeline);
    config.pipeline = config.pipeline.with_sha256("0".repeat(64));

    let registry = ModelRegistry::load(&config);
    assert_eq!(registry.state(ModelKind::FertilizerPipeline), SlotState::Absent);
    Ok(())
}
