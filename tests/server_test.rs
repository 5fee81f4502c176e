use agriserve::server::router;
use agriserve::{
    ClassVocabulary, FertilizerPrediction, ImageClassifier, ImagePrediction, ModelRegistry, PredictionService,
    ServeConfig, TabularFeatureRow, TabularPipeline,
};
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use ndarray::Array4;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

struct HealthyLeaf;

impl ImageClassifier for HealthyLeaf {
    fn output_width(&self) -> usize {
        5
    }

    fn classify(&self, _batch: &Array4<f32>) -> anyhow::Result<Vec<f32>> {
        Ok(vec![0.91, 0.03, 0.02, 0.02, 0.02])
    }
}

struct Urea;

impl TabularPipeline for Urea {
    fn predict_label(&self, _row: &TabularFeatureRow) -> anyhow::Result<String> {
        Ok("Urea".to_string())
    }

    fn predict_proba(&self, _row: &TabularFeatureRow) -> anyhow::Result<Option<Vec<f32>>> {
        Ok(Some(vec![0.88, 0.12]))
    }
}

struct Stalled;

impl TabularPipeline for Stalled {
    fn predict_label(&self, _row: &TabularFeatureRow) -> anyhow::Result<String> {
        std::thread::sleep(Duration::from_secs(1));
        Ok("late".to_string())
    }
}

async fn spawn_server(registry: ModelRegistry, config: ServeConfig) -> SocketAddr {
    let service = PredictionService::new(Arc::new(registry));
    let app = router(service, &config);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn test_config() -> ServeConfig {
    ServeConfig::with_artifacts("/unused/crop_model.onnx", "/unused/fertilizer_model.onnx")
}

fn full_registry() -> ModelRegistry {
    ModelRegistry::new(Some(Box::new(HealthyLeaf)), Some(Box::new(Urea)), ClassVocabulary::crop())
}

fn png_part(width: u32, height: u32) -> Part {
    let image = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(width, height, Rgb([30u8, 120, 40])));
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, ImageFormat::Png).unwrap();
    Part::bytes(bytes.into_inner()).file_name("leaf.png").mime_str("image/png").unwrap()
}

fn soil_reading() -> Value {
    json!({"N": 40, "P": 50, "K": 40, "temperature": 25, "humidity": 60, "cropType": "Rice"})
}

#[tokio::test]
async fn test_predict_image_ok() -> Result<(), Box<dyn std::error::Error>> {
    let addr = spawn_server(full_registry(), test_config()).await;
    let form = Form::new().part("file", png_part(32, 16));

    let response = reqwest::Client::new()
        .post(format!("http://{}/predict-image", addr))
        .multipart(form)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await?;
    assert_eq!(body, json!({"deficiency": "Healthy", "confidence": 0.91}));
    Ok(())
}

#[tokio::test]
async fn test_predict_fertilizer_ok() -> Result<(), Box<dyn std::error::Error>> {
    let addr = spawn_server(full_registry(), test_config()).await;

    let prediction: FertilizerPrediction = reqwest::Client::new()
        .post(format!("http://{}/predict-fertilizer", addr))
        .json(&soil_reading())
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    assert_eq!(prediction.label, "Urea");
    assert_eq!(prediction.probability, 0.88);
    Ok(())
}

#[tokio::test]
async fn test_absent_models_return_503() -> Result<(), Box<dyn std::error::Error>> {
    let addr = spawn_server(ModelRegistry::empty(), test_config()).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("http://{}/predict-image", addr))
        .multipart(Form::new().part("file", png_part(4, 4)))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json().await?;
    assert_eq!(body["detail"], "Crop model offline");

    let response = client
        .post(format!("http://{}/predict-fertilizer", addr))
        .json(&soil_reading())
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json().await?;
    assert_eq!(body["detail"], "Fertilizer model offline");
    Ok(())
}

#[tokio::test]
async fn test_corrupt_image_returns_500() -> Result<(), Box<dyn std::error::Error>> {
    let addr = spawn_server(full_registry(), test_config()).await;
    let part = Part::bytes(b"not really a png".to_vec()).file_name("leaf.png");

    let response = reqwest::Client::new()
        .post(format!("http://{}/predict-image", addr))
        .multipart(Form::new().part("file", part))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await?;
    assert!(body["detail"].as_str().unwrap().starts_with("Invalid input"));
    Ok(())
}

#[tokio::test]
async fn test_missing_file_part_returns_400() -> Result<(), Box<dyn std::error::Error>> {
    let addr = spawn_server(full_registry(), test_config()).await;

    let response = reqwest::Client::new()
        .post(format!("http://{}/predict-image", addr))
        .multipart(Form::new().text("note", "no image here"))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn test_oversized_upload_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = test_config();
    config.max_upload_bytes = 1024;
    let addr = spawn_server(full_registry(), config).await;
    let part = Part::bytes(vec![0u8; 16 * 1024]).file_name("huge.png");

    let response = reqwest::Client::new()
        .post(format!("http://{}/predict-image", addr))
        .multipart(Form::new().part("file", part))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    Ok(())
}

#[tokio::test]
async fn test_malformed_fertilizer_body_is_rejected_at_boundary() -> Result<(), Box<dyn std::error::Error>> {
    let addr = spawn_server(full_registry(), test_config()).await;

    let response = reqwest::Client::new()
        .post(format!("http://{}/predict-fertilizer", addr))
        .json(&json!({"N": 40, "cropType": "Rice"}))
        .send()
        .await?;
    assert!(response.status().is_client_error());
    Ok(())
}

#[tokio::test]
async fn test_stalled_inference_times_out() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = test_config();
    config.request_timeout = Duration::from_millis(200);
    let registry = ModelRegistry::new(None, Some(Box::new(Stalled)), ClassVocabulary::crop());
    let addr = spawn_server(registry, config).await;

    let response = reqwest::Client::new()
        .post(format!("http://{}/predict-fertilizer", addr))
        .json(&soil_reading())
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    Ok(())
}

#[tokio::test]
async fn test_health_reports_slot_states() -> Result<(), Box<dyn std::error::Error>> {
    let registry = ModelRegistry::new(Some(Box::new(HealthyLeaf)), None, ClassVocabulary::crop());
    let addr = spawn_server(registry, test_config()).await;

    let body: Value = reqwest::get(format!("http://{}/health", addr)).await?.json().await?;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["models"]["image_classifier"], "loaded");
    assert_eq!(body["models"]["fertilizer_pipeline"], "absent");

    let addr = spawn_server(full_registry(), test_config()).await;
    let body: Value = reqwest::get(format!("http://{}/health", addr)).await?.json().await?;
    assert_eq!(body["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn test_image_response_deserializes() -> Result<(), Box<dyn std::error::Error>> {
    let addr = spawn_server(full_registry(), test_config()).await;

    let prediction: ImagePrediction = reqwest::Client::new()
        .post(format!("http://{}/predict-image", addr))
        .multipart(Form::new().part("image", png_part(300, 200)))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(prediction.label, "Healthy");
    Ok(())
}
