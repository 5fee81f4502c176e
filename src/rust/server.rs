//! HTTP boundary: parses requests, hands them to the prediction service on
//! the blocking pool and maps outcomes to status codes.

use std::sync::Arc;

use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{error, info, warn};
use serde::Serialize;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;

use crate::config::ServeConfig;
use crate::error::{ModelKind, ServeError};
use crate::registry::{ModelRegistry, SlotState};
use crate::schema::{FertilizerPrediction, FertilizerRequest, ImagePrediction};
use crate::service::PredictionService;

/// Failure returned by a handler, rendered as `{"detail": ...}`
#[derive(Debug)]
pub enum ApiError {
    Serve(ServeError),
    BadRequest(StatusCode, String),
}

impl From<ServeError> for ApiError {
    fn from(err: ServeError) -> Self {
        Self::Serve(err)
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::BadRequest(err.status(), err.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            Self::Serve(err @ ServeError::ModelUnavailable(_)) => {
                warn!("{}", err);
                (StatusCode::SERVICE_UNAVAILABLE, err.to_string())
            }
            Self::Serve(err) => {
                error!("{}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
            Self::BadRequest(status, detail) => {
                warn!("Rejected request: {}", detail);
                (status, detail)
            }
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct ModelsHealth {
    pub image_classifier: SlotState,
    pub fertilizer_pipeline: SlotState,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub models: ModelsHealth,
}

/// Builds the router with the upload limit and request timeout applied
pub fn router(service: PredictionService, config: &ServeConfig) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/predict-image", post(predict_image))
        .route("/predict-fertilizer", post(predict_fertilizer))
        .with_state(service)
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(TimeoutLayer::new(config.request_timeout))
}

/// Serves until the process receives Ctrl-C.
pub async fn serve(config: ServeConfig, registry: ModelRegistry) -> anyhow::Result<()> {
    let addr = config.bind_addr()?;
    let service = PredictionService::new(Arc::new(registry));
    let app = router(service, &config);

    let listener = TcpListener::bind(addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

async fn health(State(service): State<PredictionService>) -> Json<HealthResponse> {
    let registry = service.registry();
    let models = ModelsHealth {
        image_classifier: registry.state(ModelKind::ImageClassifier),
        fertilizer_pipeline: registry.state(ModelKind::FertilizerPipeline),
    };
    let all_loaded = models.image_classifier == SlotState::Loaded
        && models.fertilizer_pipeline == SlotState::Loaded;

    Json(HealthResponse {
        status: if all_loaded { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        models,
    })
}

/// POST /predict-image - multipart upload, the first file part is classified
async fn predict_image(
    State(service): State<PredictionService>,
    mut multipart: Multipart,
) -> Result<Json<ImagePrediction>, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.file_name().is_some() {
            upload = Some(field.bytes().await?);
            break;
        }
    }
    let bytes = upload.ok_or_else(|| {
        ApiError::BadRequest(StatusCode::BAD_REQUEST, "No image file in request".to_string())
    })?;

    let prediction = tokio::task::spawn_blocking(move || service.predict_image(&bytes))
        .await
        .map_err(ServeError::inference)??;
    Ok(Json(prediction))
}

/// POST /predict-fertilizer - JSON soil reading
async fn predict_fertilizer(
    State(service): State<PredictionService>,
    Json(request): Json<FertilizerRequest>,
) -> Result<Json<FertilizerPrediction>, ApiError> {
    let prediction = tokio::task::spawn_blocking(move || service.predict_fertilizer(&request))
        .await
        .map_err(ServeError::inference)??;
    Ok(Json(prediction))
}
