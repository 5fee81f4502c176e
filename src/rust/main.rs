use agriserve::{server, Args, ModelKind, ModelRegistry, SlotState};
use clap::Parser;
use log::{info, warn};
use std::time::Instant;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    agriserve::init_logger();
    let config = Args::parse().into_config();

    info!("=== Starting agriserve v{} ===", env!("CARGO_PKG_VERSION"));
    info!("  Classifier path: {:?}", config.classifier.path);
    info!("  Pipeline path:   {:?}", config.pipeline.path);
    info!("  Request timeout: {:?}", config.request_timeout);

    // Both artifacts are loaded before the listener binds
    let start_time = Instant::now();
    let load_config = config.clone();
    let registry = tokio::task::spawn_blocking(move || ModelRegistry::load(&load_config)).await?;
    info!("=== Models loaded (took {:.2?}) ===", start_time.elapsed());

    for kind in [ModelKind::ImageClassifier, ModelKind::FertilizerPipeline] {
        if registry.state(kind) == SlotState::Absent {
            warn!("{} unavailable; its endpoint will answer 503", kind);
        }
    }

    server::serve(config, registry).await
}
