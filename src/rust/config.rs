use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use crate::artifact::{default_models_dir, ArtifactSpec, CLASSIFIER_FILE, PIPELINE_FILE};
use crate::runtime::RuntimeConfig;

/// Largest accepted image upload
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_PORT: u16 = 8000;

/// Everything the server needs to start.
#[derive(Debug, Clone)]
pub struct ServeConfig {
    pub classifier: ArtifactSpec,
    pub pipeline: ArtifactSpec,
    pub runtime: RuntimeConfig,
    pub host: String,
    pub port: u16,
    pub request_timeout: Duration,
    pub max_upload_bytes: usize,
}

impl Default for ServeConfig {
    fn default() -> Self {
        let models_dir = default_models_dir();
        Self::with_artifacts(models_dir.join(CLASSIFIER_FILE), models_dir.join(PIPELINE_FILE))
    }
}

impl ServeConfig {
    pub fn with_artifacts(classifier: impl Into<PathBuf>, pipeline: impl Into<PathBuf>) -> Self {
        Self {
            classifier: ArtifactSpec::new(classifier),
            pipeline: ArtifactSpec::new(pipeline),
            runtime: RuntimeConfig::default(),
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", self.host, self.port))
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Serve crop-deficiency and fertilizer predictions over HTTP", long_about = None)]
pub struct Args {
    /// Path to the crop image classifier (ONNX)
    #[arg(long, env = "AGRISERVE_CLASSIFIER_PATH")]
    pub classifier_path: Option<PathBuf>,

    /// Path to the fertilizer pipeline (ONNX)
    #[arg(long, env = "AGRISERVE_PIPELINE_PATH")]
    pub pipeline_path: Option<PathBuf>,

    /// Expected SHA-256 of the classifier file
    #[arg(long, env = "AGRISERVE_CLASSIFIER_SHA256")]
    pub classifier_sha256: Option<String>,

    /// Expected SHA-256 of the pipeline file
    #[arg(long, env = "AGRISERVE_PIPELINE_SHA256")]
    pub pipeline_sha256: Option<String>,

    /// Host to bind to
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Seconds before an in-flight request is abandoned
    #[arg(long, default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Largest accepted image upload in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,

    /// Threads ONNX Runtime may use inside one operator (0 lets it decide)
    #[arg(long, default_value_t = 0)]
    pub intra_threads: usize,
}

impl Args {
    pub fn into_config(self) -> ServeConfig {
        let mut config = ServeConfig::default();

        if let Some(path) = self.classifier_path {
            config.classifier.path = path;
        }
        if let Some(path) = self.pipeline_path {
            config.pipeline.path = path;
        }
        if let Some(sha256) = self.classifier_sha256 {
            config.classifier = config.classifier.with_sha256(sha256);
        }
        if let Some(sha256) = self.pipeline_sha256 {
            config.pipeline = config.pipeline.with_sha256(sha256);
        }

        config.host = self.host;
        config.port = self.port;
        config.request_timeout = Duration::from_secs(self.request_timeout_secs);
        config.max_upload_bytes = self.max_upload_bytes;
        config.runtime.intra_threads = self.intra_threads;
        config
    }
}
