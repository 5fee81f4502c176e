use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

/// File name of the crop classifier inside the models directory
pub const CLASSIFIER_FILE: &str = "crop_model.onnx";
/// File name of the fertilizer pipeline inside the models directory
pub const PIPELINE_FILE: &str = "fertilizer_model.onnx";

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Artifact not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Hash mismatch: expected {expected}, got {actual} for {path:?}")]
    HashMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },
}

/// Location of a trained artifact on disk, optionally pinned to a SHA-256 digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSpec {
    pub path: PathBuf,
    pub sha256: Option<String>,
}

impl ArtifactSpec {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            sha256: None,
        }
    }

    pub fn with_sha256(mut self, sha256: impl Into<String>) -> Self {
        self.sha256 = Some(sha256.into().to_lowercase());
        self
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Checks the file is present and, when a digest is pinned, that it matches.
    pub fn verify(&self) -> Result<(), ArtifactError> {
        if !self.exists() {
            return Err(ArtifactError::NotFound(self.path.clone()));
        }
        let Some(expected) = &self.sha256 else {
            return Ok(());
        };

        let actual = file_sha256(&self.path)?;
        log::debug!("Artifact {:?}: expected hash {}, calculated {}", self.path, expected, actual);
        if &actual != expected {
            return Err(ArtifactError::HashMismatch {
                path: self.path.clone(),
                expected: expected.clone(),
                actual,
            });
        }
        Ok(())
    }
}

pub fn file_sha256(path: &Path) -> Result<String, ArtifactError> {
    let bytes = fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Returns the default directory the trained artifacts are read from
pub fn default_models_dir() -> PathBuf {
    // 1. Check environment variable
    if let Ok(path) = env::var("AGRISERVE_MODELS_DIR") {
        return PathBuf::from(path);
    }

    // 2. Use platform-specific data directory
    if let Some(data_dir) = dirs::data_dir() {
        return data_dir.join("agriserve").join("models");
    }

    // 3. Fallback to user's home directory
    if let Some(home_dir) = dirs::home_dir() {
        return home_dir.join(".agriserve").join("models");
    }

    // 4. If all else fails, use system temp directory
    env::temp_dir().join("agriserve").join("models")
}
