use std::fmt;

use anyhow::Context;
use log::{error, info, warn};

use crate::artifact::{ArtifactError, ArtifactSpec};
use crate::config::ServeConfig;
use crate::error::ModelKind;
use crate::model::{ImageClassifier, OnnxImageClassifier, OnnxTabularPipeline, TabularPipeline};
use crate::vocabulary::ClassVocabulary;

/// Holds an artifact handle, or records that none could be loaded.
///
/// The state is decided once at startup and never changes afterwards.
pub enum Slot<T> {
    Loaded(T),
    Absent,
}

impl<T> Slot<T> {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    pub fn loaded(self) -> Option<T> {
        match self {
            Self::Loaded(handle) => Some(handle),
            Self::Absent => None,
        }
    }
}

impl<T> From<Option<T>> for Slot<T> {
    fn from(handle: Option<T>) -> Self {
        handle.map_or(Self::Absent, Self::Loaded)
    }
}

impl<T> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loaded(_) => write!(f, "Loaded"),
            Self::Absent => write!(f, "Absent"),
        }
    }
}

/// Externally visible state of a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotState {
    Loaded,
    Absent,
}

/// The two artifact handles the server fronts, each independently present or absent.
///
/// Built once before the server accepts requests and shared read-only
/// afterwards; nothing here locks or reloads.
#[derive(Debug)]
pub struct ModelRegistry {
    image: Slot<Box<dyn ImageClassifier>>,
    tabular: Slot<Box<dyn TabularPipeline>>,
    vocabulary: ClassVocabulary,
}

impl ModelRegistry {
    /// Builds a registry from handles that were loaded elsewhere.
    ///
    /// A classifier whose output width disagrees with `vocabulary` is
    /// refused and its slot left absent.
    pub fn new(
        image: Option<Box<dyn ImageClassifier>>,
        tabular: Option<Box<dyn TabularPipeline>>,
        vocabulary: ClassVocabulary,
    ) -> Self {
        let image = image.filter(|classifier| {
            let width = classifier.output_width();
            if width != vocabulary.len() {
                error!(
                    "{} scores {} classes but the vocabulary has {}; endpoint disabled",
                    ModelKind::ImageClassifier,
                    width,
                    vocabulary.len()
                );
                return false;
            }
            true
        });

        Self {
            image: image.into(),
            tabular: tabular.into(),
            vocabulary,
        }
    }

    /// A registry with both slots absent
    pub fn empty() -> Self {
        Self::new(None, None, ClassVocabulary::crop())
    }

    /// Loads both artifacts independently.
    ///
    /// Never fails: an artifact that cannot be loaded is logged and its slot
    /// stays absent, leaving the other endpoint unaffected.
    pub fn load(config: &ServeConfig) -> Self {
        let vocabulary = ClassVocabulary::crop();

        let image = load_slot(ModelKind::ImageClassifier, &config.classifier, |spec| {
            let classifier = OnnxImageClassifier::load(&spec.path, &config.runtime, vocabulary.len())?;
            Ok(Box::new(classifier) as Box<dyn ImageClassifier>)
        });
        let tabular = load_slot(ModelKind::FertilizerPipeline, &config.pipeline, |spec| {
            let pipeline = OnnxTabularPipeline::load(&spec.path, &config.runtime)?;
            Ok(Box::new(pipeline) as Box<dyn TabularPipeline>)
        });

        Self { image, tabular, vocabulary }
    }

    pub fn image(&self) -> Slot<&dyn ImageClassifier> {
        match &self.image {
            Slot::Loaded(handle) => Slot::Loaded(handle.as_ref()),
            Slot::Absent => Slot::Absent,
        }
    }

    pub fn tabular(&self) -> Slot<&dyn TabularPipeline> {
        match &self.tabular {
            Slot::Loaded(handle) => Slot::Loaded(handle.as_ref()),
            Slot::Absent => Slot::Absent,
        }
    }

    pub fn state(&self, kind: ModelKind) -> SlotState {
        let loaded = match kind {
            ModelKind::ImageClassifier => self.image.is_loaded(),
            ModelKind::FertilizerPipeline => self.tabular.is_loaded(),
        };
        if loaded {
            SlotState::Loaded
        } else {
            SlotState::Absent
        }
    }

    pub fn vocabulary(&self) -> &ClassVocabulary {
        &self.vocabulary
    }
}

fn load_slot<T>(
    kind: ModelKind,
    spec: &ArtifactSpec,
    load: impl FnOnce(&ArtifactSpec) -> anyhow::Result<T>,
) -> Slot<T> {
    if let Err(e) = spec.verify() {
        match e {
            ArtifactError::NotFound(path) => warn!("{} not found at {:?}; endpoint disabled", kind, path),
            other => error!("{} rejected: {}; endpoint disabled", kind, other),
        }
        return Slot::Absent;
    }

    match load(spec).with_context(|| format!("Error loading {} from {:?}", kind, spec.path)) {
        Ok(handle) => {
            info!("{} loaded from {:?}", kind, spec.path);
            Slot::Loaded(handle)
        }
        Err(e) => {
            error!("{:#}", e);
            Slot::Absent
        }
    }
}
