/// Labels of the crop classifier, in the order of its output positions.
///
/// The classifier artifact and this list must agree on width; loaders reject
/// an artifact whose output width differs from `CROP_CLASSES.len()`.
pub const CROP_CLASSES: [&str; 5] = [
    "Healthy",
    "Nitrogen Deficiency",
    "Rust",
    "Powdery Mildew",
    "Bacterial Blight",
];

/// Ordered label set mapping classifier output indices to names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassVocabulary {
    labels: Vec<String>,
}

impl ClassVocabulary {
    pub fn new(labels: Vec<impl Into<String>>) -> Self {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    /// The vocabulary the crop classifier was trained with
    pub fn crop() -> Self {
        Self::new(CROP_CLASSES.to_vec())
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }
}

impl Default for ClassVocabulary {
    fn default() -> Self {
        Self::crop()
    }
}
