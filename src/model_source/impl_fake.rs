use crate::model_source::interface::ModelMetadataFetcher;
use crate::model_source::source::{ModelMetadata, ModelSource, ModelSourceError};

/// Serves a fixed metadata document, or fails every fetch when `None`.
pub struct ModelMetadataFetcherFake {
    metadata: Option<ModelMetadata>,
}

impl ModelMetadataFetcherFake {
    pub fn new(metadata: Option<ModelMetadata>) -> Self {
        Self { metadata }
    }

    pub fn image(labels: &[&str]) -> Self {
        Self::new(Some(ModelMetadata {
            package_name: Some("@teachablemachine/image".to_string()),
            model_name: Some("fake".to_string()),
            labels: labels.iter().map(|label| label.to_string()).collect(),
        }))
    }
}

impl ModelMetadataFetcher for ModelMetadataFetcherFake {
    fn fetch(&self, source: &ModelSource) -> Result<ModelMetadata, ModelSourceError> {
        self.metadata.clone().ok_or_else(|| {
            ModelSourceError::Fetch(format!("no metadata at {}", source.metadata_url()))
        })
    }
}
