use crate::model_source::source::{ModelMetadata, ModelSource, ModelSourceError};

pub trait ModelMetadataFetcher {
    fn fetch(&self, source: &ModelSource) -> Result<ModelMetadata, ModelSourceError>;
}
