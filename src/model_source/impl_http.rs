use crate::library::logger::interface::Logger;
use crate::model_source::interface::ModelMetadataFetcher;
use crate::model_source::source::{ModelMetadata, ModelSource, ModelSourceError};
use std::sync::Arc;
use std::time::Duration;

pub struct ModelMetadataFetcherHttp {
    agent: ureq::Agent,
    logger: Arc<dyn Logger + Send + Sync>,
}

impl ModelMetadataFetcherHttp {
    pub fn new(timeout: Duration, logger: Arc<dyn Logger + Send + Sync>) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            logger: logger.with_namespace("model_source").with_namespace("http"),
        }
    }
}

impl ModelMetadataFetcher for ModelMetadataFetcherHttp {
    fn fetch(&self, source: &ModelSource) -> Result<ModelMetadata, ModelSourceError> {
        let url = source.metadata_url();
        let _ = self.logger.info(&format!("Fetching {}", url));

        let body = self
            .agent
            .get(&url)
            .call()
            .map_err(|e| ModelSourceError::Fetch(e.to_string()))?
            .into_string()
            .map_err(|e| ModelSourceError::Fetch(e.to_string()))?;

        ModelMetadata::from_json(&body)
    }
}
