use serde::Deserialize;
use thiserror::Error;
use url::Url;

pub const TEACHABLE_MACHINE_HOST: &str = "teachablemachine.withgoogle.com";

#[derive(Debug, Error)]
pub enum ModelSourceError {
    #[error("model url is empty")]
    Empty,
    #[error("model url is not a valid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("model url scheme `{0}` is not supported")]
    UnsupportedScheme(String),
    #[error("model url host `{0}` is not a recognised model host")]
    UnrecognisedHost(String),
    #[error("failed to fetch model metadata: {0}")]
    Fetch(String),
    #[error("failed to decode model metadata: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Validated base url of a hosted model, always ending with `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSource {
    base: Url,
}

impl ModelSource {
    pub fn parse(input: &str, allowed_hosts: &[String]) -> Result<Self, ModelSourceError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ModelSourceError::Empty);
        }

        let mut base = Url::parse(trimmed)?;

        if !matches!(base.scheme(), "http" | "https") {
            return Err(ModelSourceError::UnsupportedScheme(base.scheme().to_string()));
        }

        let host = base.host_str().unwrap_or_default().to_lowercase();
        let recognised = allowed_hosts.iter().any(|allowed| {
            let allowed = allowed.to_lowercase();
            host == allowed || host.ends_with(&format!(".{}", allowed))
        });
        if !recognised {
            return Err(ModelSourceError::UnrecognisedHost(host));
        }

        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.set_query(None);
        base.set_fragment(None);

        Ok(Self { base })
    }

    #[allow(dead_code)]
    pub fn base_url(&self) -> &str {
        self.base.as_str()
    }

    #[allow(dead_code)]
    pub fn model_url(&self) -> String {
        format!("{}model.json", self.base)
    }

    pub fn metadata_url(&self) -> String {
        format!("{}metadata.json", self.base)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Image,
    Pose,
    Audio,
}

impl ModelKind {
    /// Unknown or missing package names are treated as image models.
    pub fn from_package_name(package_name: Option<&str>) -> Self {
        match package_name {
            Some("@teachablemachine/pose") => ModelKind::Pose,
            Some("@teachablemachine/audio") => ModelKind::Audio,
            _ => ModelKind::Image,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelMetadata {
    #[serde(default)]
    pub package_name: Option<String>,
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
}

impl ModelMetadata {
    pub fn from_json(body: &str) -> Result<Self, ModelSourceError> {
        Ok(serde_json::from_str(body)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    pub source: ModelSource,
    pub kind: ModelKind,
    pub labels: Vec<String>,
}

impl ModelInfo {
    pub fn from_metadata(source: ModelSource, metadata: ModelMetadata) -> Self {
        Self {
            source,
            kind: ModelKind::from_package_name(metadata.package_name.as_deref()),
            labels: metadata.labels,
        }
    }

    /// Labels the wire format cannot carry.
    pub fn labels_unsafe_for_wire(&self) -> Vec<&str> {
        self.labels
            .iter()
            .filter(|label| label.contains('#') || label.contains('\n'))
            .map(String::as_str)
            .collect()
    }
}
