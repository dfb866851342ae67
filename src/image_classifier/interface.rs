use crate::device_camera::interface::Frame;
use crate::model_source::source::ModelInfo;

/// One class probability out of a single classified frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub class_name: String,
    pub probability: f32,
}

impl Sample {
    pub fn new(class_name: impl Into<String>, probability: f32) -> Self {
        Self {
            class_name: class_name.into(),
            probability,
        }
    }
}

pub trait ImageClassifier {
    fn load(&self, model: &ModelInfo) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Returns one sample per known label.
    fn classify(&self, frame: &Frame) -> Result<Vec<Sample>, Box<dyn std::error::Error + Send + Sync>>;
}
