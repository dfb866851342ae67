use crate::device_camera::interface::Frame;
use crate::image_classifier::interface::{ImageClassifier, Sample};
use crate::library::logger::interface::Logger;
use crate::model_source::source::ModelInfo;
use rand::distr::{Distribution, Uniform};
use std::sync::{Arc, Mutex, PoisonError};

const DEFAULT_LABELS: [&str; 2] = ["Class 1", "Class 2"];

/// Chance per frame that the scene in front of the camera changes.
const SCENE_CHANGE_RATE: f32 = 0.01;

/// Produces one normalized probability per label, favouring a dominant
/// label that drifts over time.
pub struct ImageClassifierFake {
    labels: Mutex<Vec<String>>,
    dominant: Mutex<usize>,
    logger: Arc<dyn Logger + Send + Sync>,
}

impl ImageClassifierFake {
    pub fn new(logger: Arc<dyn Logger + Send + Sync>) -> Self {
        Self {
            labels: Mutex::new(Vec::new()),
            dominant: Mutex::new(0),
            logger: logger.with_namespace("image_classifier").with_namespace("fake"),
        }
    }
}

impl ImageClassifier for ImageClassifierFake {
    fn load(&self, model: &ModelInfo) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let labels: Vec<String> = if model.labels.is_empty() {
            DEFAULT_LABELS.iter().map(|label| label.to_string()).collect()
        } else {
            model.labels.clone()
        };

        let _ = self
            .logger
            .info(&format!("Loaded fake model with labels {:?}", labels));

        *self.labels.lock().unwrap_or_else(PoisonError::into_inner) = labels;
        *self.dominant.lock().unwrap_or_else(PoisonError::into_inner) = 0;
        Ok(())
    }

    fn classify(
        &self,
        _frame: &Frame,
    ) -> Result<Vec<Sample>, Box<dyn std::error::Error + Send + Sync>> {
        let labels = self.labels.lock().unwrap_or_else(PoisonError::into_inner);
        if labels.is_empty() {
            return Err("model is not loaded".into());
        }

        let mut rng = rand::rng();
        let unit_dist = Uniform::new(0.0f32, 1.0)?;

        let mut dominant = self.dominant.lock().unwrap_or_else(PoisonError::into_inner);
        if unit_dist.sample(&mut rng) < SCENE_CHANGE_RATE || *dominant >= labels.len() {
            let index_dist = Uniform::new(0, labels.len())?;
            *dominant = index_dist.sample(&mut rng);
        }

        let confidence = Uniform::new(0.55f32, 0.95)?.sample(&mut rng);
        let weights: Vec<f32> = (0..labels.len())
            .map(|_| unit_dist.sample(&mut rng) + f32::EPSILON)
            .collect();
        let other_weight: f32 = weights
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != *dominant)
            .map(|(_, weight)| weight)
            .sum();

        let samples = labels
            .iter()
            .enumerate()
            .map(|(index, label)| {
                let probability = if labels.len() == 1 {
                    1.0
                } else if index == *dominant {
                    confidence
                } else {
                    (1.0 - confidence) * weights[index] / other_weight
                };
                Sample::new(label.clone(), probability)
            })
            .collect();

        Ok(samples)
    }
}
