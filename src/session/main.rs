use crate::config::Config;
use crate::device_camera::interface::DeviceCamera;
use crate::device_display::interface::DeviceDisplay;
use crate::device_link::gateway::LinkGateway;
use crate::image_classifier::interface::ImageClassifier;
use crate::library::logger::interface::Logger;
use crate::library::state_machine::StateMachine;
use crate::model_source::interface::ModelMetadataFetcher;
use crate::session::core::{init, transition, Event, State};
use crate::session::render::Render;
use crate::session::run_effect::RunEffect;
use std::sync::{Arc, Mutex};

/// Bridges classifier output to the peripheral until the user quits.
pub struct Session {
    pub config: Config,
    pub logger: Arc<dyn Logger + Send + Sync>,
    pub device_camera: Arc<dyn DeviceCamera + Send + Sync>,
    pub device_display: Arc<Mutex<dyn DeviceDisplay + Send + Sync>>,
    pub image_classifier: Arc<dyn ImageClassifier + Send + Sync>,
    pub metadata_fetcher: Arc<dyn ModelMetadataFetcher + Send + Sync>,
    pub link_gateway: Arc<LinkGateway>,
}

impl Session {
    pub fn new(
        config: Config,
        logger: Arc<dyn Logger + Send + Sync>,
        device_camera: Arc<dyn DeviceCamera + Send + Sync>,
        device_display: Arc<Mutex<dyn DeviceDisplay + Send + Sync>>,
        image_classifier: Arc<dyn ImageClassifier + Send + Sync>,
        metadata_fetcher: Arc<dyn ModelMetadataFetcher + Send + Sync>,
        link_gateway: Arc<LinkGateway>,
    ) -> Self {
        Self {
            config,
            logger: logger.with_namespace("session"),
            device_camera,
            device_display,
            image_classifier,
            metadata_fetcher,
            link_gateway,
        }
    }

    /// Blocks until the session has exited and returns its final state.
    pub fn run(self) -> Result<State, Box<dyn std::error::Error + Send + Sync>> {
        let render = Render::new(self.device_display.clone());
        let run_effect = RunEffect::new(
            self.config.clone(),
            self.logger.clone(),
            self.device_camera,
            self.device_display,
            self.image_classifier,
            self.metadata_fetcher,
            self.link_gateway,
        );

        let config = self.config;
        let init = init(&config);
        let transition_logger = self.logger.with_namespace("transition");
        let render_logger = self.logger.with_namespace("render");

        let state_machine = StateMachine::new(
            init,
            move |state: State, event: Event| {
                if !event.is_periodic() {
                    let _ = transition_logger.info(&format!(
                        "event: {}",
                        event.to_display_string()
                    ));
                }
                transition(&config, state, event)
            },
            move |state: &State| {
                if let Err(e) = render.render(state) {
                    let _ = render_logger.error(&format!("Render failed: {}", e));
                }
            },
            move |effect, event_sender| run_effect.run_effect(effect, event_sender),
            |state: &State| matches!(state, State::Exited),
        );

        state_machine.run()
    }
}
