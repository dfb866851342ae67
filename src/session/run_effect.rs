use crate::config::Config;
use crate::device_camera::interface::DeviceCamera;
use crate::device_display::interface::DeviceDisplay;
use crate::device_link::gateway::LinkGateway;
use crate::device_link::interface::LinkError;
use crate::image_classifier::interface::ImageClassifier;
use crate::library::logger::interface::Logger;
use crate::model_source::interface::ModelMetadataFetcher;
use crate::model_source::source::{ModelInfo, ModelKind, ModelSource};
use crate::prediction::delivery_throttle::SendOutcome;
use crate::session::core::{Effect, Event};
use crate::session::frame_loop::FrameSubscription;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

/// Reports `LinkSendDone` exactly once per send, with a failure when the
/// send is abandoned before it completes (e.g. the writer panicked).
struct SendCompletion {
    send_id: u64,
    event_sender: Sender<Event>,
    completed: bool,
}

impl SendCompletion {
    fn new(send_id: u64, event_sender: Sender<Event>) -> Self {
        Self {
            send_id,
            event_sender,
            completed: false,
        }
    }

    fn complete(mut self, result: Result<bool, LinkError>) {
        self.completed = true;
        let _ = self.event_sender.send(Event::LinkSendDone {
            send_id: self.send_id,
            result,
            at: Instant::now(),
        });
    }
}

impl Drop for SendCompletion {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        let _ = self.event_sender.send(Event::LinkSendDone {
            send_id: self.send_id,
            result: Err(LinkError::Write("send abandoned".to_string())),
            at: Instant::now(),
        });
    }
}

pub struct RunEffect {
    config: Config,
    logger: Arc<dyn Logger + Send + Sync>,
    device_camera: Arc<dyn DeviceCamera + Send + Sync>,
    device_display: Arc<Mutex<dyn DeviceDisplay + Send + Sync>>,
    image_classifier: Arc<dyn ImageClassifier + Send + Sync>,
    metadata_fetcher: Arc<dyn ModelMetadataFetcher + Send + Sync>,
    link_gateway: Arc<LinkGateway>,
    frame_subscription: Mutex<Option<FrameSubscription>>,
}

impl RunEffect {
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
            logger: logger.with_namespace("run_effect"),
            device_camera,
            device_display,
            image_classifier,
            metadata_fetcher,
            link_gateway,
            frame_subscription: Mutex::new(None),
        }
    }

    pub fn run_effect(&self, effect: Effect, event_sender: Sender<Event>) {
        if !matches!(
            effect,
            Effect::SendFrame { .. } | Effect::LogSendOutcome(_) | Effect::LogFrameError { .. }
        ) {
            let _ = self
                .logger
                .info(&format!("Running effect: {}", effect.to_display_string()));
        }

        match effect {
            Effect::SubscribeUserInput => {
                let events = self
                    .device_display
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .events();
                while let Ok(event) = events.recv() {
                    if event_sender.send(Event::UserInput(event)).is_err() {
                        return;
                    }
                }
            }
            Effect::SubscribeTick => loop {
                std::thread::sleep(self.config.tick_rate);
                if event_sender.send(Event::Tick(Instant::now())).is_err() {
                    return;
                }
            },
            Effect::ConnectLink => {
                let connected = if self.link_gateway.is_connected() {
                    Ok(true)
                } else {
                    self.link_gateway.connect()
                };
                let _ = event_sender.send(Event::LinkConnectDone(connected));
            }
            Effect::LoadModel { source } => {
                let loaded = self.load_model(source);
                let _ = event_sender.send(Event::ModelLoadDone(loaded));
            }
            Effect::StartFrameLoop => {
                let started = self.start_frame_loop(event_sender.clone());
                let _ = event_sender.send(Event::FrameLoopStartDone {
                    result: started,
                    at: Instant::now(),
                });
            }
            Effect::SendFrame { send_id, frame } => {
                let completion = SendCompletion::new(send_id, event_sender);
                let sent = self.link_gateway.send(&frame);
                completion.complete(sent);
            }
            Effect::ShowAlert { message } => {
                let _ = self.logger.warn(&message);
                let shown = self
                    .device_display
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .show_alert(&message);
                if let Err(e) = shown {
                    let _ = self.logger.error(&format!("Could not show alert: {}", e));
                }
            }
            Effect::LogSendOutcome(outcome) => self.log_send_outcome(&outcome),
            Effect::LogFrameError { message } => {
                let _ = self.logger.warn(&format!("Frame skipped: {}", message));
            }
            Effect::StopFrameLoop => self.stop_frame_loop(),
            Effect::DisconnectLink => self.link_gateway.disconnect(),
            Effect::StopSession => {
                self.stop_frame_loop();
                self.link_gateway.disconnect();
                let _ = event_sender.send(Event::SessionStopped);
            }
        }
    }

    fn load_model(
        &self,
        source: ModelSource,
    ) -> Result<ModelInfo, Box<dyn std::error::Error + Send + Sync>> {
        let info = match self.metadata_fetcher.fetch(&source) {
            Ok(metadata) => {
                let _ = self.logger.info(&format!(
                    "Model {} has labels {:?}",
                    metadata.model_name.as_deref().unwrap_or("(unnamed)"),
                    metadata.labels
                ));
                ModelInfo::from_metadata(source, metadata)
            }
            Err(e) => {
                let _ = self
                    .logger
                    .warn(&format!("{}; assuming an image model", e));
                ModelInfo {
                    source,
                    kind: ModelKind::Image,
                    labels: Vec::new(),
                }
            }
        };

        let unsafe_labels = info.labels_unsafe_for_wire();
        if !unsafe_labels.is_empty() {
            let _ = self.logger.warn(&format!(
                "Labels {:?} contain `#` or a newline and will garble frames",
                unsafe_labels
            ));
        }

        if info.kind == ModelKind::Image {
            self.image_classifier.load(&info)?;
        }
        Ok(info)
    }

    fn start_frame_loop(
        &self,
        event_sender: Sender<Event>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.device_camera.start()?;

        let subscription = FrameSubscription::start(
            self.device_camera.clone(),
            self.image_classifier.clone(),
            self.config.frame_interval,
            move |result, at| event_sender.send(Event::FrameClassified { result, at }).is_ok(),
        );

        let previous = self
            .frame_subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(subscription);
        if let Some(previous) = previous {
            previous.cancel();
        }
        Ok(())
    }

    fn stop_frame_loop(&self) {
        let subscription = self
            .frame_subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(subscription) = subscription {
            subscription.cancel();
        }

        if let Err(e) = self.device_camera.stop() {
            let _ = self.logger.warn(&format!("Could not stop camera: {}", e));
        }
    }

    fn log_send_outcome(&self, outcome: &SendOutcome) {
        let _ = match outcome {
            SendOutcome::Delivered { .. } => Ok(()),
            SendOutcome::NotReady { prediction } => self
                .logger
                .warn(&format!("Link not ready, {} not sent", prediction)),
            SendOutcome::Failed { prediction, reason } => self
                .logger
                .warn(&format!("Sending {} failed: {}", prediction, reason)),
            SendOutcome::TimedOut { prediction, after } => self.logger.warn(&format!(
                "Sending {} gave no answer after {:?}",
                prediction, after
            )),
            SendOutcome::Stale { send_id } => self
                .logger
                .info(&format!("Late completion of send {} ignored", send_id)),
        };
    }
}
