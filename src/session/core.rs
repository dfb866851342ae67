use crate::config::Config;
use crate::device_display::interface::DeviceDisplayEvent;
use crate::device_link::interface::LinkError;
use crate::image_classifier::interface::Sample;
use crate::model_source::source::{ModelInfo, ModelKind, ModelSource};
use crate::prediction::delivery_throttle::{DeliveryThrottle, SendOutcome};
use std::time::Instant;

#[derive(Debug, Clone, PartialEq)]
pub enum State {
    Setup,
    Connecting {
        source: ModelSource,
    },
    LoadingModel {
        source: ModelSource,
    },
    StartingFrameLoop {
        info: ModelInfo,
    },
    Running {
        info: ModelInfo,
        throttle: DeliveryThrottle,
        /// Text of the last frame handed to the link.
        label: Option<String>,
    },
    Stopping {
        exit_after: bool,
    },
    Exited,
}

#[derive(Debug)]
pub enum Event {
    Tick(Instant),
    UserInput(DeviceDisplayEvent),
    LinkConnectDone(Result<bool, LinkError>),
    ModelLoadDone(Result<ModelInfo, Box<dyn std::error::Error + Send + Sync>>),
    FrameLoopStartDone {
        result: Result<(), Box<dyn std::error::Error + Send + Sync>>,
        at: Instant,
    },
    FrameClassified {
        result: Result<Vec<Sample>, Box<dyn std::error::Error + Send + Sync>>,
        at: Instant,
    },
    LinkSendDone {
        send_id: u64,
        result: Result<bool, LinkError>,
        at: Instant,
    },
    SessionStopped,
}

impl Event {
    pub fn to_display_string(&self) -> String {
        match self {
            Event::FrameClassified { result: Ok(samples), .. } => {
                format!("FrameClassified(Ok({} samples))", samples.len())
            }
            event => format!("{:?}", event),
        }
    }

    /// Events arriving every tick or frame; not worth a log line each.
    pub fn is_periodic(&self) -> bool {
        matches!(self, Event::Tick(_) | Event::FrameClassified { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    SubscribeUserInput,
    SubscribeTick,
    ConnectLink,
    LoadModel { source: ModelSource },
    StartFrameLoop,
    SendFrame { send_id: u64, frame: Vec<u8> },
    ShowAlert { message: String },
    LogSendOutcome(SendOutcome),
    LogFrameError { message: String },
    StopFrameLoop,
    DisconnectLink,
    /// Cancels the frame loop, then disconnects the link, then reports
    /// `SessionStopped`.
    StopSession,
}

impl Effect {
    pub fn to_display_string(&self) -> String {
        match self {
            Effect::SendFrame { send_id, frame } => format!(
                "SendFrame {{ send_id: {}, frame: {:?} }}",
                send_id,
                String::from_utf8_lossy(frame)
            ),
            effect => format!("{:?}", effect),
        }
    }
}

pub fn init(config: &Config) -> (State, Vec<Effect>) {
    let mut effects = vec![Effect::SubscribeUserInput, Effect::SubscribeTick];

    let state = match &config.model_url {
        Some(model_url) => {
            let (state, start_effects) = start(config, model_url);
            effects.extend(start_effects);
            state
        }
        None => State::Setup,
    };

    (state, effects)
}

fn start(config: &Config, model_url: &str) -> (State, Vec<Effect>) {
    match ModelSource::parse(model_url, &config.allowed_model_hosts) {
        Ok(source) => (State::Connecting { source }, vec![Effect::ConnectLink]),
        Err(e) => (
            State::Setup,
            vec![Effect::ShowAlert {
                message: format!("Invalid model url: {}", e),
            }],
        ),
    }
}

fn abort(message: String) -> (State, Vec<Effect>) {
    (
        State::Stopping { exit_after: false },
        vec![Effect::ShowAlert { message }, Effect::StopSession],
    )
}

pub fn transition(config: &Config, state: State, event: Event) -> (State, Vec<Effect>) {
    match (state, event) {
        (State::Exited, _) => (State::Exited, vec![]),

        // User input
        (State::Setup, Event::UserInput(DeviceDisplayEvent::StartRequested { model_url })) => {
            start(config, &model_url)
        }
        (State::Setup, Event::UserInput(DeviceDisplayEvent::ResetRequested)) => {
            (State::Setup, vec![])
        }
        (State::Stopping { .. }, Event::UserInput(DeviceDisplayEvent::QuitRequested)) => {
            (State::Stopping { exit_after: true }, vec![])
        }
        (State::Stopping { exit_after }, Event::UserInput(_)) => {
            (State::Stopping { exit_after }, vec![])
        }
        (_, Event::UserInput(DeviceDisplayEvent::QuitRequested)) => (
            State::Stopping { exit_after: true },
            vec![Effect::StopSession],
        ),
        (_, Event::UserInput(DeviceDisplayEvent::ResetRequested)) => (
            State::Stopping { exit_after: false },
            vec![Effect::StopSession],
        ),
        (state, Event::UserInput(DeviceDisplayEvent::StartRequested { .. })) => (state, vec![]),

        // Startup
        (State::Connecting { source }, Event::LinkConnectDone(Ok(true))) => (
            State::LoadingModel {
                source: source.clone(),
            },
            vec![Effect::LoadModel { source }],
        ),
        (State::Connecting { .. }, Event::LinkConnectDone(Ok(false))) => (
            State::Setup,
            vec![Effect::ShowAlert {
                message: "No micro:bit selected".to_string(),
            }],
        ),
        (State::Connecting { .. }, Event::LinkConnectDone(Err(e))) => (
            State::Setup,
            vec![Effect::ShowAlert {
                message: format!("Could not connect to the micro:bit: {}", e),
            }],
        ),
        (state, Event::LinkConnectDone(Ok(true))) => (state, vec![Effect::DisconnectLink]),
        (state, Event::LinkConnectDone(_)) => (state, vec![]),

        (State::LoadingModel { .. }, Event::ModelLoadDone(Ok(info))) => {
            if info.kind != ModelKind::Image {
                return abort(format!(
                    "Only image models are supported, this is a {:?} model",
                    info.kind
                ));
            }
            (State::StartingFrameLoop { info }, vec![Effect::StartFrameLoop])
        }
        (State::LoadingModel { .. }, Event::ModelLoadDone(Err(e))) => {
            abort(format!("Could not load the model: {}", e))
        }
        (state, Event::ModelLoadDone(_)) => (state, vec![]),

        (State::StartingFrameLoop { info }, Event::FrameLoopStartDone { result: Ok(()), at }) => (
            State::Running {
                info,
                throttle: DeliveryThrottle::new(config.throttle(), at),
                label: None,
            },
            vec![],
        ),
        (State::StartingFrameLoop { .. }, Event::FrameLoopStartDone { result: Err(e), .. }) => {
            abort(format!("Could not start the camera: {}", e))
        }
        (state, Event::FrameLoopStartDone { result: Ok(()), .. }) => {
            (state, vec![Effect::StopFrameLoop])
        }
        (state, Event::FrameLoopStartDone { .. }) => (state, vec![]),

        // Steady state
        (
            State::Running {
                info,
                mut throttle,
                label,
            },
            Event::FrameClassified { result, at },
        ) => match result {
            Ok(samples) => match throttle.on_frame(&samples, at) {
                Some(dispatch) => (
                    State::Running {
                        info,
                        throttle,
                        label: Some(dispatch.prediction.to_string()),
                    },
                    vec![Effect::SendFrame {
                        send_id: dispatch.send_id,
                        frame: dispatch.frame,
                    }],
                ),
                None => (
                    State::Running {
                        info,
                        throttle,
                        label,
                    },
                    vec![],
                ),
            },
            Err(e) => (
                State::Running {
                    info,
                    throttle,
                    label,
                },
                vec![Effect::LogFrameError {
                    message: e.to_string(),
                }],
            ),
        },
        (state, Event::FrameClassified { .. }) => (state, vec![]),

        (
            State::Running {
                info,
                mut throttle,
                label,
            },
            Event::LinkSendDone {
                send_id,
                result,
                at,
            },
        ) => {
            let outcome = throttle.on_send_done(send_id, &result, at);
            (
                State::Running {
                    info,
                    throttle,
                    label,
                },
                vec![Effect::LogSendOutcome(outcome)],
            )
        }
        (state, Event::LinkSendDone { .. }) => (state, vec![]),

        (
            State::Running {
                info,
                mut throttle,
                label,
            },
            Event::Tick(now),
        ) => {
            let effects = throttle
                .on_tick(now)
                .map(Effect::LogSendOutcome)
                .into_iter()
                .collect();
            (
                State::Running {
                    info,
                    throttle,
                    label,
                },
                effects,
            )
        }
        (state, Event::Tick(_)) => (state, vec![]),

        // Teardown
        (State::Stopping { exit_after: true }, Event::SessionStopped) => (State::Exited, vec![]),
        (State::Stopping { exit_after: false }, Event::SessionStopped) => (State::Setup, vec![]),
        (state, Event::SessionStopped) => (state, vec![]),
    }
}
