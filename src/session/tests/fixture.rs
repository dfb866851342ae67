use crate::config::Config;
use crate::device_camera::impl_fake::DeviceCameraFake;
use crate::device_display::impl_fake::DeviceDisplayFake;
use crate::device_link::gateway::LinkGateway;
use crate::device_link::impl_fake::{DeviceLinkFake, FakeConnectBehavior, FakeWriteBehavior};
use crate::image_classifier::impl_fake::ImageClassifierFake;
use crate::library::logger::impl_fake::LoggerFake;
use crate::model_source::impl_fake::ModelMetadataFetcherFake;
use crate::session::main::Session;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const MODEL_URL: &str = "https://teachablemachine.withgoogle.com/models/abc123/";

#[allow(dead_code)]
pub struct Fixture {
    pub config: Config,
    pub logger: LoggerFake,
    pub device_display: Arc<Mutex<DeviceDisplayFake>>,
    pub device_link: Arc<DeviceLinkFake>,
    pub session: Session,
}

impl Fixture {
    pub fn new(connect: FakeConnectBehavior, metadata_fetcher: ModelMetadataFetcherFake) -> Self {
        Self::with_logger(connect, metadata_fetcher, LoggerFake::new())
    }

    pub fn with_logger(
        connect: FakeConnectBehavior,
        metadata_fetcher: ModelMetadataFetcherFake,
        logger: LoggerFake,
    ) -> Self {
        let config = Config {
            tick_rate: Duration::from_millis(10),
            frame_interval: Duration::from_millis(5),
            window_duration: Duration::from_millis(40),
            ..Config::default()
        };
        let shared_logger = Arc::new(logger.clone());
        let device_camera = Arc::new(DeviceCameraFake::new(shared_logger.clone()));
        let device_display = Arc::new(Mutex::new(DeviceDisplayFake::new()));
        let device_link = Arc::new(DeviceLinkFake::new(
            connect,
            FakeWriteBehavior::Succeed,
            shared_logger.clone(),
        ));
        let link_gateway = Arc::new(LinkGateway::new(
            device_link.clone(),
            shared_logger.clone(),
        ));
        let image_classifier = Arc::new(ImageClassifierFake::new(shared_logger.clone()));
        let session = Session::new(
            config.clone(),
            shared_logger,
            device_camera,
            device_display.clone(),
            image_classifier,
            Arc::new(metadata_fetcher),
            link_gateway,
        );

        Self {
            config,
            logger,
            device_display,
            device_link,
            session,
        }
    }
}
