use config::{Config, DisplayKind};
use device_camera::impl_fake::DeviceCameraFake;
use device_display::{impl_console::DeviceDisplayConsole, impl_gui::DeviceDisplayGui};
use device_link::gateway::LinkGateway;
use device_link::impl_tty::{DeviceLinkTty, DeviceLinkTtyConfig};
use device_link::interface::DeviceLink;
use image_classifier::impl_fake::ImageClassifierFake;
use library::logger::{impl_console::LoggerConsole, interface::Logger};
use model_source::impl_http::ModelMetadataFetcherHttp;
use session::main::Session;
use std::sync::{Arc, Mutex};

mod config;
mod device_camera;
mod device_display;
mod device_link;
mod image_classifier;
mod library;
mod model_source;
mod prediction;
mod session;

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenv::dotenv().ok();
    let config = Config::from_env()?;

    let logger: Arc<dyn Logger + Send + Sync> =
        Arc::new(LoggerConsole::new(config.logger_timezone));

    let device_camera = Arc::new(DeviceCameraFake::new(logger.clone()));

    let image_classifier = Arc::new(ImageClassifierFake::new(logger.clone()));

    let metadata_fetcher = Arc::new(ModelMetadataFetcherHttp::new(
        config.metadata_timeout,
        logger.clone(),
    ));

    let device_link: Arc<dyn DeviceLink + Send + Sync> = Arc::new(DeviceLinkTty::new(
        DeviceLinkTtyConfig {
            device_dir: config.link_device_dir.clone(),
            name_prefixes: config.link_name_prefixes.clone(),
            baud_rate: config.link_baud_rate,
        },
        logger.clone(),
    ));
    let link_gateway = Arc::new(LinkGateway::new(device_link, logger.clone()));

    match config.display_kind {
        DisplayKind::Console => {
            let device_display = Arc::new(Mutex::new(DeviceDisplayConsole::new()));
            let session = Session::new(
                config,
                logger,
                device_camera,
                device_display,
                image_classifier,
                metadata_fetcher,
                link_gateway,
            );
            session.run()?;
        }
        DisplayKind::Gui => {
            let device_display = DeviceDisplayGui::new(config.model_url.as_deref());
            let window = device_display.window();
            let session = Session::new(
                config,
                logger,
                device_camera,
                Arc::new(Mutex::new(device_display)),
                image_classifier,
                metadata_fetcher,
                link_gateway,
            );
            let running = std::thread::spawn(move || session.run());
            window.run()?;
            running.join().map_err(|_| "session thread panicked")??;
        }
    }

    Ok(())
}
