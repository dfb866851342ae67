use crate::device_camera::interface::{DeviceCamera, Frame};
use crate::library::logger::interface::Logger;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub struct DeviceCameraFake {
    started: AtomicBool,
    size: u32,
    logger: Arc<dyn Logger + Send + Sync>,
}

impl DeviceCameraFake {
    pub fn new(logger: Arc<dyn Logger + Send + Sync>) -> Self {
        Self {
            started: AtomicBool::new(false),
            size: 400,
            logger: logger.with_namespace("camera").with_namespace("fake"),
        }
    }
}

impl DeviceCamera for DeviceCameraFake {
    fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let _ = self.logger.info("Starting camera...");
        self.started.store(true, Ordering::SeqCst);
        let _ = self.logger.info("Camera started");
        Ok(())
    }

    fn stop(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.started.store(false, Ordering::SeqCst);
        let _ = self.logger.info("Camera stopped");
        Ok(())
    }

    fn capture_frame(&self) -> Result<Frame, Box<dyn std::error::Error + Send + Sync>> {
        if !self.started.load(Ordering::SeqCst) {
            return Err("camera is not started".into());
        }
        Ok(Frame {
            width: self.size,
            height: self.size,
            pixels: vec![0; (self.size * self.size * 3) as usize],
        })
    }
}
