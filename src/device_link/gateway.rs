use crate::device_link::interface::{DeviceLink, LinkError};
use crate::library::logger::interface::Logger;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Owns the single outbound connection to the peripheral and allows one
/// write on it at a time.
pub struct LinkGateway {
    link: Arc<dyn DeviceLink + Send + Sync>,
    sending: AtomicBool,
    logger: Arc<dyn Logger + Send + Sync>,
}

struct SendingGuard<'a>(&'a AtomicBool);

impl Drop for SendingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl LinkGateway {
    pub fn new(
        link: Arc<dyn DeviceLink + Send + Sync>,
        logger: Arc<dyn Logger + Send + Sync>,
    ) -> Self {
        Self {
            link,
            sending: AtomicBool::new(false),
            logger: logger.with_namespace("link_gateway"),
        }
    }

    /// Not safe to call while connected; check `is_connected` first.
    pub fn connect(&self) -> Result<bool, LinkError> {
        let _ = self.logger.info("Requesting peripheral...");
        let result = self.link.connect();
        let _ = match &result {
            Ok(true) => self.logger.info("Connected to peripheral"),
            Ok(false) => self.logger.info("Peripheral selection cancelled"),
            Err(e) => self.logger.error(&format!("Connection failed: {}", e)),
        };
        result
    }

    pub fn send(&self, bytes: &[u8]) -> Result<bool, LinkError> {
        if bytes.is_empty() {
            return Ok(false);
        }

        if self
            .sending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(LinkError::Busy);
        }
        let _guard = SendingGuard(&self.sending);

        if !self.link.is_connected() {
            return Ok(false);
        }

        let result = self.link.write(bytes);
        match &result {
            Ok(true) => {
                let text = String::from_utf8_lossy(bytes);
                let _ = self.logger.info(&format!("Sent: {}", text.trim_end()));
            }
            Ok(false) => {}
            Err(e) => {
                let _ = self.logger.warn(&format!("Send failed: {}", e));
            }
        }
        result
    }

    /// Best effort; the link always ends up disconnected.
    pub fn disconnect(&self) {
        if let Err(e) = self.link.disconnect() {
            let _ = self
                .logger
                .warn(&format!("Disconnect did not complete cleanly: {}", e));
        }
        let _ = self.logger.info("Disconnected");
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_connected()
    }
}
