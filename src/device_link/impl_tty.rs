use crate::device_link::interface::{DeviceLink, LinkError};
use crate::library::logger::interface::Logger;
use serial2::SerialPort;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceLinkTtyConfig {
    /// Directory scanned for the peripheral, e.g. `/dev/serial/by-id`.
    pub device_dir: PathBuf,
    pub name_prefixes: Vec<String>,
    pub baud_rate: u32,
}

struct TtyConnection {
    path: PathBuf,
    port: SerialPort,
}

/// First entry of `dir`, in path order, whose file name starts with one
/// of `prefixes`.
pub fn find_device(dir: &Path, prefixes: &[String]) -> Result<PathBuf, LinkError> {
    let entries = fs::read_dir(dir).map_err(|e| {
        LinkError::Unavailable(format!("cannot scan {}: {}", dir.display(), e))
    })?;

    let mut candidates: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .filter(|entry| {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            prefixes
                .iter()
                .any(|prefix| name.starts_with(prefix.as_str()))
        })
        .map(|entry| entry.path())
        .collect();
    candidates.sort();

    candidates.into_iter().next().ok_or_else(|| {
        LinkError::Unavailable(format!(
            "no device in {} matching {:?}",
            dir.display(),
            prefixes
        ))
    })
}

/// Peripheral reached through a USB serial character device.
pub struct DeviceLinkTty {
    config: DeviceLinkTtyConfig,
    connection: Mutex<Option<TtyConnection>>,
    logger: Arc<dyn Logger + Send + Sync>,
}

impl DeviceLinkTty {
    pub fn new(config: DeviceLinkTtyConfig, logger: Arc<dyn Logger + Send + Sync>) -> Self {
        Self {
            config,
            connection: Mutex::new(None),
            logger: logger.with_namespace("device_link").with_namespace("tty"),
        }
    }

    fn connection(&self) -> MutexGuard<'_, Option<TtyConnection>> {
        self.connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl DeviceLink for DeviceLinkTty {
    fn connect(&self) -> Result<bool, LinkError> {
        let path = find_device(&self.config.device_dir, &self.config.name_prefixes)?;
        // Raw 8N1: no output post-processing turns `\n` into `\r\n`.
        let port = SerialPort::open(&path, self.config.baud_rate)
            .map_err(|e| LinkError::Unavailable(format!("cannot open {}: {}", path.display(), e)))?;

        let _ = self.logger.info(&format!(
            "Opened {} at {} baud",
            path.display(),
            self.config.baud_rate
        ));
        *self.connection() = Some(TtyConnection { path, port });
        Ok(true)
    }

    fn write(&self, bytes: &[u8]) -> Result<bool, LinkError> {
        let mut connection = self.connection();
        let Some(open) = connection.as_mut() else {
            return Ok(false);
        };

        let written = open.port.write_all(bytes).and_then(|_| open.port.flush());
        match written {
            Ok(()) => Ok(true),
            Err(e) => {
                let message = format!("{}: {}", open.path.display(), e);
                *connection = None;
                Err(LinkError::Write(message))
            }
        }
    }

    fn disconnect(&self) -> Result<(), LinkError> {
        if let Some(closed) = self.connection().take() {
            let _ = self
                .logger
                .info(&format!("Closed {}", closed.path.display()));
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connection().is_some()
    }
}
