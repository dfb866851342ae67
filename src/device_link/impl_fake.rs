use crate::device_link::interface::{DeviceLink, LinkError};
use crate::library::logger::interface::Logger;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeConnectBehavior {
    Accept,
    Decline,
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeWriteBehavior {
    Succeed,
    Fail,
    /// Succeeds after sleeping, holding the write channel meanwhile.
    Delay(Duration),
}

struct FakeLinkState {
    connect_behavior: FakeConnectBehavior,
    write_behavior: FakeWriteBehavior,
    connected: bool,
    written: Vec<Vec<u8>>,
    disconnect_count: usize,
}

pub struct DeviceLinkFake {
    state: Mutex<FakeLinkState>,
    logger: Arc<dyn Logger + Send + Sync>,
}

impl DeviceLinkFake {
    pub fn new(
        connect_behavior: FakeConnectBehavior,
        write_behavior: FakeWriteBehavior,
        logger: Arc<dyn Logger + Send + Sync>,
    ) -> Self {
        Self {
            state: Mutex::new(FakeLinkState {
                connect_behavior,
                write_behavior,
                connected: false,
                written: Vec::new(),
                disconnect_count: 0,
            }),
            logger: logger.with_namespace("device_link").with_namespace("fake"),
        }
    }

    fn state(&self) -> MutexGuard<'_, FakeLinkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn written(&self) -> Vec<Vec<u8>> {
        self.state().written.clone()
    }

    pub fn disconnect_count(&self) -> usize {
        self.state().disconnect_count
    }
}

impl DeviceLink for DeviceLinkFake {
    fn connect(&self) -> Result<bool, LinkError> {
        let mut state = self.state();
        match state.connect_behavior {
            FakeConnectBehavior::Accept => {
                state.connected = true;
                let _ = self.logger.info("Fake micro:bit paired");
                Ok(true)
            }
            FakeConnectBehavior::Decline => Ok(false),
            FakeConnectBehavior::Unavailable => Err(LinkError::Unavailable(
                "fake peripheral is switched off".to_string(),
            )),
        }
    }

    fn write(&self, bytes: &[u8]) -> Result<bool, LinkError> {
        let behavior = {
            let state = self.state();
            if !state.connected {
                return Ok(false);
            }
            state.write_behavior
        };

        match behavior {
            FakeWriteBehavior::Succeed => {}
            FakeWriteBehavior::Fail => {
                self.state().connected = false;
                return Err(LinkError::Write("fake write rejected".to_string()));
            }
            FakeWriteBehavior::Delay(delay) => std::thread::sleep(delay),
        }

        self.state().written.push(bytes.to_vec());
        Ok(true)
    }

    fn disconnect(&self) -> Result<(), LinkError> {
        let mut state = self.state();
        state.connected = false;
        state.disconnect_count += 1;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.state().connected
    }
}
