use crate::device_display::interface::{DeviceDisplay, DeviceDisplayEvent};
use std::error::Error;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayCall {
    SetupMode,
    RunningMode,
    Label(String),
    Alert(String),
}

/// Records every call and lets tests play the user through `sender`.
pub struct DeviceDisplayFake {
    calls: Vec<DisplayCall>,
    event_sender: Sender<DeviceDisplayEvent>,
    event_receiver: Mutex<Option<Receiver<DeviceDisplayEvent>>>,
}

impl DeviceDisplayFake {
    pub fn new() -> Self {
        let (event_sender, event_receiver) = channel();
        Self {
            calls: Vec::new(),
            event_sender,
            event_receiver: Mutex::new(Some(event_receiver)),
        }
    }

    pub fn sender(&self) -> Sender<DeviceDisplayEvent> {
        self.event_sender.clone()
    }

    pub fn calls(&self) -> &[DisplayCall] {
        &self.calls
    }

    pub fn labels(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                DisplayCall::Label(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn alerts(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                DisplayCall::Alert(message) => Some(message.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl DeviceDisplay for DeviceDisplayFake {
    fn show_setup_mode(&mut self) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.calls.push(DisplayCall::SetupMode);
        Ok(())
    }

    fn show_running_mode(&mut self) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.calls.push(DisplayCall::RunningMode);
        Ok(())
    }

    fn update_label(&mut self, text: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.calls.push(DisplayCall::Label(text.to_string()));
        Ok(())
    }

    fn show_alert(&mut self, message: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.calls.push(DisplayCall::Alert(message.to_string()));
        Ok(())
    }

    fn events(&mut self) -> Receiver<DeviceDisplayEvent> {
        let event_receiver = self
            .event_receiver
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        match event_receiver.take() {
            Some(receiver) => receiver,
            None => channel().1,
        }
    }
}
