use crate::device_display::interface::DeviceDisplay;
use crate::session::core::State;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Screen {
    Setup,
    Running { label: Option<String> },
}

impl Screen {
    fn of(state: &State) -> Option<Screen> {
        match state {
            State::Setup
            | State::Connecting { .. }
            | State::LoadingModel { .. }
            | State::StartingFrameLoop { .. }
            | State::Stopping { .. } => Some(Screen::Setup),
            State::Running { label, .. } => Some(Screen::Running {
                label: label.clone(),
            }),
            State::Exited => None,
        }
    }
}

/// Pushes the screen implied by the session state to the display, only
/// touching what changed since the last render.
pub struct Render {
    device_display: Arc<Mutex<dyn DeviceDisplay + Send + Sync>>,
    shown: Mutex<Option<Screen>>,
}

impl Render {
    pub fn new(device_display: Arc<Mutex<dyn DeviceDisplay + Send + Sync>>) -> Self {
        Self {
            device_display,
            shown: Mutex::new(None),
        }
    }

    pub fn render(&self, state: &State) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let Some(screen) = Screen::of(state) else {
            return Ok(());
        };

        let mut shown = self.shown.lock().unwrap_or_else(PoisonError::into_inner);
        if shown.as_ref() == Some(&screen) {
            return Ok(());
        }

        let mut device_display = self
            .device_display
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        match (&*shown, &screen) {
            (_, Screen::Setup) => device_display.show_setup_mode()?,
            (Some(Screen::Running { .. }), Screen::Running { label }) => {
                device_display.update_label(label.as_deref().unwrap_or_default())?
            }
            (_, Screen::Running { label }) => {
                device_display.show_running_mode()?;
                if let Some(label) = label {
                    device_display.update_label(label)?;
                }
            }
        }

        *shown = Some(screen);
        Ok(())
    }
}
