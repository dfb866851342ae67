use std::error::Error;
use std::sync::mpsc::Receiver;

/// Requests a user makes through the display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceDisplayEvent {
    StartRequested { model_url: String },
    ResetRequested,
    QuitRequested,
}

/// Screen the session drives: a setup form, a running view showing the
/// last frame sent to the peripheral, and alerts.
pub trait DeviceDisplay: Send + Sync {
    /// Shows the model url form. Clears any label shown while running.
    fn show_setup_mode(&mut self) -> Result<(), Box<dyn Error + Send + Sync>>;

    fn show_running_mode(&mut self) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Text of the last dispatched frame, without the terminator.
    fn update_label(&mut self, text: &str) -> Result<(), Box<dyn Error + Send + Sync>>;

    fn show_alert(&mut self, message: &str) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// User requests. Only the first call is guaranteed to receive them.
    fn events(&mut self) -> Receiver<DeviceDisplayEvent>;
}
