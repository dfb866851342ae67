use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("no peripheral available: {0}")]
    Unavailable(String),
    #[error("write to peripheral failed: {0}")]
    Write(String),
    #[error("another send is already in flight")]
    Busy,
}

/// Raw connection to one peripheral.
///
/// Implementations keep the device handle and the write channel together:
/// either both are present or neither is.
pub trait DeviceLink {
    /// `Ok(false)` when the user declines discovery.
    fn connect(&self) -> Result<bool, LinkError>;

    /// `Ok(false)` when not connected. A failed write leaves the link
    /// disconnected.
    fn write(&self, bytes: &[u8]) -> Result<bool, LinkError>;

    /// Local state is cleared even when the teardown itself fails.
    fn disconnect(&self) -> Result<(), LinkError>;

    fn is_connected(&self) -> bool;
}
