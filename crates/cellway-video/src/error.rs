use thiserror::Error;

/// Error type for the capture layer.
#[derive(Debug, Error)]
pub enum VideoError {
    /// The device could not be opened. Terminal for the channel — reopen
    /// policy belongs to the caller.
    #[error("capture device {device_index} unavailable: {reason}")]
    DeviceUnavailable { device_index: u32, reason: String },

    /// A single frame read failed. The capture loop treats this as
    /// transient and retries after a short backoff.
    #[error("frame read failed: {0}")]
    ReadFailed(String),
}
