//! Error types for capture operations.

use crate::format::PixelFormat;
use thiserror::Error;

/// Errors that can occur while operating a capture provider.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The platform capture subsystem failed to come up.
    #[error("capture subsystem failed to initialize: {0}")]
    InitializationFailed(String),

    /// No device matched the requested name or index.
    #[error("no capture device matched \"{0}\"")]
    DeviceNotFound(String),

    /// The device exists but could not be bound.
    #[error("device \"{device}\" could not be opened: {reason}")]
    OpenFailed { device: String, reason: String },

    /// The requested pixel format is impossible and force was not set.
    #[error("pixel format {0} is not supported by the device")]
    FormatUnsupported(PixelFormat),

    /// An operation was called in the wrong provider state.
    #[error("{op} is invalid while the provider is {state}")]
    InvalidState { op: &'static str, state: &'static str },

    /// The device was lost at runtime (e.g. USB unplug).
    #[error("capture device disconnected")]
    DeviceDisconnected,

    /// A single sample could not be retrieved; recovered locally.
    #[error("failed to retrieve a capture sample: {0}")]
    FrameCaptureFailed(String),

    /// In-place conversion was invoked against its precondition.
    #[error("in-place conversion misuse: {0}")]
    ConversionMisuse(&'static str),

    /// A conversion kernel rejected the frame geometry.
    #[error(transparent)]
    Convert(#[from] camcap_convert::ConvertError),

    /// Filesystem error while dumping a frame.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
