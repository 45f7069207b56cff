use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Capture device not found: {name:?}")]
    DeviceNotFound { name: Option<String> },

    #[error("Device activation failed: {0}")]
    ActivationFailed(String),

    #[error("Format not supported: {format}")]
    FormatNotSupported { format: String },

    #[error("Buffer overflow, dropped {count} samples")]
    BufferOverflow { count: usize },

    #[error("Capture stream failed: {0}")]
    Stream(String),

    #[error("CPAL error: {0}")]
    Cpal(#[from] cpal::StreamError),

    #[error("Build stream error: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("Play stream error: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("Fatal error, cannot recover: {0}")]
    Fatal(String),
}

/// Errors surfaced to the bridging layer by the control dispatch.
#[derive(Error, Debug)]
pub enum ControlError {
    #[error("Control method not implemented: {0}")]
    NotImplemented(String),
}
