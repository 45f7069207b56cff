use crate::config::{CaptureConfig, NegotiatedFormat};
use mictap_foundation::CaptureError;
use std::sync::Arc;
use std::time::Duration;

/// One read from a capture backend.
#[derive(Debug)]
pub enum Packet {
    /// Interleaved samples at the negotiated channel count.
    Samples(Vec<f32>),
    /// Nothing arrived within the timeout; the caller rechecks its
    /// cancellation flag and tries again.
    TimedOut,
}

/// A platform capture session: constructed on the capture thread, read
/// until cancellation or error, released on drop.
///
/// Any error from `read_packet` is terminal for the session; backends
/// never retry internally.
pub trait CaptureBackend {
    /// The format the device actually granted.
    fn format(&self) -> NegotiatedFormat;

    /// Blocks for the next batch of samples, bounded by `timeout`.
    fn read_packet(&mut self, timeout: Duration) -> Result<Packet, CaptureError>;
}

/// Backend constructor invoked on the capture thread. Construction has to
/// happen there: cpal streams and COM clients are bound to the thread
/// that creates them.
pub type BackendFactory =
    Arc<dyn Fn(&CaptureConfig) -> Result<Box<dyn CaptureBackend>, CaptureError> + Send + Sync>;

/// The default backend for this platform: event-driven WASAPI on
/// Windows, blocking-read cpal everywhere else.
pub fn platform_backend(config: &CaptureConfig) -> Result<Box<dyn CaptureBackend>, CaptureError> {
    #[cfg(target_os = "windows")]
    {
        Ok(Box::new(crate::wasapi_backend::WasapiBackend::open(config)?))
    }
    #[cfg(not(target_os = "windows"))]
    {
        Ok(Box::new(crate::cpal_backend::CpalBackend::open(config)?))
    }
}
