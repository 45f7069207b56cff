pub mod backend;
pub mod capture;
pub mod chunker;
pub mod config;
pub mod controller;
#[cfg(not(target_os = "windows"))]
pub mod cpal_backend;
pub mod device;
pub mod mock_backend;
pub mod ring_buffer;
pub mod sink;
#[cfg(target_os = "windows")]
pub mod wasapi_backend;

// Public API
pub use backend::{BackendFactory, CaptureBackend, Packet};
pub use capture::{CaptureStats, CaptureThread};
pub use chunker::SampleChunker;
pub use config::{CaptureConfig, NegotiatedFormat, DEFAULT_CHUNK_SAMPLES, DEFAULT_SAMPLE_RATE_HZ};
pub use controller::CaptureController;
#[cfg(not(target_os = "windows"))]
pub use cpal_backend::CpalBackend;
pub use device::DeviceManager;
pub use mock_backend::MockBackend;
pub use ring_buffer::AudioRingBuffer;
pub use sink::{ChunkSink, SinkSlot};
#[cfg(target_os = "windows")]
pub use wasapi_backend::WasapiBackend;

use std::sync::Arc;

/// One completed capture buffer: exactly the configured number of mono
/// f32 samples, cheap to clone across threads.
#[derive(Debug, Clone)]
pub struct Chunk {
    samples: Arc<[f32]>,
    sample_rate_hz: u32,
}

impl Chunk {
    pub fn new(samples: Vec<f32>, sample_rate_hz: u32) -> Self {
        Self {
            samples: samples.into(),
            sample_rate_hz,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Rate the samples were captured at. Differs from the requested rate
    /// only when the event-driven backend fell back to the device mix
    /// format.
    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    /// Wire form for the bridging layer: a contiguous little-endian
    /// IEEE-754 32-bit float array, four bytes per sample, no framing.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.samples.len() * 4);
        for s in self.samples.iter() {
            out.extend_from_slice(&s.to_le_bytes());
        }
        out
    }
}
