/// Capture rate used when the caller supplies none, or an invalid one.
pub const DEFAULT_SAMPLE_RATE_HZ: u32 = 44_100;

/// Chunk length used when the caller supplies none, or an invalid one.
pub const DEFAULT_CHUNK_SAMPLES: usize = 1_024;

/// What the caller asked for. Output is always mono f32 regardless of
/// what the device negotiates; immutable once a session starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConfig {
    pub sample_rate_hz: u32,
    pub chunk_samples: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
            chunk_samples: DEFAULT_CHUNK_SAMPLES,
        }
    }
}

impl CaptureConfig {
    /// Zero values fall back to the defaults rather than failing the call.
    pub fn sanitized(sample_rate_hz: u32, chunk_samples: usize) -> Self {
        if sample_rate_hz == 0 || chunk_samples == 0 {
            tracing::warn!(
                "Invalid capture parameters ({} Hz, {} samples); using defaults",
                sample_rate_hz,
                chunk_samples
            );
        }
        Self {
            sample_rate_hz: if sample_rate_hz == 0 {
                DEFAULT_SAMPLE_RATE_HZ
            } else {
                sample_rate_hz
            },
            chunk_samples: if chunk_samples == 0 {
                DEFAULT_CHUNK_SAMPLES
            } else {
                chunk_samples
            },
        }
    }
}

/// Format a backend actually achieved after negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegotiatedFormat {
    pub sample_rate_hz: u32,
    pub channels: u16,
}
