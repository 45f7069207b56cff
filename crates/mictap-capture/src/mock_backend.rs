use std::thread;
use std::time::{Duration, Instant};

use crate::backend::{CaptureBackend, Packet};
use crate::config::NegotiatedFormat;
use mictap_foundation::CaptureError;

/// Marker carried by every channel other than channel 0, so tests can
/// observe which channel the chunker selected.
pub const OTHER_CHANNEL_MARKER: f32 = -0.5;

/// Deterministic in-memory backend for driving the capture loop without
/// hardware.
///
/// Each read produces `frames_per_read` interleaved frames. Channel 0
/// carries an incrementing ramp; any further channels carry
/// [`OTHER_CHANNEL_MARKER`]. A paced mock schedules reads against a
/// deadline so the long-run sample rate matches the nominal rate.
pub struct MockBackend {
    format: NegotiatedFormat,
    frames_per_read: usize,
    pace: Duration,
    next_due: Option<Instant>,
    fail_after_reads: Option<usize>,
    reads: usize,
    next_value: f32,
}

impl MockBackend {
    pub fn new(format: NegotiatedFormat, frames_per_read: usize) -> Self {
        Self {
            format,
            frames_per_read,
            pace: Duration::ZERO,
            next_due: None,
            fail_after_reads: None,
            reads: 0,
            next_value: 0.0,
        }
    }

    /// Paces reads so samples flow at the nominal rate in real time.
    pub fn paced(mut self) -> Self {
        self.pace = Duration::from_secs_f64(
            self.frames_per_read as f64 / self.format.sample_rate_hz as f64,
        );
        self
    }

    /// Fails with a stream error once `reads` packets have been produced.
    pub fn fail_after(mut self, reads: usize) -> Self {
        self.fail_after_reads = Some(reads);
        self
    }
}

impl CaptureBackend for MockBackend {
    fn format(&self) -> NegotiatedFormat {
        self.format
    }

    fn read_packet(&mut self, timeout: Duration) -> Result<Packet, CaptureError> {
        if let Some(limit) = self.fail_after_reads {
            if self.reads >= limit {
                return Err(CaptureError::Stream("mock stream failure".into()));
            }
        }

        if self.pace > Duration::ZERO {
            let pace = self.pace;
            let due = *self
                .next_due
                .get_or_insert_with(|| Instant::now() + pace);
            let now = Instant::now();
            if due > now {
                let wait = due - now;
                if wait > timeout {
                    thread::sleep(timeout);
                    return Ok(Packet::TimedOut);
                }
                thread::sleep(wait);
            }
            // Deadline-based, so sleep overshoot does not skew the rate.
            self.next_due = Some(due + pace);
        }

        self.reads += 1;
        let channels = self.format.channels as usize;
        let mut samples = Vec::with_capacity(self.frames_per_read * channels);
        for _ in 0..self.frames_per_read {
            samples.push(self.next_value);
            self.next_value += 1.0;
            for _ in 1..channels {
                samples.push(OTHER_CHANNEL_MARKER);
            }
        }
        Ok(Packet::Samples(samples))
    }
}
