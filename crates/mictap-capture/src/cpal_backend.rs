use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::backend::{CaptureBackend, Packet};
use crate::config::{CaptureConfig, NegotiatedFormat};
use crate::device::DeviceManager;
use crate::ring_buffer::{AudioConsumer, AudioRingBuffer};
use mictap_foundation::CaptureError;

/// Poll interval while waiting for the device callback to fill the ring.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Smallest scratch buffer handed to the ring reader.
const MIN_SCRATCH_SAMPLES: usize = 1_024;

/// Blocking-read capture over cpal.
///
/// The stream is opened directly at the requested rate, mono, f32; there
/// is no negotiation step, and a device that rejects that configuration
/// fails construction outright.
pub struct CpalBackend {
    // Held for its side effect: dropping the stream stops capture.
    _stream: Stream,
    consumer: AudioConsumer,
    format: NegotiatedFormat,
    stream_failed: Arc<AtomicBool>,
    overflow_samples: Arc<AtomicU64>,
    scratch: Vec<f32>,
}

impl CpalBackend {
    pub fn open(config: &CaptureConfig) -> Result<Self, CaptureError> {
        let devices = DeviceManager::new();
        let device = devices.default_input_device().map_err(|e| {
            tracing::error!(
                "No default input device; enumerable inputs: {:?}",
                devices.input_device_names()
            );
            e
        })?;
        if let Ok(name) = device.name() {
            tracing::info!(
                "Selected input device: {} (host: {:?})",
                name,
                devices.host_id()
            );
        }

        let stream_config = StreamConfig {
            channels: 1,
            sample_rate: config.sample_rate_hz,
            buffer_size: cpal::BufferSize::Default,
        };

        // Roughly half a second of headroom at the requested rate, and
        // never less than a few chunks.
        let capacity = (config.sample_rate_hz as usize / 2).max(config.chunk_samples * 4);
        let (mut producer, consumer) = AudioRingBuffer::new(capacity).split();

        let stream_failed = Arc::new(AtomicBool::new(false));
        let overflow_samples = Arc::new(AtomicU64::new(0));

        let overflow = Arc::clone(&overflow_samples);
        let failed = Arc::clone(&stream_failed);

        let stream = device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                // Never block the device callback; drop and count.
                if producer.write(data).is_err() {
                    overflow.fetch_add(data.len() as u64, Ordering::Relaxed);
                }
            },
            move |err: cpal::StreamError| {
                tracing::error!("Input stream error: {}", err);
                failed.store(true, Ordering::SeqCst);
            },
            None,
        )?;
        stream.play()?;

        Ok(Self {
            _stream: stream,
            consumer,
            format: NegotiatedFormat {
                sample_rate_hz: config.sample_rate_hz,
                channels: 1,
            },
            stream_failed,
            overflow_samples,
            scratch: vec![0.0; config.chunk_samples.max(MIN_SCRATCH_SAMPLES)],
        })
    }

    /// Samples dropped because the reader fell behind the device.
    pub fn overflow_samples(&self) -> u64 {
        self.overflow_samples.load(Ordering::Relaxed)
    }
}

impl CaptureBackend for CpalBackend {
    fn format(&self) -> NegotiatedFormat {
        self.format
    }

    fn read_packet(&mut self, timeout: Duration) -> Result<Packet, CaptureError> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.stream_failed.load(Ordering::SeqCst) {
                return Err(CaptureError::Stream(
                    "input stream reported an error".into(),
                ));
            }
            let read = self.consumer.read(&mut self.scratch);
            if read > 0 {
                return Ok(Packet::Samples(self.scratch[..read].to_vec()));
            }
            if Instant::now() >= deadline {
                return Ok(Packet::TimedOut);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}
