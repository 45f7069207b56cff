use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::backend::{BackendFactory, CaptureBackend, Packet};
use crate::chunker::SampleChunker;
use crate::config::CaptureConfig;
use crate::sink::SinkSlot;
use mictap_foundation::{CaptureError, SessionManager, SessionState};

/// How long one loop iteration may wait on the device before rechecking
/// the cancellation flag. Bounds stop latency.
pub const PACKET_WAIT: Duration = Duration::from_secs(1);

/// Counters shared between the capture thread and its owner.
#[derive(Debug, Default)]
pub struct CaptureStats {
    pub chunks_emitted: AtomicU64,
    pub chunks_delivered: AtomicU64,
    pub chunks_discarded: AtomicU64,
    pub packets_timed_out: AtomicU64,
}

/// Handle to the dedicated capture thread. The thread exclusively owns
/// the backend (and with it every device handle) for its lifetime.
pub struct CaptureThread {
    handle: JoinHandle<()>,
    shutdown: Arc<AtomicBool>,
}

impl CaptureThread {
    pub fn spawn(
        config: CaptureConfig,
        factory: BackendFactory,
        sink: SinkSlot,
        session: Arc<SessionManager>,
        stats: Arc<CaptureStats>,
    ) -> Result<Self, CaptureError> {
        let running = Arc::new(AtomicBool::new(true));
        let shutdown = Arc::clone(&running);

        let handle = thread::Builder::new()
            .name("mic-capture".to_string())
            .spawn(move || run_capture(config, factory, sink, session, stats, running))
            .map_err(|e| CaptureError::Fatal(format!("failed to spawn capture thread: {e}")))?;

        Ok(Self { handle, shutdown })
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Flips the cancellation flag and joins. Returns only once the
    /// thread has exited and dropped its device handles.
    pub fn stop(self) {
        self.shutdown.store(false, Ordering::SeqCst);
        let _ = self.handle.join();
    }
}

fn run_capture(
    config: CaptureConfig,
    factory: BackendFactory,
    sink: SinkSlot,
    session: Arc<SessionManager>,
    stats: Arc<CaptureStats>,
    running: Arc<AtomicBool>,
) {
    let mut backend = match factory(&config) {
        Ok(backend) => backend,
        Err(e) => {
            tracing::error!("Capture backend failed to start: {}", e);
            let _ = session.transition(SessionState::Failed);
            return;
        }
    };

    let format = backend.format();
    if format.channels != 1 || format.sample_rate_hz != config.sample_rate_hz {
        tracing::warn!(
            "Capturing degraded: {} Hz, {} ch (requested {} Hz mono)",
            format.sample_rate_hz,
            format.channels,
            config.sample_rate_hz
        );
    }

    let mut chunker = SampleChunker::new(config.chunk_samples, format);

    while running.load(Ordering::Relaxed) {
        match backend.read_packet(PACKET_WAIT) {
            Ok(Packet::TimedOut) => {
                stats.packets_timed_out.fetch_add(1, Ordering::Relaxed);
            }
            Ok(Packet::Samples(samples)) => {
                for chunk in chunker.push(&samples) {
                    stats.chunks_emitted.fetch_add(1, Ordering::Relaxed);
                    if sink.deliver(chunk) {
                        stats.chunks_delivered.fetch_add(1, Ordering::Relaxed);
                    } else {
                        // No consumer installed: drop for freshness
                        // rather than queue.
                        stats.chunks_discarded.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
            Err(e) => {
                tracing::error!("Capture stream failed: {}", e);
                let _ = session.transition(SessionState::Failed);
                break;
            }
        }
    }

    if chunker.pending() > 0 {
        tracing::debug!(
            "Discarding {} trailing samples short of a chunk",
            chunker.pending()
        );
    }
    // Backend drop releases the stream and any device/COM handles before
    // the join in stop() can observe the thread as exited.
    drop(backend);
    tracing::info!("Capture thread exiting");
}
