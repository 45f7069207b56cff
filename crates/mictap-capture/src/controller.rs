use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::backend::{platform_backend, BackendFactory};
use crate::capture::{CaptureStats, CaptureThread};
use crate::config::CaptureConfig;
use crate::sink::SinkSlot;
use crate::Chunk;
use mictap_foundation::{ControlError, SessionManager, SessionState};

/// Owns at most one capture session and the sink registration.
///
/// An explicitly owned instance; embedders hold one per process and
/// route their control surface through it.
pub struct CaptureController {
    session: Arc<SessionManager>,
    sink: SinkSlot,
    stats: Arc<CaptureStats>,
    factory: BackendFactory,
    worker: Mutex<Option<CaptureThread>>,
}

impl Default for CaptureController {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureController {
    /// Controller backed by the platform capture backend.
    pub fn new() -> Self {
        Self::with_backend_factory(Arc::new(platform_backend))
    }

    /// Controller backed by an injected backend factory; how tests swap
    /// in deterministic mock backends.
    pub fn with_backend_factory(factory: BackendFactory) -> Self {
        Self {
            session: Arc::new(SessionManager::new()),
            sink: SinkSlot::new(),
            stats: Arc::new(CaptureStats::default()),
            factory,
            worker: Mutex::new(None),
        }
    }

    /// Starts capture at the given rate and chunk length (zeros fall
    /// back to 44100/1024). Idempotent while a session is running.
    ///
    /// Returns true once the capture thread is up. Device readiness is
    /// asynchronous: the thread may still fail into
    /// [`SessionState::Failed`], observable via [`state`](Self::state).
    pub fn start(&self, sample_rate_hz: u32, chunk_samples: usize) -> bool {
        let config = CaptureConfig::sanitized(sample_rate_hz, chunk_samples);

        let mut worker = self.worker.lock();
        if let Some(existing) = worker.as_ref() {
            if !existing.is_finished() && self.session.current() == SessionState::Running {
                tracing::debug!("start() ignored: capture already running");
                return true;
            }
        }
        // A previous session failed; reap the exited thread first.
        if let Some(old) = worker.take() {
            old.stop();
        }

        if self.session.transition(SessionState::Starting).is_err() {
            tracing::warn!(
                "start() rejected in state {:?}",
                self.session.current()
            );
            return false;
        }

        match CaptureThread::spawn(
            config,
            Arc::clone(&self.factory),
            self.sink.clone(),
            Arc::clone(&self.session),
            Arc::clone(&self.stats),
        ) {
            Ok(thread) => {
                *worker = Some(thread);
                // The worker may already have moved the session to
                // Failed; the rejected transition leaves that visible.
                let _ = self.session.transition(SessionState::Running);
                true
            }
            Err(e) => {
                tracing::error!("Failed to spawn capture thread: {}", e);
                let _ = self.session.transition(SessionState::Failed);
                false
            }
        }
    }

    /// Stops capture and blocks until the worker has exited and released
    /// its device handles; no chunk is delivered after this returns.
    /// Idempotent; a no-op when nothing was started.
    pub fn stop(&self) {
        let mut worker = self.worker.lock();
        let Some(thread) = worker.take() else {
            tracing::debug!("stop() ignored: no capture session");
            return;
        };

        let was_running = self.session.current() == SessionState::Running;
        if was_running {
            let _ = self.session.transition(SessionState::Stopping);
        }
        thread.stop();
        if was_running {
            let _ = self.session.transition(SessionState::Idle);
        }
        // After an asynchronous failure the session stays Failed; the
        // dead thread was still reaped above.
    }

    /// Installs the chunk sink, replacing any previous one. May be
    /// called at any time, independent of session state; takes effect
    /// for the next chunk.
    pub fn set_sink<F>(&self, sink: F)
    where
        F: Fn(Chunk) + Send + Sync + 'static,
    {
        self.sink.install(sink);
    }

    pub fn clear_sink(&self) {
        self.sink.clear();
    }

    pub fn state(&self) -> SessionState {
        self.session.current()
    }

    pub fn stats(&self) -> Arc<CaptureStats> {
        Arc::clone(&self.stats)
    }

    /// Receiver of session state transitions.
    pub fn subscribe(&self) -> Receiver<SessionState> {
        self.session.subscribe()
    }

    /// Control dispatch for the bridging layer. Unknown methods are
    /// rejected without touching session state.
    pub fn handle_control(
        &self,
        method: &str,
        sample_rate_hz: u32,
        chunk_samples: usize,
    ) -> Result<bool, ControlError> {
        match method {
            "start" => Ok(self.start(sample_rate_hz, chunk_samples)),
            "stop" => {
                self.stop();
                Ok(true)
            }
            other => Err(ControlError::NotImplemented(other.to_string())),
        }
    }
}
