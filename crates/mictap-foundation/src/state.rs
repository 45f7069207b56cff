use crate::error::CaptureError;
use crossbeam_channel::{Receiver, Sender};
use parking_lot::RwLock;
use std::sync::Arc;

/// Lifecycle of a capture session. `Failed` is sticky until the next
/// start; everything else follows the start/stop path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Starting,
    Running,
    Stopping,
    Failed,
}

pub struct SessionManager {
    state: Arc<RwLock<SessionState>>,
    state_tx: Sender<SessionState>,
    state_rx: Receiver<SessionState>,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionManager {
    pub fn new() -> Self {
        let (state_tx, state_rx) = crossbeam_channel::unbounded();
        Self {
            state: Arc::new(RwLock::new(SessionState::Idle)),
            state_tx,
            state_rx,
        }
    }

    pub fn transition(&self, new_state: SessionState) -> Result<(), CaptureError> {
        let mut current = self.state.write();

        // The capture thread and the control path race on failure; the
        // table below is what keeps the loser of that race harmless.
        let valid = matches!(
            (&*current, &new_state),
            (SessionState::Idle, SessionState::Starting)
                | (SessionState::Failed, SessionState::Starting)
                | (SessionState::Starting, SessionState::Running)
                | (SessionState::Starting, SessionState::Failed)
                | (SessionState::Running, SessionState::Stopping)
                | (SessionState::Running, SessionState::Failed)
                | (SessionState::Stopping, SessionState::Idle)
        );

        if !valid {
            return Err(CaptureError::Fatal(format!(
                "Invalid state transition: {:?} -> {:?}",
                *current, new_state
            )));
        }

        tracing::info!("Session transition: {:?} -> {:?}", *current, new_state);
        *current = new_state;
        let _ = self.state_tx.send(new_state);
        Ok(())
    }

    pub fn current(&self) -> SessionState {
        *self.state.read()
    }

    pub fn subscribe(&self) -> Receiver<SessionState> {
        self.state_rx.clone()
    }
}
