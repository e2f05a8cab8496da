//! Voice session state machine.
//!
//! Valid transitions:
//! - Idle -> Requesting (user toggle, microphone being acquired)
//! - Requesting -> Streaming (session opened, frames flowing)
//! - Requesting -> Idle (open failed or was aborted)
//! - Streaming -> Idle (user toggle, session close, or error)

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::VoiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoiceState {
    /// No session. Ready to start.
    Idle,
    /// Microphone access and session connect in progress.
    Requesting,
    /// Session open; audio frames are being streamed out.
    Streaming,
}

impl fmt::Display for VoiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoiceState::Idle => write!(f, "Idle"),
            VoiceState::Requesting => write!(f, "Requesting"),
            VoiceState::Streaming => write!(f, "Streaming"),
        }
    }
}

impl VoiceState {
    /// Returns whether a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: &VoiceState) -> bool {
        matches!(
            (self, target),
            (VoiceState::Idle, VoiceState::Requesting)
                | (VoiceState::Requesting, VoiceState::Streaming)
                | (VoiceState::Requesting, VoiceState::Idle)
                | (VoiceState::Streaming, VoiceState::Idle)
        )
    }
}

/// Shared state machine; clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct StateMachine {
    state: Arc<Mutex<VoiceState>>,
}

impl Default for VoiceState {
    fn default() -> Self {
        VoiceState::Idle
    }
}

impl StateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> VoiceState {
        *self.state.lock()
    }

    /// Attempt a validated transition.
    pub fn transition(&self, target: VoiceState) -> Result<(), VoiceError> {
        let mut state = self.state.lock();
        if state.can_transition_to(&target) {
            tracing::debug!("voice state: {} -> {}", *state, target);
            *state = target;
            Ok(())
        } else {
            Err(VoiceError::InvalidTransition(*state, target))
        }
    }

    /// Force back to Idle regardless of current state (stop/error recovery).
    pub fn reset(&self) {
        let mut state = self.state.lock();
        if *state != VoiceState::Idle {
            tracing::debug!("voice state reset to Idle from {}", *state);
        }
        *state = VoiceState::Idle;
    }
}
