//! Live voice transcription session.
//!
//! Microphone frames are encoded to 16 kHz PCM and streamed to a
//! bidirectional transcription session; recognized text lands in the
//! shared input buffer. Transport and capture are ports so the whole
//! lifecycle is testable without hardware or a network.

pub mod pcm;
pub mod session;
pub mod state;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("Invalid state transition: {0} -> {1}")]
    InvalidTransition(state::VoiceState, state::VoiceState),

    #[error("Microphone capture error: {0}")]
    Capture(String),

    #[error("Transport error: {0}")]
    Transport(String),
}
