//! The live transcription session lifecycle.
//!
//! All transitions funnel through [`VoiceSession::handle_event`] and the
//! user-facing [`VoiceSession::toggle`]; the capture and transport sides
//! are ports so the state machine is exercised without hardware.

use serde::Serialize;
use shared::input::InputBuffer;

use crate::pcm::{self, PCM_MIME_TYPE};
use crate::state::{StateMachine, VoiceState};
use crate::VoiceError;

/// Live model used for audio-in transcription.
pub const LIVE_MODEL: &str = "gemini-2.5-flash-native-audio-preview-09-2025";

/// Instruction that keeps the session a pure transcriptionist.
pub const TRANSCRIBE_INSTRUCTION: &str = "You are a silent transcriptionist. Transcribe audio to text exactly as heard. Do not generate audio responses.";

/// Error substrings that indicate an expired or invalid credential.
const CREDENTIAL_ERROR_MARKERS: [&str; 2] = ["Requested entity was not found", "unavailable"];

/// Session configuration sent on connect.
#[derive(Debug, Clone)]
pub struct LiveConfig {
    pub model: String,
    pub system_instruction: String,
    /// Incremental input transcription events enabled.
    pub transcribe_input: bool,
    /// Audio responses disabled: the session only listens.
    pub audio_response: bool,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            model: LIVE_MODEL.to_string(),
            system_instruction: TRANSCRIBE_INSTRUCTION.to_string(),
            transcribe_input: true,
            audio_response: false,
        }
    }
}

/// One outbound audio message.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RealtimeInput {
    pub media: MediaBlob,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MediaBlob {
    pub data: String,
    pub mime_type: String,
}

/// Inbound lifecycle and transcript events, dispatched by the host.
#[derive(Debug, Clone)]
pub enum LiveEvent {
    Opened,
    Transcript(String),
    Error(String),
    Closed,
}

/// Microphone access.
pub trait MicrophonePort {
    fn open(&self) -> Result<Box<dyn MicrophoneHandle>, VoiceError>;
}

/// An open capture stream; closing releases the device.
pub trait MicrophoneHandle {
    fn close(&mut self);
}

/// Bidirectional transcription transport.
pub trait LiveTranscriptPort {
    fn connect(&self, config: &LiveConfig) -> Result<Box<dyn LiveSessionHandle>, VoiceError>;
}

/// An open transcription session.
pub trait LiveSessionHandle {
    fn send_audio(&mut self, input: &RealtimeInput) -> Result<(), VoiceError>;
    fn close(&mut self);
}

/// Best-effort credential reselection, tried before giving up on a
/// credential error.
pub trait CredentialRefresher {
    fn refresh(&self) -> bool;
}

pub struct VoiceSession {
    state: StateMachine,
    microphone: Box<dyn MicrophonePort>,
    transport: Box<dyn LiveTranscriptPort>,
    credentials: Option<Box<dyn CredentialRefresher>>,
    config: LiveConfig,
    input: InputBuffer,
    mic_handle: Option<Box<dyn MicrophoneHandle>>,
    session: Option<Box<dyn LiveSessionHandle>>,
}

impl VoiceSession {
    pub fn new(
        microphone: Box<dyn MicrophonePort>,
        transport: Box<dyn LiveTranscriptPort>,
        input: InputBuffer,
    ) -> Self {
        Self {
            state: StateMachine::new(),
            microphone,
            transport,
            credentials: None,
            config: LiveConfig::default(),
            input,
            mic_handle: None,
            session: None,
        }
    }

    pub fn with_credentials(mut self, credentials: Box<dyn CredentialRefresher>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn state(&self) -> VoiceState {
        self.state.current()
    }

    pub fn is_streaming(&self) -> bool {
        self.state.current() == VoiceState::Streaming
    }

    /// User toggle: starts from Idle, stops from Streaming. While the
    /// session is still being requested the toggle is inert; only the
    /// open callback or an error can move the state on.
    pub fn toggle(&mut self) -> Result<(), VoiceError> {
        match self.state.current() {
            VoiceState::Idle => self.start(),
            VoiceState::Streaming => {
                self.stop();
                Ok(())
            }
            VoiceState::Requesting => Ok(()),
        }
    }

    fn start(&mut self) -> Result<(), VoiceError> {
        self.state.transition(VoiceState::Requesting)?;

        let mic_handle = match self.microphone.open() {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!("microphone acquisition failed: {}", e);
                self.state.reset();
                return Err(e);
            }
        };
        self.mic_handle = Some(mic_handle);

        match self.transport.connect(&self.config) {
            Ok(session) => {
                self.session = Some(session);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("live session connect failed: {}", e);
                self.stop();
                Err(e)
            }
        }
    }

    /// Single entry point for transport callbacks.
    pub fn handle_event(&mut self, event: LiveEvent) {
        match event {
            LiveEvent::Opened => {
                if let Err(e) = self.state.transition(VoiceState::Streaming) {
                    // Open raced with a stop; the session is already torn down.
                    tracing::debug!("ignoring open event: {}", e);
                }
            }
            LiveEvent::Transcript(text) => {
                if self.state.current() == VoiceState::Streaming && !text.is_empty() {
                    self.input.append_transcript(&text);
                }
            }
            LiveEvent::Error(message) => {
                if CREDENTIAL_ERROR_MARKERS.iter().any(|m| message.contains(m)) {
                    if let Some(credentials) = &self.credentials {
                        let refreshed = credentials.refresh();
                        tracing::info!(refreshed, "credential reselection attempted");
                    }
                }
                tracing::warn!("live session error: {}", message);
                self.stop();
            }
            LiveEvent::Closed => self.stop(),
        }
    }

    /// Per-frame capture callback. The state is checked synchronously so a
    /// frame arriving between a stop request and audio-graph teardown is
    /// dropped rather than sent.
    pub fn on_audio_frame(&mut self, samples: &[f32]) {
        if self.state.current() != VoiceState::Streaming {
            return;
        }
        let input = RealtimeInput {
            media: MediaBlob {
                data: pcm::encode_frame(samples),
                mime_type: PCM_MIME_TYPE.to_string(),
            },
        };
        let failed = match self.session.as_mut() {
            Some(session) => session.send_audio(&input).is_err(),
            None => true,
        };
        if failed {
            self.stop();
        }
    }

    /// Tear everything down. Idempotent; every resource is released even
    /// if another release step failed first.
    pub fn stop(&mut self) {
        if let Some(mut mic) = self.mic_handle.take() {
            mic.close();
        }
        if let Some(mut session) = self.session.take() {
            session.close();
        }
        self.state.reset();
    }
}

impl Drop for VoiceSession {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Hardware-free port implementations used by tests and by hosts without
/// a real capture device.
pub mod mock {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;

    /// Microphone that tracks how many handles are currently open.
    #[derive(Clone, Default)]
    pub struct MockMicrophone {
        pub open_handles: Arc<AtomicUsize>,
        pub fail_next_open: Arc<AtomicBool>,
    }

    impl MockMicrophone {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl MicrophonePort for MockMicrophone {
        fn open(&self) -> Result<Box<dyn MicrophoneHandle>, VoiceError> {
            if self.fail_next_open.swap(false, Ordering::SeqCst) {
                return Err(VoiceError::Capture("permission denied".to_string()));
            }
            self.open_handles.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(MockMicrophoneHandle {
                open_handles: self.open_handles.clone(),
                closed: false,
            }))
        }
    }

    struct MockMicrophoneHandle {
        open_handles: Arc<AtomicUsize>,
        closed: bool,
    }

    impl MicrophoneHandle for MockMicrophoneHandle {
        fn close(&mut self) {
            if !self.closed {
                self.closed = true;
                self.open_handles.fetch_sub(1, Ordering::SeqCst);
            }
        }
    }

    /// Transport that records every outbound frame.
    #[derive(Clone, Default)]
    pub struct MockTransport {
        pub open_sessions: Arc<AtomicUsize>,
        pub sent: Arc<Mutex<Vec<RealtimeInput>>>,
        pub fail_next_connect: Arc<AtomicBool>,
        pub fail_sends: Arc<AtomicBool>,
        pub last_config: Arc<Mutex<Option<LiveConfig>>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn sent_frames(&self) -> Vec<RealtimeInput> {
            self.sent.lock().clone()
        }
    }

    impl LiveTranscriptPort for MockTransport {
        fn connect(&self, config: &LiveConfig) -> Result<Box<dyn LiveSessionHandle>, VoiceError> {
            if self.fail_next_connect.swap(false, Ordering::SeqCst) {
                return Err(VoiceError::Transport("connect refused".to_string()));
            }
            *self.last_config.lock() = Some(config.clone());
            self.open_sessions.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(MockSessionHandle {
                open_sessions: self.open_sessions.clone(),
                sent: self.sent.clone(),
                fail_sends: self.fail_sends.clone(),
                closed: false,
            }))
        }
    }

    struct MockSessionHandle {
        open_sessions: Arc<AtomicUsize>,
        sent: Arc<Mutex<Vec<RealtimeInput>>>,
        fail_sends: Arc<AtomicBool>,
        closed: bool,
    }

    impl LiveSessionHandle for MockSessionHandle {
        fn send_audio(&mut self, input: &RealtimeInput) -> Result<(), VoiceError> {
            if self.fail_sends.load(Ordering::SeqCst) {
                return Err(VoiceError::Transport("stream broken".to_string()));
            }
            self.sent.lock().push(input.clone());
            Ok(())
        }

        fn close(&mut self) {
            if !self.closed {
                self.closed = true;
                self.open_sessions.fetch_sub(1, Ordering::SeqCst);
            }
        }
    }

    /// Refresher that counts invocations.
    #[derive(Clone, Default)]
    pub struct MockCredentialRefresher {
        pub calls: Arc<AtomicUsize>,
    }

    impl CredentialRefresher for MockCredentialRefresher {
        fn refresh(&self) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            true
        }
    }
}
