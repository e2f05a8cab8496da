//! The application controller: pending input, mode selection, settings
//! and the response orchestration cycle.
//!
//! One controller holds one in-flight slot for generation. Submissions
//! clear the pending input before the backend call so the same content
//! cannot be sent twice, and every outcome (success, failure, skip)
//! leaves the controller ready for the next submission.

use std::sync::Arc;

use providers::backend::GenerativeBackend;
use providers::gemini::Part;
use providers::policy::{self, ModeConfig, RequestPlan};
use shared::attachment::Attachment;
use shared::chat::{ChatMessage, Feedback};
use shared::input::InputBuffer;
use shared::mode::AppMode;
use shared::settings::{Theme, UserLocation, ONBOARDING_KEY, THEME_KEY};

use crate::sessions::SessionStore;
use crate::storage::BlobStore;

/// Substituted when the backend returns a response with no text.
pub const EMPTY_RESPONSE_FALLBACK: &str = "I couldn't generate a text response.";

/// Caption on every synthesized image.
pub const IMAGE_CAPTION: &str = "Here is the image I generated for you:";

/// Substituted when the backend call fails outright.
pub const CONNECTIVITY_ERROR: &str =
    "Error connecting to Genesis AI. Check your connection and try again.";

pub struct ChatController {
    store: Arc<dyn BlobStore>,
    backend: Box<dyn GenerativeBackend>,
    sessions: SessionStore,
    input: InputBuffer,
    attachments: Vec<Attachment>,
    mode: AppMode,
    location: Option<UserLocation>,
    theme: Theme,
    onboarding_complete: bool,
    in_flight: bool,
}

impl ChatController {
    pub fn new(store: Arc<dyn BlobStore>, backend: Box<dyn GenerativeBackend>) -> Self {
        let mut sessions = SessionStore::new(store.clone());
        sessions.ensure_current();

        let theme = store
            .get(THEME_KEY)
            .ok()
            .flatten()
            .and_then(|s| Theme::from_str(&s))
            .unwrap_or(Theme::System);
        let onboarding_complete = store
            .get(ONBOARDING_KEY)
            .ok()
            .flatten()
            .map(|s| s == "true")
            .unwrap_or(false);

        Self {
            store,
            backend,
            sessions,
            input: InputBuffer::new(),
            attachments: Vec::new(),
            mode: AppMode::Fast,
            location: None,
            theme,
            onboarding_complete,
            in_flight: false,
        }
    }

    // ── Pending turn state ───────────────────────────────────────

    /// The pending-input buffer; clone it to share with a voice session.
    pub fn input(&self) -> &InputBuffer {
        &self.input
    }

    /// Explicit single-file picker: accepts any MIME type.
    pub fn attach_file(&mut self, mime_type: &str, bytes: &[u8]) {
        self.attachments.push(Attachment::from_file(mime_type, bytes));
    }

    /// Multi-file drop: non-media files are silently ignored.
    pub fn attach_dropped_file(&mut self, mime_type: &str, bytes: &[u8]) {
        if let Some(att) = Attachment::from_dropped_file(mime_type, bytes) {
            self.attachments.push(att);
        }
    }

    pub fn remove_attachment(&mut self, index: usize) {
        if index < self.attachments.len() {
            self.attachments.remove(index);
        }
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub fn mode(&self) -> AppMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: AppMode) {
        self.mode = mode;
    }

    pub fn set_location(&mut self, location: Option<UserLocation>) {
        self.location = location;
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    // ── Sessions ─────────────────────────────────────────────────

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn new_session(&mut self) -> String {
        self.sessions.create()
    }

    pub fn select_session(&mut self, id: &str) -> bool {
        self.sessions.select(id)
    }

    pub fn delete_session(&mut self, id: &str) {
        self.sessions.delete(id);
    }

    pub fn clear_history(&mut self) {
        self.sessions.clear();
    }

    pub fn toggle_feedback(&mut self, session_id: &str, message_id: &str, feedback: Feedback) {
        self.sessions.toggle_feedback(session_id, message_id, feedback);
    }

    // ── Settings ─────────────────────────────────────────────────

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
        if let Err(e) = self.store.set(THEME_KEY, theme.as_str()) {
            tracing::warn!("failed to persist theme: {}", e);
        }
    }

    pub fn onboarding_complete(&self) -> bool {
        self.onboarding_complete
    }

    pub fn complete_onboarding(&mut self) {
        self.onboarding_complete = true;
        if let Err(e) = self.store.set(ONBOARDING_KEY, "true") {
            tracing::warn!("failed to persist onboarding flag: {}", e);
        }
    }

    // ── Submission ───────────────────────────────────────────────

    /// Submit the pending turn. A blank turn, a missing current session
    /// or an in-flight submission all make this a no-op.
    pub async fn submit(&mut self) {
        if self.input.is_blank() && self.attachments.is_empty() {
            return;
        }
        if self.in_flight {
            return;
        }
        let Some(session_id) = self.sessions.current_id() else {
            return;
        };

        // Take the pending content before anything async happens so the
        // same turn cannot be submitted twice.
        let text = self.input.take();
        let attachments = std::mem::take(&mut self.attachments);
        self.in_flight = true;

        // Optimistic append: the user turn is visible before the backend
        // responds.
        self.sessions
            .append_message(&session_id, ChatMessage::user(text.clone(), attachments.clone()));

        let reply = self.generate_reply(&text, &attachments).await;
        self.sessions.append_message(&session_id, reply);
        self.in_flight = false;
    }

    /// Run generation for one turn. Infallible by construction: every
    /// failure becomes the connectivity-error message.
    async fn generate_reply(&self, text: &str, attachments: &[Attachment]) -> ChatMessage {
        match policy::resolve(self.mode, !attachments.is_empty(), self.location) {
            RequestPlan::Image => self.generate_image_reply(text).await,
            RequestPlan::Text { model, config } => {
                self.generate_text_reply(model, &config, text, attachments)
                    .await
            }
        }
    }

    async fn generate_text_reply(
        &self,
        model: &str,
        config: &ModeConfig,
        text: &str,
        attachments: &[Attachment],
    ) -> ChatMessage {
        // Inline media parts always precede the text part.
        let mut parts: Vec<Part> = attachments
            .iter()
            .map(|a| Part::inline_data(a.mime_type.clone(), a.data.clone()))
            .collect();
        parts.push(Part::text(text));

        match self.backend.generate(model, config, parts).await {
            Ok(reply) => {
                let mut msg = ChatMessage::model(if reply.text.is_empty() {
                    EMPTY_RESPONSE_FALLBACK.to_string()
                } else {
                    reply.text
                });
                msg.grounding_metadata = reply.grounding;
                msg
            }
            Err(e) => {
                tracing::error!("generation failed: {}", e);
                ChatMessage::model(CONNECTIVITY_ERROR)
            }
        }
    }

    async fn generate_image_reply(&self, prompt: &str) -> ChatMessage {
        match self.backend.generate_image(prompt).await {
            Ok(raw_base64) => {
                let mut msg = ChatMessage::model(IMAGE_CAPTION);
                msg.attachments = vec![Attachment::from_generated_image(&raw_base64)];
                msg
            }
            Err(e) => {
                tracing::error!("image generation failed: {}", e);
                ChatMessage::model(CONNECTIVITY_ERROR)
            }
        }
    }

    #[cfg(test)]
    fn set_in_flight(&mut self, value: bool) {
        self.in_flight = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use anyhow::{anyhow, Result};
    use parking_lot::Mutex;
    use providers::backend::GeneratedReply;
    use shared::chat::{GroundingChunk, GroundingMetadata, Role};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Copy)]
    enum Behavior {
        Text(&'static str),
        Empty,
        Grounded,
        Fail,
        Image(&'static str),
        ImageFail,
    }

    struct MockBackend {
        behavior: Behavior,
        calls: Arc<AtomicUsize>,
        last_model: Arc<Mutex<Option<String>>>,
        last_parts: Arc<Mutex<Vec<serde_json::Value>>>,
    }

    impl MockBackend {
        fn new(behavior: Behavior) -> Self {
            Self {
                behavior,
                calls: Arc::new(AtomicUsize::new(0)),
                last_model: Arc::new(Mutex::new(None)),
                last_parts: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait::async_trait]
    impl GenerativeBackend for MockBackend {
        async fn generate(
            &self,
            model: &str,
            _config: &ModeConfig,
            parts: Vec<Part>,
        ) -> Result<GeneratedReply> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_model.lock() = Some(model.to_string());
            *self.last_parts.lock() = parts
                .iter()
                .map(|p| serde_json::to_value(p).unwrap())
                .collect();
            match self.behavior {
                Behavior::Text(text) => Ok(GeneratedReply {
                    text: text.to_string(),
                    grounding: None,
                }),
                Behavior::Empty => Ok(GeneratedReply::default()),
                Behavior::Grounded => Ok(GeneratedReply {
                    text: "grounded answer".to_string(),
                    grounding: Some(GroundingMetadata {
                        search_chunks: vec![GroundingChunk {
                            uri: "https://example.com".to_string(),
                            title: "Example".to_string(),
                        }],
                        map_chunks: vec![],
                    }),
                }),
                Behavior::Fail => Err(anyhow!("connection refused")),
                Behavior::Image(_) | Behavior::ImageFail => {
                    panic!("text generation not expected")
                }
            }
        }

        async fn generate_image(&self, _prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                Behavior::Image(data) => Ok(data.to_string()),
                _ => Err(anyhow!("image endpoint down")),
            }
        }
    }

    fn controller_with(behavior: Behavior) -> (ChatController, Arc<AtomicUsize>) {
        let backend = MockBackend::new(behavior);
        let calls = backend.calls.clone();
        let controller = ChatController::new(Arc::new(MemoryStore::new()), Box::new(backend));
        (controller, calls)
    }

    #[tokio::test]
    async fn test_startup_creates_a_session() {
        let (controller, _) = controller_with(Behavior::Text("hi"));
        assert!(controller.sessions().current_id().is_some());
    }

    #[tokio::test]
    async fn test_fast_text_end_to_end() {
        let (mut controller, calls) = controller_with(Behavior::Text("Hi there!"));
        controller.input().set("Hello");
        controller.submit().await;

        let session = controller.sessions().current().unwrap();
        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.messages[0].role, Role::User);
        assert_eq!(session.messages[0].text, "Hello");
        assert_eq!(session.messages[1].role, Role::Model);
        assert_eq!(session.messages[1].text, "Hi there!");
        assert!(!controller.is_in_flight());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_blank_submission_is_a_no_op() {
        let (mut controller, calls) = controller_with(Behavior::Text("unused"));
        controller.input().set("   ");
        controller.submit().await;

        assert_eq!(controller.sessions().current().unwrap().messages.len(), 0);
        assert!(!controller.is_in_flight());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_attachment_only_submission_goes_through() {
        let (mut controller, calls) = controller_with(Behavior::Text("a photo"));
        controller.attach_file("image/png", b"pixels");
        controller.submit().await;

        let session = controller.sessions().current().unwrap();
        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.messages[0].attachments.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        // The pending attachment list was drained on submit.
        assert!(controller.attachments().is_empty());
    }

    #[tokio::test]
    async fn test_in_flight_guard_blocks_second_submission() {
        let (mut controller, calls) = controller_with(Behavior::Text("unused"));
        controller.set_in_flight(true);
        controller.input().set("Hello");
        controller.submit().await;

        assert_eq!(controller.sessions().current().unwrap().messages.len(), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        // The pending input is untouched by the skipped submission.
        assert_eq!(controller.input().get(), "Hello");
    }

    #[tokio::test]
    async fn test_backend_error_becomes_connectivity_message() {
        let (mut controller, _) = controller_with(Behavior::Fail);
        controller.input().set("Hello");
        controller.submit().await;

        let session = controller.sessions().current().unwrap();
        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.messages[1].text, CONNECTIVITY_ERROR);
        assert!(!controller.is_in_flight());
    }

    #[tokio::test]
    async fn test_empty_backend_text_gets_fallback() {
        let (mut controller, _) = controller_with(Behavior::Empty);
        controller.input().set("Hello");
        controller.submit().await;

        let session = controller.sessions().current().unwrap();
        assert_eq!(session.messages[1].text, EMPTY_RESPONSE_FALLBACK);
    }

    #[tokio::test]
    async fn test_grounding_metadata_reaches_the_message() {
        let (mut controller, _) = controller_with(Behavior::Grounded);
        controller.set_mode(AppMode::Search);
        controller.input().set("latest news");
        controller.submit().await;

        let session = controller.sessions().current().unwrap();
        let grounding = session.messages[1].grounding_metadata.as_ref().unwrap();
        assert_eq!(grounding.search_chunks[0].title, "Example");
    }

    #[tokio::test]
    async fn test_image_mode_end_to_end() {
        let (mut controller, _) = controller_with(Behavior::Image("cGl4ZWxz"));
        controller.set_mode(AppMode::Image);
        controller.input().set("a lighthouse");
        controller.submit().await;

        let session = controller.sessions().current().unwrap();
        assert_eq!(session.messages.len(), 2);
        let reply = &session.messages[1];
        assert_eq!(reply.text, IMAGE_CAPTION);
        assert_eq!(reply.attachments.len(), 1);
        assert_eq!(
            reply.attachments[0].kind,
            shared::attachment::AttachmentKind::Image
        );
        assert_eq!(reply.attachments[0].data, "cGl4ZWxz");
        assert!(!controller.is_in_flight());
    }

    #[tokio::test]
    async fn test_image_failure_becomes_connectivity_message() {
        let (mut controller, _) = controller_with(Behavior::ImageFail);
        controller.set_mode(AppMode::Image);
        controller.input().set("a lighthouse");
        controller.submit().await;

        let session = controller.sessions().current().unwrap();
        assert_eq!(session.messages[1].text, CONNECTIVITY_ERROR);
    }

    #[tokio::test]
    async fn test_media_parts_precede_text_part() {
        let backend = MockBackend::new(Behavior::Text("ok"));
        let parts = backend.last_parts.clone();
        let mut controller =
            ChatController::new(Arc::new(MemoryStore::new()), Box::new(backend));
        controller.attach_file("image/png", b"pixels");
        controller.input().set("what is this?");
        controller.submit().await;

        let parts = parts.lock();
        assert_eq!(parts.len(), 2);
        assert!(parts[0].get("inlineData").is_some());
        assert_eq!(parts[1]["text"], "what is this?");
    }

    #[tokio::test]
    async fn test_media_escalates_model_for_fast_mode() {
        let backend = MockBackend::new(Behavior::Text("ok"));
        let model = backend.last_model.clone();
        let mut controller =
            ChatController::new(Arc::new(MemoryStore::new()), Box::new(backend));
        controller.attach_file("image/png", b"pixels");
        controller.input().set("look");
        controller.submit().await;

        assert_eq!(model.lock().as_deref(), Some(providers::policy::DEEP_MODEL));
    }

    #[tokio::test]
    async fn test_remove_attachment() {
        let (mut controller, _) = controller_with(Behavior::Text("ok"));
        controller.attach_file("image/png", b"a");
        controller.attach_file("video/mp4", b"b");
        controller.remove_attachment(0);
        assert_eq!(controller.attachments().len(), 1);
        assert_eq!(
            controller.attachments()[0].kind,
            shared::attachment::AttachmentKind::Video
        );
        // Out-of-range removal is ignored.
        controller.remove_attachment(5);
        assert_eq!(controller.attachments().len(), 1);
    }

    #[tokio::test]
    async fn test_dropped_non_media_file_is_ignored() {
        let (mut controller, _) = controller_with(Behavior::Text("ok"));
        controller.attach_dropped_file("application/pdf", b"%PDF");
        assert!(controller.attachments().is_empty());
        controller.attach_dropped_file("image/png", b"pixels");
        assert_eq!(controller.attachments().len(), 1);
    }

    #[tokio::test]
    async fn test_theme_persists_across_controllers() {
        let store: Arc<dyn BlobStore> = Arc::new(MemoryStore::new());
        {
            let mut controller =
                ChatController::new(store.clone(), Box::new(MockBackend::new(Behavior::Empty)));
            assert_eq!(controller.theme(), Theme::System);
            controller.set_theme(Theme::Dark);
        }
        let controller =
            ChatController::new(store, Box::new(MockBackend::new(Behavior::Empty)));
        assert_eq!(controller.theme(), Theme::Dark);
    }

    #[tokio::test]
    async fn test_onboarding_flag_persists_as_string() {
        let store: Arc<dyn BlobStore> = Arc::new(MemoryStore::new());
        {
            let mut controller =
                ChatController::new(store.clone(), Box::new(MockBackend::new(Behavior::Empty)));
            assert!(!controller.onboarding_complete());
            controller.complete_onboarding();
        }
        assert_eq!(store.get(ONBOARDING_KEY).unwrap().as_deref(), Some("true"));
        let controller =
            ChatController::new(store, Box::new(MockBackend::new(Behavior::Empty)));
        assert!(controller.onboarding_complete());
    }

    #[tokio::test]
    async fn test_voice_transcript_feeds_submission() {
        use voice::session::mock::{MockMicrophone, MockTransport};
        use voice::session::{LiveEvent, VoiceSession};

        let (mut controller, _) = controller_with(Behavior::Text("done"));
        let mut voice_session = VoiceSession::new(
            Box::new(MockMicrophone::new()),
            Box::new(MockTransport::new()),
            controller.input().clone(),
        );
        voice_session.toggle().unwrap();
        voice_session.handle_event(LiveEvent::Opened);
        voice_session.handle_event(LiveEvent::Transcript("send the".to_string()));
        voice_session.handle_event(LiveEvent::Transcript("report".to_string()));
        voice_session.stop();

        assert_eq!(controller.input().get(), "send the report");
        controller.submit().await;
        let session = controller.sessions().current().unwrap();
        assert_eq!(session.messages[0].text, "send the report");
    }
}
