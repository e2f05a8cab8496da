//! The seam between the orchestrator and the generative backend.
//!
//! The controller only ever talks to this trait, so tests can substitute
//! a mock and the real HTTP client stays confined to `gemini`.

use anyhow::Result;
use shared::chat::GroundingMetadata;

use crate::gemini::Part;
use crate::policy::ModeConfig;

/// Normalized result of a text/multimodal generation call.
#[derive(Debug, Clone, Default)]
pub struct GeneratedReply {
    pub text: String,
    pub grounding: Option<GroundingMetadata>,
}

/// Note: uses async_trait for object safety.
#[async_trait::async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Text/multimodal generation. `parts` are already ordered with inline
    /// media before the text part.
    async fn generate(
        &self,
        model: &str,
        config: &ModeConfig,
        parts: Vec<Part>,
    ) -> Result<GeneratedReply>;

    /// Image synthesis; returns the raw base64 PNG payload.
    async fn generate_image(&self, prompt: &str) -> Result<String>;
}
